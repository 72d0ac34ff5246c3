//! Collected outcome of a mapping pass
//!
//! A [`MappingResults`] is filled while classes are rewritten and committed
//! afterwards in one step. Until [`MappingResults::apply`] runs, no bundle
//! has been touched, so the results can be inspected (or dropped) freely.

use crate::class::ClassInfo;
use crate::resource::{BundleKey, ClassPath, Resource};
use crate::{Error, Result};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Lifecycle of a [`MappingResults`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultsState {
    Collecting,
    Committed,
}

/// A class that could not be rewritten. It stays untouched in its bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RewriteFailure {
    pub resource: String,
    pub bundle: BundleKey,
    pub class: String,
    pub message: String,
}

impl fmt::Display for RewriteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}: {}", self.resource, self.bundle, self.class, self.message)
    }
}

impl From<&RewriteFailure> for Error {
    fn from(failure: &RewriteFailure) -> Self {
        Error::Rewrite {
            class: failure.class.clone(),
            message: failure.message.clone(),
        }
    }
}

#[derive(Debug, Clone)]
struct MappedEntry {
    pre: Arc<ClassInfo>,
    post: Arc<ClassInfo>,
}

/// Rewritten classes of one resource, keyed by pre-mapping name and bundle.
pub struct MappingResults {
    resource: Arc<Resource>,
    /// Primary sorts before every versioned bundle, so the first entry for
    /// a name is the one from the primary bundle when there is one.
    entries: BTreeMap<(String, BundleKey), MappedEntry>,
    failures: Vec<RewriteFailure>,
    state: Mutex<ResultsState>,
}

impl fmt::Debug for MappingResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappingResults")
            .field("resource", &self.resource.name())
            .field("mapped", &self.entries.len())
            .field("failures", &self.failures.len())
            .field("state", &self.state())
            .finish()
    }
}

impl MappingResults {
    pub(crate) fn new(resource: Arc<Resource>) -> Self {
        Self {
            resource,
            entries: BTreeMap::new(),
            failures: Vec::new(),
            state: Mutex::new(ResultsState::Collecting),
        }
    }

    pub(crate) fn add_mapped(&mut self, bundle: BundleKey, pre: Arc<ClassInfo>, post: ClassInfo) {
        self.entries.insert(
            (pre.name().to_string(), bundle),
            MappedEntry {
                pre,
                post: Arc::new(post),
            },
        );
    }

    pub(crate) fn add_failure(&mut self, failure: RewriteFailure) {
        self.failures.push(failure);
    }

    /// Reject batches that would lose a class on commit.
    ///
    /// Within one bundle, two classes may not share a target name, and a
    /// target name may only be taken if its current owner is renamed away.
    pub(crate) fn check_conflicts(&self) -> Result<()> {
        let mut targets: HashMap<(BundleKey, &str), &str> = HashMap::new();
        for ((old, key), entry) in &self.entries {
            if let Some(other) = targets.insert((*key, entry.post.name()), old.as_str()) {
                return Err(Error::MappingConflict(format!(
                    "{} and {} both map to {} in {}",
                    other,
                    old,
                    entry.post.name(),
                    key
                )));
            }
        }

        for ((old, key), entry) in &self.entries {
            let new = entry.post.name();
            if new == old {
                continue;
            }
            let bundle = self.resource.class_bundle_or_err(*key)?;
            if !bundle.contains(new) {
                continue;
            }
            let vacated = self
                .entries
                .get(&(new.to_string(), *key))
                .is_some_and(|occupant| occupant.post.name() != new);
            if !vacated {
                return Err(Error::MappingConflict(format!(
                    "{} maps to {}, which already exists in {} and is not renamed",
                    old, new, key
                )));
            }
        }
        Ok(())
    }

    pub fn resource(&self) -> &Arc<Resource> {
        &self.resource
    }

    /// Pre-mapping name → post-mapping name of every changed class
    pub fn mapped_classes(&self) -> BTreeMap<String, String> {
        self.entries
            .iter()
            .map(|((old, _), entry)| (old.clone(), entry.post.name().to_string()))
            .collect()
    }

    /// Pre-mapping names whose class gets a new name
    pub fn renamed_classes(&self) -> BTreeSet<String> {
        self.entries
            .iter()
            .filter(|((old, _), entry)| entry.post.name() != old)
            .map(|((old, _), _)| old.clone())
            .collect()
    }

    pub fn was_mapped(&self, old_name: &str) -> bool {
        self.first_entry(old_name).is_some()
    }

    pub fn post_mapping_class(&self, old_name: &str) -> Option<Arc<ClassInfo>> {
        self.first_entry(old_name).map(|(_, entry)| entry.post.clone())
    }

    /// Location of the class before mapping
    pub fn pre_mapping_path(&self, old_name: &str) -> Option<ClassPath> {
        self.first_entry(old_name).map(|(key, entry)| ClassPath {
            resource: self.resource.clone(),
            bundle: key,
            class: entry.pre.clone(),
        })
    }

    /// Location of the class once committed
    pub fn post_mapping_path(&self, old_name: &str) -> Option<ClassPath> {
        self.first_entry(old_name).map(|(key, entry)| ClassPath {
            resource: self.resource.clone(),
            bundle: key,
            class: entry.post.clone(),
        })
    }

    pub fn failures(&self) -> &[RewriteFailure] {
        &self.failures
    }

    /// Number of changed class entries, over all bundles
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn state(&self) -> ResultsState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_committed(&self) -> bool {
        self.state() == ResultsState::Committed
    }

    /// Commit every rewritten class into its bundle.
    ///
    /// Each new class is put under its new name, then old names are removed
    /// unless the same batch produced them again (chained renames). Runs
    /// under the resource's commit lock, after re-checking conflicts against
    /// the bundle as it is now. Applying twice is harmless.
    ///
    /// Returns the pre-mapping names of renamed classes.
    pub fn apply(&self) -> Result<BTreeSet<String>> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let _commit = self.resource.lock_commits();
        // The bundle may have changed since compute; a committed batch owns its targets
        if *state != ResultsState::Committed {
            self.check_conflicts()?;
        }

        let produced: HashSet<(BundleKey, &str)> = self
            .entries
            .iter()
            .map(|((_, key), entry)| (*key, entry.post.name()))
            .collect();

        for ((_, key), entry) in &self.entries {
            self.resource
                .class_bundle_or_err(*key)?
                .put(entry.post.clone())?;
        }

        let mut renamed = BTreeSet::new();
        for ((old, key), entry) in &self.entries {
            if entry.post.name() == old {
                continue;
            }
            renamed.insert(old.clone());
            if !produced.contains(&(*key, old.as_str())) {
                self.resource.class_bundle_or_err(*key)?.remove(old)?;
            }
        }

        if *state == ResultsState::Committed {
            tracing::debug!("Re-applied mapping results to {}", self.resource.name());
        } else {
            tracing::info!(
                "Committed {} classes ({} renamed) to {}",
                self.entries.len(),
                renamed.len(),
                self.resource.name()
            );
        }
        *state = ResultsState::Committed;
        Ok(renamed)
    }

    fn first_entry(&self, old_name: &str) -> Option<(BundleKey, &MappedEntry)> {
        self.entries
            .range((old_name.to_string(), BundleKey::Primary)..)
            .next()
            .filter(|((name, _), _)| name == old_name)
            .map(|((_, key), entry)| (*key, entry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(name: &str) -> ClassInfo {
        ClassInfo::builder(name).super_name("java/lang/Object").build()
    }

    fn resource(names: &[&str]) -> Arc<Resource> {
        Arc::new(
            Resource::builder("app.jar")
                .classes(names.iter().map(|n| class(n)))
                .build(),
        )
    }

    fn results_for(resource: &Arc<Resource>, renames: &[(&str, &str)]) -> MappingResults {
        let mut results = MappingResults::new(resource.clone());
        for (old, new) in renames {
            let pre = resource.classes().get(old).unwrap();
            let post = pre.to_builder().name(*new).build();
            results.add_mapped(BundleKey::Primary, pre, post);
        }
        results
    }

    #[test]
    fn test_chained_renames_keep_both_classes() {
        let resource = resource(&["a/X", "a/Y"]);
        let results = results_for(&resource, &[("a/X", "a/Y"), ("a/Y", "a/Z")]);
        results.check_conflicts().unwrap();

        let renamed = results.apply().unwrap();
        assert_eq!(renamed.len(), 2);
        assert_eq!(resource.classes().names(), vec!["a/Y", "a/Z"]);
        assert!(results.is_committed());
    }

    #[test]
    fn test_swap_renames() {
        let resource = resource(&["a/A", "a/B"]);
        let results = results_for(&resource, &[("a/A", "a/B"), ("a/B", "a/A")]);
        results.check_conflicts().unwrap();
        results.apply().unwrap();
        assert_eq!(resource.classes().len(), 2);
    }

    #[test]
    fn test_same_target_is_conflict() {
        let resource = resource(&["a/A", "a/B"]);
        let results = results_for(&resource, &[("a/A", "a/C"), ("a/B", "a/C")]);
        assert!(matches!(results.check_conflicts(), Err(Error::MappingConflict(_))));
    }

    #[test]
    fn test_occupied_target_is_conflict() {
        let resource = resource(&["a/A", "a/B"]);
        let results = results_for(&resource, &[("a/A", "a/B")]);
        assert!(matches!(results.check_conflicts(), Err(Error::MappingConflict(_))));
    }

    #[test]
    fn test_target_taken_after_compute_blocks_apply() {
        let resource = resource(&["a/A"]);
        let results = results_for(&resource, &[("a/A", "b/B")]);
        results.check_conflicts().unwrap();

        let squatter = ClassInfo::builder("b/B").super_name("x/Marker").build();
        resource.classes().put(squatter).unwrap();

        assert!(matches!(results.apply(), Err(Error::MappingConflict(_))));
        assert_eq!(results.state(), ResultsState::Collecting);
        assert_eq!(resource.classes().names(), vec!["a/A", "b/B"]);
        assert_eq!(
            resource.classes().get("b/B").unwrap().super_name(),
            Some("x/Marker")
        );
    }

    #[test]
    fn test_apply_twice_is_harmless() {
        let resource = resource(&["a/A"]);
        let results = results_for(&resource, &[("a/A", "b/A")]);
        results.apply().unwrap();
        results.apply().unwrap();
        assert_eq!(resource.classes().names(), vec!["b/A"]);
    }

    #[test]
    fn test_paths_before_and_after() {
        let resource = resource(&["a/A"]);
        let results = results_for(&resource, &[("a/A", "b/A")]);
        assert!(results.was_mapped("a/A"));
        assert!(!results.was_mapped("b/A"));
        assert_eq!(results.pre_mapping_path("a/A").unwrap().name(), "a/A");
        assert_eq!(results.post_mapping_path("a/A").unwrap().name(), "b/A");
        assert_eq!(results.post_mapping_class("a/A").unwrap().name(), "b/A");
        assert_eq!(results.mapped_classes().get("a/A").map(String::as_str), Some("b/A"));
        assert_eq!(results.state(), ResultsState::Collecting);
        // Nothing touched before apply
        assert!(resource.classes().contains("a/A"));
    }

    #[test]
    fn test_primary_entry_preferred() {
        let resource = Arc::new(
            Resource::builder("app.jar")
                .class(class("a/A"))
                .versioned_class(11, class("a/A"))
                .build(),
        );
        let mut results = MappingResults::new(resource.clone());
        let versioned = resource.versioned_bundle(11).unwrap().get("a/A").unwrap();
        results.add_mapped(BundleKey::Versioned(11), versioned.clone(), versioned.to_builder().name("b/V").build());
        let primary = resource.classes().get("a/A").unwrap();
        results.add_mapped(BundleKey::Primary, primary.clone(), primary.to_builder().name("b/P").build());

        assert_eq!(results.post_mapping_path("a/A").unwrap().bundle, BundleKey::Primary);
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_failure_converts_to_rewrite_error() {
        let failure = RewriteFailure {
            resource: "app.jar".to_string(),
            bundle: BundleKey::Primary,
            class: "a/A".to_string(),
            message: "boom".to_string(),
        };
        assert_eq!(failure.to_string(), "app.jar/classes/a/A: boom");
        assert!(matches!(Error::from(&failure), Error::Rewrite { .. }));
    }
}
