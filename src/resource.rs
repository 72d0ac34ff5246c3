//! Resources - one import unit (e.g. one archive)
//!
//! A resource owns:
//! - one primary class bundle and one file bundle
//! - any number of version-scoped class bundles (multi-release overrides)
//! - any number of embedded child resources (nested archives), keyed by path
//!
//! The bundle topology is fixed once the resource is built. Bundle contents
//! stay mutable. A class name is unique within one bundle but may appear in
//! several bundles of the same resource, so lookups report the bundle they hit.

use crate::bundle::{ClassBundle, FileBundle};
use crate::class::{ClassInfo, FileInfo};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Addresses one class bundle inside a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BundleKey {
    Primary,
    Versioned(u32),
}

impl fmt::Display for BundleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BundleKey::Primary => write!(f, "classes"),
            BundleKey::Versioned(v) => write!(f, "versions/{}", v),
        }
    }
}

/// Navigable location of a class: resource, bundle and the class itself.
#[derive(Debug, Clone)]
pub struct ClassPath {
    pub resource: Arc<Resource>,
    pub bundle: BundleKey,
    pub class: Arc<ClassInfo>,
}

impl ClassPath {
    pub fn name(&self) -> &str {
        self.class.name()
    }

    /// Bundle the class lives in. A path always refers to an existing bundle.
    pub fn class_bundle(&self) -> Result<&ClassBundle> {
        self.resource.class_bundle_or_err(self.bundle)
    }
}

impl fmt::Display for ClassPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.resource.name(), self.bundle, self.class.name())
    }
}

/// Location of a file inside a (possibly embedded) resource.
#[derive(Debug, Clone)]
pub struct FilePath {
    pub resource: Arc<Resource>,
    pub file: Arc<FileInfo>,
}

/// One import unit.
pub struct Resource {
    name: String,
    classes: ClassBundle,
    files: FileBundle,
    versioned: BTreeMap<u32, ClassBundle>,
    embedded: BTreeMap<String, Arc<Resource>>,
    commit_lock: Mutex<()>,
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("name", &self.name)
            .field("classes", &self.classes.len())
            .field("files", &self.files.len())
            .field("versions", &self.versioned.keys().collect::<Vec<_>>())
            .field("embedded", &self.embedded.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Resource {
    pub fn builder(name: impl Into<String>) -> ResourceBuilder {
        ResourceBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Primary class bundle
    pub fn classes(&self) -> &ClassBundle {
        &self.classes
    }

    pub fn files(&self) -> &FileBundle {
        &self.files
    }

    pub fn versioned_classes(&self) -> &BTreeMap<u32, ClassBundle> {
        &self.versioned
    }

    pub fn versioned_bundle(&self, version: u32) -> Option<&ClassBundle> {
        self.versioned.get(&version)
    }

    pub fn class_bundle(&self, key: BundleKey) -> Option<&ClassBundle> {
        match key {
            BundleKey::Primary => Some(&self.classes),
            BundleKey::Versioned(v) => self.versioned.get(&v),
        }
    }

    /// Like [`Resource::class_bundle`], for callers that require the bundle to exist
    pub fn class_bundle_or_err(&self, key: BundleKey) -> Result<&ClassBundle> {
        self.class_bundle(key)
            .ok_or_else(|| Error::BundleNotFound(format!("{} in {}", key, self.name)))
    }

    /// Own class bundles: primary first, then versions ascending
    pub fn class_bundles(&self) -> impl Iterator<Item = (BundleKey, &ClassBundle)> {
        std::iter::once((BundleKey::Primary, &self.classes)).chain(
            self.versioned
                .iter()
                .map(|(v, bundle)| (BundleKey::Versioned(*v), bundle)),
        )
    }

    pub fn embedded(&self) -> &BTreeMap<String, Arc<Resource>> {
        &self.embedded
    }

    pub fn embedded_resource(&self, path: &str) -> Option<&Arc<Resource>> {
        self.embedded.get(path)
    }

    /// This resource followed by all embedded resources, depth first
    pub fn resources_recursive(self: &Arc<Self>) -> Vec<Arc<Resource>> {
        let mut out = vec![self.clone()];
        for child in self.embedded.values() {
            out.extend(child.resources_recursive());
        }
        out
    }

    /// Total classes over every own bundle (embedded resources not included)
    pub fn class_count(&self) -> usize {
        self.class_bundles().map(|(_, b)| b.len()).sum()
    }

    /// Find a class in own bundles (primary, then versions), then in embedded
    /// resources in path order.
    pub fn find_class(self: &Arc<Self>, name: &str) -> Option<ClassPath> {
        for (key, bundle) in self.class_bundles() {
            if let Some(class) = bundle.get(name) {
                return Some(ClassPath {
                    resource: self.clone(),
                    bundle: key,
                    class,
                });
            }
        }
        self.embedded
            .values()
            .find_map(|child| child.find_class(name))
    }

    pub fn find_file(self: &Arc<Self>, name: &str) -> Option<FilePath> {
        if let Some(file) = self.files.get(name) {
            return Some(FilePath {
                resource: self.clone(),
                file,
            });
        }
        self.embedded.values().find_map(|child| child.find_file(name))
    }

    /// Serializes read-modify-write sequences over this resource's bundles
    pub fn lock_commits(&self) -> MutexGuard<'_, ()> {
        self.commit_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Builder for [`Resource`].
#[derive(Debug, Default)]
pub struct ResourceBuilder {
    name: String,
    classes: Vec<ClassInfo>,
    files: Vec<FileInfo>,
    versioned: BTreeMap<u32, Vec<ClassInfo>>,
    embedded: BTreeMap<String, Resource>,
}

impl ResourceBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn class(mut self, class: ClassInfo) -> Self {
        self.classes.push(class);
        self
    }

    pub fn classes(mut self, classes: impl IntoIterator<Item = ClassInfo>) -> Self {
        self.classes.extend(classes);
        self
    }

    pub fn file(mut self, file: FileInfo) -> Self {
        self.files.push(file);
        self
    }

    /// Declare a (possibly empty) version-scoped bundle
    pub fn version(mut self, version: u32) -> Self {
        self.versioned.entry(version).or_default();
        self
    }

    pub fn versioned_class(mut self, version: u32, class: ClassInfo) -> Self {
        self.versioned.entry(version).or_default().push(class);
        self
    }

    pub fn embedded(mut self, path: impl Into<String>, resource: Resource) -> Self {
        self.embedded.insert(path.into(), resource);
        self
    }

    pub fn build(self) -> Resource {
        Resource {
            name: self.name,
            classes: ClassBundle::with_entries(self.classes),
            files: FileBundle::with_entries(self.files),
            versioned: self
                .versioned
                .into_iter()
                .map(|(v, classes)| (v, ClassBundle::with_entries(classes)))
                .collect(),
            embedded: self
                .embedded
                .into_iter()
                .map(|(path, r)| (path, Arc::new(r)))
                .collect(),
            commit_lock: Mutex::new(()),
        }
    }
}
