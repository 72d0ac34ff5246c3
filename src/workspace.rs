//! Workspace - the full analysis scope
//!
//! One primary resource (the user's input) plus an ordered list of
//! supporting resources (libraries). Lookups always prefer the primary
//! resource, then consult libraries in list order, and every result says
//! where it came from. Only primary results are safe to rename.

use crate::class::{ClassInfo, FileInfo};
use crate::resource::{BundleKey, ClassPath, FilePath, Resource};
use crate::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// A class found in the workspace, with provenance.
#[derive(Debug, Clone)]
pub struct ClassLookup {
    pub path: ClassPath,
    /// Found in the primary resource (or one of its embedded resources)
    pub is_primary: bool,
}

impl ClassLookup {
    pub fn class(&self) -> &Arc<ClassInfo> {
        &self.path.class
    }

    pub fn resource(&self) -> &Arc<Resource> {
        &self.path.resource
    }

    pub fn bundle(&self) -> BundleKey {
        self.path.bundle
    }
}

/// A file found in the workspace, with provenance.
#[derive(Debug, Clone)]
pub struct FileLookup {
    pub path: FilePath,
    pub is_primary: bool,
}

impl FileLookup {
    pub fn file(&self) -> &Arc<FileInfo> {
        &self.path.file
    }

    pub fn resource(&self) -> &Arc<Resource> {
        &self.path.resource
    }
}

/// Observer of workspace-level changes.
pub trait WorkspaceListener: Send + Sync {
    fn on_add_library(&self, _workspace: &Workspace, _library: &Arc<Resource>) -> Result<()> {
        Ok(())
    }

    fn on_remove_library(&self, _workspace: &Workspace, _library: &Arc<Resource>) -> Result<()> {
        Ok(())
    }

    fn on_close(&self, _workspace: &Workspace) {}
}

/// One primary resource plus supporting libraries.
pub struct Workspace {
    primary: Arc<Resource>,
    supporting: RwLock<Vec<Arc<Resource>>>,
    listeners: RwLock<Vec<Arc<dyn WorkspaceListener>>>,
    closed: AtomicBool,
}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace")
            .field("primary", &self.primary.name())
            .field("supporting", &self.supporting().len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Workspace {
    pub fn new(primary: Resource) -> Self {
        Self::with_supporting(primary, Vec::new())
    }

    pub fn with_supporting(primary: Resource, supporting: Vec<Resource>) -> Self {
        Self {
            primary: Arc::new(primary),
            supporting: RwLock::new(supporting.into_iter().map(Arc::new).collect()),
            listeners: RwLock::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    pub fn primary(&self) -> &Arc<Resource> {
        &self.primary
    }

    /// Snapshot of the supporting resources, in lookup order
    pub fn supporting(&self) -> Vec<Arc<Resource>> {
        self.supporting
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Primary first, then supporting resources in order
    pub fn all_resources(&self) -> Vec<Arc<Resource>> {
        let mut all = vec![self.primary.clone()];
        all.extend(self.supporting());
        all
    }

    /// True for the primary resource and anything embedded in it
    pub fn is_primary_resource(&self, resource: &Arc<Resource>) -> bool {
        self.primary
            .resources_recursive()
            .iter()
            .any(|r| Arc::ptr_eq(r, resource))
    }

    pub fn add_supporting_resource(&self, resource: Resource) -> Result<Arc<Resource>> {
        let resource = Arc::new(resource);
        self.supporting
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(resource.clone());
        tracing::debug!("Added library {}", resource.name());

        for listener in self.listeners() {
            listener.on_add_library(self, &resource)?;
        }
        Ok(resource)
    }

    /// Returns false if the resource was not a supporting resource
    pub fn remove_supporting_resource(&self, resource: &Arc<Resource>) -> Result<bool> {
        let removed = {
            let mut supporting = self
                .supporting
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            let before = supporting.len();
            supporting.retain(|r| !Arc::ptr_eq(r, resource));
            supporting.len() != before
        };

        if removed {
            tracing::debug!("Removed library {}", resource.name());
            for listener in self.listeners() {
                listener.on_remove_library(self, resource)?;
            }
        }
        Ok(removed)
    }

    /// Find a class anywhere. Primary resource (all of its bundles) first,
    /// then supporting resources in order.
    pub fn find_any_class(&self, name: &str) -> Option<ClassLookup> {
        if let Some(path) = self.primary.find_class(name) {
            return Some(ClassLookup {
                path,
                is_primary: true,
            });
        }
        self.supporting().iter().find_map(|resource| {
            resource.find_class(name).map(|path| ClassLookup {
                path,
                is_primary: false,
            })
        })
    }

    pub fn find_primary_class(&self, name: &str) -> Option<ClassLookup> {
        self.primary.find_class(name).map(|path| ClassLookup {
            path,
            is_primary: true,
        })
    }

    pub fn find_any_file(&self, name: &str) -> Option<FileLookup> {
        if let Some(path) = self.primary.find_file(name) {
            return Some(FileLookup {
                path,
                is_primary: true,
            });
        }
        self.supporting().iter().find_map(|resource| {
            resource.find_file(name).map(|path| FileLookup {
                path,
                is_primary: false,
            })
        })
    }

    /// Every class in every bundle of every resource matching `predicate`.
    ///
    /// Unlike [`Workspace::find_any_class`], shadowed duplicates are reported too.
    pub fn find_classes<F>(&self, predicate: F) -> Vec<ClassLookup>
    where
        F: Fn(&ClassInfo) -> bool,
    {
        let mut found = Vec::new();
        for root in self.all_resources() {
            let is_primary = Arc::ptr_eq(&root, &self.primary);
            for resource in root.resources_recursive() {
                for (key, bundle) in resource.class_bundles() {
                    for class in bundle.values() {
                        if predicate(&class) {
                            found.push(ClassLookup {
                                path: ClassPath {
                                    resource: resource.clone(),
                                    bundle: key,
                                    class,
                                },
                                is_primary,
                            });
                        }
                    }
                }
            }
        }
        found
    }

    pub fn add_listener(&self, listener: Arc<dyn WorkspaceListener>) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    /// Remove a listener by identity. Returns true if it was registered.
    pub fn remove_listener(&self, listener: &Arc<dyn WorkspaceListener>) -> bool {
        let target = Arc::as_ptr(listener) as *const ();
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|l| Arc::as_ptr(l) as *const () != target);
        listeners.len() != before
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Close the workspace. Listeners are told once and then dropped.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let listeners = std::mem::take(
            &mut *self
                .listeners
                .write()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for listener in &listeners {
            listener.on_close(self);
        }
        tracing::debug!("Closed workspace over {}", self.primary.name());
    }

    fn listeners(&self) -> Vec<Arc<dyn WorkspaceListener>> {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn class(name: &str, super_name: &str) -> ClassInfo {
        ClassInfo::builder(name).super_name(super_name).build()
    }

    fn sample_workspace() -> Workspace {
        let primary = Resource::builder("app.jar")
            .class(class("app/Main", "java/lang/Object"))
            .class(class("shared/Util", "app/Main"))
            .file(FileInfo::new("META-INF/MANIFEST.MF", b"Main-Class: app.Main".to_vec()))
            .build();
        let lib_a = Resource::builder("lib-a.jar")
            .class(class("shared/Util", "lib/Base"))
            .class(class("lib/Base", "java/lang/Object"))
            .build();
        let lib_b = Resource::builder("lib-b.jar")
            .class(class("lib/Base", "other/Root"))
            .build();
        Workspace::with_supporting(primary, vec![lib_a, lib_b])
    }

    #[test]
    fn test_lookup_prefers_primary() {
        let workspace = sample_workspace();
        let found = workspace.find_any_class("shared/Util").unwrap();
        assert!(found.is_primary);
        assert_eq!(found.resource().name(), "app.jar");
        assert_eq!(found.class().super_name(), Some("app/Main"));
    }

    #[test]
    fn test_lookup_supporting_in_order() {
        let workspace = sample_workspace();
        let found = workspace.find_any_class("lib/Base").unwrap();
        assert!(!found.is_primary);
        assert_eq!(found.resource().name(), "lib-a.jar");
        assert!(workspace.find_any_class("missing/Thing").is_none());
        assert!(workspace.find_primary_class("lib/Base").is_none());
    }

    #[test]
    fn test_file_lookup() {
        let workspace = sample_workspace();
        let found = workspace.find_any_file("META-INF/MANIFEST.MF").unwrap();
        assert!(found.is_primary);
        assert_eq!(found.file().content(), b"Main-Class: app.Main");
        assert!(workspace.find_any_file("missing.txt").is_none());
    }

    #[test]
    fn test_find_classes_reports_shadowed() {
        let workspace = sample_workspace();
        let bases = workspace.find_classes(|c| c.name() == "lib/Base");
        assert_eq!(bases.len(), 2);
        assert!(bases.iter().all(|l| !l.is_primary));
    }

    #[derive(Default)]
    struct Counting {
        added: AtomicUsize,
        removed: AtomicUsize,
        closed: AtomicUsize,
    }

    impl WorkspaceListener for Counting {
        fn on_add_library(&self, _: &Workspace, _: &Arc<Resource>) -> Result<()> {
            self.added.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn on_remove_library(&self, _: &Workspace, _: &Arc<Resource>) -> Result<()> {
            self.removed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn on_close(&self, _: &Workspace) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_library_changes_and_close_notify() {
        let workspace = Workspace::new(Resource::builder("app.jar").build());
        let counting = Arc::new(Counting::default());
        workspace.add_listener(counting.clone());

        let lib = workspace
            .add_supporting_resource(Resource::builder("lib.jar").build())
            .unwrap();
        assert!(workspace.remove_supporting_resource(&lib).unwrap());
        assert!(!workspace.remove_supporting_resource(&lib).unwrap());

        workspace.close();
        workspace.close();

        assert_eq!(counting.added.load(Ordering::SeqCst), 1);
        assert_eq!(counting.removed.load(Ordering::SeqCst), 1);
        assert_eq!(counting.closed.load(Ordering::SeqCst), 1);
        assert!(workspace.is_closed());
    }

    #[test]
    fn test_embedded_in_primary_counts_as_primary() {
        let nested = Resource::builder("BOOT-INF/lib/dep.jar")
            .class(class("dep/Thing", "java/lang/Object"))
            .build();
        let workspace = Workspace::new(
            Resource::builder("app.jar")
                .embedded("BOOT-INF/lib/dep.jar", nested)
                .build(),
        );
        let found = workspace.find_any_class("dep/Thing").unwrap();
        assert!(found.is_primary);
        assert!(workspace.is_primary_resource(found.resource()));
    }
}
