//! Workspace manifests - JSON snapshots of bundle contents
//!
//! A manifest lists the classes and files of each resource, so a workspace
//! can be populated without an archive importer and written back out after
//! a mapping pass.

use crate::class::{ClassInfo, FileInfo};
use crate::resource::Resource;
use crate::workspace::Workspace;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// Contents of one resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceManifest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<ClassInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<FileInfo>,
    /// Version → classes of that version-scoped bundle
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub versioned: BTreeMap<u32, Vec<ClassInfo>>,
    /// Container path → nested resource
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub embedded: BTreeMap<String, ResourceManifest>,
}

impl ResourceManifest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            classes: Vec::new(),
            files: Vec::new(),
            versioned: BTreeMap::new(),
            embedded: BTreeMap::new(),
        }
    }

    pub fn into_resource(self) -> Resource {
        let mut builder = Resource::builder(self.name).classes(self.classes);
        for file in self.files {
            builder = builder.file(file);
        }
        for (version, classes) in self.versioned {
            builder = builder.version(version);
            for class in classes {
                builder = builder.versioned_class(version, class);
            }
        }
        for (path, nested) in self.embedded {
            builder = builder.embedded(path, nested.into_resource());
        }
        builder.build()
    }

    /// Snapshot of the current bundle contents, in bundle order
    pub fn from_resource(resource: &Resource) -> Self {
        let snapshot = |values: Vec<Arc<ClassInfo>>| -> Vec<ClassInfo> {
            values.iter().map(|c| ClassInfo::clone(c)).collect()
        };
        Self {
            name: resource.name().to_string(),
            classes: snapshot(resource.classes().values()),
            files: resource
                .files()
                .values()
                .iter()
                .map(|f| FileInfo::clone(f))
                .collect(),
            versioned: resource
                .versioned_classes()
                .iter()
                .map(|(version, bundle)| (*version, snapshot(bundle.values())))
                .collect(),
            embedded: resource
                .embedded()
                .iter()
                .map(|(path, nested)| (path.clone(), Self::from_resource(nested)))
                .collect(),
        }
    }

    /// Total classes here and in embedded resources
    pub fn class_count(&self) -> usize {
        self.classes.len()
            + self.versioned.values().map(Vec::len).sum::<usize>()
            + self.embedded.values().map(Self::class_count).sum::<usize>()
    }
}

/// One primary resource plus libraries, in lookup order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceManifest {
    pub primary: ResourceManifest,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub libraries: Vec<ResourceManifest>,
}

impl WorkspaceManifest {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn into_workspace(self) -> Workspace {
        Workspace::with_supporting(
            self.primary.into_resource(),
            self.libraries
                .into_iter()
                .map(ResourceManifest::into_resource)
                .collect(),
        )
    }

    pub fn from_workspace(workspace: &Workspace) -> Self {
        Self {
            primary: ResourceManifest::from_resource(workspace.primary()),
            libraries: workspace
                .supporting()
                .iter()
                .map(|r| ResourceManifest::from_resource(r))
                .collect(),
        }
    }
}
