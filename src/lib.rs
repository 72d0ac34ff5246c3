//! # bytegraph - Class hierarchy and remapping engine
//!
//! Analysis and transformation core for collections of binary classes.
//!
//! bytegraph provides:
//! - A workspace model: ordered, observable bundles grouped into resources,
//!   grouped into a workspace of one primary resource plus libraries
//! - An inheritance graph over the workspace that stays current as bundles change
//! - Mappings (class, field, method and variable renames), optionally
//!   resolved through the class hierarchy
//! - A parallel mapping applier with a two-phase compute/commit model

pub mod class;
pub mod bundle;
pub mod resource;
pub mod workspace;
pub mod graph;
pub mod mapping;
pub mod manifest;
pub mod config;
pub mod output;
pub mod ui;

// Re-exports for convenient access
pub use class::{ClassInfo, ClassInfoBuilder, FieldMember, FileInfo, LocalVariable, MethodMember};
pub use bundle::{Bundle, BundleEntry, BundleListener, ClassBundle, FileBundle};
pub use resource::{BundleKey, Resource, ResourceBuilder};
pub use workspace::{ClassLookup, FileLookup, Workspace, WorkspaceListener};
pub use graph::{InheritanceGraph, InheritanceVertex, ROOT_TYPE};
pub use mapping::{
    ApplyReport, EmptyMappings, HierarchyMappings, IntermediateMappings, MappingApplier,
    MappingResults, Mappings,
};

/// Result type alias for bytegraph operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for bytegraph operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A graph or bundle relationship was about to be corrupted.
    /// Always propagated, never swallowed.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Bundle not found: {0}")]
    BundleNotFound(String),

    /// A rename batch would lose a class (two sources onto one target,
    /// or a target that is already taken).
    #[error("Mapping conflict: {0}")]
    MappingConflict(String),

    #[error("Invalid descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("Mapping parse error at line {line}: {message}")]
    MappingParse { line: usize, message: String },

    /// A single class could not be rewritten
    #[error("Rewrite of {class} failed: {message}")]
    Rewrite { class: String, message: String },

    #[error("Worker pool error: {0}")]
    WorkerPool(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
