//! Mappings - rename tables and the engine that applies them
//!
//! A [`Mappings`] implementation answers "what is the new name of X?"
//! for classes, fields, methods and local variables. Answers are partial:
//! `None` means the symbol keeps its name.
//!
//! Applying mappings to a resource is two-phase:
//! 1. [`MappingApplier::compute`] rewrites every class in parallel and
//!    collects the results without touching any bundle
//! 2. [`MappingResults::apply`] commits the collected classes into their
//!    bundles under the resource's commit lock

pub mod applier;
pub mod descriptor;
pub mod format;
pub mod hierarchy;
pub mod intermediate;
pub mod remap;
pub mod results;

pub use applier::{ApplyReport, MappingApplier};
pub use format::{JsonFormat, MappingFormat, SimpleFormat};
pub use hierarchy::HierarchyMappings;
pub use intermediate::IntermediateMappings;
pub use remap::{ClassRemapper, StructuralRemapper};
pub use results::{MappingResults, RewriteFailure};

use std::sync::Arc;

/// Lookup of renamed symbols. All lookups are pure.
///
/// Names are internal names (`a/b/C`), descriptors are in their raw form
/// (`I`, `(Ljava/lang/String;)V`). Owners are always pre-rename names.
pub trait Mappings: Send + Sync {
    fn mapped_class_name(&self, internal_name: &str) -> Option<String>;

    fn mapped_field_name(&self, owner: &str, name: &str, descriptor: &str) -> Option<String>;

    fn mapped_method_name(&self, owner: &str, name: &str, descriptor: &str) -> Option<String>;

    /// New name of a local variable, addressed by its enclosing method and slot
    fn mapped_variable_name(
        &self,
        class_name: &str,
        method_name: &str,
        method_descriptor: &str,
        name: &str,
        descriptor: &str,
        index: u16,
    ) -> Option<String>;
}

/// Mappings that rename nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyMappings;

impl Mappings for EmptyMappings {
    fn mapped_class_name(&self, _: &str) -> Option<String> {
        None
    }

    fn mapped_field_name(&self, _: &str, _: &str, _: &str) -> Option<String> {
        None
    }

    fn mapped_method_name(&self, _: &str, _: &str, _: &str) -> Option<String> {
        None
    }

    fn mapped_variable_name(&self, _: &str, _: &str, _: &str, _: &str, _: &str, _: u16) -> Option<String> {
        None
    }
}

macro_rules! delegate_mappings {
    ($($ty:ty),+ $(,)?) => {$(
        impl<M: Mappings + ?Sized> Mappings for $ty {
            fn mapped_class_name(&self, internal_name: &str) -> Option<String> {
                (**self).mapped_class_name(internal_name)
            }

            fn mapped_field_name(&self, owner: &str, name: &str, descriptor: &str) -> Option<String> {
                (**self).mapped_field_name(owner, name, descriptor)
            }

            fn mapped_method_name(&self, owner: &str, name: &str, descriptor: &str) -> Option<String> {
                (**self).mapped_method_name(owner, name, descriptor)
            }

            fn mapped_variable_name(
                &self,
                class_name: &str,
                method_name: &str,
                method_descriptor: &str,
                name: &str,
                descriptor: &str,
                index: u16,
            ) -> Option<String> {
                (**self).mapped_variable_name(
                    class_name,
                    method_name,
                    method_descriptor,
                    name,
                    descriptor,
                    index,
                )
            }
        }
    )+};
}

delegate_mappings!(&M, Arc<M>, Box<M>);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_mappings_rename_nothing() {
        let mappings = EmptyMappings;
        assert!(mappings.mapped_class_name("a/A").is_none());
        assert!(mappings.mapped_field_name("a/A", "f", "I").is_none());
        assert!(mappings.mapped_method_name("a/A", "m", "()V").is_none());
        assert!(mappings
            .mapped_variable_name("a/A", "m", "()V", "x", "I", 1)
            .is_none());
    }

    #[test]
    fn test_delegation_through_pointers() {
        let mut inner = IntermediateMappings::new();
        inner.add_class("a/A", "b/B");

        let shared: Arc<IntermediateMappings> = Arc::new(inner);
        assert_eq!(shared.mapped_class_name("a/A").as_deref(), Some("b/B"));

        let boxed: Box<dyn Mappings> = Box::new(shared.clone());
        assert_eq!(boxed.mapped_class_name("a/A").as_deref(), Some("b/B"));

        fn class_of<M: Mappings>(mappings: M, name: &str) -> Option<String> {
            mappings.mapped_class_name(name)
        }
        assert_eq!(class_of(&*shared, "a/A").as_deref(), Some("b/B"));
        assert_eq!(class_of(boxed, "x/X"), None);
    }
}
