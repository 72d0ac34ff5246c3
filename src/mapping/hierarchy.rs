//! Hierarchy-aware mapping lookups
//!
//! Rename tables usually list a member only under the class that declares
//! it. A call site in a subclass refers to the same member through its own
//! name, so a plain lookup on the subclass misses. [`HierarchyMappings`]
//! retries such misses against each ancestor of the owner.

use super::Mappings;
use crate::graph::InheritanceGraph;
use std::sync::Arc;

/// Wraps any [`Mappings`] and resolves member lookups through the class hierarchy.
pub struct HierarchyMappings<M> {
    inner: M,
    graph: Arc<InheritanceGraph>,
}

impl<M: Mappings> HierarchyMappings<M> {
    pub fn new(inner: M, graph: Arc<InheritanceGraph>) -> Self {
        Self { inner, graph }
    }

    pub fn inner(&self) -> &M {
        &self.inner
    }

    pub fn into_inner(self) -> M {
        self.inner
    }

    /// Ancestors of `owner`, nearest first, each once, root type excluded
    fn ancestors(&self, owner: &str) -> Vec<String> {
        let Some(vertex) = self.graph.vertex(owner) else {
            return Vec::new();
        };
        vertex
            .all_parents()
            .iter()
            .filter(|parent| !parent.is_root_type())
            .map(|parent| parent.name().to_string())
            .collect()
    }

    fn through_ancestors<F>(&self, owner: &str, lookup: F) -> Option<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(found) = lookup(owner) {
            return Some(found);
        }
        self.ancestors(owner).iter().find_map(|ancestor| lookup(ancestor))
    }
}

impl<M: Mappings> Mappings for HierarchyMappings<M> {
    fn mapped_class_name(&self, internal_name: &str) -> Option<String> {
        self.inner.mapped_class_name(internal_name)
    }

    fn mapped_field_name(&self, owner: &str, name: &str, descriptor: &str) -> Option<String> {
        self.through_ancestors(owner, |o| self.inner.mapped_field_name(o, name, descriptor))
    }

    fn mapped_method_name(&self, owner: &str, name: &str, descriptor: &str) -> Option<String> {
        self.through_ancestors(owner, |o| self.inner.mapped_method_name(o, name, descriptor))
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
        self.inner.mapped_variable_name(
            class_name,
            method_name,
            method_descriptor,
            name,
            descriptor,
            index,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::{ClassInfo, MethodMember};
    use crate::graph::ROOT_TYPE;
    use crate::mapping::IntermediateMappings;
    use crate::resource::Resource;
    use crate::workspace::Workspace;

    fn graph() -> Arc<InheritanceGraph> {
        let primary = Resource::builder("app.jar")
            .class(
                ClassInfo::builder("a/Base")
                    .super_name(ROOT_TYPE)
                    .method(MethodMember::new("m", "()V"))
                    .build(),
            )
            .class(ClassInfo::builder("a/Api").super_name(ROOT_TYPE).build())
            .class(
                ClassInfo::builder("a/Derived")
                    .super_name("a/Base")
                    .interface("a/Api")
                    .build(),
            )
            .class(ClassInfo::builder("a/Leaf").super_name("a/Derived").build())
            .build();
        Arc::new(InheritanceGraph::new(Arc::new(Workspace::new(primary))))
    }

    #[test]
    fn test_method_found_on_ancestor() {
        let mut inner = IntermediateMappings::new();
        inner.add_method("a/Base", "m", "()V", "n");
        let mappings = HierarchyMappings::new(inner, graph());

        assert_eq!(mappings.mapped_method_name("a/Derived", "m", "()V").as_deref(), Some("n"));
        assert_eq!(mappings.mapped_method_name("a/Leaf", "m", "()V").as_deref(), Some("n"));
        assert!(mappings.mapped_method_name("a/Leaf", "m", "(I)V").is_none());
        assert!(mappings.mapped_method_name("a/Unknown", "m", "()V").is_none());
    }

    #[test]
    fn test_nearest_ancestor_wins() {
        let mut inner = IntermediateMappings::new();
        inner.add_field("a/Base", "f", "I", "far");
        inner.add_field("a/Derived", "f", "I", "near");
        let mappings = HierarchyMappings::new(inner, graph());
        assert_eq!(mappings.mapped_field_name("a/Leaf", "f", "I").as_deref(), Some("near"));
        assert_eq!(mappings.mapped_field_name("a/Base", "f", "I").as_deref(), Some("far"));
    }

    #[test]
    fn test_interface_ancestor_consulted() {
        let mut inner = IntermediateMappings::new();
        inner.add_method("a/Api", "call", "()V", "invoke");
        let mappings = HierarchyMappings::new(inner, graph());
        assert_eq!(mappings.mapped_method_name("a/Leaf", "call", "()V").as_deref(), Some("invoke"));
    }

    #[test]
    fn test_root_type_skipped() {
        let mut inner = IntermediateMappings::new();
        inner.add_method(ROOT_TYPE, "hashCode", "()I", "hash");
        let mappings = HierarchyMappings::new(inner, graph());
        assert!(mappings.mapped_method_name("a/Leaf", "hashCode", "()I").is_none());
        assert_eq!(
            mappings.mapped_method_name(ROOT_TYPE, "hashCode", "()I").as_deref(),
            Some("hash")
        );
    }

    #[test]
    fn test_class_and_variable_lookups_delegate() {
        let mut inner = IntermediateMappings::new();
        inner.add_class("a/Base", "b/Base");
        let mappings = HierarchyMappings::new(inner, graph());
        assert_eq!(mappings.mapped_class_name("a/Base").as_deref(), Some("b/Base"));
        assert!(mappings.mapped_class_name("a/Derived").is_none());
        assert!(mappings.inner().mapped_class_name("a/Leaf").is_none());
    }
}
