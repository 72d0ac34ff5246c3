//! Reverse inheritance index: parent name → child names
//!
//! Edges are counted, so the same (parent, child) pair contributed by two
//! bundles (e.g. a class and its versioned override) survives the removal
//! of one of them.

use crate::class::ClassInfo;
use crate::workspace::Workspace;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub(crate) struct ParentIndex {
    children: HashMap<String, HashMap<String, usize>>,
}

impl ParentIndex {
    /// Index every class of every bundle of every resource in the workspace
    pub fn build(workspace: &Workspace) -> Self {
        let mut index = Self::default();
        for root in workspace.all_resources() {
            for resource in root.resources_recursive() {
                for (_, bundle) in resource.class_bundles() {
                    for class in bundle.values() {
                        index.add_class(&class);
                    }
                }
            }
        }
        index
    }

    pub fn add_class(&mut self, class: &ClassInfo) {
        for parent in class.declared_parents() {
            self.add_edge(parent, class.name());
        }
    }

    pub fn remove_class(&mut self, class: &ClassInfo) {
        for parent in class.declared_parents() {
            self.remove_edge(parent, class.name());
        }
    }

    pub fn add_edge(&mut self, parent: &str, child: &str) {
        *self
            .children
            .entry(parent.to_string())
            .or_default()
            .entry(child.to_string())
            .or_insert(0) += 1;
    }

    pub fn remove_edge(&mut self, parent: &str, child: &str) {
        let Some(children) = self.children.get_mut(parent) else {
            return;
        };
        if let Some(count) = children.get_mut(child) {
            *count -= 1;
            if *count == 0 {
                children.remove(child);
            }
        }
        if children.is_empty() {
            self.children.remove(parent);
        }
    }

    /// Direct children, sorted by name
    pub fn children_of(&self, parent: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .children
            .get(parent)
            .map(|c| c.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    pub fn edge_count(&self) -> usize {
        self.children.values().map(|c| c.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counted_edges() {
        let mut index = ParentIndex::default();
        index.add_edge("a/Base", "a/Child");
        index.add_edge("a/Base", "a/Child");
        index.add_edge("a/Base", "a/Other");

        index.remove_edge("a/Base", "a/Child");
        assert_eq!(index.children_of("a/Base"), vec!["a/Child", "a/Other"]);

        index.remove_edge("a/Base", "a/Child");
        index.remove_edge("a/Base", "a/Other");
        assert!(index.children_of("a/Base").is_empty());
        assert_eq!(index.edge_count(), 0);
    }

    #[test]
    fn test_remove_unknown_edge_is_noop() {
        let mut index = ParentIndex::default();
        index.remove_edge("x/Missing", "x/Child");
        index.add_edge("a/Base", "a/Child");
        index.remove_edge("a/Base", "x/Child");
        assert_eq!(index.edge_count(), 1);
    }

    #[test]
    fn test_add_class_records_super_and_interfaces() {
        let class = ClassInfo::builder("a/Impl")
            .super_name("a/Base")
            .interface("a/Api")
            .build();
        let mut index = ParentIndex::default();
        index.add_class(&class);
        assert_eq!(index.children_of("a/Base"), vec!["a/Impl"]);
        assert_eq!(index.children_of("a/Api"), vec!["a/Impl"]);
        index.remove_class(&class);
        assert_eq!(index.edge_count(), 0);
    }
}
