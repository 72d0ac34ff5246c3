//! Inheritance vertex - one class plus its cached relations
//!
//! Direct parents and direct children are computed on first use and kept
//! in explicit `Unset | Set` slots. Replacing the wrapped class, or any
//! change to a neighbouring class, resets the slots.

use super::GraphCore;
use crate::class::ClassInfo;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};

enum Cached<T> {
    Unset,
    Set(T),
}

/// A cache slot. The epoch moves on every invalidation, so a value computed
/// against an older epoch is never stored.
struct CacheSlot {
    state: Cached<Arc<[String]>>,
    epoch: u64,
}

impl CacheSlot {
    fn new() -> Self {
        Self {
            state: Cached::Unset,
            epoch: 0,
        }
    }
}

#[derive(Clone, Copy)]
enum Relation {
    Parents,
    Children,
}

/// A class in the inheritance graph.
pub struct InheritanceVertex {
    name: String,
    value: RwLock<Arc<ClassInfo>>,
    primary: AtomicBool,
    parents: Mutex<CacheSlot>,
    children: Mutex<CacheSlot>,
    graph: Weak<GraphCore>,
}

impl std::fmt::Debug for InheritanceVertex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InheritanceVertex")
            .field("name", &self.name)
            .field("primary", &self.is_primary())
            .finish()
    }
}

impl PartialEq for InheritanceVertex {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for InheritanceVertex {}

impl std::hash::Hash for InheritanceVertex {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl InheritanceVertex {
    pub(crate) fn new(value: Arc<ClassInfo>, primary: bool, graph: Weak<GraphCore>) -> Self {
        Self {
            name: value.name().to_string(),
            value: RwLock::new(value),
            primary: AtomicBool::new(primary),
            parents: Mutex::new(CacheSlot::new()),
            children: Mutex::new(CacheSlot::new()),
            graph,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current class value
    pub fn value(&self) -> Arc<ClassInfo> {
        self.value
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Swap the wrapped class and reset both relation caches
    pub(crate) fn set_value(&self, value: Arc<ClassInfo>, primary: bool) {
        *self.value.write().unwrap_or_else(PoisonError::into_inner) = value;
        self.primary.store(primary, Ordering::Release);
        self.invalidate();
    }

    pub(crate) fn invalidate(&self) {
        self.invalidate_parents();
        self.invalidate_children();
    }

    pub(crate) fn invalidate_parents(&self) {
        Self::reset(&self.parents);
    }

    pub(crate) fn invalidate_children(&self) {
        Self::reset(&self.children);
    }

    fn reset(slot: &Mutex<CacheSlot>) {
        let mut slot = slot.lock().unwrap_or_else(PoisonError::into_inner);
        slot.state = Cached::Unset;
        slot.epoch += 1;
    }

    /// Defined in the primary resource
    pub fn is_primary(&self) -> bool {
        self.primary.load(Ordering::Acquire)
    }

    /// Defined outside the primary resource
    pub fn is_library_vertex(&self) -> bool {
        !self.is_primary()
    }

    pub fn is_root_type(&self) -> bool {
        self.graph()
            .map(|g| g.root_type == self.name)
            .unwrap_or(false)
    }

    pub fn is_module(&self) -> bool {
        self.value().is_module()
    }

    /// Direct parents (super type + interfaces) present in the workspace
    pub fn parents(&self) -> Vec<Arc<InheritanceVertex>> {
        self.resolve(Relation::Parents)
    }

    /// Direct children present in the workspace
    pub fn children(&self) -> Vec<Arc<InheritanceVertex>> {
        self.resolve(Relation::Children)
    }

    pub(crate) fn parent_names(&self) -> Arc<[String]> {
        self.cached_names(Relation::Parents)
    }

    pub(crate) fn child_names(&self) -> Arc<[String]> {
        self.cached_names(Relation::Children)
    }

    /// Every ancestor, nearest first. Terminates on cycles.
    pub fn all_parents(&self) -> Vec<Arc<InheritanceVertex>> {
        self.walk(Relation::Parents)
    }

    /// Every descendant, nearest first. Terminates on cycles.
    pub fn all_children(&self) -> Vec<Arc<InheritanceVertex>> {
        self.walk(Relation::Children)
    }

    /// Connected component through parent and child edges.
    ///
    /// The root type is part of every family but is never expanded, since
    /// every class would otherwise join through it.
    pub fn family(&self, include_root: bool) -> HashSet<Arc<InheritanceVertex>> {
        match self.graph() {
            Some(graph) => graph.family_of(&self.name, include_root),
            None => HashSet::new(),
        }
    }

    pub fn has_field(&self, name: &str, descriptor: &str) -> bool {
        self.value().field(name, descriptor).is_some()
    }

    pub fn has_method(&self, name: &str, descriptor: &str) -> bool {
        self.value().method(name, descriptor).is_some()
    }

    pub fn has_member(&self, name: &str, descriptor: &str) -> bool {
        self.value().has_member(name, descriptor)
    }

    pub fn has_member_in_self_or_ancestors(&self, name: &str, descriptor: &str) -> bool {
        self.has_member(name, descriptor)
            || self
                .all_parents()
                .iter()
                .any(|p| p.has_member(name, descriptor))
    }

    pub fn has_member_in_self_or_descendants(&self, name: &str, descriptor: &str) -> bool {
        self.has_member(name, descriptor)
            || self
                .all_children()
                .iter()
                .any(|c| c.has_member(name, descriptor))
    }

    /// Direct parent check
    pub fn is_parent_of(&self, name: &str) -> bool {
        self.child_names().iter().any(|c| c == name)
    }

    /// Direct child check
    pub fn is_child_of(&self, name: &str) -> bool {
        self.parent_names().iter().any(|p| p == name)
    }

    pub fn is_ancestor_of(&self, name: &str) -> bool {
        name != self.name && self.all_children().iter().any(|c| c.name == name)
    }

    pub fn is_descendant_of(&self, name: &str) -> bool {
        name != self.name && self.all_parents().iter().any(|p| p.name == name)
    }

    /// In the same family, but neither an ancestor nor a descendant.
    ///
    /// Siblings and cousins fall in this bucket: a rename on one of them can
    /// still clash with the other through a shared subtype.
    pub fn is_indirect_relative_of(&self, name: &str) -> bool {
        if name == self.name || self.is_ancestor_of(name) || self.is_descendant_of(name) {
            return false;
        }
        self.family(false).iter().any(|v| v.name == name)
    }

    /// This class, or an ancestor below the root type, comes from a library.
    ///
    /// The universal root type is left out: it relates to every class and
    /// would make every vertex a library definition.
    pub fn is_library_definition(&self) -> bool {
        if self.is_library_vertex() && !self.is_root_type() {
            return true;
        }
        self.all_parents()
            .iter()
            .any(|p| p.is_library_vertex() && !p.is_root_type())
    }

    /// The member is declared by this class or an ancestor owned by a library
    pub fn is_library_member(&self, name: &str, descriptor: &str) -> bool {
        if self.is_library_vertex() && self.has_member(name, descriptor) {
            return true;
        }
        self.all_parents()
            .iter()
            .any(|p| p.is_library_vertex() && p.has_member(name, descriptor))
    }

    fn graph(&self) -> Option<Arc<GraphCore>> {
        self.graph.upgrade()
    }

    fn slot(&self, relation: Relation) -> &Mutex<CacheSlot> {
        match relation {
            Relation::Parents => &self.parents,
            Relation::Children => &self.children,
        }
    }

    fn cached_names(&self, relation: Relation) -> Arc<[String]> {
        let epoch = {
            let slot = self.slot(relation).lock().unwrap_or_else(PoisonError::into_inner);
            if let Cached::Set(names) = &slot.state {
                return names.clone();
            }
            slot.epoch
        };

        // Computed without holding the slot, the graph takes its own locks
        let Some(graph) = self.graph() else {
            return Arc::from(Vec::new());
        };
        let names: Arc<[String]> = match relation {
            Relation::Parents => {
                let value = self.value();
                value
                    .declared_parents()
                    .filter(|p| graph.lookup_vertex(p).is_some())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
                    .into()
            }
            Relation::Children => graph.children_of(&self.name).into(),
        };

        let mut slot = self.slot(relation).lock().unwrap_or_else(PoisonError::into_inner);
        if slot.epoch == epoch {
            slot.state = Cached::Set(names.clone());
        }
        names
    }

    fn resolve(&self, relation: Relation) -> Vec<Arc<InheritanceVertex>> {
        let Some(graph) = self.graph() else {
            return Vec::new();
        };
        self.cached_names(relation)
            .iter()
            .filter_map(|name| graph.lookup_vertex(name))
            .collect()
    }

    fn walk(&self, relation: Relation) -> Vec<Arc<InheritanceVertex>> {
        let mut visited = HashSet::new();
        visited.insert(self.name.clone());
        let mut queue: VecDeque<Arc<InheritanceVertex>> = self.resolve(relation).into();
        let mut out = Vec::new();

        while let Some(vertex) = queue.pop_front() {
            if !visited.insert(vertex.name.clone()) {
                continue;
            }
            queue.extend(vertex.resolve(relation));
            out.push(vertex);
        }
        out
    }
}
