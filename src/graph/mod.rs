//! Inheritance Graph - hierarchy queries over a workspace
//!
//! The graph keeps two structures:
//! - a reverse index (parent name → child names) over every class bundle
//! - a cache of vertices, created lazily on first lookup
//!
//! Both follow bundle changes through listeners, so after any bundle
//! mutation returns the graph reflects it. Missing super types simply
//! produce fewer edges: inputs are often incomplete, and may be cyclic.

mod index;
mod vertex;

pub use vertex::InheritanceVertex;

use crate::bundle::BundleListener;
use crate::class::ClassInfo;
use crate::resource::Resource;
use crate::workspace::{Workspace, WorkspaceListener};
use crate::{Error, Result};
use index::ParentIndex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};

/// The universal root type every class implicitly extends
pub const ROOT_TYPE: &str = "java/lang/Object";

/// Shared graph state. Vertices hold a weak handle to it.
pub(crate) struct GraphCore {
    workspace: Arc<Workspace>,
    root_type: String,
    vertices: RwLock<HashMap<String, Arc<InheritanceVertex>>>,
    index: RwLock<ParentIndex>,
    /// Serializes structural edits and vertex creation
    maintenance: Mutex<()>,
    closed: AtomicBool,
    listener: Arc<GraphListener>,
    self_ref: Weak<GraphCore>,
}

/// Inheritance graph over a [`Workspace`].
pub struct InheritanceGraph {
    core: Arc<GraphCore>,
}

impl std::fmt::Debug for InheritanceGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InheritanceGraph")
            .field("root_type", &self.core.root_type)
            .field("vertices", &self.vertex_count())
            .finish()
    }
}

impl InheritanceGraph {
    /// Build the graph and subscribe to the workspace and all of its class bundles
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self::with_root_type(workspace, ROOT_TYPE)
    }

    pub fn with_root_type(workspace: Arc<Workspace>, root_type: impl Into<String>) -> Self {
        let index = ParentIndex::build(&workspace);
        tracing::debug!("Indexed {} inheritance edges", index.edge_count());

        let core = Arc::new_cyclic(|weak: &Weak<GraphCore>| GraphCore {
            workspace,
            root_type: root_type.into(),
            vertices: RwLock::new(HashMap::new()),
            index: RwLock::new(index),
            maintenance: Mutex::new(()),
            closed: AtomicBool::new(false),
            listener: Arc::new(GraphListener { core: weak.clone() }),
            self_ref: weak.clone(),
        });

        for resource in core.workspace.all_resources() {
            core.attach(&resource);
        }
        core.workspace.add_listener(core.listener.clone());

        Self { core }
    }

    pub fn workspace(&self) -> &Arc<Workspace> {
        &self.core.workspace
    }

    pub fn root_type(&self) -> &str {
        &self.core.root_type
    }

    /// Vertex for a class, `None` if no resource defines it.
    ///
    /// The root type always resolves, falling back to a bare library vertex.
    pub fn vertex(&self, name: &str) -> Option<Arc<InheritanceVertex>> {
        self.core.lookup_vertex(name)
    }

    /// Number of vertices created so far
    pub fn vertex_count(&self) -> usize {
        self.core.read_vertices().len()
    }

    /// Connected component of `name` through parent and child edges
    pub fn family(&self, name: &str, include_root: bool) -> HashSet<Arc<InheritanceVertex>> {
        self.core.family_of(name, include_root)
    }

    /// Names of the direct children of `name`, sorted
    pub fn direct_children(&self, name: &str) -> Vec<String> {
        self.core.children_of(name)
    }

    pub fn all_parents(&self, name: &str) -> Vec<Arc<InheritanceVertex>> {
        self.vertex(name)
            .map(|v| v.all_parents())
            .unwrap_or_default()
    }

    pub fn all_children(&self, name: &str) -> Vec<Arc<InheritanceVertex>> {
        self.vertex(name)
            .map(|v| v.all_children())
            .unwrap_or_default()
    }

    /// Most specific common ancestor of two classes.
    ///
    /// Never fails: the root type is the answer of last resort.
    pub fn common_ancestor(&self, first: &str, second: &str) -> String {
        let root = &self.core.root_type;
        let Some(first_vertex) = self.vertex(first) else {
            return root.clone();
        };

        // The first type's lineage; the root type always belongs to it
        let mut members: HashSet<String> = HashSet::from([first.to_string(), root.clone()]);
        members.extend(
            first_vertex
                .all_parents()
                .iter()
                .map(|parent| parent.name().to_string()),
        );

        if members.contains(second) {
            return second.to_string();
        }

        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([second.to_string()]);
        while let Some(next) = queue.pop_front() {
            if !visited.insert(next.clone()) {
                continue;
            }
            if members.contains(&next) {
                return next;
            }
            if let Some(vertex) = self.vertex(&next) {
                queue.extend(vertex.parent_names().iter().cloned());
            }
        }
        root.clone()
    }

    /// Whether a value of type `child` can be assigned to `target`
    pub fn is_assignable_from(&self, target: &str, child: &str) -> bool {
        if target == child || target == self.core.root_type {
            return true;
        }
        self.vertex(child)
            .map(|v| v.is_descendant_of(target))
            .unwrap_or(false)
    }
}

impl Drop for InheritanceGraph {
    fn drop(&mut self) {
        let listener: Arc<dyn WorkspaceListener> = self.core.listener.clone();
        self.core.workspace.remove_listener(&listener);
        for resource in self.core.workspace.all_resources() {
            self.core.detach(&resource);
        }
    }
}

impl GraphCore {
    fn lock_maintenance(&self) -> MutexGuard<'_, ()> {
        self.maintenance.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_vertices(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Arc<InheritanceVertex>>> {
        self.vertices.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_vertices(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Arc<InheritanceVertex>>> {
        self.vertices.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_index(&self) -> std::sync::RwLockWriteGuard<'_, ParentIndex> {
        self.index.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn cached_vertex(&self, name: &str) -> Option<Arc<InheritanceVertex>> {
        self.read_vertices().get(name).cloned()
    }

    pub(crate) fn children_of(&self, name: &str) -> Vec<String> {
        self.index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .children_of(name)
    }

    pub(crate) fn lookup_vertex(&self, name: &str) -> Option<Arc<InheritanceVertex>> {
        if self.closed.load(Ordering::Acquire) {
            return None;
        }
        if let Some(vertex) = self.cached_vertex(name) {
            return Some(vertex);
        }

        let _guard = self.lock_maintenance();
        if let Some(vertex) = self.cached_vertex(name) {
            return Some(vertex);
        }
        let (class, primary) = self.resolve_class(name)?;
        let vertex = Arc::new(InheritanceVertex::new(class, primary, self.self_ref.clone()));
        self.write_vertices().insert(name.to_string(), vertex.clone());
        Some(vertex)
    }

    /// Current class for a name plus its provenance
    fn resolve_class(&self, name: &str) -> Option<(Arc<ClassInfo>, bool)> {
        match self.workspace.find_any_class(name) {
            Some(lookup) => Some((lookup.class().clone(), lookup.is_primary)),
            None if name == self.root_type => {
                let root = ClassInfo::builder(name).no_super().build();
                Some((Arc::new(root), false))
            }
            None => None,
        }
    }

    pub(crate) fn family_of(&self, name: &str, include_root: bool) -> HashSet<Arc<InheritanceVertex>> {
        let Some(start) = self.lookup_vertex(name) else {
            return HashSet::new();
        };
        if start.is_module() {
            let mut family = HashSet::from([start]);
            if include_root {
                family.extend(self.lookup_vertex(&self.root_type));
            }
            return family;
        }

        let mut family = HashSet::new();
        let mut stack = vec![start];
        while let Some(vertex) = stack.pop() {
            if vertex.is_module() || family.contains(&vertex) {
                continue;
            }
            family.insert(vertex.clone());
            if vertex.name() == self.root_type {
                continue;
            }
            stack.extend(vertex.parents());
            stack.extend(vertex.children());
        }

        if include_root {
            if let Some(root) = self.lookup_vertex(&self.root_type) {
                family.insert(root);
            }
        } else {
            family.retain(|v| v.name() != self.root_type);
        }
        family
    }

    fn attach(&self, resource: &Arc<Resource>) {
        for nested in resource.resources_recursive() {
            for (_, bundle) in nested.class_bundles() {
                bundle.add_listener(self.listener.clone());
            }
        }
    }

    fn detach(&self, resource: &Arc<Resource>) {
        let listener: Arc<dyn BundleListener<ClassInfo>> = self.listener.clone();
        for nested in resource.resources_recursive() {
            for (_, bundle) in nested.class_bundles() {
                bundle.remove_listener(&listener);
            }
        }
    }

    /// Re-read a cached vertex from the workspace, dropping it when gone
    fn refresh_vertex(&self, name: &str) {
        let Some(vertex) = self.cached_vertex(name) else {
            return;
        };
        match self.resolve_class(name) {
            Some((class, primary)) => vertex.set_value(class, primary),
            None => {
                self.write_vertices().remove(name);
                vertex.invalidate();
            }
        }
    }

    /// Reset caches of the direct neighbours of a changed class
    fn invalidate_neighbours<'a>(&self, name: &str, parents: impl IntoIterator<Item = &'a str>) {
        let children = self.children_of(name);
        let vertices = self.read_vertices();
        for parent in parents {
            if let Some(vertex) = vertices.get(parent) {
                vertex.invalidate_children();
            }
        }
        for child in &children {
            if let Some(vertex) = vertices.get(child) {
                vertex.invalidate_parents();
            }
        }
    }

    fn on_class_added(&self, class: &ClassInfo) {
        let _guard = self.lock_maintenance();
        self.write_index().add_class(class);
        self.refresh_vertex(class.name());
        self.invalidate_neighbours(class.name(), class.declared_parents());
    }

    fn on_class_updated(&self, old: &ClassInfo, new: &ClassInfo) -> Result<()> {
        if old.name() != new.name() {
            return Err(Error::InvariantViolation(format!(
                "class {} was updated under the name {}; renames must go through the mapping applier",
                old.name(),
                new.name()
            )));
        }
        let name = new.name();
        let _guard = self.lock_maintenance();

        // Per-parent edge delta between the old and new declarations
        let mut delta: HashMap<&str, i64> = HashMap::new();
        for parent in old.declared_parents() {
            *delta.entry(parent).or_insert(0) -= 1;
        }
        for parent in new.declared_parents() {
            *delta.entry(parent).or_insert(0) += 1;
        }
        delta.retain(|_, d| *d != 0);

        {
            let mut index = self.write_index();
            for (parent, d) in &delta {
                for _ in 0..d.unsigned_abs() {
                    if *d > 0 {
                        index.add_edge(parent, name);
                    } else {
                        index.remove_edge(parent, name);
                    }
                }
            }
        }

        self.refresh_vertex(name);
        let vertices = self.read_vertices();
        for parent in delta.keys() {
            if let Some(vertex) = vertices.get(*parent) {
                vertex.invalidate_children();
            }
        }
        Ok(())
    }

    fn on_class_removed(&self, class: &ClassInfo) {
        let _guard = self.lock_maintenance();
        self.write_index().remove_class(class);
        self.refresh_vertex(class.name());
        self.invalidate_neighbours(class.name(), class.declared_parents());
    }

    /// Full rebuild, used when libraries come or go
    fn rebuild(&self) {
        let _guard = self.lock_maintenance();
        let index = ParentIndex::build(&self.workspace);
        tracing::debug!("Rebuilt inheritance index: {} edges", index.edge_count());
        *self.write_index() = index;

        // Held vertices stay live: re-resolve each in place or drop it
        let names: Vec<String> = self.read_vertices().keys().cloned().collect();
        for name in &names {
            self.refresh_vertex(name);
        }
    }

    fn close(&self) {
        let _guard = self.lock_maintenance();
        self.closed.store(true, Ordering::Release);
        *self.write_index() = ParentIndex::default();
        let old = std::mem::take(&mut *self.write_vertices());
        for vertex in old.values() {
            vertex.invalidate();
        }
    }
}

/// Forwards bundle and workspace events into the graph
struct GraphListener {
    core: Weak<GraphCore>,
}

impl BundleListener<ClassInfo> for GraphListener {
    fn on_new_item(&self, item: &Arc<ClassInfo>) -> Result<()> {
        if let Some(core) = self.core.upgrade() {
            core.on_class_added(item);
        }
        Ok(())
    }

    fn on_update_item(&self, old: &Arc<ClassInfo>, new: &Arc<ClassInfo>) -> Result<()> {
        match self.core.upgrade() {
            Some(core) => core.on_class_updated(old, new),
            None => Ok(()),
        }
    }

    fn on_remove_item(&self, item: &Arc<ClassInfo>) -> Result<()> {
        if let Some(core) = self.core.upgrade() {
            core.on_class_removed(item);
        }
        Ok(())
    }
}

impl WorkspaceListener for GraphListener {
    fn on_add_library(&self, _workspace: &Workspace, library: &Arc<Resource>) -> Result<()> {
        if let Some(core) = self.core.upgrade() {
            core.attach(library);
            core.rebuild();
        }
        Ok(())
    }

    fn on_remove_library(&self, _workspace: &Workspace, library: &Arc<Resource>) -> Result<()> {
        if let Some(core) = self.core.upgrade() {
            core.detach(library);
            core.rebuild();
        }
        Ok(())
    }

    fn on_close(&self, _workspace: &Workspace) {
        if let Some(core) = self.core.upgrade() {
            core.close();
        }
    }
}
