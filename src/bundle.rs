//! Bundles - ordered, observable name → value containers
//!
//! A bundle holds classes or files keyed by their unique name. Iteration
//! follows insertion order, and an update keeps the entry's position.
//!
//! Listeners are told about every structural change:
//! - `on_new_item`: a `put` with an unused name
//! - `on_update_item`: a `put` replacing an existing name
//! - `on_remove_item`: a `remove` of a present name
//!
//! Callbacks run synchronously on the mutating thread, after the bundle's
//! own lock has been released, so a listener may read the bundle back.

use crate::class::{ClassInfo, FileInfo};
use crate::Result;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

/// Anything stored in a bundle is addressed by a unique name.
pub trait BundleEntry: Send + Sync + 'static {
    fn entry_name(&self) -> &str;
}

impl BundleEntry for ClassInfo {
    fn entry_name(&self) -> &str {
        self.name()
    }
}

impl BundleEntry for FileInfo {
    fn entry_name(&self) -> &str {
        self.name()
    }
}

/// Observer of bundle changes.
///
/// An error returned by a listener is handed back to whoever mutated
/// the bundle. The mutation itself has already happened at that point.
pub trait BundleListener<T>: Send + Sync {
    fn on_new_item(&self, _item: &Arc<T>) -> Result<()> {
        Ok(())
    }

    fn on_update_item(&self, _old: &Arc<T>, _new: &Arc<T>) -> Result<()> {
        Ok(())
    }

    fn on_remove_item(&self, _item: &Arc<T>) -> Result<()> {
        Ok(())
    }
}

pub type ClassBundle = Bundle<ClassInfo>;
pub type FileBundle = Bundle<FileInfo>;

struct BundleState<T> {
    /// name → (insertion sequence, value)
    entries: HashMap<String, (u64, Arc<T>)>,
    /// insertion sequence → name
    order: BTreeMap<u64, String>,
    next_seq: u64,
}

impl<T> Default for BundleState<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            order: BTreeMap::new(),
            next_seq: 0,
        }
    }
}

enum Change<T> {
    New(Arc<T>),
    Update(Arc<T>, Arc<T>),
    Remove(Arc<T>),
}

/// Keyed, insertion-ordered, mutable container with change listeners.
pub struct Bundle<T: BundleEntry> {
    state: RwLock<BundleState<T>>,
    listeners: RwLock<Vec<Arc<dyn BundleListener<T>>>>,
}

impl<T: BundleEntry> Default for Bundle<T> {
    fn default() -> Self {
        Self {
            state: RwLock::new(BundleState::default()),
            listeners: RwLock::new(Vec::new()),
        }
    }
}

impl<T: BundleEntry> std::fmt::Debug for Bundle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bundle")
            .field("entries", &self.len())
            .finish()
    }
}

impl<T: BundleEntry> Bundle<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a bundle pre-populated with the given values, without events
    pub fn with_entries(values: impl IntoIterator<Item = T>) -> Self {
        let bundle = Self::new();
        {
            let mut state = bundle.write_state();
            for value in values {
                Self::insert_locked(&mut state, Arc::new(value));
            }
        }
        bundle
    }

    pub fn get(&self, name: &str) -> Option<Arc<T>> {
        self.read_state().entries.get(name).map(|(_, v)| v.clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read_state().entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.read_state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Names in insertion order
    pub fn names(&self) -> Vec<String> {
        self.read_state().order.values().cloned().collect()
    }

    /// Values in insertion order
    pub fn values(&self) -> Vec<Arc<T>> {
        let state = self.read_state();
        state
            .order
            .values()
            .filter_map(|name| state.entries.get(name).map(|(_, v)| v.clone()))
            .collect()
    }

    /// Insert or update the entry named after `value`.
    ///
    /// Returns the previous value when this was an update.
    pub fn put(&self, value: impl Into<Arc<T>>) -> Result<Option<Arc<T>>> {
        let value = value.into();
        let previous = {
            let mut state = self.write_state();
            Self::insert_locked(&mut state, value.clone())
        };

        match &previous {
            Some(old) => self.notify(Change::Update(old.clone(), value))?,
            None => self.notify(Change::New(value))?,
        }
        Ok(previous)
    }

    /// Remove an entry. Missing names are a no-op and fire nothing.
    pub fn remove(&self, name: &str) -> Result<Option<Arc<T>>> {
        let removed = {
            let mut state = self.write_state();
            match state.entries.remove(name) {
                Some((seq, value)) => {
                    state.order.remove(&seq);
                    Some(value)
                }
                None => None,
            }
        };

        if let Some(value) = &removed {
            self.notify(Change::Remove(value.clone()))?;
        }
        Ok(removed)
    }

    /// Remove every entry, firing one removal per entry
    pub fn clear(&self) -> Result<()> {
        let removed = {
            let mut state = self.write_state();
            let old = std::mem::take(&mut *state);
            old.order
                .into_values()
                .filter_map(|name| old.entries.get(&name).map(|(_, v)| v.clone()))
                .collect::<Vec<_>>()
        };

        let mut first_error = None;
        for value in removed {
            if let Err(e) = self.notify(Change::Remove(value)) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    pub fn add_listener(&self, listener: Arc<dyn BundleListener<T>>) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    /// Remove a listener by identity. Returns true if it was registered.
    pub fn remove_listener(&self, listener: &Arc<dyn BundleListener<T>>) -> bool {
        let target = Arc::as_ptr(listener) as *const ();
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|l| Arc::as_ptr(l) as *const () != target);
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn insert_locked(state: &mut BundleState<T>, value: Arc<T>) -> Option<Arc<T>> {
        let name = value.entry_name().to_string();
        if let Some((_, slot)) = state.entries.get_mut(&name) {
            return Some(std::mem::replace(slot, value));
        }
        let seq = state.next_seq;
        state.next_seq += 1;
        state.order.insert(seq, name.clone());
        state.entries.insert(name, (seq, value));
        None
    }

    fn notify(&self, change: Change<T>) -> Result<()> {
        let listeners: Vec<_> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let mut first_error = None;
        for listener in &listeners {
            let outcome = match &change {
                Change::New(item) => listener.on_new_item(item),
                Change::Update(old, new) => listener.on_update_item(old, new),
                Change::Remove(item) => listener.on_remove_item(item),
            };
            if let Err(e) = outcome {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, BundleState<T>> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, BundleState<T>> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}
