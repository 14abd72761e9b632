//! Handle Registry
//!
//! Maps externally visible [`Handle`]s to internal values in O(1). The
//! registry is a lookup index, not a container: it stores small `Copy`
//! values (arena keys) and never owns or destroys the objects they name.
//!
//! ## Teardown ordering
//!
//! An object must be unreachable by handle before its destruction begins.
//! Single objects are torn down with [`HandleRegistry::erase`] followed by
//! destruction; bulk teardown goes through
//! [`HandleRegistry::clear_and_call_for_each`], which empties the table before
//! invoking the destroy callback even once.
//!
//! ## Concurrency
//!
//! The table sits behind an `RwLock`: concurrent `find`s run in parallel,
//! `insert`/`erase`/`clear_and_call_for_each` are exclusive.

mod handle;

pub use handle::{Handle, HandleAllocator};

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;

/// Registry errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    /// No entry for this handle
    #[error("Handle not found: {0}")]
    NotFound(Handle),

    /// An entry for this handle already exists
    #[error("Handle already registered: {0}")]
    Duplicate(Handle),

    /// The table could not grow
    #[error("Registry allocation failed")]
    AllocationFailed,
}

/// Thread-safe map from [`Handle`] to a non-owning value
pub struct HandleRegistry<V> {
    table: RwLock<HashMap<Handle, V>>,
}

impl<V: Copy> HandleRegistry<V> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            table: RwLock::new(HashMap::new()),
        }
    }

    /// Add an entry; fails if `handle` is already present
    pub fn insert(&self, handle: Handle, value: V) -> Result<(), RegistryError> {
        let mut table = self.write();
        if table.contains_key(&handle) {
            return Err(RegistryError::Duplicate(handle));
        }
        table
            .try_reserve(1)
            .map_err(|_| RegistryError::AllocationFailed)?;
        table.insert(handle, value);
        Ok(())
    }

    /// Look up the value registered under `handle`
    pub fn find(&self, handle: Handle) -> Result<V, RegistryError> {
        self.read()
            .get(&handle)
            .copied()
            .ok_or(RegistryError::NotFound(handle))
    }

    /// Remove the entry for `handle` and return its value
    ///
    /// The referenced object is not touched; destroying it is the caller's
    /// job and must happen after this call.
    pub fn erase(&self, handle: Handle) -> Result<V, RegistryError> {
        self.write()
            .remove(&handle)
            .ok_or(RegistryError::NotFound(handle))
    }

    /// Whether the registry holds no entries
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Visit every entry in unspecified order
    ///
    /// Entries are copied out under the read lock and visited after it is
    /// released, so `visit` may look up this registry. Inserts and erases made
    /// by `visit` are not reflected in the traversal.
    pub fn for_each<F>(&self, mut visit: F)
    where
        F: FnMut(Handle, &V),
    {
        let snapshot: Vec<(Handle, V)> = self
            .read()
            .iter()
            .map(|(handle, value)| (*handle, *value))
            .collect();
        for (handle, value) in &snapshot {
            visit(*handle, value);
        }
    }

    /// Empty the table, then call `destroy` once per previously held entry
    ///
    /// The table is swapped out and the lock released before the first
    /// callback runs: every handle already resolves to `NotFound` by then, and
    /// `destroy` may re-enter the registry freely.
    ///
    /// Returns the number of entries destroyed.
    pub fn clear_and_call_for_each<F>(&self, mut destroy: F) -> usize
    where
        F: FnMut(Handle, V),
    {
        let drained = std::mem::take(&mut *self.write());
        let count = drained.len();
        for (handle, value) in drained {
            destroy(handle, value);
        }
        count
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<Handle, V>> {
        self.table.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<Handle, V>> {
        self.table.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<V: Copy> Default for HandleRegistry<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Drop for HandleRegistry<V> {
    fn drop(&mut self) {
        let table = self.table.get_mut().unwrap_or_else(PoisonError::into_inner);
        if !table.is_empty() {
            log::debug!("Handle registry dropped with {} live entries", table.len());
        }
    }
}
