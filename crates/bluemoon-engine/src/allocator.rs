//! Identifier allocation.
//!
//! Identifiers are monotonically increasing per entity kind, never reused and never
//! decremented. Production code allocates through the store's counters; tests can inject
//! [`SequenceAllocator`] to pin identifiers without a store.

use std::collections::HashMap;
use std::sync::Mutex;

use bluemoon_core::EntityKind;
use bluemoon_store::{keys, SharedStore};

use crate::error::{EngineError, Result};

/// Source of fresh identifiers.
pub trait IdAllocator: Send + Sync {
    /// Allocate the next identifier of `kind`.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the backing counter cannot be incremented.
    fn next(&self, kind: EntityKind) -> Result<u64>;

    /// The most recently allocated identifier of `kind`, or zero.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the backing counter cannot be read.
    fn current(&self, kind: EntityKind) -> Result<u64>;
}

/// Allocates identifiers from the store's `seq:<kind>` counters.
#[derive(Clone)]
pub struct StoreAllocator {
    store: SharedStore,
}

impl StoreAllocator {
    /// Create an allocator over `store`.
    #[must_use]
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }
}

impl IdAllocator for StoreAllocator {
    fn next(&self, kind: EntityKind) -> Result<u64> {
        let id = self.store.increment(&keys::counter_key(kind))?;
        tracing::trace!(%kind, id, "Allocated identifier");
        Ok(id)
    }

    fn current(&self, kind: EntityKind) -> Result<u64> {
        Ok(self.store.counter(&keys::counter_key(kind))?)
    }
}

/// In-process allocator for tests and fixtures.
#[derive(Debug, Default)]
pub struct SequenceAllocator {
    counters: Mutex<HashMap<EntityKind, u64>>,
}

impl SequenceAllocator {
    /// Create an allocator whose first identifier of every kind is 1.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an allocator that continues after `last` for `kind`.
    #[must_use]
    pub fn starting_after(kind: EntityKind, last: u64) -> Self {
        let allocator = Self::default();
        if let Ok(mut counters) = allocator.counters.lock() {
            counters.insert(kind, last);
        }
        allocator
    }
}

impl IdAllocator for SequenceAllocator {
    fn next(&self, kind: EntityKind) -> Result<u64> {
        let mut counters = self
            .counters
            .lock()
            .map_err(|_| EngineError::StoreUnavailable("allocator lock poisoned".into()))?;
        let counter = counters.entry(kind).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }

    fn current(&self, kind: EntityKind) -> Result<u64> {
        let counters = self
            .counters
            .lock()
            .map_err(|_| EngineError::StoreUnavailable("allocator lock poisoned".into()))?;
        Ok(counters.get(&kind).copied().unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bluemoon_store::MemoryStore;

    use super::*;

    #[test]
    fn store_allocator_is_monotonic_per_kind() {
        let allocator = StoreAllocator::new(Arc::new(MemoryStore::new()));

        assert_eq!(allocator.current(EntityKind::Payment).unwrap(), 0);
        assert_eq!(allocator.next(EntityKind::Payment).unwrap(), 1);
        assert_eq!(allocator.next(EntityKind::Payment).unwrap(), 2);
        assert_eq!(allocator.next(EntityKind::Form).unwrap(), 1);
        assert_eq!(allocator.current(EntityKind::Payment).unwrap(), 2);
    }

    #[test]
    fn sequence_allocator_can_start_late() {
        let allocator = SequenceAllocator::starting_after(EntityKind::Resident, 41);

        assert_eq!(allocator.next(EntityKind::Resident).unwrap(), 42);
        assert_eq!(allocator.next(EntityKind::Service).unwrap(), 1);
    }
}
