//! Store wrapper that fails writes on demand.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bluemoon_store::{KvStore, MemoryStore, Order, Page, SharedStore, StoreError};

type StoreResult<T> = bluemoon_store::Result<T>;

/// A `MemoryStore` whose writes to selected key prefixes fail.
#[derive(Default)]
pub struct FaultyStore {
    inner: MemoryStore,
    failing: Mutex<Vec<String>>,
    increments: AtomicUsize,
}

impl FaultyStore {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make every write to a key (or listing) starting with `prefix` fail.
    pub fn fail_writes_to(&self, prefix: &str) {
        self.failing.lock().unwrap().push(prefix.to_string());
    }

    /// Successful `increment` calls so far.
    pub fn increments(&self) -> usize {
        self.increments.load(Ordering::SeqCst)
    }

    /// Stop injecting failures.
    pub fn heal(&self) {
        self.failing.lock().unwrap().clear();
    }

    fn guard(&self, key: &str) -> StoreResult<()> {
        let failing = self.failing.lock().unwrap();
        if failing.iter().any(|prefix| key.starts_with(prefix.as_str())) {
            return Err(StoreError::Database(format!("injected failure on {key}")));
        }
        Ok(())
    }
}

impl KvStore for FaultyStore {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        self.guard(key)?;
        self.inner.set(key, value)
    }

    fn delete(&self, key: &str) -> StoreResult<bool> {
        self.guard(key)?;
        self.inner.delete(key)
    }

    fn scan_keys(&self, prefix: &str) -> StoreResult<Vec<String>> {
        self.inner.scan_keys(prefix)
    }

    fn increment(&self, key: &str) -> StoreResult<u64> {
        self.guard(key)?;
        let value = self.inner.increment(key)?;
        self.increments.fetch_add(1, Ordering::SeqCst);
        Ok(value)
    }

    fn counter(&self, key: &str) -> StoreResult<u64> {
        self.inner.counter(key)
    }

    fn raise_counter(&self, key: &str, floor: u64) -> StoreResult<u64> {
        self.guard(key)?;
        self.inner.raise_counter(key, floor)
    }

    fn listing_add(&self, listing: &str, score: i64, member: &str) -> StoreResult<()> {
        self.guard(listing)?;
        self.inner.listing_add(listing, score, member)
    }

    fn listing_remove(&self, listing: &str, member: &str) -> StoreResult<bool> {
        self.guard(listing)?;
        self.inner.listing_remove(listing, member)
    }

    fn listing_score(&self, listing: &str, member: &str) -> StoreResult<Option<i64>> {
        self.inner.listing_score(listing, member)
    }

    fn listing_range(
        &self,
        listing: &str,
        order: Order,
        page: Option<Page>,
    ) -> StoreResult<Vec<String>> {
        self.inner.listing_range(listing, order, page)
    }

    fn scan_listings(&self, prefix: &str) -> StoreResult<Vec<String>> {
        self.inner.scan_listings(prefix)
    }
}

/// A fresh in-memory store.
pub fn memory_store() -> SharedStore {
    Arc::new(MemoryStore::new())
}
