//! Key-value storage layer for the Blue Moon residence backend.
//!
//! The backend persists every record in a schemaless key-value store that offers only
//! single-key atomicity. This crate defines that contract ([`KvStore`]), the logical key
//! layout ([`keys`]), the record codec ([`codec`]), and two implementations:
//!
//! - [`MemoryStore`]: maps guarded by `RwLock`s, used for tests and single-process runs
//! - `RocksStore`: `RocksDB` with column families (feature `rocksdb-backend`)
//!
//! # Data model
//!
//! - **Values**: plain key → bytes. Primary records are CBOR blobs; index entries hold a
//!   decimal identifier.
//! - **Counters**: monotonic per-key integers used for identifier allocation.
//! - **Listings**: named sorted sets of `(score, member)` supporting range queries in
//!   either direction.
//!
//! No operation spans more than one key atomically. Callers that maintain several keys
//! must tolerate a failure between any two writes.
//!
//! # Example
//!
//! ```
//! use bluemoon_store::{KvStore, MemoryStore, Order};
//!
//! let store = MemoryStore::new();
//! store.listing_add("all:payment", 1_700_000_000_000, "1").unwrap();
//! store.listing_add("all:payment", 1_700_000_000_500, "2").unwrap();
//!
//! let newest_first = store.listing_range("all:payment", Order::Descending, None).unwrap();
//! assert_eq!(newest_first, vec!["2".to_string(), "1".to_string()]);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod codec;
pub mod error;
pub mod keys;
pub mod memory;
#[cfg(feature = "rocksdb-backend")]
pub mod rocks;
#[cfg(feature = "rocksdb-backend")]
pub mod schema;

use std::sync::Arc;

pub use codec::KvStoreExt;
pub use error::{Result, StoreError};
pub use memory::MemoryStore;
#[cfg(feature = "rocksdb-backend")]
pub use rocks::RocksStore;

/// A store shared between request handlers.
pub type SharedStore = Arc<dyn KvStore>;

/// Direction of a listing range query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    /// Lowest score first.
    Ascending,
    /// Highest score first.
    Descending,
}

/// A window into a listing range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// Members to skip.
    pub offset: usize,
    /// Maximum members to return.
    pub limit: usize,
}

impl Page {
    /// Create a page.
    #[must_use]
    pub const fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }

    /// Apply the page to an already ordered sequence.
    #[must_use]
    pub fn apply<T>(page: Option<Self>, items: Vec<T>) -> Vec<T> {
        match page {
            Some(page) => items
                .into_iter()
                .skip(page.offset)
                .take(page.limit)
                .collect(),
            None => items,
        }
    }
}

/// The storage contract every backend honors.
///
/// Each method touches exactly one key (or one listing) and is atomic on its own. There
/// are no cross-key transactions.
pub trait KvStore: Send + Sync {
    // =========================================================================
    // Values
    // =========================================================================

    /// Read a value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Write a value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn set(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Delete a value. Returns whether the key existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn delete(&self, key: &str) -> Result<bool>;

    /// List value keys starting with `prefix`, in key order.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn scan_keys(&self, prefix: &str) -> Result<Vec<String>>;

    // =========================================================================
    // Counters
    // =========================================================================

    /// Increment a counter and return the new value. Missing counters start at zero.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn increment(&self, key: &str) -> Result<u64>;

    /// Read a counter without changing it.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn counter(&self, key: &str) -> Result<u64>;

    /// Raise a counter to at least `floor` in one write and return the resulting value.
    /// A counter already at or above `floor` is left unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn raise_counter(&self, key: &str, floor: u64) -> Result<u64>;

    // =========================================================================
    // Listings
    // =========================================================================

    /// Add `member` to a listing, or move it to `score` if already present.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn listing_add(&self, listing: &str, score: i64, member: &str) -> Result<()>;

    /// Remove `member` from a listing. Returns whether it was present.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn listing_remove(&self, listing: &str, member: &str) -> Result<bool>;

    /// Score of `member` in a listing, or `None` if it is not a member.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn listing_score(&self, listing: &str, member: &str) -> Result<Option<i64>>;

    /// Members of a listing ordered by `(score, member)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn listing_range(&self, listing: &str, order: Order, page: Option<Page>)
        -> Result<Vec<String>>;

    /// Names of non-empty listings starting with `prefix`, in name order.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn scan_listings(&self, prefix: &str) -> Result<Vec<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_applies_offset_and_limit() {
        let items = vec![1, 2, 3, 4, 5];
        assert_eq!(Page::apply(Some(Page::new(1, 2)), items.clone()), vec![2, 3]);
        assert_eq!(Page::apply(Some(Page::new(4, 10)), items.clone()), vec![5]);
        assert_eq!(Page::apply(None, items), vec![1, 2, 3, 4, 5]);
    }
}
