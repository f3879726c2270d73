//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `KvStore` trait.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Arc, Mutex};

use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, Direction, IteratorMode,
    MultiThreaded, Options, WriteBatch,
};

use crate::error::{Result, StoreError};
use crate::schema::{self, all_column_families, cf};
use crate::{KvStore, Order, Page};

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    /// Serializes read-modify-write sequences (counters, listing moves) so each stays
    /// atomic for its single logical key.
    write_lock: Mutex<()>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path.as_ref(), cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        tracing::debug!(path = %path.as_ref().display(), "RocksDB store opened");

        Ok(Self {
            db: Arc::new(db),
            write_lock: Mutex::new(()),
        })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Collect every key in `cf_name` starting with `prefix`.
    fn keys_with_prefix(&self, cf_name: &str, prefix: &[u8]) -> Result<Vec<Box<[u8]>>> {
        let cf = self.cf(cf_name)?;
        let iter = self
            .db
            .iterator_cf(&cf, IteratorMode::From(prefix, Direction::Forward));

        let mut keys = Vec::new();
        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(prefix) {
                break;
            }
            keys.push(key);
        }
        Ok(keys)
    }
}

impl KvStore for RocksStore {
    // =========================================================================
    // Values
    // =========================================================================

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let cf = self.cf(cf::VALUES)?;
        self.db
            .get_cf(&cf, key.as_bytes())
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        let cf = self.cf(cf::VALUES)?;
        self.db
            .put_cf(&cf, key.as_bytes(), value)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let cf = self.cf(cf::VALUES)?;
        let _guard = self.write_lock.lock().map_err(StoreError::poisoned)?;

        let existed = self
            .db
            .get_pinned_cf(&cf, key.as_bytes())
            .map_err(|e| StoreError::Database(e.to_string()))?
            .is_some();

        if existed {
            self.db
                .delete_cf(&cf, key.as_bytes())
                .map_err(|e| StoreError::Database(e.to_string()))?;
        }

        Ok(existed)
    }

    fn scan_keys(&self, prefix: &str) -> Result<Vec<String>> {
        self.keys_with_prefix(cf::VALUES, prefix.as_bytes())?
            .into_iter()
            .map(|key| {
                String::from_utf8(key.into_vec())
                    .map_err(|e| StoreError::Serialization(e.to_string()))
            })
            .collect()
    }

    // =========================================================================
    // Counters
    // =========================================================================

    fn increment(&self, key: &str) -> Result<u64> {
        let cf = self.cf(cf::COUNTERS)?;
        let _guard = self.write_lock.lock().map_err(StoreError::poisoned)?;

        let next = self.counter(key)? + 1;
        self.db
            .put_cf(&cf, key.as_bytes(), next.to_be_bytes())
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(next)
    }

    fn counter(&self, key: &str) -> Result<u64> {
        let cf = self.cf(cf::COUNTERS)?;
        let Some(data) = self
            .db
            .get_cf(&cf, key.as_bytes())
            .map_err(|e| StoreError::Database(e.to_string()))?
        else {
            return Ok(0);
        };

        let bytes: [u8; 8] = data
            .as_slice()
            .try_into()
            .map_err(|_| StoreError::Serialization(format!("counter {key} is corrupt")))?;
        Ok(u64::from_be_bytes(bytes))
    }

    fn raise_counter(&self, key: &str, floor: u64) -> Result<u64> {
        let cf = self.cf(cf::COUNTERS)?;
        let _guard = self.write_lock.lock().map_err(StoreError::poisoned)?;

        let current = self.counter(key)?;
        if current >= floor {
            return Ok(current);
        }
        self.db
            .put_cf(&cf, key.as_bytes(), floor.to_be_bytes())
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(floor)
    }

    // =========================================================================
    // Listings
    // =========================================================================

    fn listing_add(&self, listing: &str, score: i64, member: &str) -> Result<()> {
        let cf_entries = self.cf(cf::LISTING_ENTRIES)?;
        let cf_scores = self.cf(cf::LISTING_SCORES)?;
        let score_key = schema::listing_score_key(listing, member);
        let _guard = self.write_lock.lock().map_err(StoreError::poisoned)?;

        let mut batch = WriteBatch::default();
        if let Some(previous) = self
            .db
            .get_cf(&cf_scores, &score_key)
            .map_err(|e| StoreError::Database(e.to_string()))?
        {
            if let Ok(bytes) = <[u8; 8]>::try_from(previous.as_slice()) {
                let previous = schema::decode_score(bytes);
                batch.delete_cf(
                    &cf_entries,
                    schema::listing_entry_key(listing, previous, member),
                );
            }
        }

        batch.put_cf(
            &cf_entries,
            schema::listing_entry_key(listing, score, member),
            b"",
        );
        batch.put_cf(&cf_scores, &score_key, schema::encode_score(score));

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn listing_remove(&self, listing: &str, member: &str) -> Result<bool> {
        let cf_entries = self.cf(cf::LISTING_ENTRIES)?;
        let cf_scores = self.cf(cf::LISTING_SCORES)?;
        let score_key = schema::listing_score_key(listing, member);
        let _guard = self.write_lock.lock().map_err(StoreError::poisoned)?;

        let Some(previous) = self
            .db
            .get_cf(&cf_scores, &score_key)
            .map_err(|e| StoreError::Database(e.to_string()))?
        else {
            return Ok(false);
        };

        let bytes = <[u8; 8]>::try_from(previous.as_slice())
            .map_err(|_| StoreError::Serialization(format!("score of {listing}/{member}")))?;

        // Write atomically
        let mut batch = WriteBatch::default();
        batch.delete_cf(
            &cf_entries,
            schema::listing_entry_key(listing, schema::decode_score(bytes), member),
        );
        batch.delete_cf(&cf_scores, &score_key);

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(true)
    }

    fn listing_score(&self, listing: &str, member: &str) -> Result<Option<i64>> {
        let cf_scores = self.cf(cf::LISTING_SCORES)?;
        let Some(stored) = self
            .db
            .get_cf(&cf_scores, schema::listing_score_key(listing, member))
            .map_err(|e| StoreError::Database(e.to_string()))?
        else {
            return Ok(None);
        };

        let bytes = <[u8; 8]>::try_from(stored.as_slice())
            .map_err(|_| StoreError::Serialization(format!("score of {listing}/{member}")))?;
        Ok(Some(schema::decode_score(bytes)))
    }

    fn listing_range(
        &self,
        listing: &str,
        order: Order,
        page: Option<Page>,
    ) -> Result<Vec<String>> {
        let prefix = schema::listing_prefix(listing);

        // Entry keys sort by score, so a forward prefix scan is ascending order
        let mut members: Vec<String> = self
            .keys_with_prefix(cf::LISTING_ENTRIES, &prefix)?
            .iter()
            .filter_map(|key| schema::member_from_entry_key(key, prefix.len()))
            .collect();

        if order == Order::Descending {
            members.reverse();
        }

        Ok(Page::apply(page, members))
    }

    fn scan_listings(&self, prefix: &str) -> Result<Vec<String>> {
        let names: BTreeSet<String> = self
            .keys_with_prefix(cf::LISTING_SCORES, prefix.as_bytes())?
            .iter()
            .filter_map(|key| schema::listing_name_from_key(key))
            .collect();

        Ok(names.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::KvStoreExt;
    use tempfile::TempDir;

    fn create_test_store() -> (RocksStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = RocksStore::open(dir.path()).unwrap();
        (store, dir)
    }

    #[test]
    fn value_crud() {
        let (store, _dir) = create_test_store();

        store.set_id("login-email:a@x.com", 1).unwrap();
        assert_eq!(store.get_id("login-email:a@x.com").unwrap(), Some(1));

        assert!(store.delete("login-email:a@x.com").unwrap());
        assert!(!store.delete("login-email:a@x.com").unwrap());
        assert!(store.get("login-email:a@x.com").unwrap().is_none());
    }

    #[test]
    fn counters_survive_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = RocksStore::open(dir.path()).unwrap();
            assert_eq!(store.increment("seq:payment").unwrap(), 1);
            assert_eq!(store.increment("seq:payment").unwrap(), 2);
        }

        let store = RocksStore::open(dir.path()).unwrap();
        assert_eq!(store.counter("seq:payment").unwrap(), 2);
        assert_eq!(store.increment("seq:payment").unwrap(), 3);

        assert_eq!(store.raise_counter("seq:payment", 10).unwrap(), 10);
        assert_eq!(store.raise_counter("seq:payment", 4).unwrap(), 10);
        assert_eq!(store.increment("seq:payment").unwrap(), 11);
    }

    #[test]
    fn listing_operations() {
        let (store, _dir) = create_test_store();

        store.listing_add("all:payment", 2_000, "2").unwrap();
        store.listing_add("all:payment", 1_000, "1").unwrap();
        store.listing_add("all:payment", 3_000, "3").unwrap();
        store.listing_add("all:paymentx", 0, "9").unwrap();

        let desc = store
            .listing_range("all:payment", Order::Descending, None)
            .unwrap();
        assert_eq!(desc, vec!["3", "2", "1"]);

        // Moving a member replaces its old entry
        store.listing_add("all:payment", 500, "3").unwrap();
        assert_eq!(store.listing_score("all:payment", "3").unwrap(), Some(500));
        assert_eq!(store.listing_score("all:payment", "7").unwrap(), None);
        let asc = store
            .listing_range("all:payment", Order::Ascending, Some(Page::new(0, 2)))
            .unwrap();
        assert_eq!(asc, vec!["3", "1"]);

        assert!(store.listing_remove("all:payment", "1").unwrap());
        assert!(!store.listing_remove("all:payment", "1").unwrap());
        let asc = store
            .listing_range("all:payment", Order::Ascending, None)
            .unwrap();
        assert_eq!(asc, vec!["3", "2"]);
    }

    #[test]
    fn scan_listings_lists_names_once() {
        let (store, _dir) = create_test_store();

        store.listing_add("forms-by-apartment:5", 1, "1").unwrap();
        store.listing_add("forms-by-apartment:5", 2, "2").unwrap();
        store.listing_add("forms-by-apartment:6", 3, "3").unwrap();
        store.listing_add("forms-by-service:1", 3, "3").unwrap();

        let names = store.scan_listings("forms-by-apartment:").unwrap();
        assert_eq!(names, vec!["forms-by-apartment:5", "forms-by-apartment:6"]);
    }
}
