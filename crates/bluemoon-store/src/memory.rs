//! In-memory storage implementation.
//!
//! Values, counters, and listings live in separate maps, each behind its own lock, so
//! every single-key operation is atomic while nothing spans two keys.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Mutex, RwLock};

use crate::error::{Result, StoreError};
use crate::{KvStore, Order, Page};

/// One sorted set: ordered entries plus a member → score lookup for moves and removals.
#[derive(Debug, Default)]
struct Listing {
    entries: BTreeSet<(i64, String)>,
    scores: HashMap<String, i64>,
}

/// Memory-backed storage implementation.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<BTreeMap<String, Vec<u8>>>,
    counters: Mutex<HashMap<String, u64>>,
    listings: RwLock<BTreeMap<String, Listing>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let values = self.values.read().map_err(StoreError::poisoned)?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        let mut values = self.values.write().map_err(StoreError::poisoned)?;
        values.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let mut values = self.values.write().map_err(StoreError::poisoned)?;
        Ok(values.remove(key).is_some())
    }

    fn scan_keys(&self, prefix: &str) -> Result<Vec<String>> {
        let values = self.values.read().map_err(StoreError::poisoned)?;
        Ok(values
            .range(prefix.to_string()..)
            .map(|(key, _)| key)
            .take_while(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn increment(&self, key: &str) -> Result<u64> {
        let mut counters = self.counters.lock().map_err(StoreError::poisoned)?;
        let counter = counters.entry(key.to_string()).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }

    fn counter(&self, key: &str) -> Result<u64> {
        let counters = self.counters.lock().map_err(StoreError::poisoned)?;
        Ok(counters.get(key).copied().unwrap_or(0))
    }

    fn raise_counter(&self, key: &str, floor: u64) -> Result<u64> {
        let mut counters = self.counters.lock().map_err(StoreError::poisoned)?;
        let counter = counters.entry(key.to_string()).or_insert(0);
        *counter = (*counter).max(floor);
        Ok(*counter)
    }

    fn listing_add(&self, listing: &str, score: i64, member: &str) -> Result<()> {
        let mut listings = self.listings.write().map_err(StoreError::poisoned)?;
        let set = listings.entry(listing.to_string()).or_default();

        if let Some(previous) = set.scores.insert(member.to_string(), score) {
            set.entries.remove(&(previous, member.to_string()));
        }
        set.entries.insert((score, member.to_string()));

        Ok(())
    }

    fn listing_remove(&self, listing: &str, member: &str) -> Result<bool> {
        let mut listings = self.listings.write().map_err(StoreError::poisoned)?;
        let Some(set) = listings.get_mut(listing) else {
            return Ok(false);
        };

        let removed = match set.scores.remove(member) {
            Some(score) => set.entries.remove(&(score, member.to_string())),
            None => false,
        };

        if set.entries.is_empty() {
            listings.remove(listing);
        }

        Ok(removed)
    }

    fn listing_score(&self, listing: &str, member: &str) -> Result<Option<i64>> {
        let listings = self.listings.read().map_err(StoreError::poisoned)?;
        Ok(listings
            .get(listing)
            .and_then(|set| set.scores.get(member).copied()))
    }

    fn listing_range(
        &self,
        listing: &str,
        order: Order,
        page: Option<Page>,
    ) -> Result<Vec<String>> {
        let listings = self.listings.read().map_err(StoreError::poisoned)?;
        let Some(set) = listings.get(listing) else {
            return Ok(Vec::new());
        };

        let members: Vec<String> = match order {
            Order::Ascending => set.entries.iter().map(|(_, m)| m.clone()).collect(),
            Order::Descending => set.entries.iter().rev().map(|(_, m)| m.clone()).collect(),
        };

        Ok(Page::apply(page, members))
    }

    fn scan_listings(&self, prefix: &str) -> Result<Vec<String>> {
        let listings = self.listings.read().map_err(StoreError::poisoned)?;
        Ok(listings
            .range(prefix.to_string()..)
            .map(|(name, _)| name)
            .take_while(|name| name.starts_with(prefix))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_crud() {
        let store = MemoryStore::new();

        store.set("resident:1", b"one").unwrap();
        assert_eq!(store.get("resident:1").unwrap().unwrap(), b"one");

        store.set("resident:1", b"uno").unwrap();
        assert_eq!(store.get("resident:1").unwrap().unwrap(), b"uno");

        assert!(store.delete("resident:1").unwrap());
        assert!(!store.delete("resident:1").unwrap());
        assert!(store.get("resident:1").unwrap().is_none());
    }

    #[test]
    fn scan_keys_stops_at_prefix_boundary() {
        let store = MemoryStore::new();
        store.set("login-email:a@x.com", b"1").unwrap();
        store.set("login-email:b@x.com", b"2").unwrap();
        store.set("login-phone:0901", b"1").unwrap();

        let keys = store.scan_keys("login-email:").unwrap();
        assert_eq!(keys, vec!["login-email:a@x.com", "login-email:b@x.com"]);
    }

    #[test]
    fn counters_are_monotonic_per_key() {
        let store = MemoryStore::new();
        assert_eq!(store.counter("seq:resident").unwrap(), 0);
        assert_eq!(store.increment("seq:resident").unwrap(), 1);
        assert_eq!(store.increment("seq:resident").unwrap(), 2);
        assert_eq!(store.increment("seq:payment").unwrap(), 1);
        assert_eq!(store.counter("seq:resident").unwrap(), 2);
    }

    #[test]
    fn raise_counter_never_lowers() {
        let store = MemoryStore::new();
        assert_eq!(store.raise_counter("seq:form", 7).unwrap(), 7);
        assert_eq!(store.raise_counter("seq:form", 3).unwrap(), 7);
        assert_eq!(store.increment("seq:form").unwrap(), 8);
    }

    #[test]
    fn listing_score_tracks_moves() {
        let store = MemoryStore::new();
        assert_eq!(store.listing_score("all:form", "1").unwrap(), None);

        store.listing_add("all:form", 100, "1").unwrap();
        assert_eq!(store.listing_score("all:form", "1").unwrap(), Some(100));

        store.listing_add("all:form", 250, "1").unwrap();
        assert_eq!(store.listing_score("all:form", "1").unwrap(), Some(250));

        store.listing_remove("all:form", "1").unwrap();
        assert_eq!(store.listing_score("all:form", "1").unwrap(), None);
    }

    #[test]
    fn listing_orders_by_score_both_ways() {
        let store = MemoryStore::new();
        store.listing_add("all:form", 300, "3").unwrap();
        store.listing_add("all:form", 100, "1").unwrap();
        store.listing_add("all:form", 200, "2").unwrap();

        let asc = store.listing_range("all:form", Order::Ascending, None).unwrap();
        assert_eq!(asc, vec!["1", "2", "3"]);

        let desc = store
            .listing_range("all:form", Order::Descending, Some(Page::new(0, 2)))
            .unwrap();
        assert_eq!(desc, vec!["3", "2"]);
    }

    #[test]
    fn listing_add_moves_existing_member() {
        let store = MemoryStore::new();
        store.listing_add("all:form", 100, "1").unwrap();
        store.listing_add("all:form", 200, "2").unwrap();
        store.listing_add("all:form", 300, "1").unwrap();

        let asc = store.listing_range("all:form", Order::Ascending, None).unwrap();
        assert_eq!(asc, vec!["2", "1"]);
    }

    #[test]
    fn empty_listing_disappears() {
        let store = MemoryStore::new();
        store.listing_add("forms-by-apartment:5", 1, "1").unwrap();
        assert_eq!(
            store.scan_listings("forms-by-apartment:").unwrap(),
            vec!["forms-by-apartment:5"]
        );

        assert!(store.listing_remove("forms-by-apartment:5", "1").unwrap());
        assert!(!store.listing_remove("forms-by-apartment:5", "1").unwrap());
        assert!(store.scan_listings("forms-by-apartment:").unwrap().is_empty());
        assert!(store
            .listing_range("forms-by-apartment:5", Order::Ascending, None)
            .unwrap()
            .is_empty());
    }
}
