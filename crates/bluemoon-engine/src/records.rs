//! Typed access to primary records.

use bluemoon_core::{EntityKind, Form, Notification, Payment, Resident, ServiceRequest};
use bluemoon_store::{keys, KvStoreExt, SharedStore};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{EngineError, Result};

/// A primary record stored under `<kind>:<id>`.
pub trait Record: Serialize + DeserializeOwned {
    /// Entity kind, which names the key prefix, counter and global listing.
    const KIND: EntityKind;

    /// The record's identifier.
    fn record_id(&self) -> u64;
}

impl Record for Resident {
    const KIND: EntityKind = EntityKind::Resident;

    fn record_id(&self) -> u64 {
        self.id.get()
    }
}

impl Record for Payment {
    const KIND: EntityKind = EntityKind::Payment;

    fn record_id(&self) -> u64 {
        self.id.get()
    }
}

impl Record for Notification {
    const KIND: EntityKind = EntityKind::Notification;

    fn record_id(&self) -> u64 {
        self.id.get()
    }
}

impl Record for ServiceRequest {
    const KIND: EntityKind = EntityKind::Service;

    fn record_id(&self) -> u64 {
        self.id.get()
    }
}

impl Record for Form {
    const KIND: EntityKind = EntityKind::Form;

    fn record_id(&self) -> u64 {
        self.id.get()
    }
}

/// Loads and persists primary records.
#[derive(Clone)]
pub struct Records {
    store: SharedStore,
}

impl Records {
    /// Create a record accessor over `store`.
    #[must_use]
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Load a record if it exists.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the store fails or the record does not decode.
    pub fn load<T: Record>(&self, id: u64) -> Result<Option<T>> {
        Ok(self.store.get_record(&keys::record_key(T::KIND, id))?)
    }

    /// Load a record that must exist.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the record is absent, `StoreUnavailable` if the store fails.
    pub fn require<T: Record>(&self, id: u64) -> Result<T> {
        self.load(id)?
            .ok_or_else(|| EngineError::not_found(T::KIND.as_str(), id))
    }

    /// Persist a record, replacing any previous version.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the store fails.
    pub fn save<T: Record>(&self, record: &T) -> Result<()> {
        let key = keys::record_key(T::KIND, record.record_id());
        self.store.put_record(&key, record)?;
        Ok(())
    }

    /// Delete a record. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the store fails.
    pub fn erase<T: Record>(&self, id: u64) -> Result<bool> {
        Ok(self.store.delete(&keys::record_key(T::KIND, id))?)
    }

    /// Load records in the given order, skipping identifiers whose record is gone.
    ///
    /// Listings are weak references, so a missing record only means the listing is stale.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the store fails.
    pub fn load_many<T: Record>(&self, ids: impl IntoIterator<Item = u64>) -> Result<Vec<T>> {
        let mut records = Vec::new();
        for id in ids {
            match self.load(id)? {
                Some(record) => records.push(record),
                None => tracing::debug!(kind = %T::KIND, id, "Skipping dangling listing entry"),
            }
        }
        Ok(records)
    }

    /// Identifiers of every stored record of `T`, ascending.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the store fails.
    pub fn scan_ids<T: Record>(&self) -> Result<Vec<u64>> {
        let mut ids: Vec<u64> = self
            .store
            .scan_keys(&keys::record_prefix(T::KIND))?
            .iter()
            .filter_map(|key| keys::parse_record_key(T::KIND, key))
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bluemoon_core::{ApartmentId, NotificationId};
    use bluemoon_store::MemoryStore;
    use chrono::Utc;

    use super::*;

    fn notification(id: u64) -> Notification {
        Notification::new(
            NotificationId::new(id),
            ApartmentId::new("5"),
            format!("notice {id}"),
            Utc::now(),
        )
    }

    #[test]
    fn require_reports_not_found() {
        let records = Records::new(Arc::new(MemoryStore::new()));

        let err = records.require::<Notification>(3).unwrap_err();
        assert!(matches!(
            err,
            EngineError::NotFound { entity: "notification", ref id } if id == "3"
        ));
    }

    #[test]
    fn load_many_skips_missing_and_keeps_order() {
        let records = Records::new(Arc::new(MemoryStore::new()));
        records.save(&notification(1)).unwrap();
        records.save(&notification(3)).unwrap();

        let loaded: Vec<Notification> = records.load_many([3, 2, 1]).unwrap();
        let ids: Vec<u64> = loaded.iter().map(|n| n.id.get()).collect();
        assert_eq!(ids, vec![3, 1]);
    }

    #[test]
    fn scan_ids_sorts_numerically() {
        let records = Records::new(Arc::new(MemoryStore::new()));
        for id in [10, 2, 1] {
            records.save(&notification(id)).unwrap();
        }

        assert_eq!(records.scan_ids::<Notification>().unwrap(), vec![1, 2, 10]);
        assert!(records.erase::<Notification>(2).unwrap());
        assert_eq!(records.scan_ids::<Notification>().unwrap(), vec![1, 10]);
    }
}
