//! Value encoding.
//!
//! Primary records are stored as CBOR. Index entries (login, owner slot, transaction
//! reference) store the referenced identifier as a decimal string so they stay readable
//! from any client of the underlying store.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, StoreError};
use crate::KvStore;

/// Serialize a value using CBOR.
///
/// # Errors
///
/// Returns `StoreError::Serialization` if the value cannot be encoded.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    Ok(buf)
}

/// Deserialize a value from CBOR.
///
/// # Errors
///
/// Returns `StoreError::Serialization` if the bytes are not a valid encoding of `T`.
pub fn decode<T: DeserializeOwned>(data: &[u8]) -> Result<T> {
    ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn parse_id(key: &str, data: &[u8]) -> Result<u64> {
    std::str::from_utf8(data)
        .ok()
        .and_then(|text| text.trim().parse().ok())
        .ok_or_else(|| StoreError::Serialization(format!("index entry {key} is not an id")))
}

/// Typed access on top of the raw byte contract.
pub trait KvStoreExt {
    /// Read and decode a record.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails or the stored bytes do not decode.
    fn get_record<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>>;

    /// Encode and write a record.
    ///
    /// # Errors
    ///
    /// Returns an error if the value does not encode or the backend fails.
    fn put_record<T: Serialize>(&self, key: &str, value: &T) -> Result<()>;

    /// Read an index entry holding an identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails or the entry is not a decimal id.
    fn get_id(&self, key: &str) -> Result<Option<u64>>;

    /// Point an index entry at an identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn set_id(&self, key: &str, id: u64) -> Result<()>;
}

impl<S: KvStore + ?Sized> KvStoreExt for S {
    fn get_record<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.get(key)?.map(|data| decode(&data)).transpose()
    }

    fn put_record<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let value = encode(value)?;
        self.set(key, &value)
    }

    fn get_id(&self, key: &str) -> Result<Option<u64>> {
        self.get(key)?.map(|data| parse_id(key, &data)).transpose()
    }

    fn set_id(&self, key: &str, id: u64) -> Result<()> {
        self.set(key, id.to_string().as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use bluemoon_core::{ApartmentId, Notification, NotificationId};

    #[test]
    fn record_roundtrip_through_store() {
        let store = MemoryStore::new();
        let notification = Notification::new(
            NotificationId::new(1),
            ApartmentId::new("5"),
            "Water shut-off on Friday".into(),
            chrono::Utc::now(),
        );

        store.put_record("notification:1", &notification).unwrap();
        let loaded: Notification = store.get_record("notification:1").unwrap().unwrap();
        assert_eq!(loaded, notification);

        let missing: Option<Notification> = store.get_record("notification:2").unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn ids_are_stored_as_decimal_text() {
        let store = MemoryStore::new();
        store.set_id("login-email:a@x.com", 42).unwrap();

        assert_eq!(store.get("login-email:a@x.com").unwrap().unwrap(), b"42");
        assert_eq!(store.get_id("login-email:a@x.com").unwrap(), Some(42));
    }

    #[test]
    fn malformed_index_entry_is_a_serialization_error() {
        let store = MemoryStore::new();
        store.set("login-phone:0901", b"not-a-number").unwrap();

        let err = store.get_id("login-phone:0901").unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }

    #[test]
    fn garbage_record_fails_to_decode() {
        let store = MemoryStore::new();
        store.set("notification:9", &[0xff, 0x00]).unwrap();

        let result: Result<Option<Notification>> = store.get_record("notification:9");
        assert!(matches!(result, Err(StoreError::Serialization(_))));
    }
}
