//! Store backend selection tests.

use bluemoon_service::{open_store, ServiceConfig, StoreBackend};
use bluemoon_store::KvStore;

#[test]
fn memory_backend_opens() {
    let store = open_store(&ServiceConfig::default()).unwrap();

    store.set("ping", b"1").unwrap();
    assert_eq!(store.get("ping").unwrap().as_deref(), Some(&b"1"[..]));
}

#[cfg(not(feature = "rocksdb-backend"))]
#[test]
fn rocksdb_backend_requires_feature() {
    let config = ServiceConfig {
        store_backend: StoreBackend::RocksDb,
        ..ServiceConfig::default()
    };

    assert!(open_store(&config).is_err());
}

#[cfg(feature = "rocksdb-backend")]
#[test]
fn rocksdb_backend_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = ServiceConfig {
        store_backend: StoreBackend::RocksDb,
        data_dir: dir.path().to_string_lossy().into_owned(),
        ..ServiceConfig::default()
    };

    {
        let store = open_store(&config).unwrap();
        store.set("ping", b"1").unwrap();
    }

    let store = open_store(&config).unwrap();
    assert_eq!(store.get("ping").unwrap().as_deref(), Some(&b"1"[..]));
}
