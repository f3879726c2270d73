//! Application state.

use std::sync::Arc;

use bluemoon_engine::Engine;
use bluemoon_store::{MemoryStore, SharedStore, StoreError};

use crate::auth::{Argon2Hasher, CredentialHasher, TokenIssuer};
use crate::config::{ServiceConfig, StoreBackend};
use crate::mailer::{LogMailer, Mailer};

/// Open the configured store backend.
///
/// # Errors
///
/// Returns `Database` if `RocksDB` cannot be opened or the binary was built without it.
pub fn open_store(config: &ServiceConfig) -> Result<SharedStore, StoreError> {
    match config.store_backend {
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store - data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        #[cfg(feature = "rocksdb-backend")]
        StoreBackend::RocksDb => {
            tracing::info!(path = %config.data_dir, "Opening RocksDB store");
            Ok(Arc::new(bluemoon_store::RocksStore::open(&config.data_dir)?))
        }
        #[cfg(not(feature = "rocksdb-backend"))]
        StoreBackend::RocksDb => Err(StoreError::Database(
            "rocksdb backend requested but the service was built without `rocksdb-backend`"
                .into(),
        )),
    }
}

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Repositories and the payment ledger over the store.
    pub engine: Engine,

    /// Service configuration.
    pub config: ServiceConfig,

    /// Password hashing.
    pub hasher: Arc<dyn CredentialHasher>,

    /// Login token signing.
    pub tokens: TokenIssuer,

    /// Account mail.
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    /// Create the state with Argon2id password hashing.
    #[must_use]
    pub fn new(store: SharedStore, config: ServiceConfig) -> Self {
        Self::with_hasher(store, config, Arc::new(Argon2Hasher::default()))
    }

    /// Create the state with an explicit password hasher.
    #[must_use]
    pub fn with_hasher(
        store: SharedStore,
        config: ServiceConfig,
        hasher: Arc<dyn CredentialHasher>,
    ) -> Self {
        if config.uses_default_jwt_secret() {
            tracing::warn!("JWT_SECRET not configured - login tokens use the development key");
        }
        if config.admin_api_key.is_none() {
            tracing::warn!("ADMIN_API_KEY not configured - admin endpoints are disabled");
        }
        if config.callback_secret.is_none() {
            tracing::warn!("CALLBACK_SECRET not configured - payment callbacks are not verified");
        }

        let tokens = TokenIssuer::new(&config.jwt_secret, config.jwt_ttl_hours);
        Self {
            engine: Engine::new(store),
            config,
            hasher,
            tokens,
            mailer: Arc::new(LogMailer),
        }
    }

    /// Replace the mailer.
    #[must_use]
    pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.mailer = mailer;
        self
    }
}
