//! Common test utilities for bluemoon integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::{Arc, Mutex};

use axum::Router;
use axum_test::TestServer;
use serde_json::{json, Value};

use bluemoon_service::{create_router, ApiError, AppState, Argon2Hasher, Mailer, ServiceConfig};
use bluemoon_store::{MemoryStore, SharedStore};

pub const ADMIN_KEY: &str = "test-admin-key";
pub const PASSWORD: &str = "correct horse";

/// Keeps every reset mail instead of sending it.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingMailer {
    /// Recipients and links, oldest first.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    /// The token from the most recent link.
    pub fn last_token(&self) -> Option<String> {
        let sent = self.sent.lock().unwrap();
        let (_, link) = sent.last()?;
        link.split("token=").nth(1).map(ToString::to_string)
    }
}

impl Mailer for RecordingMailer {
    fn send_password_reset(&self, to: &str, link: &str) -> Result<(), ApiError> {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), link.to_string()));
        Ok(())
    }
}

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// The store behind the server, for inspecting or corrupting indexes.
    pub store: SharedStore,
    /// Reset mail the server tried to send.
    pub mailer: Arc<RecordingMailer>,
}

impl TestHarness {
    /// Create a new test harness over a fresh in-memory store.
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    /// Create a harness after adjusting the default test configuration.
    pub fn with_config(adjust: impl FnOnce(&mut ServiceConfig)) -> Self {
        let store: SharedStore = Arc::new(MemoryStore::new());

        let mut config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            jwt_secret: "test-jwt-secret".into(),
            admin_api_key: Some(ADMIN_KEY.into()),
            ..ServiceConfig::default()
        };
        adjust(&mut config);

        // Cheap Argon2 parameters keep the suites fast.
        let hasher = Argon2Hasher::with_cost(1024, 1).expect("valid argon2 params");
        let mailer = Arc::new(RecordingMailer::default());
        let state = AppState::with_hasher(store.clone(), config, Arc::new(hasher))
            .with_mailer(mailer.clone());
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            store,
            mailer,
        }
    }

    /// Register a resident and return the response body.
    pub async fn register(&self, body: Value) -> Value {
        let response = self.server.post("/residents").json(&body).await;
        response.assert_status(axum::http::StatusCode::CREATED);
        response.json()
    }

    /// Register a resident with sensible defaults for the fields not given.
    pub async fn register_resident(&self, apartment: &str, phone: &str, extra: Value) -> Value {
        let mut body = json!({
            "first_name": "Minh",
            "last_name": "Nguyen",
            "phone": phone,
            "apartment_id": apartment,
            "password": PASSWORD,
            "role": "resident",
        });
        if let (Some(base), Some(extra)) = (body.as_object_mut(), extra.as_object()) {
            for (key, value) in extra {
                base.insert(key.clone(), value.clone());
            }
        }
        self.register(body).await
    }

    /// Create a pending payment and return the response body.
    pub async fn create_payment(&self, resident_id: u64, amount: i64) -> Value {
        let response = self
            .server
            .post("/payments")
            .json(&json!({ "resident_id": resident_id, "amount": amount }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        response.json()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
