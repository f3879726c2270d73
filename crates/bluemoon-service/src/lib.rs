//! Blue Moon HTTP API Service.
//!
//! This crate provides the HTTP API for the Blue Moon residence backend:
//!
//! - Resident registration, profile updates, login and password reset
//! - Payments and the payment provider callback
//! - Notifications, service requests and residence forms
//! - Index reconciliation for operators
//!
//! # Authentication
//!
//! 1. **Login tokens** - HS256 tokens issued by `POST /login`
//! 2. **Admin API key** - `x-admin-key` for operator endpoints
//! 3. **Callback signatures** - `x-callback-signature` on provider callbacks, when a secret
//!    is configured

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Handlers call the synchronous engine directly

pub mod auth;
pub mod config;
pub mod crypto;
pub mod error;
pub mod handlers;
pub mod mailer;
pub mod routes;
pub mod state;

pub use auth::{Argon2Hasher, CredentialHasher, TokenIssuer};
pub use config::{ServiceConfig, StoreBackend};
pub use error::ApiError;
pub use mailer::{LogMailer, Mailer};
pub use routes::create_router;
pub use state::{open_store, AppState};
