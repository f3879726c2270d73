//! Core types for the Blue Moon residence backend.
//!
//! This crate provides the record types persisted by the store and the identifiers
//! that link them together:
//!
//! - **Identifiers**: `ResidentId`, `PaymentId`, `NotificationId`, `ServiceId`, `FormId`,
//!   `ApartmentId`, `TransactionRef`, and the `EntityKind` they are allocated for
//! - **Residents**: `Resident`, `ResidentState`
//! - **Payments**: `Payment`, `PaymentState`, `CallbackOutcome`, `ProviderFields`, `Fee`
//! - **Notifications**: `Notification`
//! - **Service requests**: `ServiceRequest` and its closed classifications
//! - **Forms**: `Form`
//!
//! Every record is owned by its own primary key. Records only ever point at each other
//! through identifiers, never through embedded copies.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod form;
pub mod ids;
pub mod notification;
pub mod payment;
pub mod resident;
pub mod service;

pub use error::ValidationError;
pub use form::Form;
pub use ids::{
    ApartmentId, EntityKind, FormId, IdError, NotificationId, PaymentId, ResidentId, ServiceId,
    TransactionRef,
};
pub use notification::Notification;
pub use payment::{
    local_payment_date, standard_fees, CallbackOutcome, Fee, Payment, PaymentState,
    ProviderFields, WEBHOOK_VERIFICATION,
};
pub use resident::{PasswordReset, Resident, ResidentState, HOUSEHOLD_HEAD, HOUSEHOLD_HEAD_VI};
pub use service::{HandlingParty, Problem, Rating, ServiceRequest, ServiceStatus, ServiceType};
