//! Logical key layout.
//!
//! Any replacement storage layer must preserve these names:
//!
//! | Key | Value |
//! |-----|-------|
//! | `<kind>:<id>` | primary record (CBOR) |
//! | `login-email:<email>`, `login-phone:<phone>` | resident id |
//! | `owner-by-apartment:<apartment>` | resident id |
//! | `payments-by-txref:<ref>` | payment id |
//! | `reset-token:<token>` | pending password reset (CBOR) |
//! | `seq:<kind>` | identifier counter |
//!
//! Listings: `all:<kind>`, `payments-by-resident:<id>`, `services-by-apartment:<id>`,
//! `forms-by-apartment:<id>`, `forms-by-service:<id>`.

use bluemoon_core::{ApartmentId, EntityKind, ResidentId, ServiceId, TransactionRef};

/// Prefix of the email login index.
pub const LOGIN_EMAIL_PREFIX: &str = "login-email:";

/// Prefix of the phone login index.
pub const LOGIN_PHONE_PREFIX: &str = "login-phone:";

/// Prefix of the household-head slot per apartment.
pub const OWNER_PREFIX: &str = "owner-by-apartment:";

/// Prefix of the transaction reference lookup.
pub const TXREF_PREFIX: &str = "payments-by-txref:";

/// Prefix of pending password reset tokens.
pub const RESET_TOKEN_PREFIX: &str = "reset-token:";

/// Prefix of the all-entities-of-a-kind listings.
pub const ALL_LISTING_PREFIX: &str = "all:";

/// Prefix of the per-resident payment listings.
pub const PAYMENTS_BY_RESIDENT_PREFIX: &str = "payments-by-resident:";

/// Prefix of the per-apartment service listings.
pub const SERVICES_BY_APARTMENT_PREFIX: &str = "services-by-apartment:";

/// Prefix of the per-apartment form listings.
pub const FORMS_BY_APARTMENT_PREFIX: &str = "forms-by-apartment:";

/// Prefix of the per-service form listings.
pub const FORMS_BY_SERVICE_PREFIX: &str = "forms-by-service:";

// ============================================================================
// Primary records
// ============================================================================

/// Primary key of a record.
///
/// Pattern: `{kind}:{id}`
#[must_use]
pub fn record_key(kind: EntityKind, id: u64) -> String {
    format!("{}:{id}", kind.as_str())
}

/// Prefix shared by every primary key of `kind`.
#[must_use]
pub fn record_prefix(kind: EntityKind) -> String {
    format!("{}:", kind.as_str())
}

/// Parse the identifier out of a primary key of `kind`.
///
/// Returns `None` if the key does not match the pattern.
#[must_use]
pub fn parse_record_key(kind: EntityKind, key: &str) -> Option<u64> {
    key.strip_prefix(kind.as_str())
        .and_then(|rest| rest.strip_prefix(':'))
        .and_then(|id| id.parse().ok())
}

/// Identifier counter of `kind`.
///
/// Pattern: `seq:{kind}`
#[must_use]
pub fn counter_key(kind: EntityKind) -> String {
    format!("seq:{}", kind.as_str())
}

// ============================================================================
// Lookup indexes
// ============================================================================

/// Email login index entry. The email is expected to be normalized already.
#[must_use]
pub fn login_email_key(email: &str) -> String {
    format!("{LOGIN_EMAIL_PREFIX}{email}")
}

/// Phone login index entry.
#[must_use]
pub fn login_phone_key(phone: &str) -> String {
    format!("{LOGIN_PHONE_PREFIX}{phone}")
}

/// Household-head slot of an apartment.
#[must_use]
pub fn owner_key(apartment: &ApartmentId) -> String {
    format!("{OWNER_PREFIX}{apartment}")
}

/// Reverse lookup from transaction reference to payment id.
#[must_use]
pub fn txref_key(reference: &TransactionRef) -> String {
    format!("{TXREF_PREFIX}{reference}")
}

/// Pending password reset stored under its token.
#[must_use]
pub fn reset_token_key(token: &str) -> String {
    format!("{RESET_TOKEN_PREFIX}{token}")
}

// ============================================================================
// Listings
// ============================================================================

/// Listing of every record of `kind`.
#[must_use]
pub fn all_listing(kind: EntityKind) -> String {
    format!("{ALL_LISTING_PREFIX}{}", kind.as_str())
}

/// A resident's payments, ordered by creation time.
#[must_use]
pub fn payments_by_resident(resident: ResidentId) -> String {
    format!("{PAYMENTS_BY_RESIDENT_PREFIX}{resident}")
}

/// An apartment's service requests, ordered by creation time.
#[must_use]
pub fn services_by_apartment(apartment: &ApartmentId) -> String {
    format!("{SERVICES_BY_APARTMENT_PREFIX}{apartment}")
}

/// An apartment's forms, ordered by creation time.
#[must_use]
pub fn forms_by_apartment(apartment: &ApartmentId) -> String {
    format!("{FORMS_BY_APARTMENT_PREFIX}{apartment}")
}

/// Forms filed against a service request, ordered by creation time.
#[must_use]
pub fn forms_by_service(service: ServiceId) -> String {
    format!("{FORMS_BY_SERVICE_PREFIX}{service}")
}
