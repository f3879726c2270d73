//! Resident records.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{ApartmentId, ResidentId};

/// The residency status that claims an apartment's household-head slot.
///
/// Compared case-insensitively.
pub const HOUSEHOLD_HEAD: &str = "household head";

/// Vietnamese spelling of [`HOUSEHOLD_HEAD`], as stored by earlier clients.
pub const HOUSEHOLD_HEAD_VI: &str = "chủ hộ";

/// A household-head status compared in its accepted spellings.
fn is_household_head_status(status: &str) -> bool {
    let status = status.trim().to_lowercase();
    status == HOUSEHOLD_HEAD || status == HOUSEHOLD_HEAD_VI
}

/// Lifecycle state of a resident account.
///
/// Residents are never physically deleted; removal is a soft delete to `Inactive`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResidentState {
    /// The account may log in.
    #[default]
    Active,
    /// The account was soft-deleted or locked.
    Inactive,
}

/// A registered resident.
///
/// The record is the source of truth for the login indexes (email, phone) and for the
/// apartment's household-head slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resident {
    /// Permanent identifier.
    pub id: ResidentId,

    /// Given name.
    pub first_name: String,

    /// Family name.
    pub last_name: String,

    /// Derived from the trimmed first and last names.
    pub full_name: String,

    /// Phone number, also usable as a login name.
    pub phone: String,

    /// The apartment the resident lives in.
    pub apartment_id: ApartmentId,

    /// National identity card number.
    pub national_id: Option<String>,

    /// Date of birth.
    pub birth_date: Option<NaiveDate>,

    /// Application role the account logs in as.
    pub role: Option<String>,

    /// Free-text residency status; see [`HOUSEHOLD_HEAD`].
    pub residency_status: Option<String>,

    /// Lower-cased email, also usable as a login name.
    pub email: Option<String>,

    /// Opaque hashed credential.
    pub password_hash: String,

    /// Lifecycle state.
    pub state: ResidentState,

    /// When the resident registered.
    pub created_at: DateTime<Utc>,

    /// When the record was last written.
    pub updated_at: DateTime<Utc>,
}

impl Resident {
    /// Whether this resident claims the household-head slot of their apartment.
    #[must_use]
    pub fn is_household_head(&self) -> bool {
        self.residency_status
            .as_deref()
            .is_some_and(is_household_head_status)
    }

    /// Whether the account may log in.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == ResidentState::Active
    }

    /// Replace the names and recompute the full name.
    pub fn rename(&mut self, first_name: Option<String>, last_name: Option<String>) {
        if let Some(first) = first_name {
            self.first_name = first;
        }
        if let Some(last) = last_name {
            self.last_name = last;
        }
        self.full_name = full_name(&self.first_name, &self.last_name);
    }
}

/// A pending password reset, stored under its one-time token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordReset {
    /// The account whose password the token may replace.
    pub resident_id: ResidentId,
    /// The token stops working at this instant.
    pub expires_at: DateTime<Utc>,
}

impl PasswordReset {
    /// Whether the token is no longer usable at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Join first and last name the way they are displayed.
#[must_use]
pub fn full_name(first_name: &str, last_name: &str) -> String {
    format!("{} {}", first_name.trim(), last_name.trim())
}

/// Normalize an email for storage and lookup: trimmed, lower-cased, blank becomes `None`.
#[must_use]
pub fn normalize_email(email: &str) -> Option<String> {
    let trimmed = email.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_lowercase())
}
