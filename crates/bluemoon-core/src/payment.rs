//! Payment records and the vocabulary of provider callbacks.

use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{PaymentId, ResidentId, TransactionRef, ValidationError};

/// Verification method stamped on payments touched by a provider callback.
pub const WEBHOOK_VERIFICATION: &str = "webhook";

/// Offset of the building's local time zone (Asia/Ho_Chi_Minh, no daylight saving).
const LOCAL_UTC_OFFSET_HOURS: i64 = 7;

/// Settlement state of a payment.
///
/// Stored and exchanged as the integers `0` and `1`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum PaymentState {
    /// Awaiting settlement.
    #[default]
    Pending,
    /// Settled.
    Confirmed,
}

impl From<PaymentState> for u8 {
    fn from(state: PaymentState) -> Self {
        match state {
            PaymentState::Pending => 0,
            PaymentState::Confirmed => 1,
        }
    }
}

impl TryFrom<u8> for PaymentState {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Pending),
            1 => Ok(Self::Confirmed),
            other => Err(ValidationError::new(
                "state",
                format!("expected 0 or 1, got {other}"),
            )),
        }
    }
}

/// Outcome reported by the payment provider's callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallbackOutcome {
    /// The provider settled the transaction.
    Success,
    /// The provider reported a non-success. This only annotates the payment.
    Failed,
}

impl FromStr for CallbackOutcome {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            _ => Err(ValidationError::new(
                "status",
                format!("expected \"success\" or \"failed\", got {s:?}"),
            )),
        }
    }
}

/// Provider-side details carried by a callback.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderFields {
    /// The provider's own transaction id.
    pub provider_tx_id: Option<String>,
    /// Account the payer paid from.
    pub payer_account: Option<String>,
    /// Name of the payer.
    pub payer_name: Option<String>,
}

/// A fee payment made by a resident.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    /// Permanent identifier.
    pub id: PaymentId,

    /// The paying resident. A weak reference: the resident may be inactive.
    pub resident_id: ResidentId,

    /// Amount in Vietnamese dong.
    pub amount: i64,

    /// Settlement state.
    pub state: PaymentState,

    /// Idempotency token shared with the payment provider.
    pub transaction_ref: TransactionRef,

    /// What the payment is for (for example "management fee").
    pub fee_type: Option<String>,

    /// How the resident pays (for example "bank transfer").
    pub payment_form: Option<String>,

    /// Local calendar date the payment counts for.
    pub payment_date: Option<NaiveDate>,

    /// The provider's transaction id.
    pub provider_tx_id: Option<String>,

    /// Account the payer paid from.
    pub payer_account: Option<String>,

    /// Name of the payer.
    pub payer_name: Option<String>,

    /// How the payment was verified; see [`WEBHOOK_VERIFICATION`].
    pub verification_method: Option<String>,

    /// When a provider callback confirmed the payment.
    pub verified_at: Option<DateTime<Utc>>,

    /// When the payment was created.
    pub created_at: DateTime<Utc>,

    /// When the payment was last written.
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    /// Create a pending payment with its freshly issued transaction reference.
    #[must_use]
    pub fn pending(
        id: PaymentId,
        resident_id: ResidentId,
        amount: i64,
        fee_type: Option<String>,
        payment_form: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            resident_id,
            amount,
            state: PaymentState::Pending,
            transaction_ref: TransactionRef::issue(id, now),
            fee_type,
            payment_form,
            payment_date: None,
            provider_tx_id: None,
            payer_account: None,
            payer_name: None,
            verification_method: None,
            verified_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the payment has been settled.
    #[must_use]
    pub fn is_paid(&self) -> bool {
        self.state == PaymentState::Confirmed
    }

    /// Display label for the settlement state.
    #[must_use]
    pub fn status_label(&self) -> &'static str {
        if self.is_paid() {
            "paid"
        } else {
            "unpaid"
        }
    }

    /// Merge provider details into the payment.
    ///
    /// A field that is absent or blank in `fields` never clears a value recorded earlier.
    pub fn merge_provider_fields(&mut self, fields: &ProviderFields) {
        merge_field(&mut self.provider_tx_id, fields.provider_tx_id.as_deref());
        merge_field(&mut self.payer_account, fields.payer_account.as_deref());
        merge_field(&mut self.payer_name, fields.payer_name.as_deref());
    }
}

fn merge_field(slot: &mut Option<String>, incoming: Option<&str>) {
    if let Some(value) = incoming.map(str::trim).filter(|v| !v.is_empty()) {
        *slot = Some(value.to_string());
    }
}

/// The building-local calendar date of `now`.
#[must_use]
pub fn local_payment_date(now: DateTime<Utc>) -> NaiveDate {
    (now + Duration::hours(LOCAL_UTC_OFFSET_HOURS)).date_naive()
}

/// An entry in the standard fee catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fee {
    /// Catalogue id.
    pub id: u32,
    /// What the fee covers.
    pub description: &'static str,
    /// Amount in Vietnamese dong.
    pub amount: i64,
}

/// The standard monthly fees charged to every apartment.
#[must_use]
pub fn standard_fees() -> Vec<Fee> {
    vec![
        Fee {
            id: 1,
            description: "Monthly management fee",
            amount: 300_000,
        },
        Fee {
            id: 2,
            description: "Parking fee",
            amount: 100_000,
        },
    ]
}
