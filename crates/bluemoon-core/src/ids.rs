//! Identifier types for Blue Moon records.
//!
//! Numeric identifiers are handed out by a per-kind counter and are never reused, so they
//! double as a creation-order key. The `numeric_id_type!` macro keeps the newtypes uniform.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The kinds of primary record kept in the store.
///
/// Each kind has its own identifier counter, its own primary key prefix, and its own
/// `all:<kind>` listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// A registered resident.
    Resident,
    /// A fee payment.
    Payment,
    /// A notification addressed to an apartment.
    Notification,
    /// A service request raised by an apartment.
    Service,
    /// A residence declaration form.
    Form,
}

impl EntityKind {
    /// Every entity kind, in allocation-table order.
    pub const ALL: [Self; 5] = [
        Self::Resident,
        Self::Payment,
        Self::Notification,
        Self::Service,
        Self::Form,
    ];

    /// The name used in store keys.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Resident => "resident",
            Self::Payment => "payment",
            Self::Notification => "notification",
            Self::Service => "service",
            Self::Form => "form",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Defines a counter-allocated numeric identifier with standard trait implementations.
///
/// The generated newtype wraps a `u64` and provides:
/// - `Clone`, `Copy`, `PartialEq`, `Eq`, `PartialOrd`, `Ord`, `Hash`
/// - transparent `Serialize` / `Deserialize`
/// - `FromStr`, `Display`, `Debug`
/// - `From<u64>` and `From<$name> for u64`
macro_rules! numeric_id_type {
    ($name:ident, $kind:expr, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// The entity kind this identifier is allocated for.
            pub const KIND: EntityKind = $kind;

            /// Wrap a raw counter value.
            #[must_use]
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            /// Return the raw counter value.
            #[must_use]
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim()
                    .parse::<u64>()
                    .map(Self)
                    .map_err(|_| IdError::InvalidNumber(s.to_string()))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

numeric_id_type!(
    ResidentId,
    EntityKind::Resident,
    "A resident identifier.\n\nAllocated in registration order and never renumbered, so it also orders the global resident listing."
);
numeric_id_type!(PaymentId, EntityKind::Payment, "A payment identifier.");
numeric_id_type!(
    NotificationId,
    EntityKind::Notification,
    "A notification identifier."
);
numeric_id_type!(ServiceId, EntityKind::Service, "A service request identifier.");
numeric_id_type!(FormId, EntityKind::Form, "A residence form identifier.");

/// An apartment identifier as entered by building staff (for example `"A-1203"`).
///
/// Apartments are not records of their own; the identifier only scopes listings and the
/// household-head slot.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApartmentId(String);

impl ApartmentId {
    /// Create an apartment identifier, trimming surrounding whitespace.
    #[must_use]
    pub fn new(value: impl AsRef<str>) -> Self {
        Self(value.as_ref().trim().to_string())
    }

    /// Return the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the identifier is empty after trimming.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for ApartmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApartmentId({})", self.0)
    }
}

impl fmt::Display for ApartmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ApartmentId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ApartmentId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// A payment's transaction reference.
///
/// The reference is the idempotency token shared with the payment provider: it is issued
/// once at creation, never changes, and a provider callback carrying it may settle the
/// payment at most once.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionRef(String);

impl TransactionRef {
    /// Issue the reference for a freshly allocated payment.
    ///
    /// The creation instant alone can collide under concurrent creates, so the allocated
    /// payment id is appended. Ids are never reused, which makes the reference unique.
    #[must_use]
    pub fn issue(payment_id: PaymentId, created_at: DateTime<Utc>) -> Self {
        Self(format!(
            "TRX_{}_{}",
            created_at.timestamp_millis(),
            payment_id.get()
        ))
    }

    /// Wrap a reference received from outside (for example in a provider callback).
    #[must_use]
    pub fn from_external(value: impl AsRef<str>) -> Self {
        Self(value.as_ref().trim().to_string())
    }

    /// Return the reference as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for TransactionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransactionRef({})", self.0)
    }
}

impl fmt::Display for TransactionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors that can occur when parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// The input is not a non-negative integer.
    #[error("invalid numeric identifier: {0:?}")]
    InvalidNumber(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn numeric_id_parses_and_displays() {
        let id: ResidentId = " 42 ".parse().unwrap();
        assert_eq!(id, ResidentId::new(42));
        assert_eq!(id.to_string(), "42");
        assert_eq!(format!("{id:?}"), "ResidentId(42)");
    }

    #[test]
    fn numeric_id_rejects_garbage() {
        assert_eq!(
            "abc".parse::<PaymentId>(),
            Err(IdError::InvalidNumber("abc".into()))
        );
        assert!("-1".parse::<FormId>().is_err());
    }

    #[test]
    fn numeric_id_serializes_as_plain_number() {
        let json = serde_json::to_string(&ServiceId::new(7)).unwrap();
        assert_eq!(json, "7");
        let parsed: ServiceId = serde_json::from_str("7").unwrap();
        assert_eq!(parsed, ServiceId::new(7));
    }

    #[test]
    fn ids_know_their_kind() {
        assert_eq!(ResidentId::KIND, EntityKind::Resident);
        assert_eq!(NotificationId::KIND.as_str(), "notification");
    }

    #[test]
    fn apartment_id_is_trimmed() {
        let apartment = ApartmentId::new("  A-1203 ");
        assert_eq!(apartment.as_str(), "A-1203");
        assert!(ApartmentId::new("   ").is_empty());
    }

    #[test]
    fn transaction_ref_embeds_time_and_id() {
        let at = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        let first = TransactionRef::issue(PaymentId::new(1), at);
        let second = TransactionRef::issue(PaymentId::new(2), at);

        assert_eq!(
            first.as_str(),
            format!("TRX_{}_1", at.timestamp_millis())
        );
        assert_ne!(first, second);
    }
}
