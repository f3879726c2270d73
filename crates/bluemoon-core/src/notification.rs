//! Notifications addressed to an apartment.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ApartmentId, NotificationId};

/// A notice from the management board to one apartment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Permanent identifier.
    pub id: NotificationId,
    /// Recipient apartment.
    pub apartment_id: ApartmentId,
    /// Message body.
    pub content: String,
    /// Date shown on the notice. Defaults to the creation time.
    pub notification_date: Option<DateTime<Utc>>,
    /// When the notice was marked as sent.
    pub sent_date: Option<DateTime<Utc>>,
    /// When the notice was created; orders the notification listing.
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Create an unsent notification dated `now`.
    #[must_use]
    pub fn new(
        id: NotificationId,
        apartment_id: ApartmentId,
        content: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            apartment_id,
            content,
            notification_date: Some(now),
            sent_date: None,
            created_at: now,
        }
    }

    /// Whether the notice has been sent.
    #[must_use]
    pub fn is_sent(&self) -> bool {
        self.sent_date.is_some()
    }
}
