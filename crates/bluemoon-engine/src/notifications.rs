//! Notifications.

use std::sync::Arc;

use bluemoon_core::error::require_text;
use bluemoon_core::{ApartmentId, EntityKind, Notification, NotificationId};
use bluemoon_store::{keys, Order, Page, SharedStore};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::allocator::IdAllocator;
use crate::consistency::Consistency;
use crate::error::Result;
use crate::listing::Listings;
use crate::records::Records;
use crate::residents::Residents;

/// Input for a new notification.
#[derive(Debug, Clone, Default)]
pub struct NewNotification {
    /// Recipient apartment (required).
    pub apartment_id: Option<String>,
    /// Message body (required).
    pub content: Option<String>,
}

/// A partial notification update. Blank apartment or content is rejected.
#[derive(Debug, Clone, Default)]
pub struct NotificationChanges {
    /// New recipient.
    pub apartment_id: Option<String>,
    /// New body.
    pub content: Option<String>,
    /// New displayed date; `Some(None)` clears it.
    pub notification_date: Option<Option<DateTime<Utc>>>,
    /// New sent date; `Some(None)` marks it unsent.
    pub sent_date: Option<Option<DateTime<Utc>>>,
}

/// A notification joined with the name of its apartment's household head.
#[derive(Debug, Clone, Serialize)]
pub struct AddressedNotification {
    /// The notification.
    #[serde(flatten)]
    pub notification: Notification,
    /// Full name of the recipient apartment's household head, if known.
    pub owner_name: Option<String>,
}

/// Notification storage.
#[derive(Clone)]
pub struct Notifications {
    records: Records,
    listings: Listings,
    residents: Residents,
    allocator: Arc<dyn IdAllocator>,
}

impl Notifications {
    /// Create the repository.
    #[must_use]
    pub fn new(store: SharedStore, allocator: Arc<dyn IdAllocator>) -> Self {
        Self {
            records: Records::new(store.clone()),
            listings: Listings::new(store.clone()),
            residents: Residents::new(store, allocator.clone()),
            allocator,
        }
    }

    /// Create a notification dated now.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if apartment or content is blank, `StoreUnavailable` if the
    /// store fails.
    pub fn create(&self, input: NewNotification) -> Result<Notification> {
        let apartment = ApartmentId::new(require_text(
            "apartment_id",
            input.apartment_id.as_deref(),
        )?);
        let content = require_text("content", input.content.as_deref())?;

        let id = NotificationId::new(self.allocator.next(EntityKind::Notification)?);
        let notification = Notification::new(id, apartment, content, Utc::now());
        self.records.save(&notification)?;

        let mut outcome = Consistency::clean();
        self.listings.add_tracked(
            &mut outcome,
            &keys::all_listing(EntityKind::Notification),
            id.get(),
            notification.created_at.timestamp_millis(),
        );
        outcome.finish("notification.create");

        tracing::info!(notification_id = %id, apartment = %notification.apartment_id, "Notification created");
        Ok(notification)
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown notification, `Validation` for a blank apartment
    /// or content, `StoreUnavailable` if the store fails.
    pub fn update(&self, id: NotificationId, changes: NotificationChanges) -> Result<Notification> {
        let apartment = changes
            .apartment_id
            .map(|v| require_text("apartment_id", Some(&v)).map(ApartmentId::new))
            .transpose()?;
        let content = changes
            .content
            .map(|v| require_text("content", Some(&v)))
            .transpose()?;

        let mut notification: Notification = self.records.require(id.get())?;
        if let Some(apartment) = apartment {
            notification.apartment_id = apartment;
        }
        if let Some(content) = content {
            notification.content = content;
        }
        if let Some(date) = changes.notification_date {
            notification.notification_date = date;
        }
        if let Some(sent) = changes.sent_date {
            notification.sent_date = sent;
        }

        self.records.save(&notification)?;
        tracing::debug!(notification_id = %id, "Notification updated");
        Ok(notification)
    }

    /// Stamp the sent date with the current time.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown notification, `StoreUnavailable` if the store fails.
    pub fn mark_sent(&self, id: NotificationId) -> Result<Notification> {
        let mut notification: Notification = self.records.require(id.get())?;
        notification.sent_date = Some(Utc::now());
        self.records.save(&notification)?;

        tracing::info!(notification_id = %id, "Notification marked as sent");
        Ok(notification)
    }

    /// Delete a notification.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown notification, `StoreUnavailable` if the store fails.
    pub fn delete(&self, id: NotificationId) -> Result<Notification> {
        let notification: Notification = self.records.require(id.get())?;
        self.records.erase::<Notification>(id.get())?;

        let mut outcome = Consistency::clean();
        self.listings.remove_tracked(
            &mut outcome,
            &keys::all_listing(EntityKind::Notification),
            id.get(),
        );
        outcome.finish("notification.delete");

        tracing::info!(notification_id = %id, "Notification deleted");
        Ok(notification)
    }

    /// Load a notification.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown notification, `StoreUnavailable` if the store fails.
    pub fn get(&self, id: NotificationId) -> Result<Notification> {
        self.records.require(id.get())
    }

    /// Every notification, newest first, with the recipient's household head.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the store fails.
    pub fn list(&self, page: Option<Page>) -> Result<Vec<AddressedNotification>> {
        let ids = self.listings.range(
            &keys::all_listing(EntityKind::Notification),
            Order::Descending,
            page,
        )?;

        self.records
            .load_many::<Notification>(ids)?
            .into_iter()
            .map(|notification| {
                let owner_name = self.residents.owner_name(&notification.apartment_id)?;
                Ok(AddressedNotification {
                    notification,
                    owner_name,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::StoreAllocator;
    use crate::error::EngineError;
    use crate::residents::NewResident;
    use crate::testing::memory_store;

    fn repositories() -> (Notifications, Residents) {
        let store = memory_store();
        let allocator: Arc<dyn IdAllocator> = Arc::new(StoreAllocator::new(store.clone()));
        (
            Notifications::new(store.clone(), allocator.clone()),
            Residents::new(store, allocator),
        )
    }

    fn notice(apartment: &str, content: &str) -> NewNotification {
        NewNotification {
            apartment_id: Some(apartment.into()),
            content: Some(content.into()),
        }
    }

    #[test]
    fn list_joins_owner_name() {
        let (notifications, residents) = repositories();
        residents
            .register(
                NewResident {
                    first_name: Some("Hoa".into()),
                    last_name: Some("Pham".into()),
                    phone: Some("0902".into()),
                    apartment_id: Some("5".into()),
                    residency_status: Some("household head".into()),
                    ..NewResident::default()
                },
                "h".into(),
            )
            .unwrap();

        notifications.create(notice("5", "Water off Friday")).unwrap();
        notifications.create(notice("6", "Parking fee due")).unwrap();

        let listed = notifications.list(None).unwrap();
        assert_eq!(listed.len(), 2);
        let for_five = listed
            .iter()
            .find(|n| n.notification.apartment_id.as_str() == "5")
            .unwrap();
        assert_eq!(for_five.owner_name.as_deref(), Some("Hoa Pham"));
        let for_six = listed
            .iter()
            .find(|n| n.notification.apartment_id.as_str() == "6")
            .unwrap();
        assert_eq!(for_six.owner_name, None);
    }

    #[test]
    fn update_rejects_blank_fields() {
        let (notifications, _) = repositories();
        let created = notifications.create(notice("5", "Hello")).unwrap();

        let err = notifications
            .update(
                created.id,
                NotificationChanges {
                    content: Some("   ".into()),
                    ..NotificationChanges::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));

        let updated = notifications
            .update(
                created.id,
                NotificationChanges {
                    apartment_id: Some(" 7 ".into()),
                    sent_date: Some(None),
                    ..NotificationChanges::default()
                },
            )
            .unwrap();
        assert_eq!(updated.apartment_id.as_str(), "7");
        assert_eq!(updated.content, "Hello");
    }

    #[test]
    fn send_and_delete() {
        let (notifications, _) = repositories();
        let created = notifications.create(notice("5", "Hello")).unwrap();
        assert!(!created.is_sent());

        assert!(notifications.mark_sent(created.id).unwrap().is_sent());

        notifications.delete(created.id).unwrap();
        assert!(notifications.list(None).unwrap().is_empty());
        assert!(matches!(
            notifications.get(created.id),
            Err(EngineError::NotFound { .. })
        ));
    }

    #[test]
    fn create_requires_content() {
        let (notifications, _) = repositories();
        let err = notifications
            .create(NewNotification {
                apartment_id: Some("5".into()),
                content: None,
            })
            .unwrap_err();
        assert!(err.to_string().contains("content"));
    }
}
