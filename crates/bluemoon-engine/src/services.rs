//! Service requests.

use std::sync::Arc;

use bluemoon_core::error::{optional_text, require_text};
use bluemoon_core::{
    ApartmentId, EntityKind, Problem, Rating, ServiceId, ServiceRequest, ServiceStatus,
    ServiceType, ValidationError,
};
use bluemoon_store::{keys, Order, Page, SharedStore};
use chrono::Utc;

use crate::allocator::IdAllocator;
use crate::consistency::Consistency;
use crate::error::Result;
use crate::listing::Listings;
use crate::records::Records;

/// Input for a new service request.
#[derive(Debug, Clone, Default)]
pub struct NewServiceRequest {
    /// Requesting apartment (required).
    pub apartment_id: Option<String>,
    /// Request type (required).
    pub service_type: Option<ServiceType>,
    /// Request details (required).
    pub content: Option<String>,
    /// Initial status; defaults to recorded.
    pub status: Option<ServiceStatus>,
    /// Staff note.
    pub note: Option<String>,
    /// Problem category; defaults to no issue.
    pub problem: Option<Problem>,
    /// Rating; defaults to acceptable quality.
    pub rating: Option<Rating>,
    /// Handling script.
    pub scripts: Option<String>,
}

/// A partial update. For `note` and `scripts`, `Some(None)` clears the field.
#[derive(Debug, Clone, Default)]
pub struct ServiceChanges {
    /// New type; reassigns the handler.
    pub service_type: Option<ServiceType>,
    /// New details.
    pub content: Option<String>,
    /// New status; becoming handled restamps the handle date.
    pub status: Option<ServiceStatus>,
    /// New note.
    pub note: Option<Option<String>>,
    /// New problem category.
    pub problem: Option<Problem>,
    /// New rating.
    pub rating: Option<Rating>,
    /// New script.
    pub scripts: Option<Option<String>>,
}

/// Service request storage.
#[derive(Clone)]
pub struct ServiceRequests {
    records: Records,
    listings: Listings,
    allocator: Arc<dyn IdAllocator>,
}

impl ServiceRequests {
    /// Create the repository.
    #[must_use]
    pub fn new(store: SharedStore, allocator: Arc<dyn IdAllocator>) -> Self {
        Self {
            records: Records::new(store.clone()),
            listings: Listings::new(store),
            allocator,
        }
    }

    /// Record a new request, routed to the handler its type prescribes.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if apartment, type or content is missing, `StoreUnavailable` if
    /// the store fails.
    pub fn create(&self, input: NewServiceRequest) -> Result<ServiceRequest> {
        let apartment = ApartmentId::new(require_text(
            "apartment_id",
            input.apartment_id.as_deref(),
        )?);
        let service_type = input
            .service_type
            .ok_or_else(|| ValidationError::missing("service_type"))?;
        let content = require_text("content", input.content.as_deref())?;

        let id = ServiceId::new(self.allocator.next(EntityKind::Service)?);
        let now = Utc::now();
        let request = ServiceRequest {
            id,
            apartment_id: apartment,
            service_type,
            handler: service_type.handler(),
            content,
            status: input.status.unwrap_or_default(),
            handle_date: now,
            note: optional_text(input.note.as_deref()),
            problem: input.problem.unwrap_or_default(),
            rating: input.rating.unwrap_or_default(),
            scripts: optional_text(input.scripts.as_deref()),
            created_at: now,
            updated_at: now,
        };
        self.records.save(&request)?;

        let score = now.timestamp_millis();
        let mut outcome = Consistency::clean();
        self.listings.add_tracked(
            &mut outcome,
            &keys::all_listing(EntityKind::Service),
            id.get(),
            score,
        );
        self.listings.add_tracked(
            &mut outcome,
            &keys::services_by_apartment(&request.apartment_id),
            id.get(),
            score,
        );
        outcome.finish("service.create");

        tracing::info!(
            service_id = %id,
            apartment = %request.apartment_id,
            service_type = ?request.service_type,
            "Service request recorded"
        );
        Ok(request)
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown request, `Validation` for blank content,
    /// `StoreUnavailable` if the store fails.
    pub fn update(&self, id: ServiceId, changes: ServiceChanges) -> Result<ServiceRequest> {
        let content = changes
            .content
            .map(|v| require_text("content", Some(&v)))
            .transpose()?;

        let mut request: ServiceRequest = self.records.require(id.get())?;
        let now = Utc::now();

        if let Some(service_type) = changes.service_type {
            request.reclassify(service_type);
        }
        if let Some(content) = content {
            request.content = content;
        }
        if let Some(status) = changes.status {
            request.set_status(status, now);
        }
        if let Some(note) = changes.note {
            request.note = optional_text(note.as_deref());
        }
        if let Some(problem) = changes.problem {
            request.problem = problem;
        }
        if let Some(rating) = changes.rating {
            request.rating = rating;
        }
        if let Some(scripts) = changes.scripts {
            request.scripts = optional_text(scripts.as_deref());
        }
        request.updated_at = now;

        self.records.save(&request)?;
        tracing::info!(service_id = %id, status = ?request.status, "Service request updated");
        Ok(request)
    }

    /// Delete a request. Forms filed against it keep their (now dangling) reference.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown request, `StoreUnavailable` if the store fails.
    pub fn delete(&self, id: ServiceId) -> Result<ServiceRequest> {
        let request: ServiceRequest = self.records.require(id.get())?;
        self.records.erase::<ServiceRequest>(id.get())?;

        let mut outcome = Consistency::clean();
        self.listings.remove_tracked(
            &mut outcome,
            &keys::all_listing(EntityKind::Service),
            id.get(),
        );
        self.listings.remove_tracked(
            &mut outcome,
            &keys::services_by_apartment(&request.apartment_id),
            id.get(),
        );
        outcome.finish("service.delete");

        tracing::info!(service_id = %id, "Service request deleted");
        Ok(request)
    }

    /// Load a request.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown request, `StoreUnavailable` if the store fails.
    pub fn get(&self, id: ServiceId) -> Result<ServiceRequest> {
        self.records.require(id.get())
    }

    /// Every request, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the store fails.
    pub fn list(&self, page: Option<Page>) -> Result<Vec<ServiceRequest>> {
        let ids = self.listings.range(
            &keys::all_listing(EntityKind::Service),
            Order::Descending,
            page,
        )?;
        self.records.load_many(ids)
    }

    /// An apartment's requests, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the store fails.
    pub fn list_by_apartment(&self, apartment: &ApartmentId) -> Result<Vec<ServiceRequest>> {
        let ids = self.listings.range(
            &keys::services_by_apartment(apartment),
            Order::Descending,
            None,
        )?;
        self.records.load_many(ids)
    }
}

#[cfg(test)]
mod tests {
    use bluemoon_core::HandlingParty;

    use super::*;
    use crate::allocator::SequenceAllocator;
    use crate::error::EngineError;
    use crate::testing::memory_store;

    fn repository() -> ServiceRequests {
        ServiceRequests::new(memory_store(), Arc::new(SequenceAllocator::new()))
    }

    fn complaint(apartment: &str) -> NewServiceRequest {
        NewServiceRequest {
            apartment_id: Some(apartment.into()),
            service_type: Some(ServiceType::Complaint),
            content: Some("Noise after midnight".into()),
            ..NewServiceRequest::default()
        }
    }

    #[test]
    fn create_applies_defaults_and_handler() {
        let services = repository();
        let request = services.create(complaint("5")).unwrap();

        assert_eq!(request.id, ServiceId::new(1));
        assert_eq!(request.handler, HandlingParty::Police);
        assert_eq!(request.status, ServiceStatus::Recorded);
        assert_eq!(request.problem, Problem::NoIssue);
        assert_eq!(request.rating, Rating::AcceptableQuality);
        assert_eq!(request.handle_date, request.created_at);
    }

    #[test]
    fn create_requires_type() {
        let services = repository();
        let mut input = complaint("5");
        input.service_type = None;

        let err = services.create(input).unwrap_err();
        assert!(matches!(err, EngineError::Validation(ref m) if m.contains("service_type")));
    }

    #[test]
    fn update_reclassifies_and_handles() {
        let services = repository();
        let request = services.create(complaint("5")).unwrap();

        let updated = services
            .update(
                request.id,
                ServiceChanges {
                    service_type: Some(ServiceType::ApartmentService),
                    status: Some(ServiceStatus::Handled),
                    rating: Some(Rating::HighQuality),
                    note: Some(Some("fixed".into())),
                    ..ServiceChanges::default()
                },
            )
            .unwrap();

        assert_eq!(updated.handler, HandlingParty::ManagementBoard);
        assert_eq!(updated.status, ServiceStatus::Handled);
        assert!(updated.handle_date >= request.handle_date);
        assert_eq!(updated.rating, Rating::HighQuality);
        assert_eq!(updated.note.as_deref(), Some("fixed"));

        let cleared = services
            .update(
                request.id,
                ServiceChanges {
                    note: Some(None),
                    ..ServiceChanges::default()
                },
            )
            .unwrap();
        assert_eq!(cleared.note, None);
    }

    #[test]
    fn listings_by_apartment_and_delete() {
        let services = repository();
        let first = services.create(complaint("5")).unwrap();
        services.create(complaint("6")).unwrap();

        let in_five = services.list_by_apartment(&ApartmentId::new("5")).unwrap();
        assert_eq!(in_five, vec![first.clone()]);
        assert_eq!(services.list(None).unwrap().len(), 2);

        services.delete(first.id).unwrap();
        assert!(services
            .list_by_apartment(&ApartmentId::new("5"))
            .unwrap()
            .is_empty());
        assert_eq!(services.list(None).unwrap().len(), 1);
    }
}
