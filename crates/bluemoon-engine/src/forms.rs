//! Residence forms.
//!
//! A form sits in three listings: all forms, its apartment's forms, and (when filed against
//! one) its service request's forms. Changing the apartment or service re-parents it.

use std::sync::Arc;

use bluemoon_core::error::{optional_text, require_text};
use bluemoon_core::{ApartmentId, EntityKind, Form, FormId, ServiceId};
use bluemoon_store::{keys, Order, Page, SharedStore};
use chrono::{NaiveDate, Utc};

use crate::allocator::IdAllocator;
use crate::consistency::Consistency;
use crate::error::Result;
use crate::listing::Listings;
use crate::records::Records;

/// Input for a new form.
#[derive(Debug, Clone, Default)]
pub struct NewForm {
    /// Declared person (required).
    pub full_name: Option<String>,
    /// Apartment (required).
    pub apartment_id: Option<String>,
    /// National identity card number.
    pub national_id: Option<String>,
    /// Date of birth.
    pub date_of_birth: Option<NaiveDate>,
    /// First day of the stay.
    pub start_date: Option<NaiveDate>,
    /// Last day of the stay.
    pub end_date: Option<NaiveDate>,
    /// Free-text note.
    pub note: Option<String>,
    /// Service request the form belongs to.
    pub service_id: Option<ServiceId>,
}

/// A partial update. For the nullable fields, `Some(None)` clears the value.
#[derive(Debug, Clone, Default)]
pub struct FormChanges {
    /// New declared person.
    pub full_name: Option<String>,
    /// New apartment; moves the form between apartment listings.
    pub apartment_id: Option<String>,
    /// New national id.
    pub national_id: Option<Option<String>>,
    /// New date of birth.
    pub date_of_birth: Option<Option<NaiveDate>>,
    /// New start date.
    pub start_date: Option<Option<NaiveDate>>,
    /// New end date.
    pub end_date: Option<Option<NaiveDate>>,
    /// New note.
    pub note: Option<Option<String>>,
    /// New service request; moves the form between service listings.
    pub service_id: Option<Option<ServiceId>>,
}

/// Form storage.
#[derive(Clone)]
pub struct Forms {
    records: Records,
    listings: Listings,
    allocator: Arc<dyn IdAllocator>,
}

impl Forms {
    /// Create the repository.
    #[must_use]
    pub fn new(store: SharedStore, allocator: Arc<dyn IdAllocator>) -> Self {
        Self {
            records: Records::new(store.clone()),
            listings: Listings::new(store),
            allocator,
        }
    }

    /// File a form.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the name or apartment is blank, `StoreUnavailable` if the
    /// store fails.
    pub fn create(&self, input: NewForm) -> Result<Form> {
        let full_name = require_text("full_name", input.full_name.as_deref())?;
        let apartment = ApartmentId::new(require_text(
            "apartment_id",
            input.apartment_id.as_deref(),
        )?);

        let id = FormId::new(self.allocator.next(EntityKind::Form)?);
        let now = Utc::now();
        let form = Form {
            id,
            full_name,
            apartment_id: apartment,
            national_id: optional_text(input.national_id.as_deref()),
            date_of_birth: input.date_of_birth,
            start_date: input.start_date,
            end_date: input.end_date,
            note: optional_text(input.note.as_deref()),
            service_id: input.service_id,
            created_at: now,
            updated_at: now,
        };
        self.records.save(&form)?;

        let score = form.created_at.timestamp_millis();
        let mut outcome = Consistency::clean();
        self.listings.add_tracked(
            &mut outcome,
            &keys::all_listing(EntityKind::Form),
            id.get(),
            score,
        );
        self.listings.add_tracked(
            &mut outcome,
            &keys::forms_by_apartment(&form.apartment_id),
            id.get(),
            score,
        );
        if let Some(service) = form.service_id {
            self.listings.add_tracked(
                &mut outcome,
                &keys::forms_by_service(service),
                id.get(),
                score,
            );
        }
        outcome.finish("form.create");

        tracing::info!(form_id = %id, apartment = %form.apartment_id, "Form filed");
        Ok(form)
    }

    /// Apply a partial update, re-parenting the form if its apartment or service changed.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown form, `Validation` for a blank name or apartment,
    /// `StoreUnavailable` if the store fails.
    pub fn update(&self, id: FormId, changes: FormChanges) -> Result<Form> {
        let full_name = changes
            .full_name
            .map(|v| require_text("full_name", Some(&v)))
            .transpose()?;
        let apartment = changes
            .apartment_id
            .map(|v| require_text("apartment_id", Some(&v)).map(ApartmentId::new))
            .transpose()?;

        let old: Form = self.records.require(id.get())?;
        let mut form = old.clone();

        if let Some(full_name) = full_name {
            form.full_name = full_name;
        }
        if let Some(apartment) = apartment {
            form.apartment_id = apartment;
        }
        if let Some(national_id) = changes.national_id {
            form.national_id = optional_text(national_id.as_deref());
        }
        if let Some(date_of_birth) = changes.date_of_birth {
            form.date_of_birth = date_of_birth;
        }
        if let Some(start_date) = changes.start_date {
            form.start_date = start_date;
        }
        if let Some(end_date) = changes.end_date {
            form.end_date = end_date;
        }
        if let Some(note) = changes.note {
            form.note = optional_text(note.as_deref());
        }
        if let Some(service_id) = changes.service_id {
            form.service_id = service_id;
        }
        form.updated_at = Utc::now();

        self.records.save(&form)?;

        let score = form.created_at.timestamp_millis();
        let mut outcome = Consistency::clean();
        if old.apartment_id != form.apartment_id {
            outcome.absorb(self.listings.relocate(
                &keys::forms_by_apartment(&old.apartment_id),
                &keys::forms_by_apartment(&form.apartment_id),
                id.get(),
                score,
            ));
        }
        if old.service_id != form.service_id {
            if let Some(previous) = old.service_id {
                self.listings
                    .remove_tracked(&mut outcome, &keys::forms_by_service(previous), id.get());
            }
            if let Some(current) = form.service_id {
                self.listings.add_tracked(
                    &mut outcome,
                    &keys::forms_by_service(current),
                    id.get(),
                    score,
                );
            }
        }
        outcome.finish("form.update");

        tracing::info!(form_id = %id, "Form updated");
        Ok(form)
    }

    /// Delete a form and remove it from every listing.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown form, `StoreUnavailable` if the store fails.
    pub fn delete(&self, id: FormId) -> Result<Form> {
        let form: Form = self.records.require(id.get())?;
        self.records.erase::<Form>(id.get())?;

        let mut outcome = Consistency::clean();
        self.listings
            .remove_tracked(&mut outcome, &keys::all_listing(EntityKind::Form), id.get());
        self.listings.remove_tracked(
            &mut outcome,
            &keys::forms_by_apartment(&form.apartment_id),
            id.get(),
        );
        if let Some(service) = form.service_id {
            self.listings
                .remove_tracked(&mut outcome, &keys::forms_by_service(service), id.get());
        }
        outcome.finish("form.delete");

        tracing::info!(form_id = %id, "Form deleted");
        Ok(form)
    }

    /// Load a form.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown form, `StoreUnavailable` if the store fails.
    pub fn get(&self, id: FormId) -> Result<Form> {
        self.records.require(id.get())
    }

    /// Every form, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the store fails.
    pub fn list(&self, page: Option<Page>) -> Result<Vec<Form>> {
        self.list_from(&keys::all_listing(EntityKind::Form), page)
    }

    /// An apartment's forms, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the store fails.
    pub fn list_by_apartment(&self, apartment: &ApartmentId) -> Result<Vec<Form>> {
        self.list_from(&keys::forms_by_apartment(apartment), None)
    }

    /// Forms filed against a service request, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the store fails.
    pub fn list_by_service(&self, service: ServiceId) -> Result<Vec<Form>> {
        self.list_from(&keys::forms_by_service(service), None)
    }

    fn list_from(&self, listing: &str, page: Option<Page>) -> Result<Vec<Form>> {
        let ids = self.listings.range(listing, Order::Descending, page)?;
        self.records.load_many(ids)
    }
}
