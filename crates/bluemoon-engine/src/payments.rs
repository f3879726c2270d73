//! Payment lifecycle.
//!
//! A payment is created `Pending` with a freshly issued transaction reference, and the
//! reference is registered in a reverse lookup. The provider's webhook callback then drives
//! the payment through at most one `Pending → Confirmed` transition:
//!
//! ```text
//!            success              success / failed
//! Pending ───────────► Confirmed ─────────────────► Conflict
//!    │ ▲
//!    └─┘ failed (annotates provider fields only)
//! ```
//!
//! The pending check is check-then-set against a store without compare-and-set, so two
//! truly simultaneous duplicate callbacks can both pass it. Operators can override state
//! with [`PaymentLedger::patch`], which has no idempotency guard.

use std::collections::HashMap;
use std::sync::Arc;

use bluemoon_core::error::optional_text;
use bluemoon_core::{
    local_payment_date, ApartmentId, CallbackOutcome, EntityKind, Payment, PaymentId,
    PaymentState, ProviderFields, Resident, ResidentId, TransactionRef, ValidationError,
    WEBHOOK_VERIFICATION,
};
use bluemoon_store::{keys, KvStoreExt, Order, Page, SharedStore};
use chrono::{NaiveDate, Utc};
use serde::Serialize;

use crate::allocator::IdAllocator;
use crate::consistency::Consistency;
use crate::error::{EngineError, Result};
use crate::listing::Listings;
use crate::records::Records;
use crate::residents::Residents;

/// Input for creating a payment.
#[derive(Debug, Clone)]
pub struct NewPayment {
    /// Paying resident.
    pub resident_id: ResidentId,
    /// Amount; must be positive.
    pub amount: i64,
    /// What the payment is for.
    pub fee_type: Option<String>,
    /// How the resident pays.
    pub payment_form: Option<String>,
}

/// An operator override. Outer `None` leaves a field unchanged; for the nullable fields,
/// `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct PaymentPatch {
    /// New settlement state.
    pub state: Option<PaymentState>,
    /// New fee type.
    pub fee_type: Option<Option<String>>,
    /// New amount.
    pub amount: Option<i64>,
    /// New payment date; wins over the date implied by `state`.
    pub payment_date: Option<Option<NaiveDate>>,
}

/// A payment decorated for display with its payer.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentView {
    /// The payment.
    #[serde(flatten)]
    pub payment: Payment,
    /// Whether the payment is settled.
    pub is_paid: bool,
    /// `paid` or `unpaid`.
    pub status: &'static str,
    /// Payer's full name, if the resident still exists.
    pub resident_name: Option<String>,
    /// Payer's apartment, if the resident still exists.
    pub apartment_id: Option<ApartmentId>,
}

impl PaymentView {
    /// Decorate a payment with its (optional) payer.
    #[must_use]
    pub fn new(payment: Payment, payer: Option<&Resident>) -> Self {
        Self {
            is_paid: payment.is_paid(),
            status: payment.status_label(),
            resident_name: payer.map(|r| r.full_name.clone()),
            apartment_id: payer.map(|r| r.apartment_id.clone()),
            payment,
        }
    }
}

/// Payment creation, callbacks, overrides and listings.
#[derive(Clone)]
pub struct PaymentLedger {
    store: SharedStore,
    records: Records,
    listings: Listings,
    residents: Residents,
    allocator: Arc<dyn IdAllocator>,
}

impl PaymentLedger {
    /// Create the ledger.
    #[must_use]
    pub fn new(store: SharedStore, allocator: Arc<dyn IdAllocator>) -> Self {
        Self {
            records: Records::new(store.clone()),
            listings: Listings::new(store.clone()),
            residents: Residents::new(store.clone(), allocator.clone()),
            store,
            allocator,
        }
    }

    /// Create a pending payment and register its transaction reference.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a non-positive amount, `StoreUnavailable` if the identifier
    /// or the record cannot be written.
    pub fn create(&self, input: NewPayment) -> Result<Payment> {
        validate_amount(input.amount)?;

        let id = PaymentId::new(self.allocator.next(EntityKind::Payment)?);
        let payment = Payment::pending(
            id,
            input.resident_id,
            input.amount,
            optional_text(input.fee_type.as_deref()),
            optional_text(input.payment_form.as_deref()),
            Utc::now(),
        );

        self.records.save(&payment)?;

        let mut outcome = Consistency::clean();
        let txref = keys::txref_key(&payment.transaction_ref);
        outcome.check(txref.as_str(), self.store.set_id(&txref, id.get()));
        let score = payment.created_at.timestamp_millis();
        self.listings.add_tracked(
            &mut outcome,
            &keys::all_listing(EntityKind::Payment),
            id.get(),
            score,
        );
        self.listings.add_tracked(
            &mut outcome,
            &keys::payments_by_resident(payment.resident_id),
            id.get(),
            score,
        );
        outcome.finish("payment.create");

        tracing::info!(
            payment_id = %id,
            resident_id = %payment.resident_id,
            amount = payment.amount,
            transaction_ref = %payment.transaction_ref,
            "Payment created"
        );
        Ok(payment)
    }

    /// Apply a provider callback.
    ///
    /// A success confirms a pending payment exactly once. A failure only records the
    /// provider fields, so a later success is still accepted.
    ///
    /// # Errors
    ///
    /// - `Validation` if the reference is blank
    /// - `NotFound` if no payment was issued under the reference
    /// - `Conflict` if the payment is gone or no longer pending
    /// - `StoreUnavailable` if the store fails
    pub fn apply_callback(
        &self,
        reference: &TransactionRef,
        outcome: CallbackOutcome,
        fields: &ProviderFields,
    ) -> Result<Payment> {
        if reference.as_str().is_empty() {
            return Err(ValidationError::missing("transaction_ref").into());
        }

        let Some(payment_id) = self.store.get_id(&keys::txref_key(reference))? else {
            tracing::warn!(transaction_ref = %reference, "Callback for unknown transaction");
            return Err(EngineError::not_found("transaction", reference));
        };

        let mut payment = match self.records.load::<Payment>(payment_id)? {
            Some(payment) if payment.state == PaymentState::Pending => payment,
            Some(_) => {
                tracing::info!(
                    payment_id,
                    transaction_ref = %reference,
                    "Ignoring callback for settled payment"
                );
                return Err(EngineError::Conflict(format!(
                    "payment {payment_id} is already confirmed"
                )));
            }
            None => {
                return Err(EngineError::Conflict(format!(
                    "no pending payment for transaction {reference}"
                )));
            }
        };

        let now = Utc::now();
        payment.merge_provider_fields(fields);
        payment.verification_method = Some(WEBHOOK_VERIFICATION.to_string());
        payment.updated_at = now;
        if outcome == CallbackOutcome::Success {
            payment.state = PaymentState::Confirmed;
            payment.verified_at = Some(now);
        }

        self.records.save(&payment)?;

        tracing::info!(
            payment_id,
            transaction_ref = %reference,
            outcome = ?outcome,
            state = ?payment.state,
            "Payment callback applied"
        );
        Ok(payment)
    }

    /// Apply an operator override.
    ///
    /// Setting `Confirmed` stamps today's local date unless the payment already has one;
    /// setting `Pending` clears it. An explicit payment date in the same patch wins.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown payment, `Validation` for a non-positive amount,
    /// `StoreUnavailable` if the store fails.
    pub fn patch(&self, id: PaymentId, patch: PaymentPatch) -> Result<Payment> {
        if let Some(amount) = patch.amount {
            validate_amount(amount)?;
        }

        let mut payment: Payment = self.records.require(id.get())?;
        let now = Utc::now();

        if let Some(state) = patch.state {
            payment.state = state;
            payment.payment_date = match state {
                PaymentState::Confirmed => payment.payment_date.or(Some(local_payment_date(now))),
                PaymentState::Pending => None,
            };
        }
        if let Some(fee_type) = patch.fee_type {
            payment.fee_type = optional_text(fee_type.as_deref());
        }
        if let Some(amount) = patch.amount {
            payment.amount = amount;
        }
        if let Some(payment_date) = patch.payment_date {
            payment.payment_date = payment_date;
        }
        payment.updated_at = now;

        self.records.save(&payment)?;

        tracing::info!(payment_id = %id, state = ?payment.state, "Payment patched");
        Ok(payment)
    }

    /// Hard-delete a payment and clean every index that references it.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown payment, `StoreUnavailable` if the record cannot be
    /// deleted.
    pub fn delete(&self, id: PaymentId) -> Result<Payment> {
        let payment: Payment = self.records.require(id.get())?;
        self.records.erase::<Payment>(id.get())?;

        let mut outcome = Consistency::clean();
        self.listings.remove_tracked(
            &mut outcome,
            &keys::all_listing(EntityKind::Payment),
            id.get(),
        );
        self.listings.remove_tracked(
            &mut outcome,
            &keys::payments_by_resident(payment.resident_id),
            id.get(),
        );
        let txref = keys::txref_key(&payment.transaction_ref);
        outcome.check(txref.as_str(), self.store.delete(&txref));
        outcome.finish("payment.delete");

        tracing::info!(payment_id = %id, "Payment deleted");
        Ok(payment)
    }

    /// Load a payment.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown payment, `StoreUnavailable` if the store fails.
    pub fn get(&self, id: PaymentId) -> Result<Payment> {
        self.records.require(id.get())
    }

    /// The payment issued under `reference`, if any.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the store fails.
    pub fn find_by_reference(&self, reference: &TransactionRef) -> Result<Option<Payment>> {
        match self.store.get_id(&keys::txref_key(reference))? {
            Some(id) => self.records.load(id),
            None => Ok(None),
        }
    }

    /// Every payment, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the store fails.
    pub fn list_all(&self, page: Option<Page>) -> Result<Vec<Payment>> {
        let ids = self.listings.range(
            &keys::all_listing(EntityKind::Payment),
            Order::Descending,
            page,
        )?;
        self.records.load_many(ids)
    }

    /// A resident's payments, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the store fails.
    pub fn list_by_resident(&self, resident: ResidentId) -> Result<Vec<Payment>> {
        let ids = self.listings.range(
            &keys::payments_by_resident(resident),
            Order::Descending,
            None,
        )?;
        self.records.load_many(ids)
    }

    /// Payments of every resident of `apartment`, grouped by resident, each group newest
    /// first.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the store fails.
    pub fn list_by_apartment(&self, apartment: &ApartmentId) -> Result<Vec<PaymentView>> {
        let mut views = Vec::new();
        for resident in self.residents.residents_of(apartment)? {
            for payment in self.list_by_resident(resident.id)? {
                views.push(PaymentView::new(payment, Some(&resident)));
            }
        }
        Ok(views)
    }

    /// Decorate payments with their payers, loading each resident once.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the store fails.
    pub fn describe(&self, payments: Vec<Payment>) -> Result<Vec<PaymentView>> {
        let mut payers: HashMap<ResidentId, Option<Resident>> = HashMap::new();
        let mut views = Vec::with_capacity(payments.len());
        for payment in payments {
            let payer = match payers.get(&payment.resident_id) {
                Some(payer) => payer.clone(),
                None => {
                    let payer = self.residents.find(payment.resident_id)?;
                    payers.insert(payment.resident_id, payer.clone());
                    payer
                }
            };
            views.push(PaymentView::new(payment, payer.as_ref()));
        }
        Ok(views)
    }
}

fn validate_amount(amount: i64) -> Result<()> {
    if amount <= 0 {
        return Err(ValidationError::new("amount", "must be greater than zero").into());
    }
    Ok(())
}
