//! Derived-index consistency and payment lifecycle for the Blue Moon residence backend.
//!
//! The store behind this crate only offers single-key atomicity. Every operation here
//! writes the primary record first and then maintains the derived indexes best-effort:
//! an index failure is logged and reported as a [`Consistency`] outcome, never as a
//! request failure, and [`Reconciler`] rebuilds everything from the primary records.
//!
//! # Components
//!
//! - [`IdAllocator`]: per-kind identifier allocation
//! - [`ResidentIndex`] / [`Residents`]: login and household-head indexes, resident registry
//! - [`PaymentLedger`]: payment state machine driven by provider callbacks
//! - [`Listings`]: creation-ordered listings per parent
//! - [`Notifications`], [`ServiceRequests`], [`Forms`]: the remaining repositories
//! - [`Reconciler`]: index repair
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use bluemoon_core::{CallbackOutcome, ProviderFields, ResidentId};
//! use bluemoon_engine::{Engine, NewPayment};
//! use bluemoon_store::MemoryStore;
//!
//! let engine = Engine::new(Arc::new(MemoryStore::new()));
//! let payment = engine
//!     .payments()
//!     .create(NewPayment {
//!         resident_id: ResidentId::new(1),
//!         amount: 300_000,
//!         fee_type: None,
//!         payment_form: None,
//!     })
//!     .unwrap();
//!
//! let confirmed = engine
//!     .payments()
//!     .apply_callback(
//!         &payment.transaction_ref,
//!         CallbackOutcome::Success,
//!         &ProviderFields::default(),
//!     )
//!     .unwrap();
//! assert!(confirmed.is_paid());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod allocator;
pub mod consistency;
pub mod error;
pub mod forms;
pub mod listing;
pub mod notifications;
pub mod payments;
pub mod reconcile;
pub mod records;
pub mod residents;
pub mod services;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use bluemoon_store::SharedStore;

pub use allocator::{IdAllocator, SequenceAllocator, StoreAllocator};
pub use consistency::Consistency;
pub use error::{EngineError, Result};
pub use forms::{FormChanges, Forms, NewForm};
pub use listing::Listings;
pub use notifications::{AddressedNotification, NewNotification, NotificationChanges, Notifications};
pub use payments::{NewPayment, PaymentLedger, PaymentPatch, PaymentView};
pub use reconcile::{ReconcileReport, Reconciler};
pub use records::{Record, Records};
pub use residents::{Deactivation, NewResident, ResidentChanges, ResidentIndex, Residents};
pub use services::{NewServiceRequest, ServiceChanges, ServiceRequests};

/// Entry point bundling every component over one store and allocator.
#[derive(Clone)]
pub struct Engine {
    store: SharedStore,
    allocator: Arc<dyn IdAllocator>,
}

impl Engine {
    /// Create an engine that allocates identifiers from the store's counters.
    #[must_use]
    pub fn new(store: SharedStore) -> Self {
        let allocator = Arc::new(StoreAllocator::new(store.clone()));
        Self::with_allocator(store, allocator)
    }

    /// Create an engine with an explicit identifier source.
    #[must_use]
    pub fn with_allocator(store: SharedStore, allocator: Arc<dyn IdAllocator>) -> Self {
        Self { store, allocator }
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Resident registry.
    #[must_use]
    pub fn residents(&self) -> Residents {
        Residents::new(self.store.clone(), self.allocator.clone())
    }

    /// Payment ledger.
    #[must_use]
    pub fn payments(&self) -> PaymentLedger {
        PaymentLedger::new(self.store.clone(), self.allocator.clone())
    }

    /// Notification repository.
    #[must_use]
    pub fn notifications(&self) -> Notifications {
        Notifications::new(self.store.clone(), self.allocator.clone())
    }

    /// Service request repository.
    #[must_use]
    pub fn services(&self) -> ServiceRequests {
        ServiceRequests::new(self.store.clone(), self.allocator.clone())
    }

    /// Form repository.
    #[must_use]
    pub fn forms(&self) -> Forms {
        Forms::new(self.store.clone(), self.allocator.clone())
    }

    /// Index reconciler.
    #[must_use]
    pub fn reconciler(&self) -> Reconciler {
        Reconciler::new(self.store.clone())
    }
}
