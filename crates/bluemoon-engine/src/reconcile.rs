//! Rebuilding derived indexes from primary records.
//!
//! Index writes are best-effort, so a crash or store hiccup between two writes can leave an
//! index stale. Reconciliation scans every primary record, computes what each index should
//! contain, and repairs the difference:
//!
//! - login and household-head entries keep their current holder when it is still valid,
//!   otherwise the highest resident id wins (the most recent registration)
//! - transaction references point at the payment that carries them
//! - listings contain exactly the live records of their parent, scored by creation time;
//!   a member present under the wrong score is moved back to its planned score
//! - identifier counters are raised to the highest stored id in a single write
//!
//! Running it twice in a row is a no-op the second time.

use std::collections::{BTreeMap, BTreeSet};

use bluemoon_core::{
    EntityKind, Form, Notification, Payment, Resident, ServiceRequest,
};
use bluemoon_store::{keys, KvStoreExt, Order, SharedStore, StoreError};
use serde::Serialize;

use crate::error::Result;
use crate::records::{Record, Records};
use crate::residents::score_of;

/// What a reconciliation pass found and fixed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Primary records scanned, per kind.
    pub records_scanned: BTreeMap<String, usize>,
    /// Lookup entries (login, owner, transaction reference) written or corrected.
    pub entries_repaired: usize,
    /// Lookup entries deleted because nothing supports them.
    pub entries_removed: usize,
    /// Listing members added because they were missing.
    pub listing_members_added: usize,
    /// Listing members present under the wrong score and moved back to their planned one.
    pub listing_members_rescored: usize,
    /// Listing members removed because their record is gone or moved.
    pub listing_members_removed: usize,
    /// Counters advanced past the highest stored identifier.
    pub counters_advanced: usize,
}

impl ReconcileReport {
    /// Whether the pass changed nothing.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.entries_repaired == 0
            && self.entries_removed == 0
            && self.listing_members_added == 0
            && self.listing_members_rescored == 0
            && self.listing_members_removed == 0
            && self.counters_advanced == 0
    }
}

/// Desired listing contents: listing name → member → score.
type ListingPlan = BTreeMap<String, BTreeMap<String, i64>>;

/// Rebuilds every derived index from the primary records.
#[derive(Clone)]
pub struct Reconciler {
    store: SharedStore,
    records: Records,
}

impl Reconciler {
    /// Create a reconciler over `store`.
    #[must_use]
    pub fn new(store: SharedStore) -> Self {
        Self {
            records: Records::new(store.clone()),
            store,
        }
    }

    /// Run a full pass.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the store fails; the pass can simply be rerun.
    pub fn rebuild(&self) -> Result<ReconcileReport> {
        let mut report = ReconcileReport::default();

        let residents: Vec<Resident> = self.scan(&mut report)?;
        let payments: Vec<Payment> = self.scan(&mut report)?;
        let notifications: Vec<Notification> = self.scan(&mut report)?;
        let services: Vec<ServiceRequest> = self.scan(&mut report)?;
        let forms: Vec<Form> = self.scan(&mut report)?;

        // Lookup entries
        let email_holders = group(residents.iter().filter_map(|r| {
            r.email
                .as_deref()
                .map(|email| (keys::login_email_key(email), r.id.get()))
        }));
        self.sync_lookup(keys::LOGIN_EMAIL_PREFIX, &email_holders, &mut report)?;

        let phone_holders = group(residents.iter().filter_map(|r| {
            let phone = r.phone.trim();
            (!phone.is_empty()).then(|| (keys::login_phone_key(phone), r.id.get()))
        }));
        self.sync_lookup(keys::LOGIN_PHONE_PREFIX, &phone_holders, &mut report)?;

        let owner_holders = group(
            residents
                .iter()
                .filter(|r| r.is_household_head())
                .map(|r| (keys::owner_key(&r.apartment_id), r.id.get())),
        );
        self.sync_lookup(keys::OWNER_PREFIX, &owner_holders, &mut report)?;

        let txref_holders = group(
            payments
                .iter()
                .map(|p| (keys::txref_key(&p.transaction_ref), p.id.get())),
        );
        self.sync_lookup(keys::TXREF_PREFIX, &txref_holders, &mut report)?;

        // Listings
        let mut plan = ListingPlan::new();
        for resident in &residents {
            plan_member(&mut plan, keys::all_listing(EntityKind::Resident), resident.id.get(), score_of(resident.id));
        }
        for payment in &payments {
            let score = payment.created_at.timestamp_millis();
            plan_member(&mut plan, keys::all_listing(EntityKind::Payment), payment.id.get(), score);
            plan_member(&mut plan, keys::payments_by_resident(payment.resident_id), payment.id.get(), score);
        }
        for notification in &notifications {
            let score = notification.created_at.timestamp_millis();
            plan_member(&mut plan, keys::all_listing(EntityKind::Notification), notification.id.get(), score);
        }
        for service in &services {
            let score = service.created_at.timestamp_millis();
            plan_member(&mut plan, keys::all_listing(EntityKind::Service), service.id.get(), score);
            plan_member(&mut plan, keys::services_by_apartment(&service.apartment_id), service.id.get(), score);
        }
        for form in &forms {
            let score = form.created_at.timestamp_millis();
            plan_member(&mut plan, keys::all_listing(EntityKind::Form), form.id.get(), score);
            plan_member(&mut plan, keys::forms_by_apartment(&form.apartment_id), form.id.get(), score);
            if let Some(service) = form.service_id {
                plan_member(&mut plan, keys::forms_by_service(service), form.id.get(), score);
            }
        }
        self.sync_listings(&plan, &mut report)?;

        // Counters
        self.advance_counter(&residents, &mut report)?;
        self.advance_counter(&payments, &mut report)?;
        self.advance_counter(&notifications, &mut report)?;
        self.advance_counter(&services, &mut report)?;
        self.advance_counter(&forms, &mut report)?;

        if report.is_clean() {
            tracing::info!("Reconciliation found every index consistent");
        } else {
            tracing::warn!(
                entries_repaired = report.entries_repaired,
                entries_removed = report.entries_removed,
                listing_members_added = report.listing_members_added,
                listing_members_rescored = report.listing_members_rescored,
                listing_members_removed = report.listing_members_removed,
                counters_advanced = report.counters_advanced,
                "Reconciliation repaired derived indexes"
            );
        }
        Ok(report)
    }

    fn scan<T: Record>(&self, report: &mut ReconcileReport) -> Result<Vec<T>> {
        let ids = self.records.scan_ids::<T>()?;
        let records: Vec<T> = self.records.load_many(ids)?;
        report
            .records_scanned
            .insert(T::KIND.as_str().to_string(), records.len());
        Ok(records)
    }

    /// Make every entry under `prefix` match `holders` (key → candidate ids).
    fn sync_lookup(
        &self,
        prefix: &str,
        holders: &BTreeMap<String, BTreeSet<u64>>,
        report: &mut ReconcileReport,
    ) -> Result<()> {
        for key in self.store.scan_keys(prefix)? {
            if !holders.contains_key(&key) {
                tracing::debug!(key = %key, "Removing unsupported index entry");
                self.store.delete(&key)?;
                report.entries_removed += 1;
            }
        }

        for (key, candidates) in holders {
            let current = self.current_id(key)?;
            if current.is_some_and(|id| candidates.contains(&id)) {
                continue;
            }
            let Some(&winner) = candidates.last() else {
                continue;
            };
            tracing::debug!(key = %key, ?current, winner, "Repairing index entry");
            self.store.set_id(key, winner)?;
            report.entries_repaired += 1;
        }
        Ok(())
    }

    /// Read an index entry, treating an undecodable value as absent.
    fn current_id(&self, key: &str) -> Result<Option<u64>> {
        match self.store.get_id(key) {
            Ok(id) => Ok(id),
            Err(StoreError::Serialization(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn sync_listings(&self, plan: &ListingPlan, report: &mut ReconcileReport) -> Result<()> {
        let prefixes = [
            keys::ALL_LISTING_PREFIX,
            keys::PAYMENTS_BY_RESIDENT_PREFIX,
            keys::SERVICES_BY_APARTMENT_PREFIX,
            keys::FORMS_BY_APARTMENT_PREFIX,
            keys::FORMS_BY_SERVICE_PREFIX,
        ];

        let mut existing = BTreeSet::new();
        for prefix in prefixes {
            existing.extend(self.store.scan_listings(prefix)?);
        }

        let empty = BTreeMap::new();
        for listing in &existing {
            let wanted = plan.get(listing).unwrap_or(&empty);
            for member in self.store.listing_range(listing, Order::Ascending, None)? {
                if !wanted.contains_key(&member) {
                    self.store.listing_remove(listing, &member)?;
                    report.listing_members_removed += 1;
                }
            }
        }

        for (listing, members) in plan {
            for (member, &score) in members {
                match self.store.listing_score(listing, member)? {
                    Some(current) if current == score => {}
                    Some(current) => {
                        tracing::debug!(
                            listing = %listing,
                            member = %member,
                            current,
                            score,
                            "Rescoring listing member"
                        );
                        self.store.listing_add(listing, score, member)?;
                        report.listing_members_rescored += 1;
                    }
                    None => {
                        self.store.listing_add(listing, score, member)?;
                        report.listing_members_added += 1;
                    }
                }
            }
        }
        Ok(())
    }

    fn advance_counter<T: Record>(
        &self,
        records: &[T],
        report: &mut ReconcileReport,
    ) -> Result<()> {
        let Some(highest) = records.iter().map(Record::record_id).max() else {
            return Ok(());
        };

        let key = keys::counter_key(T::KIND);
        let current = self.store.counter(&key)?;
        if current >= highest {
            return Ok(());
        }

        tracing::warn!(kind = %T::KIND, current, highest, "Identifier counter behind stored records");
        self.store.raise_counter(&key, highest)?;
        report.counters_advanced += 1;
        Ok(())
    }
}

fn group(pairs: impl Iterator<Item = (String, u64)>) -> BTreeMap<String, BTreeSet<u64>> {
    let mut groups: BTreeMap<String, BTreeSet<u64>> = BTreeMap::new();
    for (key, id) in pairs {
        groups.entry(key).or_default().insert(id);
    }
    groups
}

fn plan_member(plan: &mut ListingPlan, listing: String, member: u64, score: i64) {
    plan.entry(listing)
        .or_default()
        .insert(member.to_string(), score);
}
