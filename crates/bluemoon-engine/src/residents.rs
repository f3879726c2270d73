//! Residents and their derived indexes.
//!
//! A resident record drives three lookup indexes: login-by-email, login-by-phone and the
//! per-apartment household-head slot. [`ResidentIndex::reindex`] applies the minimal set of
//! index writes for a change between two versions of a record. Every sub-step is
//! independent: a failure leaves the others valid and one entry stale, and the request
//! still succeeds.

use std::sync::Arc;

use bluemoon_core::error::{optional_text, require_text};
use bluemoon_core::resident::{full_name, normalize_email};
use bluemoon_core::{
    ApartmentId, EntityKind, PasswordReset, Resident, ResidentId, ResidentState, ValidationError,
};
use bluemoon_store::{keys, KvStoreExt, Order, SharedStore};
use chrono::{Duration, NaiveDate, Utc};

use crate::allocator::IdAllocator;
use crate::consistency::Consistency;
use crate::error::{EngineError, Result};
use crate::listing::Listings;
use crate::records::Records;

// ============================================================================
// Index manager
// ============================================================================

/// Maintains the login and household-head indexes.
#[derive(Clone)]
pub struct ResidentIndex {
    store: SharedStore,
}

impl ResidentIndex {
    /// Create an index manager over `store`.
    #[must_use]
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Bring the indexes in line with `new`, given the version it replaced.
    ///
    /// Pass `old = None` on registration. Applying the same pair twice is a no-op.
    pub fn reindex(&self, old: Option<&Resident>, new: &Resident) -> Consistency {
        let mut outcome = Consistency::clean();

        // Email
        let old_email = old.and_then(|r| r.email.as_deref());
        let new_email = new.email.as_deref();
        if let Some(previous) = old_email.filter(|previous| Some(*previous) != new_email) {
            self.release(&mut outcome, &keys::login_email_key(previous), new.id);
        }
        if let Some(current) = new_email {
            self.claim(&mut outcome, &keys::login_email_key(current), new.id);
        }

        // Phone
        let old_phone = old.and_then(login_phone);
        let new_phone = login_phone(new);
        if let Some(previous) = old_phone.filter(|previous| Some(*previous) != new_phone) {
            self.release(&mut outcome, &keys::login_phone_key(previous), new.id);
        }
        if let Some(current) = new_phone {
            self.claim(&mut outcome, &keys::login_phone_key(current), new.id);
        }

        // Household head
        if let Some(previous) = old.filter(|r| r.is_household_head()) {
            if !new.is_household_head() || previous.apartment_id != new.apartment_id {
                self.release(&mut outcome, &keys::owner_key(&previous.apartment_id), new.id);
            }
        }
        if new.is_household_head() {
            self.claim(&mut outcome, &keys::owner_key(&new.apartment_id), new.id);
        }

        outcome
    }

    /// Resolve a login name to a resident.
    ///
    /// Tries the lower-cased email, then the email exactly as typed, then the phone.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the store fails.
    pub fn resolve_login(&self, username: &str) -> Result<Option<ResidentId>> {
        let username = username.trim();
        if username.is_empty() {
            return Ok(None);
        }

        let mut candidates = Vec::with_capacity(3);
        if let Some(email) = normalize_email(username) {
            candidates.push(keys::login_email_key(&email));
        }
        candidates.push(keys::login_email_key(username));
        candidates.push(keys::login_phone_key(username));
        candidates.dedup();

        for key in candidates {
            if let Some(id) = self.store.get_id(&key)? {
                return Ok(Some(ResidentId::new(id)));
            }
        }
        Ok(None)
    }

    /// The resident holding an apartment's household-head slot.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the store fails.
    pub fn owner_of(&self, apartment: &ApartmentId) -> Result<Option<ResidentId>> {
        Ok(self
            .store
            .get_id(&keys::owner_key(apartment))?
            .map(ResidentId::new))
    }

    /// Point `key` at `id` (last write wins).
    fn claim(&self, outcome: &mut Consistency, key: &str, id: ResidentId) {
        outcome.check(key, self.store.set_id(key, id.get()));
    }

    /// Drop `key` if it still points at `id`. Another resident's later claim is left alone.
    fn release(&self, outcome: &mut Consistency, key: &str, id: ResidentId) {
        let result = self.store.get_id(key).and_then(|holder| {
            if holder == Some(id.get()) {
                self.store.delete(key).map(|_| ())
            } else {
                Ok(())
            }
        });
        outcome.check(key, result);
    }
}

/// The phone as used for login; blank phones are not indexed.
fn login_phone(resident: &Resident) -> Option<&str> {
    let phone = resident.phone.trim();
    (!phone.is_empty()).then_some(phone)
}

// ============================================================================
// Registry
// ============================================================================

/// Registration input. The password arrives already hashed.
#[derive(Debug, Clone, Default)]
pub struct NewResident {
    /// Given name (required).
    pub first_name: Option<String>,
    /// Family name (required).
    pub last_name: Option<String>,
    /// Phone (required).
    pub phone: Option<String>,
    /// Apartment (required).
    pub apartment_id: Option<String>,
    /// National identity card number.
    pub national_id: Option<String>,
    /// Date of birth.
    pub birth_date: Option<NaiveDate>,
    /// Role the account logs in as.
    pub role: Option<String>,
    /// Residency status.
    pub residency_status: Option<String>,
    /// Email; normalized before storage.
    pub email: Option<String>,
}

/// A partial profile update. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct ResidentChanges {
    /// New given name.
    pub first_name: Option<String>,
    /// New family name.
    pub last_name: Option<String>,
    /// New phone.
    pub phone: Option<String>,
    /// New apartment.
    pub apartment_id: Option<String>,
    /// New lifecycle state.
    pub state: Option<ResidentState>,
    /// New national identity card number.
    pub national_id: Option<String>,
    /// New date of birth.
    pub birth_date: Option<NaiveDate>,
    /// New role.
    pub role: Option<String>,
    /// New residency status.
    pub residency_status: Option<String>,
    /// New email; a blank value clears it.
    pub email: Option<String>,
    /// New password hash.
    pub password_hash: Option<String>,
}

/// Result of a soft delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deactivation {
    /// The resident was active and is now inactive.
    Deactivated,
    /// The resident was already inactive; nothing was written.
    AlreadyInactive,
}

/// Resident registration, updates and lookups.
#[derive(Clone)]
pub struct Residents {
    store: SharedStore,
    records: Records,
    listings: Listings,
    index: ResidentIndex,
    allocator: Arc<dyn IdAllocator>,
}

impl Residents {
    /// Create the registry.
    #[must_use]
    pub fn new(store: SharedStore, allocator: Arc<dyn IdAllocator>) -> Self {
        Self {
            records: Records::new(store.clone()),
            listings: Listings::new(store.clone()),
            index: ResidentIndex::new(store.clone()),
            store,
            allocator,
        }
    }

    /// The index manager used by this registry.
    #[must_use]
    pub fn index(&self) -> &ResidentIndex {
        &self.index
    }

    /// Register a resident.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if a required field is missing, `StoreUnavailable` if the
    /// identifier or the record cannot be written.
    pub fn register(&self, input: NewResident, password_hash: String) -> Result<Resident> {
        let first_name = require_text("first_name", input.first_name.as_deref())?;
        let last_name = require_text("last_name", input.last_name.as_deref())?;
        let phone = require_text("phone", input.phone.as_deref())?;
        let apartment_id = ApartmentId::new(require_text(
            "apartment_id",
            input.apartment_id.as_deref(),
        )?);

        let id = ResidentId::new(self.allocator.next(EntityKind::Resident)?);
        let now = Utc::now();
        let resident = Resident {
            id,
            full_name: full_name(&first_name, &last_name),
            first_name,
            last_name,
            phone,
            apartment_id,
            national_id: optional_text(input.national_id.as_deref()),
            birth_date: input.birth_date,
            role: optional_text(input.role.as_deref()),
            residency_status: optional_text(input.residency_status.as_deref()),
            email: input.email.as_deref().and_then(normalize_email),
            password_hash,
            state: ResidentState::Active,
            created_at: now,
            updated_at: now,
        };

        self.records.save(&resident)?;

        let mut outcome = Consistency::clean();
        let listing = keys::all_listing(EntityKind::Resident);
        self.listings
            .add_tracked(&mut outcome, &listing, id.get(), score_of(id));
        outcome.absorb(self.index.reindex(None, &resident));
        outcome.finish("resident.register");

        tracing::info!(resident_id = %id, apartment = %resident.apartment_id, "Resident registered");
        Ok(resident)
    }

    /// Apply a partial update and reindex.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown resident, `Validation` if a required field is set
    /// blank, `StoreUnavailable` if the record cannot be written.
    pub fn update(&self, id: ResidentId, changes: ResidentChanges) -> Result<Resident> {
        let old: Resident = self.records.require(id.get())?;
        let mut resident = old.clone();

        let first_name = changes
            .first_name
            .map(|v| require_text("first_name", Some(&v)))
            .transpose()?;
        let last_name = changes
            .last_name
            .map(|v| require_text("last_name", Some(&v)))
            .transpose()?;
        if first_name.is_some() || last_name.is_some() {
            resident.rename(first_name, last_name);
        }
        if let Some(phone) = changes.phone {
            resident.phone = require_text("phone", Some(&phone))?;
        }
        if let Some(apartment) = changes.apartment_id {
            resident.apartment_id = ApartmentId::new(require_text("apartment_id", Some(&apartment))?);
        }
        if let Some(state) = changes.state {
            resident.state = state;
        }
        if let Some(national_id) = changes.national_id {
            resident.national_id = optional_text(Some(&national_id));
        }
        if let Some(birth_date) = changes.birth_date {
            resident.birth_date = Some(birth_date);
        }
        if let Some(role) = changes.role {
            resident.role = optional_text(Some(&role));
        }
        if let Some(status) = changes.residency_status {
            resident.residency_status = optional_text(Some(&status));
        }
        if let Some(email) = changes.email {
            resident.email = normalize_email(&email);
        }
        if let Some(hash) = changes.password_hash {
            resident.password_hash = hash;
        }
        resident.updated_at = Utc::now();

        self.records.save(&resident)?;
        self.index
            .reindex(Some(&old), &resident)
            .finish("resident.update");

        tracing::info!(resident_id = %id, "Resident updated");
        Ok(resident)
    }

    /// Soft-delete a resident. Indexes are kept; login refuses inactive accounts.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown resident, `StoreUnavailable` if the store fails.
    pub fn deactivate(&self, id: ResidentId) -> Result<Deactivation> {
        let mut resident: Resident = self.records.require(id.get())?;
        if !resident.is_active() {
            return Ok(Deactivation::AlreadyInactive);
        }

        resident.state = ResidentState::Inactive;
        resident.updated_at = Utc::now();
        self.records.save(&resident)?;

        tracing::info!(resident_id = %id, "Resident deactivated");
        Ok(Deactivation::Deactivated)
    }

    /// Load a resident.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown resident, `StoreUnavailable` if the store fails.
    pub fn get(&self, id: ResidentId) -> Result<Resident> {
        self.records.require(id.get())
    }

    /// Load a resident if present.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the store fails.
    pub fn find(&self, id: ResidentId) -> Result<Option<Resident>> {
        self.records.load(id.get())
    }

    /// Every resident, by id ascending.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the store fails.
    pub fn list(&self) -> Result<Vec<Resident>> {
        let ids = self.listings.range(
            &keys::all_listing(EntityKind::Resident),
            Order::Ascending,
            None,
        )?;
        self.records.load_many(ids)
    }

    /// Residents living in `apartment`, by id ascending.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the store fails.
    pub fn residents_of(&self, apartment: &ApartmentId) -> Result<Vec<Resident>> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|r| &r.apartment_id == apartment)
            .collect())
    }

    /// Resolve a login name to the resident record it points at.
    ///
    /// The record must still carry the name: an entry left behind by a failed email or
    /// phone change resolves to nothing rather than to its former owner.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the store fails.
    pub fn find_by_login(&self, username: &str) -> Result<Option<Resident>> {
        let Some(id) = self.index.resolve_login(username)? else {
            return Ok(None);
        };
        let Some(resident) = self.find(id)? else {
            return Ok(None);
        };

        if answers_to(&resident, username) {
            Ok(Some(resident))
        } else {
            tracing::warn!(resident_id = %id, "Ignoring stale login entry");
            Ok(None)
        }
    }

    /// Store a one-time password reset `token` for the account registered under `email`.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a blank email or token, `NotFound` if no account uses the
    /// email, `StoreUnavailable` if the token cannot be written.
    pub fn issue_password_reset(
        &self,
        email: &str,
        token: &str,
        ttl: Duration,
    ) -> Result<(Resident, PasswordReset)> {
        let email = normalize_email(email).ok_or_else(|| ValidationError::missing("email"))?;
        let token = require_text("token", Some(token))?;

        let resident = self
            .find_by_login(&email)?
            .filter(|r| r.email.as_deref() == Some(email.as_str()))
            .ok_or_else(|| EngineError::not_found("resident", &email))?;

        let reset = PasswordReset {
            resident_id: resident.id,
            expires_at: Utc::now() + ttl,
        };
        self.store.put_record(&keys::reset_token_key(&token), &reset)?;

        tracing::info!(
            resident_id = %resident.id,
            expires_at = %reset.expires_at,
            "Password reset issued"
        );
        Ok((resident, reset))
    }

    /// Replace the password of the account a reset `token` was issued for.
    ///
    /// The token is deleted before the account is touched, so it works at most once.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for an unknown, used or expired token, `NotFound` if the
    /// account is gone, `StoreUnavailable` if the store fails.
    pub fn reset_password(&self, token: &str, password_hash: String) -> Result<Resident> {
        let token = require_text("token", Some(token))?;
        let key = keys::reset_token_key(&token);

        let reset: PasswordReset = self.store.get_record(&key)?.ok_or_else(invalid_token)?;
        if !self.store.delete(&key)? {
            return Err(invalid_token());
        }
        if reset.is_expired(Utc::now()) {
            tracing::info!(resident_id = %reset.resident_id, "Expired password reset token used");
            return Err(invalid_token());
        }

        let mut resident: Resident = self.records.require(reset.resident_id.get())?;
        resident.password_hash = password_hash;
        resident.updated_at = Utc::now();
        self.records.save(&resident)?;

        tracing::info!(resident_id = %resident.id, "Password reset completed");
        Ok(resident)
    }

    /// Full name of the apartment's household head, via the owner slot.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the store fails.
    pub fn owner_name(&self, apartment: &ApartmentId) -> Result<Option<String>> {
        match self.index.owner_of(apartment)? {
            Some(id) => Ok(self.find(id)?.map(|owner| owner.full_name)),
            None => Ok(None),
        }
    }
}

/// Whether `username` is still one of the resident's login names.
fn answers_to(resident: &Resident, username: &str) -> bool {
    let username = username.trim();
    let email_matches = resident.email.as_deref().is_some_and(|email| {
        email == username || normalize_email(username).as_deref() == Some(email)
    });
    email_matches || resident.phone.trim() == username
}

fn invalid_token() -> EngineError {
    ValidationError::new("token", "is invalid or expired").into()
}

/// Score of a resident in the global listing: its id.
#[allow(clippy::cast_possible_wrap)]
pub(crate) fn score_of(id: ResidentId) -> i64 {
    id.get() as i64
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bluemoon_store::KvStore;

    use super::*;
    use crate::allocator::StoreAllocator;
    use crate::testing::{memory_store, FaultyStore};

    fn registry(store: SharedStore) -> Residents {
        Residents::new(store.clone(), Arc::new(StoreAllocator::new(store)))
    }

    fn new_resident(first: &str, apartment: &str, email: Option<&str>, head: bool) -> NewResident {
        NewResident {
            first_name: Some(first.into()),
            last_name: Some("Nguyen".into()),
            phone: Some(format!("09{first}")),
            apartment_id: Some(apartment.into()),
            email: email.map(Into::into),
            residency_status: head.then(|| "Household Head".to_string()),
            role: Some("resident".into()),
            ..NewResident::default()
        }
    }

    fn indexed(store: &SharedStore, key: &str) -> Option<u64> {
        store.get_id(key).unwrap()
    }

    #[test]
    fn owner_slot_and_email_scenario() {
        let store = memory_store();
        let residents = registry(store.clone());

        let a = residents
            .register(new_resident("An", "5", Some("A@X.com"), true), "h".into())
            .unwrap();
        assert_eq!(a.email.as_deref(), Some("a@x.com"));
        assert_eq!(indexed(&store, "owner-by-apartment:5"), Some(a.id.get()));

        let b = residents
            .register(new_resident("Binh", "5", None, true), "h".into())
            .unwrap();
        assert_eq!(indexed(&store, "owner-by-apartment:5"), Some(b.id.get()));

        residents
            .update(
                a.id,
                ResidentChanges {
                    email: Some("a2@x.com".into()),
                    ..ResidentChanges::default()
                },
            )
            .unwrap();
        assert_eq!(indexed(&store, "login-email:a@x.com"), None);
        assert_eq!(indexed(&store, "login-email:a2@x.com"), Some(a.id.get()));
        assert_eq!(indexed(&store, "owner-by-apartment:5"), Some(b.id.get()));
    }

    #[test]
    fn stepping_down_releases_only_own_slot() {
        let store = memory_store();
        let residents = registry(store.clone());

        let a = residents
            .register(new_resident("An", "5", None, true), "h".into())
            .unwrap();
        let b = residents
            .register(new_resident("Binh", "5", None, true), "h".into())
            .unwrap();

        // A no longer heads the household, but B holds the slot now
        residents
            .update(
                a.id,
                ResidentChanges {
                    residency_status: Some("tenant".into()),
                    ..ResidentChanges::default()
                },
            )
            .unwrap();
        assert_eq!(indexed(&store, "owner-by-apartment:5"), Some(b.id.get()));

        // B moves out: slot of 5 is released and 7 is claimed
        residents
            .update(
                b.id,
                ResidentChanges {
                    apartment_id: Some("7".into()),
                    ..ResidentChanges::default()
                },
            )
            .unwrap();
        assert_eq!(indexed(&store, "owner-by-apartment:5"), None);
        assert_eq!(indexed(&store, "owner-by-apartment:7"), Some(b.id.get()));
    }

    #[test]
    fn phone_change_moves_login_entry() {
        let store = memory_store();
        let residents = registry(store.clone());
        let a = residents
            .register(new_resident("An", "5", None, false), "h".into())
            .unwrap();
        assert_eq!(indexed(&store, "login-phone:09An"), Some(a.id.get()));

        residents
            .update(
                a.id,
                ResidentChanges {
                    phone: Some("0911".into()),
                    ..ResidentChanges::default()
                },
            )
            .unwrap();
        assert_eq!(indexed(&store, "login-phone:09An"), None);
        assert_eq!(indexed(&store, "login-phone:0911"), Some(a.id.get()));
    }

    #[test]
    fn reindex_is_idempotent() {
        let store = memory_store();
        let residents = registry(store.clone());
        let a = residents
            .register(new_resident("An", "5", Some("a@x.com"), true), "h".into())
            .unwrap();

        let index = residents.index();
        assert!(index.reindex(Some(&a), &a).is_consistent());
        assert!(index.reindex(Some(&a), &a).is_consistent());

        assert_eq!(indexed(&store, "login-email:a@x.com"), Some(a.id.get()));
        assert_eq!(indexed(&store, "owner-by-apartment:5"), Some(a.id.get()));
    }

    #[test]
    fn resolve_login_order() {
        let store = memory_store();
        let residents = registry(store.clone());
        let a = residents
            .register(new_resident("An", "5", Some("a@x.com"), false), "h".into())
            .unwrap();

        let index = residents.index();
        assert_eq!(index.resolve_login(" A@X.COM ").unwrap(), Some(a.id));
        assert_eq!(index.resolve_login("09An").unwrap(), Some(a.id));
        assert_eq!(index.resolve_login("nobody").unwrap(), None);
        assert_eq!(index.resolve_login("   ").unwrap(), None);

        // An entry written by an older client under a mixed-case email still resolves
        store.set("login-email:Legacy@X.com", b"1").unwrap();
        assert_eq!(index.resolve_login("Legacy@X.com").unwrap(), Some(a.id));
    }

    #[test]
    fn index_failure_does_not_fail_update() {
        let faulty = FaultyStore::shared();
        let store: SharedStore = faulty.clone();
        let residents = registry(store.clone());
        let a = residents
            .register(new_resident("An", "5", Some("a@x.com"), true), "h".into())
            .unwrap();

        faulty.fail_writes_to("login-email:");
        let updated = residents
            .update(
                a.id,
                ResidentChanges {
                    email: Some("a2@x.com".into()),
                    apartment_id: Some("6".into()),
                    ..ResidentChanges::default()
                },
            )
            .unwrap();

        // Primary record and the other indexes moved on; email index is stale
        assert_eq!(residents.get(a.id).unwrap(), updated);
        assert_eq!(indexed(&store, "owner-by-apartment:6"), Some(a.id.get()));
        assert_eq!(indexed(&store, "login-email:a@x.com"), Some(a.id.get()));
        assert_eq!(indexed(&store, "login-email:a2@x.com"), None);

        let outcome = residents.index().reindex(Some(&a), &updated);
        assert_eq!(
            outcome.stale_keys(),
            ["login-email:a@x.com".to_string(), "login-email:a2@x.com".to_string()]
        );
    }

    #[test]
    fn stale_email_entry_does_not_log_in() {
        let faulty = FaultyStore::shared();
        let store: SharedStore = faulty.clone();
        let residents = registry(store.clone());
        let a = residents
            .register(new_resident("An", "5", Some("a@x.com"), false), "h".into())
            .unwrap();

        faulty.fail_writes_to("login-email:a@x.com");
        residents
            .update(
                a.id,
                ResidentChanges {
                    email: Some("a2@x.com".into()),
                    ..ResidentChanges::default()
                },
            )
            .unwrap();

        // The old entry survived the failed release but no longer names its holder
        assert_eq!(indexed(&store, "login-email:a@x.com"), Some(a.id.get()));
        assert_eq!(residents.find_by_login("a@x.com").unwrap(), None);

        let by_new_email = residents.find_by_login(" A2@x.com").unwrap().unwrap();
        assert_eq!(by_new_email.id, a.id);
        let by_phone = residents.find_by_login("09An").unwrap().unwrap();
        assert_eq!(by_phone.id, a.id);
    }

    #[test]
    fn password_reset_token_works_once() {
        let store = memory_store();
        let residents = registry(store.clone());
        let a = residents
            .register(new_resident("An", "5", Some("a@x.com"), false), "old".into())
            .unwrap();

        let (owner, reset) = residents
            .issue_password_reset(" A@X.com ", "tok-1", Duration::minutes(15))
            .unwrap();
        assert_eq!(owner.id, a.id);
        assert_eq!(reset.resident_id, a.id);

        let updated = residents.reset_password("tok-1", "new".into()).unwrap();
        assert_eq!(updated.password_hash, "new");
        assert_eq!(residents.get(a.id).unwrap().password_hash, "new");
        assert!(store.get("reset-token:tok-1").unwrap().is_none());

        let err = residents.reset_password("tok-1", "again".into()).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        assert_eq!(residents.get(a.id).unwrap().password_hash, "new");
    }

    #[test]
    fn expired_reset_token_is_refused_and_dropped() {
        let store = memory_store();
        let residents = registry(store.clone());
        let a = residents
            .register(new_resident("An", "5", Some("a@x.com"), false), "old".into())
            .unwrap();

        residents
            .issue_password_reset("a@x.com", "tok-2", Duration::zero())
            .unwrap();
        let err = residents.reset_password("tok-2", "new".into()).unwrap_err();

        assert!(matches!(err, EngineError::Validation(_)));
        assert_eq!(residents.get(a.id).unwrap().password_hash, "old");
        assert!(store.get("reset-token:tok-2").unwrap().is_none());
    }

    #[test]
    fn password_reset_requires_known_email() {
        let residents = registry(memory_store());
        residents
            .register(new_resident("An", "5", None, false), "h".into())
            .unwrap();

        let err = residents
            .issue_password_reset("nobody@x.com", "tok", Duration::minutes(15))
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));

        // A phone number is not an email
        let err = residents
            .issue_password_reset("09An", "tok", Duration::minutes(15))
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));
    }

    #[test]
    fn registration_requires_core_fields() {
        let residents = registry(memory_store());
        let mut input = new_resident("An", "5", None, false);
        input.phone = Some("  ".into());

        let err = residents.register(input, "h".into()).unwrap_err();
        assert!(err.to_string().contains("phone"));
    }

    #[test]
    fn deactivate_is_soft_and_repeatable() {
        let store = memory_store();
        let residents = registry(store.clone());
        let a = residents
            .register(new_resident("An", "5", Some("a@x.com"), false), "h".into())
            .unwrap();

        assert_eq!(residents.deactivate(a.id).unwrap(), Deactivation::Deactivated);
        assert_eq!(
            residents.deactivate(a.id).unwrap(),
            Deactivation::AlreadyInactive
        );
        assert!(!residents.get(a.id).unwrap().is_active());
        assert_eq!(indexed(&store, "login-email:a@x.com"), Some(a.id.get()));
    }

    #[test]
    fn listing_and_apartment_filter() {
        let residents = registry(memory_store());
        for (name, apt) in [("An", "5"), ("Binh", "6"), ("Chi", "5")] {
            residents
                .register(new_resident(name, apt, None, false), "h".into())
                .unwrap();
        }

        let all: Vec<String> = residents.list().unwrap().into_iter().map(|r| r.first_name).collect();
        assert_eq!(all, vec!["An", "Binh", "Chi"]);

        let in_five = residents.residents_of(&ApartmentId::new("5")).unwrap();
        assert_eq!(in_five.len(), 2);
    }

    #[test]
    fn full_name_follows_renames() {
        let residents = registry(memory_store());
        let a = residents
            .register(new_resident("An", "5", None, false), "h".into())
            .unwrap();
        assert_eq!(a.full_name, "An Nguyen");

        let renamed = residents
            .update(
                a.id,
                ResidentChanges {
                    last_name: Some(" Tran ".into()),
                    ..ResidentChanges::default()
                },
            )
            .unwrap();
        assert_eq!(renamed.full_name, "An Tran");
    }
}
