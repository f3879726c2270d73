//! Ordered listings of record identifiers.
//!
//! Listings are sorted sets of identifiers scored by creation time in milliseconds (or by
//! id for the global resident listing). They hold weak references only.

use bluemoon_store::{Order, Page, SharedStore};

use crate::consistency::Consistency;
use crate::error::Result;

/// Maintains listings in the store.
#[derive(Clone)]
pub struct Listings {
    store: SharedStore,
}

impl Listings {
    /// Create a listing manager over `store`.
    #[must_use]
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Add `member` to `listing`, or rescore it if already present.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the store fails.
    pub fn add(&self, listing: &str, member: u64, score: i64) -> Result<()> {
        self.store
            .listing_add(listing, score, &member.to_string())?;
        Ok(())
    }

    /// Remove `member` from `listing`. Returns whether it was present.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the store fails.
    pub fn remove(&self, listing: &str, member: u64) -> Result<bool> {
        Ok(self.store.listing_remove(listing, &member.to_string())?)
    }

    /// Members of `listing` in `order`, optionally paged.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the store fails.
    pub fn range(&self, listing: &str, order: Order, page: Option<Page>) -> Result<Vec<u64>> {
        let members = self.store.listing_range(listing, order, page)?;
        Ok(members
            .iter()
            .filter_map(|member| match member.parse() {
                Ok(id) => Some(id),
                Err(_) => {
                    tracing::warn!(listing, member = %member, "Ignoring non-numeric listing member");
                    None
                }
            })
            .collect())
    }

    /// Best-effort add, recorded in `outcome`.
    pub fn add_tracked(&self, outcome: &mut Consistency, listing: &str, member: u64, score: i64) {
        outcome.check(listing, self.add(listing, member, score));
    }

    /// Best-effort remove, recorded in `outcome`.
    pub fn remove_tracked(&self, outcome: &mut Consistency, listing: &str, member: u64) {
        outcome.check(listing, self.remove(listing, member));
    }

    /// Move `member` from one listing to another, keeping its score.
    ///
    /// Both halves run even if the first fails. A no-op when the listings are the same.
    pub fn relocate(&self, from: &str, to: &str, member: u64, score: i64) -> Consistency {
        let mut outcome = Consistency::clean();
        if from == to {
            return outcome;
        }

        self.remove_tracked(&mut outcome, from, member);
        self.add_tracked(&mut outcome, to, member, score);

        tracing::debug!(member, from, to, "Relocated listing member");
        outcome
    }
}
