//! Outcome of best-effort derived-index maintenance.

use std::fmt::Display;

/// Which derived keys a maintenance pass failed to write.
///
/// Index writes happen after the primary record is persisted, and a failure there must not
/// fail the request. Each failure is logged when recorded and collected here so callers
/// (and tests) can see what was left stale until the next reconciliation.
#[must_use]
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Consistency {
    stale: Vec<String>,
}

impl Consistency {
    /// Nothing failed yet.
    pub fn clean() -> Self {
        Self::default()
    }

    /// Record the result of one index write against `key`.
    ///
    /// Returns the success value, or `None` after logging the failure.
    pub fn check<T, E: Display>(
        &mut self,
        key: impl Into<String>,
        result: std::result::Result<T, E>,
    ) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                let key = key.into();
                tracing::warn!(key = %key, error = %e, "Derived index left stale");
                self.stale.push(key);
                None
            }
        }
    }

    /// Fold another outcome into this one.
    pub fn absorb(&mut self, other: Self) {
        self.stale.extend(other.stale);
    }

    /// Whether every index write succeeded.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.stale.is_empty()
    }

    /// Keys whose write failed.
    #[must_use]
    pub fn stale_keys(&self) -> &[String] {
        &self.stale
    }

    /// Close the outcome for `operation`, summarizing any failures.
    pub fn finish(self, operation: &'static str) {
        if !self.stale.is_empty() {
            tracing::warn!(
                operation,
                stale = self.stale.len(),
                "Operation completed with stale indexes; run reconciliation to repair"
            );
        }
    }
}
