//! Error types for Blue Moon records.

/// A field failed validation.
///
/// Validation failures are always the caller's fault and are never worth retrying.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {field}: {reason}")]
pub struct ValidationError {
    /// The offending field, as named on the wire.
    pub field: &'static str,
    /// Human-readable reason.
    pub reason: String,
}

impl ValidationError {
    /// Create a validation error for `field`.
    #[must_use]
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }

    /// The field is required but was missing or blank.
    #[must_use]
    pub fn missing(field: &'static str) -> Self {
        Self::new(field, "is required")
    }
}

/// Reject a missing or blank required string.
///
/// # Errors
///
/// Returns `ValidationError::missing` if the value is absent or whitespace only.
pub fn require_text(field: &'static str, value: Option<&str>) -> Result<String, ValidationError> {
    match value.map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text.to_string()),
        _ => Err(ValidationError::missing(field)),
    }
}

/// Normalize an optional free-text field: blank becomes `None`.
#[must_use]
pub fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_text_trims() {
        assert_eq!(require_text("phone", Some(" 0901 ")).unwrap(), "0901");
    }

    #[test]
    fn require_text_rejects_blank() {
        let err = require_text("phone", Some("  ")).unwrap_err();
        assert_eq!(err.field, "phone");
        assert_eq!(err.to_string(), "invalid phone: is required");
        assert!(require_text("phone", None).is_err());
    }

    #[test]
    fn optional_text_drops_blank() {
        assert_eq!(optional_text(Some("")), None);
        assert_eq!(optional_text(Some(" note ")), Some("note".into()));
        assert_eq!(optional_text(None), None);
    }
}
