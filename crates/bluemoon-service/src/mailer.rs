//! Outgoing mail.

use crate::error::ApiError;

/// Delivers account mail to residents.
pub trait Mailer: Send + Sync {
    /// Send a password reset link to `to`.
    fn send_password_reset(&self, to: &str, link: &str) -> Result<(), ApiError>;
}

/// Writes mail to the log instead of delivering it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send_password_reset(&self, to: &str, link: &str) -> Result<(), ApiError> {
        tracing::info!(to = %to, "Password reset mail queued");
        // The link carries a live credential.
        tracing::debug!(to = %to, link = %link, "Password reset link");
        Ok(())
    }
}

/// Build the link a resident follows to choose a new password.
#[must_use]
pub fn reset_link(base: &str, token: &str) -> String {
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{}{separator}token={token}", base.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_link_appends_token() {
        assert_eq!(
            reset_link("https://bluemoon.example/reset-password/", "abc"),
            "https://bluemoon.example/reset-password?token=abc"
        );
        assert_eq!(
            reset_link("https://bluemoon.example/reset?lang=vi", "abc"),
            "https://bluemoon.example/reset?lang=vi&token=abc"
        );
    }

    #[test]
    fn log_mailer_always_succeeds() {
        assert!(LogMailer.send_password_reset("a@x.com", "link").is_ok());
    }
}
