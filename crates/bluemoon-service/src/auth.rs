//! Credentials, login tokens and the admin extractor.
//!
//! - [`CredentialHasher`] hides how passwords are stored; [`Argon2Hasher`] is the production
//!   implementation
//! - [`TokenIssuer`] signs the HS256 token handed out on login
//! - [`AdminAuth`] guards operator endpoints with the `x-admin-key` header

use std::sync::Arc;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use bluemoon_core::Resident;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::crypto::constant_time_eq;
use crate::error::ApiError;
use crate::state::AppState;

/// Turns passwords into stored credentials and checks them back.
pub trait CredentialHasher: Send + Sync {
    /// Hash a password for storage.
    fn hash(&self, password: &str) -> Result<String, ApiError>;

    /// Check a password against a stored credential.
    fn verify(&self, password: &str, stored: &str) -> Result<bool, ApiError>;
}

/// Argon2id password hashing.
#[derive(Debug, Clone)]
pub struct Argon2Hasher {
    params: Params,
}

impl Argon2Hasher {
    /// Use explicit cost parameters (memory in KiB, iterations).
    ///
    /// # Errors
    ///
    /// Returns `Internal` if the parameters are out of Argon2's range.
    pub fn with_cost(memory_kib: u32, iterations: u32) -> Result<Self, ApiError> {
        let params = Params::new(memory_kib, iterations, 1, None)
            .map_err(|e| ApiError::Internal(format!("argon2 params: {e}")))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl Default for Argon2Hasher {
    /// Argon2id with the RFC 9106 recommended defaults (19 MiB, 2 iterations).
    fn default() -> Self {
        Self {
            params: Params::default(),
        }
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<String, ApiError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| ApiError::Internal(format!("hash password: {e}")))
    }

    fn verify(&self, password: &str, stored: &str) -> Result<bool, ApiError> {
        let Ok(parsed) = PasswordHash::new(stored) else {
            tracing::warn!("Stored credential is not a PHC string; rejecting login");
            return Ok(false);
        };
        // Verification uses the parameters embedded in the stored hash.
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }
}

/// Hash a password off the async runtime.
///
/// # Errors
///
/// Returns `Internal` if hashing fails or the blocking task is lost.
pub async fn hash_password(
    hasher: Arc<dyn CredentialHasher>,
    password: String,
) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || hasher.hash(&password))
        .await
        .map_err(|e| ApiError::Internal(format!("hashing task: {e}")))?
}

/// Verify a password off the async runtime.
///
/// # Errors
///
/// Returns `Internal` if verification fails or the blocking task is lost.
pub async fn verify_password(
    hasher: Arc<dyn CredentialHasher>,
    password: String,
    stored: String,
) -> Result<bool, ApiError> {
    tokio::task::spawn_blocking(move || hasher.verify(&password, &stored))
        .await
        .map_err(|e| ApiError::Internal(format!("verification task: {e}")))?
}

/// Claims carried by a login token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Resident id.
    pub sub: String,
    /// Resident role at login time.
    pub role: Option<String>,
    /// Resident's apartment.
    pub apartment_id: String,
    /// Resident's full name.
    pub full_name: String,
    /// Expiration (unix seconds).
    pub exp: i64,
    /// Issued at (unix seconds).
    pub iat: i64,
}

/// Signs and checks HS256 login tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    /// Create an issuer for `secret` with tokens valid for `ttl_hours`.
    #[must_use]
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::hours(ttl_hours),
        }
    }

    /// Issue a token for `resident`.
    ///
    /// # Errors
    ///
    /// Returns `Internal` if signing fails.
    pub fn issue(&self, resident: &Resident) -> Result<String, ApiError> {
        let now = Utc::now();
        let claims = Claims {
            sub: resident.id.to_string(),
            role: resident.role.clone(),
            apartment_id: resident.apartment_id.to_string(),
            full_name: resident.full_name.clone(),
            exp: (now + self.ttl).timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| ApiError::Internal(format!("sign token: {e}")))
    }

    /// Decode and validate a token.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` for a malformed, forged or expired token.
    pub fn verify(&self, token: &str) -> Result<Claims, ApiError> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Token validation failed");
                ApiError::Unauthorized
            })
    }
}

/// Admin authentication via API key.
///
/// Requires the `X-Admin-Key` header to match the configured admin key. With no key
/// configured every request is rejected.
#[derive(Debug, Clone)]
pub struct AdminAuth {
    /// Admin identifier (for audit logging).
    pub admin_id: String,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AdminAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let admin_key = parts
            .headers
            .get("x-admin-key")
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;

        let expected_key = state
            .config
            .admin_api_key
            .as_deref()
            .ok_or(ApiError::Unauthorized)?;

        if !constant_time_eq(admin_key, expected_key) {
            tracing::warn!("Rejected admin request with a wrong key");
            return Err(ApiError::Unauthorized);
        }

        let admin_id = parts
            .headers
            .get("x-admin-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("admin")
            .to_string();

        tracing::info!(admin_id = %admin_id, "Admin authenticated");

        Ok(AdminAuth { admin_id })
    }
}

#[cfg(test)]
mod tests {
    use bluemoon_core::{ApartmentId, ResidentId, ResidentState};

    use super::*;

    fn resident() -> Resident {
        let now = Utc::now();
        Resident {
            id: ResidentId::new(7),
            first_name: "Lan".into(),
            last_name: "Tran".into(),
            full_name: "Lan Tran".into(),
            phone: "0900000007".into(),
            apartment_id: ApartmentId::new("A-12"),
            national_id: None,
            birth_date: None,
            role: Some("resident".into()),
            residency_status: None,
            email: None,
            password_hash: String::new(),
            state: ResidentState::Active,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn argon2_round_trip() {
        let hasher = Argon2Hasher::with_cost(1024, 1).unwrap();
        let stored = hasher.hash("s3cret").unwrap();

        assert!(stored.starts_with("$argon2id$"));
        assert!(hasher.verify("s3cret", &stored).unwrap());
        assert!(!hasher.verify("wrong", &stored).unwrap());
    }

    #[test]
    fn argon2_rejects_non_phc_credentials() {
        let hasher = Argon2Hasher::with_cost(1024, 1).unwrap();
        assert!(!hasher.verify("anything", "plaintext").unwrap());
    }

    #[test]
    fn tokens_carry_resident_claims() {
        let issuer = TokenIssuer::new("secret", 168);
        let token = issuer.issue(&resident()).unwrap();
        let claims = issuer.verify(&token).unwrap();

        assert_eq!(claims.sub, "7");
        assert_eq!(claims.apartment_id, "A-12");
        assert_eq!(claims.role.as_deref(), Some("resident"));
        assert_eq!(claims.exp - claims.iat, 168 * 3600);
    }

    #[test]
    fn tokens_from_another_key_are_rejected() {
        let token = TokenIssuer::new("one", 1).issue(&resident()).unwrap();
        let err = TokenIssuer::new("two", 1).verify(&token).unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized));
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let token = TokenIssuer::new("secret", -2).issue(&resident()).unwrap();
        assert!(TokenIssuer::new("secret", -2).verify(&token).is_err());
    }
}
