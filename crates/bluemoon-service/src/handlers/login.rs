//! Login and password reset.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::auth::{hash_password, verify_password};
use crate::crypto::random_token;
use crate::error::ApiError;
use crate::handlers::residents::ResidentView;
use crate::handlers::{ApiJson, MessageResponse};
use crate::mailer::reset_link;
use crate::state::AppState;

/// Login request. `username` is an email address or a phone number.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Email or phone.
    pub username: Option<String>,
    /// Password.
    pub password: Option<String>,
    /// The role the client is logging in as.
    pub role: Option<String>,
}

/// Login response.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// The resident, without credentials.
    pub user: ResidentView,
    /// Signed session token.
    pub token: String,
}

/// Request a password reset mail.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    /// The account's email.
    pub email: Option<String>,
}

/// Choose a new password with a mailed token.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    /// Token from the reset link.
    pub token: Option<String>,
    /// The new password.
    pub new_password: Option<String>,
}

/// Authenticate a resident.
///
/// The account is resolved by lower-cased email, then the email as typed, then phone.
pub async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let (Some(username), Some(password), Some(role)) = (
        body.username.filter(|s| !s.trim().is_empty()),
        body.password.filter(|s| !s.is_empty()),
        body.role.filter(|s| !s.trim().is_empty()),
    ) else {
        return Err(ApiError::BadRequest(
            "username, password and role are required".into(),
        ));
    };

    let resident = state
        .engine
        .residents()
        .find_by_login(&username)?
        .ok_or_else(|| ApiError::NotFound("account not found".into()))?;

    if !resident.is_active() {
        tracing::info!(resident_id = %resident.id, "Login refused for inactive account");
        return Err(ApiError::Forbidden("account is inactive or locked".into()));
    }

    let role_matches = resident
        .role
        .as_deref()
        .is_some_and(|r| r.trim().eq_ignore_ascii_case(role.trim()));
    if !role_matches {
        tracing::info!(resident_id = %resident.id, role = %role, "Login refused for role");
        return Err(ApiError::Forbidden(format!(
            "account may not sign in as {}",
            role.trim()
        )));
    }

    let valid = verify_password(
        state.hasher.clone(),
        password,
        resident.password_hash.clone(),
    )
    .await?;
    if !valid {
        tracing::info!(resident_id = %resident.id, "Login refused for bad password");
        return Err(ApiError::Unauthorized);
    }

    let token = state.tokens.issue(&resident)?;
    tracing::info!(resident_id = %resident.id, "Resident logged in");

    Ok(Json(LoginResponse {
        user: resident.into(),
        token,
    }))
}

/// Mail a single-use reset link to the account registered under `email`.
pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Some(email) = body.email.filter(|s| !s.trim().is_empty()) else {
        return Err(ApiError::BadRequest("email is required".into()));
    };

    let token = random_token();
    let ttl = Duration::minutes(state.config.reset_token_ttl_minutes);
    let (resident, _) = state
        .engine
        .residents()
        .issue_password_reset(&email, &token, ttl)?;

    let to = resident.email.as_deref().unwrap_or(email.trim());
    state
        .mailer
        .send_password_reset(to, &reset_link(&state.config.reset_link_base, &token))?;

    Ok(Json(MessageResponse::new("Password reset link sent")))
}

/// Consume a reset token and store the new password.
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let (Some(token), Some(password)) = (
        body.token.filter(|s| !s.trim().is_empty()),
        body.new_password.filter(|s| !s.is_empty()),
    ) else {
        return Err(ApiError::BadRequest(
            "token and new_password are required".into(),
        ));
    };

    let password_hash = hash_password(state.hasher.clone(), password).await?;
    state
        .engine
        .residents()
        .reset_password(token.trim(), password_hash)?;

    Ok(Json(MessageResponse::new("Password updated")))
}
