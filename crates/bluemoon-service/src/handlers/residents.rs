//! Resident handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use bluemoon_core::{ApartmentId, Resident, ResidentId, ResidentState};
use bluemoon_engine::{Deactivation, NewResident, ResidentChanges};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::hash_password;
use crate::error::ApiError;
use crate::handlers::{parse_id, ApiJson, MessageResponse};
use crate::state::AppState;

/// A resident as returned by the API. The stored credential never leaves the service.
#[derive(Debug, Clone, Serialize)]
pub struct ResidentView {
    /// Resident id.
    pub id: ResidentId,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Display name.
    pub full_name: String,
    /// Phone number.
    pub phone: String,
    /// Apartment.
    pub apartment_id: ApartmentId,
    /// National id number.
    pub national_id: Option<String>,
    /// Date of birth.
    pub birth_date: Option<NaiveDate>,
    /// Application role.
    pub role: Option<String>,
    /// Residency status.
    pub residency_status: Option<String>,
    /// Login email.
    pub email: Option<String>,
    /// `active` or `inactive`.
    pub state: ResidentState,
    /// Registration time.
    pub created_at: DateTime<Utc>,
    /// Last update.
    pub updated_at: DateTime<Utc>,
}

impl From<Resident> for ResidentView {
    fn from(r: Resident) -> Self {
        Self {
            id: r.id,
            first_name: r.first_name,
            last_name: r.last_name,
            full_name: r.full_name,
            phone: r.phone,
            apartment_id: r.apartment_id,
            national_id: r.national_id,
            birth_date: r.birth_date,
            role: r.role,
            residency_status: r.residency_status,
            email: r.email,
            state: r.state,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// Registration request.
#[derive(Debug, Deserialize)]
pub struct CreateResidentRequest {
    /// Given name (required).
    pub first_name: Option<String>,
    /// Family name (required).
    pub last_name: Option<String>,
    /// Phone number (required).
    pub phone: Option<String>,
    /// Apartment (required).
    pub apartment_id: Option<String>,
    /// Initial password (required).
    pub password: Option<String>,
    /// National id number.
    #[serde(alias = "cccd")]
    pub national_id: Option<String>,
    /// Date of birth.
    #[serde(alias = "dob")]
    pub birth_date: Option<NaiveDate>,
    /// Application role.
    pub role: Option<String>,
    /// Residency status.
    pub residency_status: Option<String>,
    /// Login email.
    pub email: Option<String>,
}

/// Profile update. Absent and `null` fields are both left unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateResidentRequest {
    /// New given name.
    pub first_name: Option<String>,
    /// New family name.
    pub last_name: Option<String>,
    /// New phone number.
    pub phone: Option<String>,
    /// New apartment.
    pub apartment_id: Option<String>,
    /// New password.
    pub password: Option<String>,
    /// New lifecycle state.
    pub state: Option<ResidentState>,
    /// New national id number.
    #[serde(alias = "cccd")]
    pub national_id: Option<String>,
    /// New date of birth.
    #[serde(alias = "dob")]
    pub birth_date: Option<NaiveDate>,
    /// New role.
    pub role: Option<String>,
    /// New residency status.
    pub residency_status: Option<String>,
    /// New login email.
    pub email: Option<String>,
}

/// List every resident, by id ascending.
pub async fn list_residents(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ResidentView>>, ApiError> {
    let residents = state.engine.residents().list()?;
    Ok(Json(residents.into_iter().map(ResidentView::from).collect()))
}

/// Get one resident.
pub async fn get_resident(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ResidentView>, ApiError> {
    let id: ResidentId = parse_id(&id)?;
    Ok(Json(state.engine.residents().get(id)?.into()))
}

/// Register a resident.
pub async fn create_resident(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<CreateResidentRequest>,
) -> Result<(StatusCode, Json<ResidentView>), ApiError> {
    let password = body
        .password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::BadRequest("password is required".into()))?;

    let input = NewResident {
        first_name: body.first_name,
        last_name: body.last_name,
        phone: body.phone,
        apartment_id: body.apartment_id,
        national_id: body.national_id,
        birth_date: body.birth_date,
        role: body.role,
        residency_status: body.residency_status,
        email: body.email,
    };

    // Validate before paying for the hash.
    for (field, value) in [
        ("first_name", &input.first_name),
        ("last_name", &input.last_name),
        ("phone", &input.phone),
        ("apartment_id", &input.apartment_id),
    ] {
        if value.as_deref().map_or(true, |v| v.trim().is_empty()) {
            return Err(ApiError::BadRequest(format!("{field} is required")));
        }
    }

    let password_hash = hash_password(state.hasher.clone(), password).await?;
    let resident = state.engine.residents().register(input, password_hash)?;

    Ok((StatusCode::CREATED, Json(resident.into())))
}

/// Update a resident's profile and reindex it.
pub async fn update_resident(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<UpdateResidentRequest>,
) -> Result<Json<ResidentView>, ApiError> {
    let id: ResidentId = parse_id(&id)?;

    let password_hash = match body.password.filter(|p| !p.is_empty()) {
        Some(password) => Some(hash_password(state.hasher.clone(), password).await?),
        None => None,
    };

    let changes = ResidentChanges {
        first_name: body.first_name,
        last_name: body.last_name,
        phone: body.phone,
        apartment_id: body.apartment_id,
        state: body.state,
        national_id: body.national_id,
        birth_date: body.birth_date,
        role: body.role,
        residency_status: body.residency_status,
        email: body.email,
        password_hash,
    };

    let resident = state.engine.residents().update(id, changes)?;
    Ok(Json(resident.into()))
}

/// Soft-delete a resident.
pub async fn delete_resident(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id: ResidentId = parse_id(&id)?;

    let message = match state.engine.residents().deactivate(id)? {
        Deactivation::Deactivated => "Resident deactivated",
        Deactivation::AlreadyInactive => "Resident was already inactive",
    };
    Ok(Json(MessageResponse::new(message)))
}
