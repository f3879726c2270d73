//! Service request handlers.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use bluemoon_core::{
    ApartmentId, Problem, Rating, ServiceId, ServiceRequest, ServiceStatus, ServiceType,
};
use bluemoon_engine::{NewServiceRequest, ServiceChanges};
use serde::Deserialize;

use crate::error::ApiError;
use crate::handlers::{double_option, parse_id, ApiJson, ListQuery, MessageResponse};
use crate::state::AppState;

/// Create service request. Unknown enumeration values are rejected with 400.
#[derive(Debug, Deserialize)]
pub struct CreateServiceRequest {
    /// Requesting apartment (required).
    pub apartment_id: Option<String>,
    /// Request type (required).
    pub service_type: Option<ServiceType>,
    /// Details (required).
    pub content: Option<String>,
    /// Initial status.
    #[serde(alias = "servicestatus")]
    pub status: Option<ServiceStatus>,
    /// Staff note.
    pub note: Option<String>,
    /// Problem category.
    #[serde(alias = "problems")]
    pub problem: Option<Problem>,
    /// Rating.
    #[serde(alias = "rates")]
    pub rating: Option<Rating>,
    /// Handling script.
    pub scripts: Option<String>,
}

/// Partial update of a service request.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateServiceRequest {
    /// New type; reassigns the handler.
    pub service_type: Option<ServiceType>,
    /// New details.
    pub content: Option<String>,
    /// New status.
    #[serde(alias = "servicestatus")]
    pub status: Option<ServiceStatus>,
    /// New note; `null` clears it.
    #[serde(default, deserialize_with = "double_option")]
    pub note: Option<Option<String>>,
    /// New problem category.
    #[serde(alias = "problems")]
    pub problem: Option<Problem>,
    /// New rating.
    #[serde(alias = "rates")]
    pub rating: Option<Rating>,
    /// New script; `null` clears it.
    #[serde(default, deserialize_with = "double_option")]
    pub scripts: Option<Option<String>>,
}

/// Record a service request.
pub async fn create_service(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<CreateServiceRequest>,
) -> Result<(StatusCode, Json<ServiceRequest>), ApiError> {
    let request = state.engine.services().create(NewServiceRequest {
        apartment_id: body.apartment_id,
        service_type: body.service_type,
        content: body.content,
        status: body.status,
        note: body.note,
        problem: body.problem,
        rating: body.rating,
        scripts: body.scripts,
    })?;
    Ok((StatusCode::CREATED, Json(request)))
}

/// Every service request, newest first.
pub async fn list_services(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<ServiceRequest>>, ApiError> {
    Ok(Json(state.engine.services().list(query.page())?))
}

/// One service request.
pub async fn get_service(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ServiceRequest>, ApiError> {
    let id: ServiceId = parse_id(&id)?;
    Ok(Json(state.engine.services().get(id)?))
}

/// An apartment's service requests, newest first.
pub async fn list_apartment_services(
    State(state): State<Arc<AppState>>,
    Path(apartment_id): Path<String>,
) -> Result<Json<Vec<ServiceRequest>>, ApiError> {
    let apartment = ApartmentId::new(apartment_id);
    Ok(Json(state.engine.services().list_by_apartment(&apartment)?))
}

/// Update a service request.
pub async fn update_service(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<UpdateServiceRequest>,
) -> Result<Json<ServiceRequest>, ApiError> {
    let id: ServiceId = parse_id(&id)?;
    let request = state.engine.services().update(
        id,
        ServiceChanges {
            service_type: body.service_type,
            content: body.content,
            status: body.status,
            note: body.note,
            problem: body.problem,
            rating: body.rating,
            scripts: body.scripts,
        },
    )?;
    Ok(Json(request))
}

/// Delete a service request. Forms filed against it are left in place.
pub async fn delete_service(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id: ServiceId = parse_id(&id)?;
    state.engine.services().delete(id)?;
    Ok(Json(MessageResponse::new(format!("Service request {id} deleted"))))
}
