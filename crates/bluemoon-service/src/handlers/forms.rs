//! Residence form handlers.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use bluemoon_core::{ApartmentId, Form, FormId, ServiceId};
use bluemoon_engine::{FormChanges, NewForm};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::ApiError;
use crate::handlers::{double_option, parse_id, ApiJson, ListQuery, MessageResponse};
use crate::state::AppState;

/// Create form request.
#[derive(Debug, Deserialize)]
pub struct CreateFormRequest {
    /// Declared person (required).
    pub full_name: Option<String>,
    /// Apartment (required).
    pub apartment_id: Option<String>,
    /// National id number.
    #[serde(alias = "cccd")]
    pub national_id: Option<String>,
    /// Date of birth.
    #[serde(alias = "dob")]
    pub date_of_birth: Option<NaiveDate>,
    /// Stay start.
    pub start_date: Option<NaiveDate>,
    /// Stay end.
    pub end_date: Option<NaiveDate>,
    /// Free-form note.
    pub note: Option<String>,
    /// Service request the form belongs to.
    pub service_id: Option<ServiceId>,
}

/// Partial update. `null` clears an optional field; apartment and service moves re-parent
/// the form's listings.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateFormRequest {
    /// New name.
    pub full_name: Option<String>,
    /// New apartment.
    pub apartment_id: Option<String>,
    /// New national id.
    #[serde(default, alias = "cccd", deserialize_with = "double_option")]
    pub national_id: Option<Option<String>>,
    /// New date of birth.
    #[serde(default, alias = "dob", deserialize_with = "double_option")]
    pub date_of_birth: Option<Option<NaiveDate>>,
    /// New stay start.
    #[serde(default, deserialize_with = "double_option")]
    pub start_date: Option<Option<NaiveDate>>,
    /// New stay end.
    #[serde(default, deserialize_with = "double_option")]
    pub end_date: Option<Option<NaiveDate>>,
    /// New note.
    #[serde(default, deserialize_with = "double_option")]
    pub note: Option<Option<String>>,
    /// New parent service request.
    #[serde(default, deserialize_with = "double_option")]
    pub service_id: Option<Option<ServiceId>>,
}

/// File a form.
pub async fn create_form(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<CreateFormRequest>,
) -> Result<(StatusCode, Json<Form>), ApiError> {
    let form = state.engine.forms().create(NewForm {
        full_name: body.full_name,
        apartment_id: body.apartment_id,
        national_id: body.national_id,
        date_of_birth: body.date_of_birth,
        start_date: body.start_date,
        end_date: body.end_date,
        note: body.note,
        service_id: body.service_id,
    })?;
    Ok((StatusCode::CREATED, Json(form)))
}

/// Every form, newest first.
pub async fn list_forms(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Form>>, ApiError> {
    Ok(Json(state.engine.forms().list(query.page())?))
}

/// One form.
pub async fn get_form(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Form>, ApiError> {
    let id: FormId = parse_id(&id)?;
    Ok(Json(state.engine.forms().get(id)?))
}

/// An apartment's forms, newest first.
pub async fn list_apartment_forms(
    State(state): State<Arc<AppState>>,
    Path(apartment_id): Path<String>,
) -> Result<Json<Vec<Form>>, ApiError> {
    let apartment = ApartmentId::new(apartment_id);
    Ok(Json(state.engine.forms().list_by_apartment(&apartment)?))
}

/// Forms filed against a service request, newest first.
pub async fn list_service_forms(
    State(state): State<Arc<AppState>>,
    Path(service_id): Path<String>,
) -> Result<Json<Vec<Form>>, ApiError> {
    let service: ServiceId = parse_id(&service_id)?;
    Ok(Json(state.engine.forms().list_by_service(service)?))
}

/// Update a form.
pub async fn update_form(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<UpdateFormRequest>,
) -> Result<Json<Form>, ApiError> {
    let id: FormId = parse_id(&id)?;
    let form = state.engine.forms().update(
        id,
        FormChanges {
            full_name: body.full_name,
            apartment_id: body.apartment_id,
            national_id: body.national_id,
            date_of_birth: body.date_of_birth,
            start_date: body.start_date,
            end_date: body.end_date,
            note: body.note,
            service_id: body.service_id,
        },
    )?;
    Ok(Json(form))
}

/// Delete a form.
pub async fn delete_form(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id: FormId = parse_id(&id)?;
    state.engine.forms().delete(id)?;
    Ok(Json(MessageResponse::new(format!("Form {id} deleted"))))
}
