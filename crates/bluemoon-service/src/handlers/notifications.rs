//! Notification handlers.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use bluemoon_core::{Notification, NotificationId};
use bluemoon_engine::{AddressedNotification, NewNotification, NotificationChanges};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::ApiError;
use crate::handlers::{double_option, parse_id, ApiJson, ListQuery, MessageResponse};
use crate::state::AppState;

/// Create notification request.
#[derive(Debug, Deserialize)]
pub struct CreateNotificationRequest {
    /// Addressed apartment (required).
    pub apartment_id: Option<String>,
    /// Message (required).
    pub content: Option<String>,
}

/// Notification update. Apartment and content may change but not be blanked.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateNotificationRequest {
    /// New apartment.
    pub apartment_id: Option<String>,
    /// New message.
    pub content: Option<String>,
    /// New notification date; `null` clears it.
    #[serde(default, deserialize_with = "double_option")]
    pub notification_date: Option<Option<DateTime<Utc>>>,
    /// New sent date; `null` marks the notification unsent.
    #[serde(default, deserialize_with = "double_option")]
    pub sent_date: Option<Option<DateTime<Utc>>>,
}

/// Every notification, newest first, with the addressed apartment's household head.
pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<AddressedNotification>>, ApiError> {
    Ok(Json(state.engine.notifications().list(query.page())?))
}

/// Create a notification.
pub async fn create_notification(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<CreateNotificationRequest>,
) -> Result<(StatusCode, Json<Notification>), ApiError> {
    let notification = state.engine.notifications().create(NewNotification {
        apartment_id: body.apartment_id,
        content: body.content,
    })?;
    Ok((StatusCode::CREATED, Json(notification)))
}

/// Update a notification.
pub async fn update_notification(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<UpdateNotificationRequest>,
) -> Result<Json<Notification>, ApiError> {
    let id: NotificationId = parse_id(&id)?;
    let notification = state.engine.notifications().update(
        id,
        NotificationChanges {
            apartment_id: body.apartment_id,
            content: body.content,
            notification_date: body.notification_date,
            sent_date: body.sent_date,
        },
    )?;
    Ok(Json(notification))
}

/// Stamp a notification as sent.
pub async fn send_notification(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Notification>, ApiError> {
    let id: NotificationId = parse_id(&id)?;
    Ok(Json(state.engine.notifications().mark_sent(id)?))
}

/// Delete a notification.
pub async fn delete_notification(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id: NotificationId = parse_id(&id)?;
    state.engine.notifications().delete(id)?;
    Ok(Json(MessageResponse::new(format!("Notification {id} deleted"))))
}
