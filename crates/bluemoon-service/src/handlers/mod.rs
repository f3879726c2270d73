//! API handlers.

pub mod admin;
pub mod forms;
pub mod health;
pub mod login;
pub mod notifications;
pub mod payments;
pub mod residents;
pub mod services;

use std::str::FromStr;

use axum::extract::FromRequest;
use bluemoon_core::IdError;
use bluemoon_store::Page;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ApiError;

/// JSON body extractor whose rejections use the API error format.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Plain acknowledgement.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    /// What happened.
    pub message: String,
}

impl MessageResponse {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// `?offset=&limit=` on listing endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Entries to skip.
    pub offset: Option<usize>,
    /// Maximum entries to return.
    pub limit: Option<usize>,
}

impl ListQuery {
    /// The requested window, if any.
    #[must_use]
    pub fn page(&self) -> Option<Page> {
        match (self.offset, self.limit) {
            (None, None) => None,
            (offset, limit) => Some(Page::new(
                offset.unwrap_or(0),
                limit.unwrap_or(usize::MAX),
            )),
        }
    }
}

/// Parse a numeric identifier from a path segment.
pub(crate) fn parse_id<T>(raw: &str) -> Result<T, ApiError>
where
    T: FromStr<Err = IdError>,
{
    raw.parse::<T>()
        .map_err(|e| ApiError::BadRequest(e.to_string()))
}

/// Distinguish an absent field (`None`) from an explicit `null` (`Some(None)`).
///
/// Use together with `#[serde(default)]`.
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
