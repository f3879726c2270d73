//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, patch, post, put};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{
    admin, forms, health, login, notifications, payments, residents, services,
};
use crate::state::AppState;

/// Maximum concurrent requests for the CRUD surface.
const API_MAX_CONCURRENT_REQUESTS: usize = 64;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
/// - `POST /login` - Email or phone login, returns a token
/// - `POST /forgot-password`, `POST /reset-password` - Mailed single-use reset token
///
/// ## Residents
/// - `GET|POST /residents`, `GET|PUT|DELETE /residents/:id` (delete is a soft delete)
///
/// ## Payments
/// - `GET /fees` - Standard fee catalogue
/// - `GET|POST /payments`, `GET|PATCH|DELETE /payments/:id`
/// - `GET /payments/by-resident/:resident_id`, `GET /payments/by-apartment/:apartment_id`
/// - `GET /payment-status?resident_id=`
/// - `POST /payments/callback` - Provider callback (optionally HMAC-signed)
///
/// ## Notifications, services, forms
/// - `GET|POST /notifications`, `PUT|DELETE /notifications/:id`, `PATCH /notifications/:id/send`
/// - `GET|POST /services`, `GET|PATCH|DELETE /services/:id`,
///   `GET /services/by-apartment/:apartment_id`
/// - `GET|POST /forms`, `GET|PATCH|DELETE /forms/:id`, `GET /forms/by-apartment/:apartment_id`,
///   `GET /forms/by-service/:service_id`
///
/// ## Admin (`x-admin-key`)
/// - `POST /admin/reconcile` - Rebuild derived indexes
pub fn create_router(state: AppState) -> Router {
    // Extract config values before moving state
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    let api_routes = Router::new()
        .route("/login", post(login::login))
        .route("/forgot-password", post(login::forgot_password))
        .route("/reset-password", post(login::reset_password))
        // Residents
        .route(
            "/residents",
            get(residents::list_residents).post(residents::create_resident),
        )
        .route(
            "/residents/:id",
            get(residents::get_resident)
                .put(residents::update_resident)
                .delete(residents::delete_resident),
        )
        // Payments
        .route("/fees", get(payments::list_fees))
        .route(
            "/payments",
            get(payments::list_payments).post(payments::create_payment),
        )
        .route(
            "/payments/:id",
            get(payments::get_payment)
                .patch(payments::patch_payment)
                .delete(payments::delete_payment),
        )
        .route(
            "/payments/by-resident/:resident_id",
            get(payments::list_resident_payments),
        )
        .route(
            "/payments/by-apartment/:apartment_id",
            get(payments::list_apartment_payments),
        )
        .route("/payment-status", get(payments::payment_status))
        // Notifications
        .route(
            "/notifications",
            get(notifications::list_notifications).post(notifications::create_notification),
        )
        .route(
            "/notifications/:id",
            put(notifications::update_notification)
                .delete(notifications::delete_notification),
        )
        .route(
            "/notifications/:id/send",
            patch(notifications::send_notification),
        )
        // Services
        .route(
            "/services",
            get(services::list_services).post(services::create_service),
        )
        .route(
            "/services/:id",
            get(services::get_service)
                .patch(services::update_service)
                .delete(services::delete_service),
        )
        .route(
            "/services/by-apartment/:apartment_id",
            get(services::list_apartment_services),
        )
        // Forms
        .route("/forms", get(forms::list_forms).post(forms::create_form))
        .route(
            "/forms/:id",
            get(forms::get_form)
                .patch(forms::update_form)
                .delete(forms::delete_form),
        )
        .route(
            "/forms/by-apartment/:apartment_id",
            get(forms::list_apartment_forms),
        )
        .route(
            "/forms/by-service/:service_id",
            get(forms::list_service_forms),
        )
        // Admin
        .route("/admin/reconcile", post(admin::reconcile))
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS));

    Router::new()
        // Health (public, no rate limit)
        .route("/health", get(health::health))
        // Provider callbacks (no rate limit - controlled by the payment provider)
        .route("/payments/callback", post(payments::payment_callback))
        .merge(api_routes)
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
