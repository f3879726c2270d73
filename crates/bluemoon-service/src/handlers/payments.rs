//! Payment handlers, including the provider callback.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use bluemoon_core::{
    standard_fees, ApartmentId, CallbackOutcome, Fee, Payment, PaymentId, PaymentState,
    ProviderFields, ResidentId, TransactionRef,
};
use bluemoon_engine::{NewPayment, PaymentPatch, PaymentView};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::crypto::verify_signature;
use crate::error::ApiError;
use crate::handlers::{double_option, parse_id, ApiJson, ListQuery, MessageResponse};
use crate::state::AppState;

/// Header carrying hex(HMAC-SHA256(callback secret, raw body)).
pub const SIGNATURE_HEADER: &str = "x-callback-signature";

/// Create payment request.
#[derive(Debug, Deserialize)]
pub struct CreatePaymentRequest {
    /// Paying resident (required).
    pub resident_id: Option<ResidentId>,
    /// Amount in dong, greater than zero (required).
    pub amount: Option<i64>,
    /// Fee category.
    #[serde(alias = "feetype")]
    pub fee_type: Option<String>,
    /// Payment method.
    pub payment_form: Option<String>,
}

/// Create payment response.
#[derive(Debug, Serialize)]
pub struct CreatePaymentResponse {
    /// New payment id.
    pub payment_id: PaymentId,
    /// Reference the provider must echo back in its callback.
    pub transaction_ref: TransactionRef,
    /// The stored payment.
    pub payment: Payment,
}

/// Provider callback body.
#[derive(Debug, Deserialize)]
pub struct CallbackRequest {
    /// Reference issued at creation.
    #[serde(default)]
    pub transaction_ref: String,
    /// `success` or `failed`, case-insensitive.
    #[serde(default)]
    pub status: String,
    /// Provider's transaction id.
    pub provider_tx_id: Option<String>,
    /// Payer's account.
    pub payer_account: Option<String>,
    /// Payer's name.
    pub payer_name: Option<String>,
}

/// Callback acknowledgement.
#[derive(Debug, Serialize)]
pub struct CallbackResponse {
    /// Settled payment id.
    pub payment_id: PaymentId,
    /// State after the callback.
    pub state: PaymentState,
    /// Whether the payment is now settled.
    pub is_paid: bool,
    /// What happened.
    pub message: String,
}

/// `?resident_id=` on the payment status endpoint.
#[derive(Debug, Deserialize)]
pub struct PaymentStatusQuery {
    /// Resident whose payments are listed.
    pub resident_id: Option<String>,
}

/// Operator override.
#[derive(Debug, Default, Deserialize)]
pub struct PatchPaymentRequest {
    /// New state: `0` pending, `1` confirmed.
    pub state: Option<PaymentState>,
    /// New fee category; `null` clears it.
    #[serde(default, alias = "feetype", deserialize_with = "double_option")]
    pub fee_type: Option<Option<String>>,
    /// New amount.
    pub amount: Option<i64>,
    /// New payment date; `null` clears it.
    #[serde(default, deserialize_with = "double_option")]
    pub payment_date: Option<Option<NaiveDate>>,
}

/// The standard fee catalogue.
pub async fn list_fees() -> Json<Vec<Fee>> {
    Json(standard_fees())
}

/// Create a pending payment.
pub async fn create_payment(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<CreatePaymentRequest>,
) -> Result<(StatusCode, Json<CreatePaymentResponse>), ApiError> {
    let resident_id = body
        .resident_id
        .ok_or_else(|| ApiError::BadRequest("resident_id is required".into()))?;
    let amount = body
        .amount
        .ok_or_else(|| ApiError::BadRequest("amount is required".into()))?;

    let payment = state.engine.payments().create(NewPayment {
        resident_id,
        amount,
        fee_type: body.fee_type,
        payment_form: body.payment_form,
    })?;

    Ok((
        StatusCode::CREATED,
        Json(CreatePaymentResponse {
            payment_id: payment.id,
            transaction_ref: payment.transaction_ref.clone(),
            payment,
        }),
    ))
}

/// Apply a provider callback.
///
/// The body is taken raw so the signature covers exactly the bytes the provider sent.
pub async fn payment_callback(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<CallbackResponse>, ApiError> {
    if let Some(secret) = &state.config.callback_secret {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                tracing::warn!("Payment callback without signature");
                ApiError::Unauthorized
            })?;

        if !verify_signature(secret, &body, signature) {
            tracing::warn!("Payment callback with invalid signature");
            return Err(ApiError::Unauthorized);
        }
    }

    let callback: CallbackRequest =
        serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let reference = TransactionRef::from_external(&callback.transaction_ref);
    if reference.as_str().is_empty() {
        return Err(ApiError::BadRequest("transaction_ref is required".into()));
    }
    let outcome: CallbackOutcome = callback
        .status
        .parse()
        .map_err(|e: bluemoon_core::ValidationError| ApiError::BadRequest(e.to_string()))?;

    tracing::info!(
        transaction_ref = %reference,
        outcome = ?outcome,
        "Received payment callback"
    );

    let fields = ProviderFields {
        provider_tx_id: callback.provider_tx_id,
        payer_account: callback.payer_account,
        payer_name: callback.payer_name,
    };
    let payment = state
        .engine
        .payments()
        .apply_callback(&reference, outcome, &fields)?;

    let message = match outcome {
        CallbackOutcome::Success => "Payment confirmed",
        CallbackOutcome::Failed => "Failure recorded; payment remains pending",
    };
    Ok(Json(CallbackResponse {
        payment_id: payment.id,
        state: payment.state,
        is_paid: payment.is_paid(),
        message: message.to_string(),
    }))
}

/// A resident's payments with their settlement status, newest first.
pub async fn payment_status(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PaymentStatusQuery>,
) -> Result<Json<Vec<PaymentView>>, ApiError> {
    let raw = query
        .resident_id
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("resident_id is required".into()))?;
    let resident: ResidentId = parse_id(&raw)?;

    let ledger = state.engine.payments();
    let payments = ledger.list_by_resident(resident)?;
    Ok(Json(ledger.describe(payments)?))
}

/// Every payment, newest first.
pub async fn list_payments(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<PaymentView>>, ApiError> {
    let ledger = state.engine.payments();
    let payments = ledger.list_all(query.page())?;
    Ok(Json(ledger.describe(payments)?))
}

/// One payment.
pub async fn get_payment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<PaymentView>, ApiError> {
    let id: PaymentId = parse_id(&id)?;
    let payment = state.engine.payments().get(id)?;
    let payer = state.engine.residents().find(payment.resident_id)?;
    Ok(Json(PaymentView::new(payment, payer.as_ref())))
}

/// A resident's payments, newest first.
pub async fn list_resident_payments(
    State(state): State<Arc<AppState>>,
    Path(resident_id): Path<String>,
) -> Result<Json<Vec<PaymentView>>, ApiError> {
    let resident: ResidentId = parse_id(&resident_id)?;
    let ledger = state.engine.payments();
    let payments = ledger.list_by_resident(resident)?;
    Ok(Json(ledger.describe(payments)?))
}

/// Payments of everyone living in an apartment.
pub async fn list_apartment_payments(
    State(state): State<Arc<AppState>>,
    Path(apartment_id): Path<String>,
) -> Result<Json<Vec<PaymentView>>, ApiError> {
    let apartment = ApartmentId::new(apartment_id);
    Ok(Json(state.engine.payments().list_by_apartment(&apartment)?))
}

/// Operator override of state, fee type, amount or payment date.
pub async fn patch_payment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<PatchPaymentRequest>,
) -> Result<Json<PaymentView>, ApiError> {
    let id: PaymentId = parse_id(&id)?;
    let payment = state.engine.payments().patch(
        id,
        PaymentPatch {
            state: body.state,
            fee_type: body.fee_type,
            amount: body.amount,
            payment_date: body.payment_date,
        },
    )?;
    let payer = state.engine.residents().find(payment.resident_id)?;
    Ok(Json(PaymentView::new(payment, payer.as_ref())))
}

/// Hard-delete a payment.
pub async fn delete_payment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id: PaymentId = parse_id(&id)?;
    let payment = state.engine.payments().delete(id)?;
    Ok(Json(MessageResponse::new(format!(
        "Payment {} deleted",
        payment.id
    ))))
}
