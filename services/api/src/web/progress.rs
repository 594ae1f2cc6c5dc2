//! services/api/src/web/progress.rs
//!
//! Handlers for learning progress and course purchases.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use kazusa_core::domain::{Caller, NewActivity, NewPayment};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{http_error, HttpError};
use crate::web::dto::{
    CreatePaymentRequest, CreatedResponse, PaymentCallback, PaymentResponse, PaymentStatus,
    RecordActivityRequest,
};
use crate::web::middleware::require_caller;
use crate::web::state::AppState;

/// The only provider status that confirms an order.
const SUCCESS_STATUS: &str = "success";

/// Record that the caller reached a module.
///
/// Flagging the course's last module triggers a completion notice, which is
/// delivered in the background.
#[utoipa::path(
    post,
    path = "/activity",
    request_body = RecordActivityRequest,
    responses(
        (status = 201, description = "Progress recorded", body = CreatedResponse),
        (status = 401, description = "Authentication required"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer" = []))
)]
pub async fn record_activity_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Option<Caller>>,
    Json(req): Json<RecordActivityRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let caller = require_caller(caller)?;
    let id = state
        .recorder
        .record(NewActivity {
            user_id: caller.user_id,
            course_id: req.course_id,
            module_id: req.module_id,
            is_last: req.is_last,
        })
        .await
        .map_err(http_error)?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

/// Start a purchase of a course for the caller. The payment stays unconfirmed
/// until the provider calls back with the returned order id.
#[utoipa::path(
    post,
    path = "/payments",
    request_body = CreatePaymentRequest,
    responses(
        (status = 201, description = "Payment initiated", body = PaymentResponse),
        (status = 401, description = "Authentication required"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer" = []))
)]
pub async fn create_payment_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Option<Caller>>,
    Json(req): Json<CreatePaymentRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let caller = require_caller(caller)?;
    let order_id = Uuid::new_v4();
    let id = state
        .payments
        .create(NewPayment {
            user_id: caller.user_id,
            course_id: req.course_id,
            order_id,
        })
        .await
        .map_err(http_error)?;

    info!(payment_id = %id, order_id = %order_id, "payment initiated");
    Ok((StatusCode::CREATED, Json(PaymentResponse { id, order_id })))
}

/// Payment provider callback.
#[utoipa::path(
    post,
    path = "/payments/confirm",
    request_body = PaymentCallback,
    responses(
        (status = 200, description = "Order confirmed"),
        (status = 400, description = "Malformed callback or unsuccessful payment"),
        (status = 404, description = "Unknown order"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn confirm_payment_handler(
    State(state): State<Arc<AppState>>,
    Json(callback): Json<PaymentCallback>,
) -> Result<StatusCode, HttpError> {
    let status = decode_callback(&callback.data)?;
    if status.operation_status != SUCCESS_STATUS {
        warn!(
            order_id = %status.order_id,
            status = %status.operation_status,
            "payment not confirmed"
        );
        return Err((
            StatusCode::BAD_REQUEST,
            format!("payment status is '{}'", status.operation_status),
        ));
    }

    let found = state
        .payments
        .confirm(status.order_id)
        .await
        .map_err(http_error)?;
    if !found {
        return Err((
            StatusCode::NOT_FOUND,
            format!("order {} not found", status.order_id),
        ));
    }

    info!(order_id = %status.order_id, "payment confirmed");
    Ok(StatusCode::OK)
}

fn decode_callback(data: &str) -> Result<PaymentStatus, HttpError> {
    let bytes = STANDARD.decode(data.trim()).map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            format!("callback data is not base64: {e}"),
        )
    })?;
    serde_json::from_slice(&bytes).map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            format!("callback data is not a payment status: {e}"),
        )
    })
}
