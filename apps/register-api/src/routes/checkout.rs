//! Checkout endpoint

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use kassa_core::checkout::CheckoutRequest;
use kassa_core::Receipt;
use tracing::debug;

use crate::error::{ApiError, ApiResponse};
use crate::state::AppState;

/// POST /checkout
///
/// The check is loaded server-side; any check fields the register sends
/// along are ignored. A mixed split that does not add up answers
/// `SPLIT_MISMATCH` until resent with `confirmMismatch: true`.
pub async fn checkout(
    State(state): State<AppState>,
    Json(req): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Receipt>>), ApiError> {
    debug!(check_id = %req.check_id, method = req.payment_method.as_str(), "checkout");
    let outcome = state.db.receipts().checkout(state.register_id(), &req).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(outcome.receipt)))
}
