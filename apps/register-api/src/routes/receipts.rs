//! Receipt endpoints: lookup and administrative corrections.

use axum::extract::{Path, State};
use axum::Json;
use kassa_core::receipt::ReceiptCorrection;
use kassa_core::Receipt;
use serde::Deserialize;
use tracing::debug;

use crate::error::{ApiResponse, ApiResult};
use crate::state::AppState;

/// GET /receipts/{id}
pub async fn get_receipt(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Receipt> {
    Ok(ApiResponse::ok(state.db.receipts().get(&id).await?))
}

/// GET /shifts/{id}/receipts
pub async fn list_for_shift(State(state): State<AppState>, Path(shift_id): Path<String>) -> ApiResult<Vec<Receipt>> {
    state.db.shifts().get(&shift_id).await?;
    Ok(ApiResponse::ok(state.db.receipts().list(&shift_id).await?))
}

/// Body of `PUT /receipts/{id}`: one correction tagged by `action`.
///
/// ```json
/// { "action": "comment", "comment": "table moved", "actor": "admin-1" }
/// ```
#[derive(Debug, Deserialize)]
pub struct CorrectionRequest {
    #[serde(flatten)]
    pub correction: ReceiptCorrection,
    #[serde(default)]
    pub actor: Option<String>,
}

/// PUT /receipts/{id}
pub async fn correct_receipt(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<CorrectionRequest>,
) -> ApiResult<Receipt> {
    debug!(receipt_id = %id, action = ?req.correction.action(), "correct_receipt");
    let receipt = state
        .db
        .receipts()
        .correct(state.ledger.tax_rate(), &id, req.correction, req.actor)
        .await?;
    Ok(ApiResponse::ok(receipt))
}
