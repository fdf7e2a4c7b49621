//! Check endpoints: open or resume, items, discounts, promotions, void.
//!
//! Every mutation answers with the updated check; the register folds it
//! into its state instead of refetching.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use kassa_core::check::{CheckUpdate, OpenCheckRequest};
use kassa_core::{Check, CheckStatus, Money, NewCartItem, Promotion};
use serde::Deserialize;
use tracing::debug;

use crate::error::{ApiError, ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListChecksQuery {
    pub status: Option<CheckStatus>,
}

/// GET /checks?status=open
pub async fn list_checks(State(state): State<AppState>, Query(query): Query<ListChecksQuery>) -> ApiResult<Vec<Check>> {
    Ok(ApiResponse::ok(state.db.checks().list(query.status).await?))
}

/// POST /checks
///
/// 201 with a new check, 200 with the table's existing open check.
pub async fn open_check(
    State(state): State<AppState>,
    Json(req): Json<OpenCheckRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Check>>), ApiError> {
    debug!(table_id = %req.table_id, shift_id = %req.shift_id, "open_check");
    let outcome = state.db.checks().open_or_resume(&state.ledger, req).await?;

    let status = if outcome.is_resumed() {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, ApiResponse::ok(outcome.into_check())))
}

/// GET /checks/{id}
pub async fn get_check(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Check> {
    Ok(ApiResponse::ok(state.db.checks().get(&id).await?))
}

/// PUT /checks/{id}
pub async fn update_check(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<CheckUpdate>,
) -> ApiResult<Check> {
    debug!(check_id = %id, "update_check");
    Ok(ApiResponse::ok(state.db.checks().update(&state.ledger, &id, update).await?))
}

/// POST /checks/{id}/items
pub async fn add_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(item): Json<NewCartItem>,
) -> ApiResult<Check> {
    debug!(check_id = %id, product_id = %item.product_id, qty = item.quantity, "add_item");
    Ok(ApiResponse::ok(state.db.checks().add_item(&state.ledger, &id, item).await?))
}

#[derive(Debug, Deserialize)]
pub struct QuantityRequest {
    pub quantity: i64,
}

/// PATCH /checks/{id}/items/{service_id}
pub async fn update_quantity(
    State(state): State<AppState>,
    Path((id, service_id)): Path<(String, String)>,
    Json(req): Json<QuantityRequest>,
) -> ApiResult<Check> {
    let check = state
        .db
        .checks()
        .update_quantity(&state.ledger, &id, &service_id, req.quantity)
        .await?;
    Ok(ApiResponse::ok(check))
}

/// DELETE /checks/{id}/items/{service_id}
pub async fn remove_item(
    State(state): State<AppState>,
    Path((id, service_id)): Path<(String, String)>,
) -> ApiResult<Check> {
    let check = state
        .db
        .checks()
        .remove_item(&state.ledger, &id, &service_id)
        .await?;
    Ok(ApiResponse::ok(check))
}

/// Exactly one of `percent` or `amount`.
#[derive(Debug, Deserialize)]
pub struct DiscountRequest {
    #[serde(default)]
    pub percent: Option<u32>,
    #[serde(default)]
    pub amount: Option<Money>,
}

/// POST /checks/{id}/discount
pub async fn set_discount(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<DiscountRequest>,
) -> ApiResult<Check> {
    let checks = state.db.checks();
    let check = match (req.percent, req.amount) {
        (Some(percent), None) => checks.set_discount_percent(&state.ledger, &id, percent).await?,
        (None, Some(amount)) => checks.set_discount_amount(&state.ledger, &id, amount).await?,
        _ => return Err(ApiError::validation("send exactly one of percent or amount")),
    };
    Ok(ApiResponse::ok(check))
}

/// GET /checks/{id}/promotions
///
/// Active promotions whose conditions hold for the check right now.
pub async fn applicable_promotions(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Vec<Promotion>> {
    let check = state.db.checks().get(&id).await?;
    let promotions = state.db.promotions().applicable(&check.items).await?;
    Ok(ApiResponse::ok(promotions))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyPromotionRequest {
    pub promotion_id: String,
}

/// POST /checks/{id}/promotion
pub async fn apply_promotion(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ApplyPromotionRequest>,
) -> ApiResult<Check> {
    debug!(check_id = %id, promotion_id = %req.promotion_id, "apply_promotion");
    let check = state
        .db
        .checks()
        .apply_promotion(&state.ledger, &id, &req.promotion_id)
        .await?;
    Ok(ApiResponse::ok(check))
}

/// DELETE /checks/{id}/promotion
pub async fn revoke_promotion(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Check> {
    Ok(ApiResponse::ok(state.db.checks().revoke_promotion(&state.ledger, &id).await?))
}

/// POST /checks/{id}/void
pub async fn void_check(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Check> {
    debug!(check_id = %id, "void_check");
    Ok(ApiResponse::ok(state.db.checks().void(&state.ledger, &id).await?))
}
