//! Shift endpoints: lifecycle, staff, reports, cash counts, manual transactions.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use kassa_core::report::{ClosePreview, XReport};
use kassa_core::shift::{CloseShiftRequest, OpenShiftRequest, TransactionInput};
use kassa_core::{DenominationCounts, Money, Shift, ShiftStatus, Transaction};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::clamp_limit;
use crate::error::{ApiError, ApiResponse, ApiResult};
use crate::state::AppState;

/// POST /shifts
pub async fn open_shift(
    State(state): State<AppState>,
    Json(req): Json<OpenShiftRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Shift>>), ApiError> {
    debug!(cashier_id = %req.cashier_id, "open_shift");
    let shift = state.db.shifts().open(&state.manager, req).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(shift)))
}

/// Body of `PUT /shifts`: either a staff roster update or a close.
///
/// Older registers also send `closedAt` and client-side `totals`; both are
/// ignored, the server computes them.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateShiftRequest {
    pub id: String,
    #[serde(default)]
    pub active_staff_ids: Option<Vec<String>>,
    #[serde(default)]
    pub status: Option<ShiftStatus>,
    #[serde(default)]
    pub end_balance: Option<Money>,
    #[serde(default)]
    pub denomination_counts: Option<DenominationCounts>,
}

/// PUT /shifts
pub async fn update_shift(
    State(state): State<AppState>,
    Json(req): Json<UpdateShiftRequest>,
) -> ApiResult<Shift> {
    debug!(shift_id = %req.id, status = ?req.status, "update_shift");

    match (req.status, req.active_staff_ids) {
        (Some(ShiftStatus::Closed), _) => {
            // pending counts land before the shift freezes
            state.retire_autosave(&req.id).await?;

            let close = CloseShiftRequest {
                end_balance: req.end_balance,
                denomination_counts: req.denomination_counts,
            };
            let (shift, report) = state
                .db
                .shifts()
                .close(&state.manager, &req.id, close, state.config.top_services)
                .await?;
            info!(
                shift_id = %shift.id,
                receipts = report.summary.receipts_count,
                total_sales = %report.summary.total_sales,
                "Z-report frozen"
            );
            Ok(ApiResponse::ok(shift))
        }
        (_, Some(staff_ids)) => {
            let shift = state
                .db
                .shifts()
                .update_active_staff(&state.manager, &req.id, staff_ids)
                .await?;
            Ok(ApiResponse::ok(shift))
        }
        (Some(ShiftStatus::Open), None) => Err(ApiError::validation("a shift cannot be reopened")),
        (None, None) => Err(ApiError::validation("nothing to update: send activeStaffIds or status")),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListShiftsQuery {
    pub status: Option<ShiftStatus>,
    pub limit: Option<i64>,
}

/// GET /shifts?status=open|closed&limit=N
pub async fn list_shifts(State(state): State<AppState>, Query(query): Query<ListShiftsQuery>) -> ApiResult<Vec<Shift>> {
    let shifts = state
        .db
        .shifts()
        .list(query.status, clamp_limit(query.limit, 50))
        .await?;
    Ok(ApiResponse::ok(shifts))
}

/// GET /shifts/current
///
/// `data` is `null` when the register has no open shift.
pub async fn current_shift(State(state): State<AppState>) -> ApiResult<Option<Shift>> {
    let shift = state.db.shifts().current(state.register_id()).await?;
    Ok(ApiResponse::ok(shift))
}

/// GET /shifts/{id}
pub async fn get_shift(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Shift> {
    Ok(ApiResponse::ok(state.db.shifts().get(&id).await?))
}

/// GET /shifts/{id}/close-preview
pub async fn close_preview(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<ClosePreview> {
    let preview = state
        .db
        .shifts()
        .close_preview(&id, state.config.top_services)
        .await?;
    Ok(ApiResponse::ok(preview))
}

/// GET /shifts/{id}/x-report
pub async fn x_report(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<XReport> {
    Ok(ApiResponse::ok(state.db.shifts().x_report(&id).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmendDenominationsRequest {
    pub denomination_counts: DenominationCounts,
}

/// PATCH /shifts/{id}
///
/// Replaces the whole count; works on closed shifts too.
pub async fn amend_denominations(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<AmendDenominationsRequest>,
) -> ApiResult<Shift> {
    debug!(shift_id = %id, "amend_denominations");
    state.retire_autosave(&id).await?;
    let shift = state
        .db
        .shifts()
        .amend_denominations(&state.manager, &id, &req.denomination_counts)
        .await?;
    Ok(ApiResponse::ok(shift))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditDenominationRequest {
    pub key: String,
    pub count: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingCount {
    pub shift_id: String,
    pub key: String,
    pub count: u32,
}

/// POST /shifts/{id}/denominations
///
/// One keystroke of the cash count. Saved by the autosave worker once the
/// cashier pauses; answers 202 right away.
pub async fn edit_denomination(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<EditDenominationRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PendingCount>>), ApiError> {
    if state.manager.denominations().value_of(&req.key).is_none() {
        return Err(ApiError::validation(format!("unknown denomination '{}'", req.key)));
    }

    state.edit_count(&id, &req.key, req.count).await?;

    Ok((
        StatusCode::ACCEPTED,
        ApiResponse::ok(PendingCount {
            shift_id: id,
            key: req.key,
            count: req.count,
        }),
    ))
}

/// DELETE /shifts/{id}/denominations
///
/// Clears the count and saves immediately.
pub async fn reset_denominations(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Shift> {
    debug!(shift_id = %id, "reset_denominations");
    let shift = state.reset_counts(&id).await?;
    Ok(ApiResponse::ok(shift))
}

/// GET /shifts/{id}/transactions
pub async fn list_transactions(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Vec<Transaction>> {
    // 404 for an unknown shift rather than an empty list
    state.db.shifts().get(&id).await?;
    Ok(ApiResponse::ok(state.db.transactions().list(&id).await?))
}

/// POST /shifts/{id}/transactions
pub async fn record_transaction(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<TransactionInput>,
) -> Result<(StatusCode, Json<ApiResponse<Transaction>>), ApiError> {
    debug!(shift_id = %id, "record_transaction");
    let input = input.resolve()?;
    let transaction = state
        .db
        .transactions()
        .record(&state.manager, &id, input)
        .await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(transaction)))
}
