//! Promotion directory (minimal authoring).

use axum::extract::{Path, State};
use axum::Json;
use kassa_core::validation::validate_required;
use kassa_core::{DiscountKind, Promotion};
use serde::Deserialize;

use crate::error::{ApiError, ApiResponse, ApiResult};
use crate::state::AppState;

/// GET /promotions
pub async fn list_promotions(State(state): State<AppState>) -> ApiResult<Vec<Promotion>> {
    Ok(ApiResponse::ok(state.db.promotions().list().await?))
}

/// POST /promotions
///
/// Creates or replaces a promotion by id.
pub async fn save_promotion(State(state): State<AppState>, Json(promotion): Json<Promotion>) -> ApiResult<Promotion> {
    validate_required("id", &promotion.id)?;
    validate_required("name", &promotion.name)?;

    let value = promotion.result.value;
    let in_range = match promotion.result.kind {
        DiscountKind::PercentDiscount => (1..=100).contains(&value),
        DiscountKind::FixedDiscount => value > 0,
    };
    if !in_range {
        return Err(ApiError::validation(format!("discount value {value} is out of range")));
    }
    if promotion.conditions.iter().any(|c| c.value < 0) {
        return Err(ApiError::validation("condition thresholds must not be negative"));
    }

    state.db.promotions().upsert(&promotion).await?;
    Ok(ApiResponse::ok(promotion))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TogglePromotionRequest {
    pub is_active: bool,
}

/// PATCH /promotions/{id}
pub async fn toggle_promotion(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<TogglePromotionRequest>,
) -> ApiResult<Promotion> {
    let promotions = state.db.promotions();
    promotions.set_active(&id, req.is_active).await?;
    Ok(ApiResponse::ok(promotions.get(&id).await?))
}
