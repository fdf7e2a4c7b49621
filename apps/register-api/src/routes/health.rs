//! Health check endpoint

use axum::extract::State;
use serde::Serialize;

use crate::error::{ApiError, ApiResponse, ApiResult, ErrorCode};
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Health {
    pub status: &'static str,
    pub version: &'static str,
    pub register_id: String,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Health> {
    if !state.db.health_check().await {
        return Err(ApiError::new(ErrorCode::Unavailable, "Storage is unavailable"));
    }

    Ok(ApiResponse::ok(Health {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        register_id: state.register_id().to_string(),
    }))
}
