//! Table selection: departments and tables with derived status.

use axum::extract::{Query, State};
use kassa_core::{Department, TableView};
use serde::Deserialize;

use crate::error::{ApiResponse, ApiResult};
use crate::state::AppState;

/// GET /departments
pub async fn departments(State(state): State<AppState>) -> ApiResult<Vec<Department>> {
    Ok(ApiResponse::ok(state.db.floor().departments().await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TablesQuery {
    pub department_id: Option<String>,
}

/// GET /tables?departmentId=hall
pub async fn tables(State(state): State<AppState>, Query(query): Query<TablesQuery>) -> ApiResult<Vec<TableView>> {
    let tables = state.db.floor().tables(query.department_id.as_deref()).await?;
    Ok(ApiResponse::ok(tables))
}
