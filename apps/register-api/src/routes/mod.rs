//! HTTP routes, split into sub-modules by aggregate.

mod checkout;
mod checks;
mod floor;
mod health;
mod promotions;
mod receipts;
mod reports;
mod shifts;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Upper bound for `limit` query parameters.
pub(crate) const MAX_LIMIT: i64 = 500;

pub(crate) fn clamp_limit(limit: Option<i64>, default: i64) -> i64 {
    limit.unwrap_or(default).clamp(1, MAX_LIMIT)
}

/// Builds the full router with state and request tracing.
pub fn build_router(state: AppState) -> Router {
    let shift_routes = Router::new()
        .route(
            "/shifts",
            get(shifts::list_shifts).post(shifts::open_shift).put(shifts::update_shift),
        )
        .route("/shifts/current", get(shifts::current_shift))
        .route("/shifts/{id}", get(shifts::get_shift).patch(shifts::amend_denominations))
        .route("/shifts/{id}/close-preview", get(shifts::close_preview))
        .route("/shifts/{id}/x-report", get(shifts::x_report))
        .route(
            "/shifts/{id}/denominations",
            post(shifts::edit_denomination).delete(shifts::reset_denominations),
        )
        .route(
            "/shifts/{id}/transactions",
            get(shifts::list_transactions).post(shifts::record_transaction),
        )
        .route("/shifts/{id}/receipts", get(receipts::list_for_shift));

    let check_routes = Router::new()
        .route("/checks", get(checks::list_checks).post(checks::open_check))
        .route("/checks/{id}", get(checks::get_check).put(checks::update_check))
        .route("/checks/{id}/items", post(checks::add_item))
        .route(
            "/checks/{id}/items/{service_id}",
            axum::routing::patch(checks::update_quantity).delete(checks::remove_item),
        )
        .route("/checks/{id}/discount", post(checks::set_discount))
        .route("/checks/{id}/promotions", get(checks::applicable_promotions))
        .route(
            "/checks/{id}/promotion",
            post(checks::apply_promotion).delete(checks::revoke_promotion),
        )
        .route("/checks/{id}/void", post(checks::void_check));

    let sale_routes = Router::new()
        .route("/checkout", post(checkout::checkout))
        .route("/receipts/{id}", get(receipts::get_receipt).put(receipts::correct_receipt))
        .route("/reports", get(reports::reports));

    let directory_routes = Router::new()
        .route("/departments", get(floor::departments))
        .route("/tables", get(floor::tables))
        .route("/promotions", get(promotions::list_promotions).post(promotions::save_promotion))
        .route("/promotions/{id}", axum::routing::patch(promotions::toggle_promotion));

    Router::new()
        .route("/health", get(health::health_check))
        .merge(shift_routes)
        .merge(check_routes)
        .merge(sale_routes)
        .merge(directory_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
