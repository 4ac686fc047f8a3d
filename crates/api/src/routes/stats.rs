//! Route definitions for the `/stats` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::stats;
use crate::state::AppState;

/// Routes mounted at `/stats`.
///
/// Everything except `/user/sessions` requires the `admin` role (enforced by
/// handler extractors).
///
/// ```text
/// GET    /overdue-threshold       -> overdue leases
/// POST   /rental-shares           -> usage shares
/// GET    /transaction/summary     -> transactions in range
/// GET    /transaction/college     -> revenue per affiliation
/// GET    /user/sessions           -> caller's sessions
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/overdue-threshold", get(stats::overdue))
        .route("/rental-shares", post(stats::rental_shares))
        .route("/transaction/summary", get(stats::transaction_summary_page))
        .route("/transaction/college", get(stats::transaction_college))
        .route("/user/sessions", get(stats::my_sessions))
}
