pub mod catalogue;
pub mod health;
pub mod stats;
pub mod transaction;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /transaction/authorization                       authorize (POST)
/// /transaction/feed                                capture fee (POST)
/// /transaction/acquire                             rent / extend / reserve (POST)
///
/// /stats/overdue-threshold                         overdue leases (admin)
/// /stats/rental-shares                             usage shares (POST, admin)
/// /stats/transaction/summary                       transactions in range (admin)
/// /stats/transaction/college                       revenue per affiliation (admin)
/// /stats/user/sessions                             caller's sessions
///
/// /units                                           units in an area
/// /units/suggest                                   random available unit
/// /areas                                           list areas
/// /areas/{id}                                      area info
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/transaction", transaction::router())
        .nest("/stats", stats::router())
        .merge(catalogue::router())
}
