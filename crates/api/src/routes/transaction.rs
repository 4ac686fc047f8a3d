//! Route definitions for the `/transaction` resource.

use axum::routing::post;
use axum::Router;

use crate::handlers::transaction;
use crate::state::AppState;

/// Routes mounted at `/transaction`. All require authentication.
///
/// ```text
/// POST   /authorization   -> authorization decision
/// POST   /feed            -> capture fee transaction
/// POST   /acquire         -> acquire unit
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/authorization", post(transaction::authorization))
        .route("/feed", post(transaction::feed))
        .route("/acquire", post(transaction::acquire_unit))
}
