//! Route definitions for areas and units.

use axum::routing::get;
use axum::Router;

use crate::handlers::catalogue;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/units", get(catalogue::units))
        .route("/units/suggest", get(catalogue::suggest))
        .route("/areas", get(catalogue::areas))
        .route("/areas/{id}", get(catalogue::area))
}
