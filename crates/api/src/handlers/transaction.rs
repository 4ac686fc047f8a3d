//! Handlers for the `/transaction` resource: authorization decisions, fee
//! capture and unit acquisition.
//!
//! The acting user is always taken from the bearer token.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use locker_core::acquire::{acquire, AcquireReceipt, AcquireRequest};
use locker_core::capture::{capture_transaction, CaptureReceipt, CaptureRequest};
use locker_core::engine::{authorize, AuthorizationRequest, AuthorizationVerdict};
use locker_core::types::epoch_now;
use serde::Deserialize;

use crate::error::AppResult;
use crate::extract::{lenient_amount, lenient_string};
use crate::middleware::rbac::RequireAuth;
use crate::response::ApiResponse;
use crate::state::AppState;

/// Request body for `POST /transaction/authorization`.
#[derive(Debug, Default, Deserialize)]
pub struct AuthorizationBody {
    #[serde(default, deserialize_with = "lenient_string")]
    pub unit_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub transaction_type: Option<String>,
}

/// POST /api/v1/transaction/authorization
///
/// Decide whether the caller may enter the requested activity on a unit.
/// A refusal is still a recorded decision and is returned as data.
pub async fn authorization(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    body: Result<Json<AuthorizationBody>, JsonRejection>,
) -> AppResult<(StatusCode, Json<ApiResponse<AuthorizationVerdict>>)> {
    let Json(body) = body?;
    let request = AuthorizationRequest {
        unit_id: body.unit_id,
        user_id: Some(user.user_id.to_string()),
        transaction_type: body.transaction_type,
    };

    let verdict = authorize(state.store(), state.engine(), &request, epoch_now()).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(verdict))))
}

/// Request body for `POST /transaction/feed`.
#[derive(Debug, Default, Deserialize)]
pub struct CaptureBody {
    #[serde(default, deserialize_with = "lenient_string")]
    pub auth_activity_log_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub transaction_amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub transaction_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub session_id: Option<String>,
}

/// POST /api/v1/transaction/feed
///
/// Record a fee transaction against a prior successful authorization.
pub async fn feed(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    body: Result<Json<CaptureBody>, JsonRejection>,
) -> AppResult<(StatusCode, Json<ApiResponse<CaptureReceipt>>)> {
    let Json(body) = body?;
    let request = CaptureRequest {
        auth_activity_log_id: body.auth_activity_log_id,
        transaction_amount: body.transaction_amount,
        transaction_type: body.transaction_type,
        lease_event_id: body.session_id,
    };

    let receipt =
        capture_transaction(state.store(), state.engine(), user.user_id, &request, epoch_now())
            .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(receipt))))
}

/// Request body for `POST /transaction/acquire`.
#[derive(Debug, Default, Deserialize)]
pub struct AcquireBody {
    #[serde(default, deserialize_with = "lenient_string")]
    pub auth_activity_log_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub acquire_type: Option<String>,
    pub duration_secs: Option<i64>,
}

/// POST /api/v1/transaction/acquire
///
/// Rent, extend or reserve the unit named by a prior authorization.
pub async fn acquire_unit(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    body: Result<Json<AcquireBody>, JsonRejection>,
) -> AppResult<(StatusCode, Json<ApiResponse<AcquireReceipt>>)> {
    let Json(body) = body?;
    let request = AcquireRequest {
        auth_activity_log_id: body.auth_activity_log_id,
        acquire_type: body.acquire_type,
        duration_secs: body.duration_secs,
    };

    let receipt = acquire(state.store(), state.engine(), user.user_id, &request, epoch_now()).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(receipt))))
}
