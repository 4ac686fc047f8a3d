//! Tests for `AppError` → HTTP response mapping.
//!
//! These call `IntoResponse` directly on `AppError` values; no router is
//! involved.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use http_body_util::BodyExt;
use locker_api::error::AppError;
use locker_core::error::{BusyResource, CoreError};

/// Helper: convert an `AppError` into its status code and parsed JSON body.
async fn error_to_response(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

#[tokio::test]
async fn not_found_error_returns_404() {
    let (status, json) = error_to_response(AppError::Core(CoreError::NotFound {
        entity: "Unit",
        id: 42,
    }))
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["success"], false);
    assert_eq!(json["error_code"], serde_json::json!(["not_found"]));
    assert_eq!(json["error_msg"], serde_json::json!(["Unit with id 42 not found."]));
    assert!(json.get("data").is_none());
}

#[tokio::test]
async fn bad_request_error_returns_400() {
    let (status, json) =
        error_to_response(AppError::BadRequest("invalid field value".into())).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error_code"], serde_json::json!(["invalid_request"]));
    assert_eq!(json["error_msg"], serde_json::json!(["invalid field value"]));
}

#[tokio::test]
async fn gate_failures_are_distinct_conflicts() {
    for (err, code) in [
        (CoreError::WrongCategory(1), "wrong_category"),
        (CoreError::NotAuthorized(1), "not_authorized"),
        (CoreError::AlreadyConsumed(1), "already_consumed"),
        (
            CoreError::ResourceBusy {
                resource: BusyResource::Unit,
                id: 1,
            },
            "resource_busy",
        ),
    ] {
        let (status, json) = error_to_response(AppError::Core(err)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["error_code"], serde_json::json!([code]));
    }
}

#[tokio::test]
async fn auth_errors_map_to_401_and_403() {
    let (status, _) =
        error_to_response(AppError::Core(CoreError::Unauthorized("no token".into()))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) =
        error_to_response(AppError::Core(CoreError::Forbidden("admin only".into()))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn internal_error_hides_details() {
    let (status, json) = error_to_response(AppError::Core(CoreError::Internal(
        "secret database connection string leaked".into(),
    )))
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error_code"], serde_json::json!(["internal"]));
    assert_eq!(json["error_msg"], serde_json::json!(["An internal error occurred"]));
}

#[tokio::test]
async fn rejection_lists_every_fault_with_worst_status() {
    let (status, json) = error_to_response(AppError::Core(CoreError::Rejected(vec![
        CoreError::MissingParameter { param: "Unit ID" },
        CoreError::StoreUnavailable("timeout".into()),
    ])))
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json["error_code"],
        serde_json::json!(["missing_parameter", "store_unavailable"])
    );
    assert_eq!(
        json["error_msg"],
        serde_json::json!(["Unit ID parameter is required.", "An internal error occurred"])
    );
}
