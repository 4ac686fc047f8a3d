use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use locker_core::error::{CoreError, ErrorCode, Fault};

use crate::response::ApiResponse;

const INTERNAL_MESSAGE: &str = "An internal error occurred";

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce the standard failure envelope.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `locker_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A request body or query string that could not be decoded.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

/// HTTP status for a single error code.
pub fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::MissingParameter
        | ErrorCode::InvalidIdentifier
        | ErrorCode::InvalidTransactionType
        | ErrorCode::InvalidAmount
        | ErrorCode::InvalidAcquireType
        | ErrorCode::InvalidDuration
        | ErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCode::Forbidden => StatusCode::FORBIDDEN,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::ResourceBusy
        | ErrorCode::WrongCategory
        | ErrorCode::NotAuthorized
        | ErrorCode::AlreadyConsumed
        | ErrorCode::SessionIdRequired => StatusCode::CONFLICT,
        ErrorCode::StoreUnavailable | ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Replace store and internal failure messages with a sanitized one,
/// logging the original.
fn sanitize(fault: Fault) -> Fault {
    match fault.code {
        ErrorCode::StoreUnavailable | ErrorCode::Internal => {
            tracing::error!(code = ?fault.code, error = %fault.message, "Request failed");
            Fault {
                code: fault.code,
                message: INTERNAL_MESSAGE.to_string(),
            }
        }
        _ => fault,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let faults = match self {
            AppError::Core(core) => core.faults(),
            AppError::BadRequest(message) => vec![Fault {
                code: ErrorCode::InvalidRequest,
                message,
            }],
        };

        // Collected faults report the most severe status among them.
        let status = faults
            .iter()
            .map(|f| status_for(f.code))
            .max_by_key(|s| s.as_u16())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let faults = faults.into_iter().map(sanitize).collect();
        (status, Json(ApiResponse::failure(faults))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameter_faults_are_bad_requests() {
        assert_eq!(status_for(ErrorCode::InvalidIdentifier), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorCode::NotAuthorized), StatusCode::CONFLICT);
        assert_eq!(status_for(ErrorCode::StoreUnavailable), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn rejection_uses_most_severe_status() {
        let err = AppError::Core(CoreError::Rejected(vec![
            CoreError::InvalidAmount,
            CoreError::NotFound {
                entity: "Unit",
                id: 4,
            },
        ]));
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn store_failures_are_sanitized() {
        let fault = sanitize(Fault {
            code: ErrorCode::StoreUnavailable,
            message: "find_lease failed: connection refused".into(),
        });
        assert_eq!(fault.message, INTERNAL_MESSAGE);
    }
}
