//! Shared response envelope for API handlers.
//!
//! Every response, success or failure, is serialized as
//! `{ "success": bool, "data": T?, "error_code": [..], "error_msg": [..] }`.
//! Handlers return [`ApiResponse::ok`]; failures are rendered by
//! [`AppError`](crate::error::AppError).

use locker_core::error::{ErrorCode, Fault};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    pub error_code: Vec<ErrorCode>,
    pub error_msg: Vec<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error_code: Vec::new(),
            error_msg: Vec::new(),
        }
    }
}

impl ApiResponse<()> {
    /// Failure envelope listing every fault. `success` is false iff the list
    /// is non-empty.
    pub fn failure(faults: Vec<Fault>) -> Self {
        let (error_code, error_msg): (Vec<_>, Vec<_>) =
            faults.into_iter().map(|f| (f.code, f.message)).unzip();
        Self {
            success: error_code.is_empty(),
            data: None,
            error_code,
            error_msg,
        }
    }
}
