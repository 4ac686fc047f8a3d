//! Handlers for the `/stats` resource: overdue scans, usage and revenue
//! accounting, and the caller's own session history.

use std::collections::BTreeMap;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::Json;
use locker_core::accounting::{
    aggregate_shares, transaction_shares, transaction_summary, RentalShares, TransactionPage,
    TransactionShare,
};
use locker_core::catalogue::user_sessions;
use locker_core::error::CoreError;
use locker_core::ids::{parse_epoch, parse_id};
use locker_core::models::LeaseEvent;
use locker_core::overdue::{scan_overdue, OverdueEntry};
use locker_core::types::{epoch_now, DbId, EpochSecs};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::extract::lenient_string_list;
use crate::middleware::rbac::{RequireAdmin, RequireAuth};
use crate::response::ApiResponse;
use crate::state::AppState;

// ── Overdue ─────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct OverdueParams {
    pub over_threshold: Option<String>,
}

fn parse_flag(raw: Option<&str>) -> Result<bool, AppError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Err(CoreError::MissingParameter {
            param: "Over threshold",
        }
        .into()),
        Some("true" | "1") => Ok(true),
        Some("false" | "0") => Ok(false),
        Some(other) => Err(AppError::BadRequest(format!(
            "over_threshold must be true or false, got '{other}'"
        ))),
    }
}

/// GET /api/v1/stats/overdue-threshold?over_threshold=
///
/// Occupied leases past their end time, most overdue first. With
/// `over_threshold=true` only leases past the grace period are listed.
pub async fn overdue(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    params: Result<Query<OverdueParams>, QueryRejection>,
) -> AppResult<Json<ApiResponse<Vec<OverdueEntry>>>> {
    let Query(params) = params?;
    let over_threshold = parse_flag(params.over_threshold.as_deref())?;

    let entries = scan_overdue(state.store(), state.engine(), epoch_now(), over_threshold).await?;
    Ok(Json(ApiResponse::ok(entries)))
}

// ── Rental shares ───────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct RentalSharesBody {
    #[serde(default, deserialize_with = "lenient_string_list")]
    pub session_ids: Option<Vec<String>>,
}

/// POST /api/v1/stats/rental-shares
///
/// Usage statistics for the listed sessions, or every session when
/// `session_ids` is absent.
pub async fn rental_shares(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    body: Result<Json<RentalSharesBody>, JsonRejection>,
) -> AppResult<Json<ApiResponse<RentalShares>>> {
    let Json(body) = body?;

    let session_ids = match body.session_ids {
        None => None,
        Some(raw) => {
            let mut ids: Vec<DbId> = Vec::with_capacity(raw.len());
            let mut faults = Vec::new();
            for value in &raw {
                match parse_id("Session ID", Some(value)) {
                    Ok(id) => ids.push(id),
                    Err(e) => faults.push(e),
                }
            }
            CoreError::collect(faults)?;
            Some(ids)
        }
    };

    let shares = aggregate_shares(state.store(), state.engine(), session_ids.as_deref()).await?;
    Ok(Json(ApiResponse::ok(shares)))
}

// ── Transactions ────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct TransactionRangeParams {
    pub start: Option<String>,
    pub end: Option<String>,
    pub page_cursor: Option<String>,
    pub page_size: Option<String>,
}

fn parse_page(param: &'static str, raw: Option<&str>) -> Result<u32, CoreError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(0),
        Some(value) => value
            .parse()
            .map_err(|_| CoreError::InvalidIdentifier { param }),
    }
}

fn parse_range(params: &TransactionRangeParams) -> Result<(EpochSecs, EpochSecs), CoreError> {
    match (
        parse_epoch("Start Time", params.start.as_deref()),
        parse_epoch("End Time", params.end.as_deref()),
    ) {
        (Ok(start), Ok(end)) => Ok((start, end)),
        (start, end) => {
            Err(CoreError::rejected([start.err(), end.err()].into_iter().flatten()))
        }
    }
}

/// GET /api/v1/stats/transaction/summary?start=&end=&page_cursor=&page_size=
///
/// Transactions created within `[start, end]` (epoch seconds), paged.
pub async fn transaction_summary_page(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    params: Result<Query<TransactionRangeParams>, QueryRejection>,
) -> AppResult<Json<ApiResponse<TransactionPage>>> {
    let Query(params) = params?;

    let range = parse_range(&params);
    let cursor = parse_page("Page Cursor", params.page_cursor.as_deref());
    let size = parse_page("Page Size", params.page_size.as_deref());
    let ((start, end), page_cursor, page_size) = match (range, cursor, size) {
        (Ok(range), Ok(cursor), Ok(size)) => (range, cursor, size),
        (range, cursor, size) => {
            return Err(CoreError::rejected(
                [range.err(), cursor.err(), size.err()].into_iter().flatten(),
            )
            .into());
        }
    };

    let page = transaction_summary(
        state.store(),
        state.engine(),
        start,
        end,
        page_cursor,
        page_size,
    )
    .await?;
    Ok(Json(ApiResponse::ok(page)))
}

/// GET /api/v1/stats/transaction/college?start=&end=
///
/// Per-affiliation revenue and transaction share within `[start, end]`.
pub async fn transaction_college(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    params: Result<Query<TransactionRangeParams>, QueryRejection>,
) -> AppResult<Json<ApiResponse<BTreeMap<String, TransactionShare>>>> {
    let Query(params) = params?;
    let (start, end) = parse_range(&params)?;

    let shares = transaction_shares(state.store(), state.engine(), start, end).await?;
    Ok(Json(ApiResponse::ok(shares)))
}

// ── Sessions ────────────────────────────────────────────────────────

/// GET /api/v1/stats/user/sessions
///
/// The caller's own lease sessions, newest first.
pub async fn my_sessions(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> AppResult<Json<ApiResponse<Vec<LeaseEvent>>>> {
    let sessions = user_sessions(state.store(), state.engine(), user.user_id).await?;
    Ok(Json(ApiResponse::ok(sessions)))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn flags_accept_words_and_digits() {
        assert!(!parse_flag(Some("0")).unwrap());
        assert!(parse_flag(Some("true")).unwrap());
        assert_matches!(parse_flag(Some("maybe")), Err(AppError::BadRequest(_)));
    }

    #[test]
    fn flag_is_required() {
        assert_matches!(
            parse_flag(None),
            Err(AppError::Core(CoreError::MissingParameter { param: "Over threshold" }))
        );
        assert_matches!(parse_flag(Some(" ")), Err(AppError::Core(_)));
    }

    #[test]
    fn range_collects_both_faults() {
        let params = TransactionRangeParams {
            start: Some("yesterday".into()),
            end: None,
            ..TransactionRangeParams::default()
        };
        let err = parse_range(&params).unwrap_err();
        assert_eq!(err.faults().len(), 2);
    }
}
