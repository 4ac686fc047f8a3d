//! Unit activity log rows.
//!
//! Activity logs are append-only: there is no `updated_at` column.

use locker_core::activity::ActivityKind;
use locker_core::error::CoreError;
use locker_core::models::ActivityLog;
use locker_core::types::{DbId, Timestamp};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct ActivityLogRow {
    pub id: DbId,
    pub kind: String,
    pub authorized: bool,
    pub user_id: DbId,
    pub unit_id: DbId,
    pub lease_event_id: Option<DbId>,
    pub transaction_type: Option<String>,
    pub created_at: Timestamp,
}

pub(crate) fn parse_kind(id: DbId, value: &str) -> Result<ActivityKind, CoreError> {
    ActivityKind::parse(value).ok_or_else(|| {
        CoreError::Internal(format!("record {id} has unknown activity kind '{value}'"))
    })
}

impl TryFrom<ActivityLogRow> for ActivityLog {
    type Error = CoreError;

    fn try_from(row: ActivityLogRow) -> Result<Self, Self::Error> {
        let kind = parse_kind(row.id, &row.kind)?;
        let transaction_type = row
            .transaction_type
            .as_deref()
            .map(|value| parse_kind(row.id, value))
            .transpose()?;
        Ok(ActivityLog {
            id: row.id,
            kind,
            authorized: row.authorized,
            user_id: row.user_id,
            unit_id: row.unit_id,
            lease_event_id: row.lease_event_id,
            transaction_type,
            created_at: row.created_at,
        })
    }
}
