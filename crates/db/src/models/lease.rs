//! Lease (`rental_unit_info`) and lease event rows.

use locker_core::error::CoreError;
use locker_core::models::{Lease, LeaseEvent, LeaseMode};
use locker_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// One row per unit. `mode` is stored as text.
#[derive(Debug, Clone, FromRow)]
pub struct LeaseRow {
    pub unit_id: DbId,
    pub mode: String,
    pub lease_event_id: Option<DbId>,
    pub holder_id: Option<DbId>,
    pub updated_at: Timestamp,
}

impl TryFrom<LeaseRow> for Lease {
    type Error = CoreError;

    fn try_from(row: LeaseRow) -> Result<Self, Self::Error> {
        let mode = LeaseMode::parse(&row.mode).ok_or_else(|| {
            CoreError::Internal(format!(
                "unit {} has unknown lease mode '{}'",
                row.unit_id, row.mode
            ))
        })?;
        Ok(Lease {
            unit_id: row.unit_id,
            mode,
            lease_event_id: row.lease_event_id,
            holder_id: row.holder_id,
        })
    }
}

/// Immutable lease event. `end_time` is nullable in storage.
#[derive(Debug, Clone, FromRow)]
pub struct LeaseEventRow {
    pub id: DbId,
    pub unit_id: DbId,
    pub user_id: DbId,
    pub start_time: i64,
    pub end_time: Option<i64>,
    pub created_at: Timestamp,
}

impl From<LeaseEventRow> for LeaseEvent {
    fn from(row: LeaseEventRow) -> Self {
        LeaseEvent {
            id: row.id,
            unit_id: row.unit_id,
            user_id: row.user_id,
            start_time: row.start_time,
            end_time: row.end_time,
            created_at: row.created_at,
        }
    }
}
