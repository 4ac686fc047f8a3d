//! Repositories for `unit_activity_logs` and `activity_consumptions`.

use locker_core::activity::AUTH_KINDS;
use locker_core::models::NewActivityLog;
use locker_core::types::DbId;
use sqlx::PgPool;

use crate::models::activity::ActivityLogRow;

/// Column list for `unit_activity_logs` SELECT queries.
const COLUMNS: &str = "\
    id, kind, authorized, user_id, unit_id, lease_event_id, \
    transaction_type, created_at";

/// Append-only access to the unit activity log.
pub struct ActivityLogRepo;

impl ActivityLogRepo {
    pub async fn insert(pool: &PgPool, entry: &NewActivityLog) -> Result<ActivityLogRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO unit_activity_logs \
             (kind, authorized, user_id, unit_id, lease_event_id, transaction_type, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ActivityLogRow>(&query)
            .bind(entry.kind.as_str())
            .bind(entry.authorized)
            .bind(entry.user_id)
            .bind(entry.unit_id)
            .bind(entry.lease_event_id)
            .bind(entry.transaction_type.map(|k| k.as_str()))
            .bind(entry.created_at)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<ActivityLogRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM unit_activity_logs WHERE id = $1");
        sqlx::query_as::<_, ActivityLogRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Authorized `*_auth` entries attached to a lease event, optionally
    /// restricted to `lease_event_ids`.
    pub async fn list_authorized_auth(
        pool: &PgPool,
        lease_event_ids: Option<&[DbId]>,
    ) -> Result<Vec<ActivityLogRow>, sqlx::Error> {
        let kinds: Vec<&str> = AUTH_KINDS.iter().map(|k| k.as_str()).collect();
        let query = format!(
            "SELECT {COLUMNS} FROM unit_activity_logs \
             WHERE authorized \
               AND kind = ANY($1) \
               AND lease_event_id IS NOT NULL \
               AND ($2::BIGINT[] IS NULL OR lease_event_id = ANY($2)) \
             ORDER BY lease_event_id, id"
        );
        sqlx::query_as::<_, ActivityLogRow>(&query)
            .bind(kinds)
            .bind(lease_event_ids.map(<[DbId]>::to_vec))
            .fetch_all(pool)
            .await
    }
}

/// Consumption marks for single-use authorization records.
pub struct ConsumptionRepo;

impl ConsumptionRepo {
    /// Record that `activity_log_id` gated `action`. Returns `false` if the
    /// record had already been consumed.
    pub async fn record(pool: &PgPool, activity_log_id: DbId, action: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO activity_consumptions (activity_log_id, action) VALUES ($1, $2) \
             ON CONFLICT (activity_log_id) DO NOTHING",
        )
        .bind(activity_log_id)
        .bind(action)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}
