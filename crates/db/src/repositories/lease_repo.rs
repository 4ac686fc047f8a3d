//! Repositories for `rental_unit_info` and `lease_events`.
//!
//! Every write to `rental_unit_info` is conditional on the mode and lease
//! event the caller last observed. Under READ COMMITTED a concurrent
//! update blocks on the row lock and then re-checks the predicate against
//! the committed row, so only one of several racing writers applies.

use locker_core::models::{LeaseExpectation, LeaseMode, LeaseTransition};
use locker_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::lease::{LeaseEventRow, LeaseRow};

// ---------------------------------------------------------------------------
// Column lists
// ---------------------------------------------------------------------------

const LEASE_COLUMNS: &str = "unit_id, mode, lease_event_id, holder_id, updated_at";

const EVENT_COLUMNS: &str = "id, unit_id, user_id, start_time, end_time, created_at";

// ---------------------------------------------------------------------------
// LeaseRepo
// ---------------------------------------------------------------------------

pub struct LeaseRepo;

impl LeaseRepo {
    pub async fn find_by_unit(pool: &PgPool, unit_id: DbId) -> Result<Option<LeaseRow>, sqlx::Error> {
        let query = format!("SELECT {LEASE_COLUMNS} FROM rental_unit_info WHERE unit_id = $1");
        sqlx::query_as::<_, LeaseRow>(&query)
            .bind(unit_id)
            .fetch_optional(pool)
            .await
    }

    /// Active leases whose holder is `user_id`.
    pub async fn list_held_by(pool: &PgPool, user_id: DbId) -> Result<Vec<LeaseRow>, sqlx::Error> {
        let query = format!(
            "SELECT {LEASE_COLUMNS} FROM rental_unit_info \
             WHERE holder_id = $1 AND mode <> 'available' \
             ORDER BY unit_id"
        );
        sqlx::query_as::<_, LeaseRow>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    pub async fn list_by_mode(pool: &PgPool, mode: LeaseMode) -> Result<Vec<LeaseRow>, sqlx::Error> {
        let query = format!(
            "SELECT {LEASE_COLUMNS} FROM rental_unit_info WHERE mode = $1 ORDER BY unit_id"
        );
        sqlx::query_as::<_, LeaseRow>(&query)
            .bind(mode.as_str())
            .fetch_all(pool)
            .await
    }

    /// Reset a lease to available if it still matches `expected`.
    ///
    /// Returns `true` if this call applied the reset.
    pub async fn reclaim(
        pool: &PgPool,
        unit_id: DbId,
        expected: &LeaseExpectation,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE rental_unit_info \
             SET mode = 'available', lease_event_id = NULL, holder_id = NULL, updated_at = now() \
             WHERE unit_id = $1 AND mode = $2 AND lease_event_id IS NOT DISTINCT FROM $3",
        )
        .bind(unit_id)
        .bind(expected.mode.as_str())
        .bind(expected.lease_event_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Create the lease row for a unit if it does not exist yet.
    pub async fn ensure_row(conn: &mut PgConnection, unit_id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO rental_unit_info (unit_id) VALUES ($1) ON CONFLICT (unit_id) DO NOTHING",
        )
        .bind(unit_id)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Point the lease at `lease_event_id` if it still matches `expected`.
    pub async fn swap(
        conn: &mut PgConnection,
        unit_id: DbId,
        expected: &LeaseExpectation,
        mode: LeaseMode,
        lease_event_id: DbId,
        holder_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE rental_unit_info \
             SET mode = $4, lease_event_id = $5, holder_id = $6, updated_at = now() \
             WHERE unit_id = $1 AND mode = $2 AND lease_event_id IS NOT DISTINCT FROM $3",
        )
        .bind(unit_id)
        .bind(expected.mode.as_str())
        .bind(expected.lease_event_id)
        .bind(mode.as_str())
        .bind(lease_event_id)
        .bind(holder_id)
        .execute(conn)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Open a lease event and move the lease onto it in one transaction.
    ///
    /// Returns `None`, with nothing written, if the lease no longer matches
    /// `expected`.
    pub async fn transition(
        pool: &PgPool,
        unit_id: DbId,
        expected: &LeaseExpectation,
        next: &LeaseTransition,
    ) -> Result<Option<LeaseEventRow>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        Self::ensure_row(&mut *tx, unit_id).await?;
        let event = LeaseEventRepo::insert(&mut *tx, unit_id, next).await?;
        let applied = Self::swap(&mut *tx, unit_id, expected, next.mode, event.id, next.user_id).await?;

        if !applied {
            tx.rollback().await?;
            return Ok(None);
        }
        tx.commit().await?;
        Ok(Some(event))
    }
}

// ---------------------------------------------------------------------------
// LeaseEventRepo
// ---------------------------------------------------------------------------

pub struct LeaseEventRepo;

impl LeaseEventRepo {
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<LeaseEventRow>, sqlx::Error> {
        let query = format!("SELECT {EVENT_COLUMNS} FROM lease_events WHERE id = $1");
        sqlx::query_as::<_, LeaseEventRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// A user's lease events, newest first.
    pub async fn list_for_user(pool: &PgPool, user_id: DbId) -> Result<Vec<LeaseEventRow>, sqlx::Error> {
        let query = format!(
            "SELECT {EVENT_COLUMNS} FROM lease_events \
             WHERE user_id = $1 ORDER BY start_time DESC, id DESC"
        );
        sqlx::query_as::<_, LeaseEventRow>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    pub async fn insert(
        conn: &mut PgConnection,
        unit_id: DbId,
        next: &LeaseTransition,
    ) -> Result<LeaseEventRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO lease_events (unit_id, user_id, start_time, end_time, created_at) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {EVENT_COLUMNS}"
        );
        sqlx::query_as::<_, LeaseEventRow>(&query)
            .bind(unit_id)
            .bind(next.user_id)
            .bind(next.start_time)
            .bind(next.end_time)
            .bind(next.created_at)
            .fetch_one(conn)
            .await
    }
}
