//! Persistence seam for the leasing engine.
//!
//! [`LeaseStore`] is the only way domain code reaches persisted state. Every
//! mutating method that the engine relies on for correctness under
//! concurrency is a conditional update: it applies only if the row still
//! matches the caller's [`LeaseExpectation`], and reports whether it did.
//!
//! Implementations return [`CoreError::StoreUnavailable`] for transport or
//! database failures. The [`guarded_read`] and [`guarded_write`] helpers add
//! the per-call timeout and the read retry policy on top.

pub mod memory;

use std::future::Future;

use async_trait::async_trait;

use crate::config::EngineConfig;
use crate::error::CoreError;
use crate::models::{
    ActivityLog, Area, Invoice, Lease, LeaseEvent, LeaseExpectation, LeaseMode, LeaseTransition,
    NewActivityLog, NewTransaction, Transaction, TransactionRange, Unit, UserProfile,
};
use crate::types::DbId;

#[async_trait]
pub trait LeaseStore: Send + Sync {
    /// Liveness check used by the health endpoint.
    async fn ping(&self) -> Result<(), CoreError>;

    // -- Catalogue -----------------------------------------------------------

    async fn list_areas(&self) -> Result<Vec<Area>, CoreError>;

    async fn find_area(&self, id: DbId) -> Result<Option<Area>, CoreError>;

    async fn find_unit(&self, id: DbId) -> Result<Option<Unit>, CoreError>;

    async fn list_units_in_area(&self, area_num: i32) -> Result<Vec<Unit>, CoreError>;

    // -- Leases --------------------------------------------------------------

    async fn find_lease(&self, unit_id: DbId) -> Result<Option<Lease>, CoreError>;

    /// Non-available leases whose holder is `user_id`.
    async fn list_leases_held_by(&self, user_id: DbId) -> Result<Vec<Lease>, CoreError>;

    async fn list_leases_in_mode(&self, mode: LeaseMode) -> Result<Vec<Lease>, CoreError>;

    /// Reset the unit's lease to available if it still matches `expected`.
    ///
    /// Returns `true` only for the caller whose update applied.
    async fn reclaim_lease(
        &self,
        unit_id: DbId,
        expected: &LeaseExpectation,
    ) -> Result<bool, CoreError>;

    /// Open a new lease event and point the unit's lease at it, if the lease
    /// still matches `expected`. Both happen or neither does.
    ///
    /// A unit without a lease row is treated as available; the row is
    /// created on first use and only updated afterwards.
    async fn transition_lease(
        &self,
        unit_id: DbId,
        expected: &LeaseExpectation,
        next: &LeaseTransition,
    ) -> Result<Option<LeaseEvent>, CoreError>;

    // -- Lease events --------------------------------------------------------

    async fn find_lease_event(&self, id: DbId) -> Result<Option<LeaseEvent>, CoreError>;

    async fn list_lease_events_for_user(&self, user_id: DbId)
        -> Result<Vec<LeaseEvent>, CoreError>;

    // -- Activity log --------------------------------------------------------

    async fn insert_activity_log(&self, entry: &NewActivityLog) -> Result<ActivityLog, CoreError>;

    async fn find_activity_log(&self, id: DbId) -> Result<Option<ActivityLog>, CoreError>;

    /// Authorized `*_auth` entries, restricted to the given lease events when
    /// `lease_event_ids` is `Some`.
    async fn list_authorized_auth_activity(
        &self,
        lease_event_ids: Option<&[DbId]>,
    ) -> Result<Vec<ActivityLog>, CoreError>;

    /// Record that an authorization entry gated `action`. Returns `false`
    /// if the entry was already consumed.
    async fn record_consumption(&self, activity_log_id: DbId, action: &str)
        -> Result<bool, CoreError>;

    // -- Transactions --------------------------------------------------------

    async fn insert_transaction(&self, entry: &NewTransaction) -> Result<Transaction, CoreError>;

    async fn list_transactions(&self, range: &TransactionRange)
        -> Result<Vec<Transaction>, CoreError>;

    // -- Read-only external records ------------------------------------------

    async fn find_invoice_for_activity(
        &self,
        activity_log_id: DbId,
    ) -> Result<Option<Invoice>, CoreError>;

    async fn find_user(&self, id: DbId) -> Result<Option<UserProfile>, CoreError>;
}

/// Run a read with the configured timeout, retrying transient failures.
///
/// A timeout or [`CoreError::StoreUnavailable`] is retried up to
/// `config.read_retries` times. Any other error is returned immediately.
pub async fn guarded_read<T, F, Fut>(
    config: &EngineConfig,
    op: &'static str,
    mut call: F,
) -> Result<T, CoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CoreError>>,
{
    let mut attempt: u32 = 0;
    loop {
        let failure = match tokio::time::timeout(config.store_timeout, call()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(CoreError::StoreUnavailable(msg))) => msg,
            Ok(Err(other)) => return Err(other),
            Err(_) => format!("{op} timed out after {:?}", config.store_timeout),
        };

        if attempt >= config.read_retries {
            tracing::error!(op, attempt, error = %failure, "Store read failed");
            return Err(CoreError::StoreUnavailable(failure));
        }
        attempt += 1;
        tracing::warn!(op, attempt, error = %failure, "Retrying store read");
    }
}

/// Run a write with the configured timeout. Writes are never retried; a
/// timeout is reported as [`CoreError::StoreUnavailable`].
pub async fn guarded_write<T, Fut>(
    config: &EngineConfig,
    op: &'static str,
    call: Fut,
) -> Result<T, CoreError>
where
    Fut: Future<Output = Result<T, CoreError>>,
{
    match tokio::time::timeout(config.store_timeout, call).await {
        Ok(result) => result,
        Err(_) => {
            tracing::error!(op, timeout = ?config.store_timeout, "Store write timed out");
            Err(CoreError::StoreUnavailable(format!(
                "{op} timed out after {:?}",
                config.store_timeout
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use assert_matches::assert_matches;

    use super::*;

    fn config(retries: u32) -> EngineConfig {
        EngineConfig {
            store_timeout: Duration::from_millis(50),
            read_retries: retries,
            ..EngineConfig::default()
        }
    }

    #[tokio::test]
    async fn read_retries_transient_failures() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = guarded_read(&config(2), "ping", move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(CoreError::StoreUnavailable("flaky".into()))
            } else {
                Ok(5)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 5);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn read_gives_up_after_retries() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), _> = guarded_read(&config(1), "ping", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(CoreError::StoreUnavailable("down".into()))
        })
        .await;

        assert_matches!(result, Err(CoreError::StoreUnavailable(_)));
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn read_does_not_retry_domain_errors() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), _> = guarded_read(&config(3), "ping", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(CoreError::NotAuthorized(1))
        })
        .await;

        assert_matches!(result, Err(CoreError::NotAuthorized(1)));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn read_timeouts_are_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = guarded_read(&config(1), "ping", move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                tokio::time::sleep(Duration::from_secs(10)).await;
            }
            Ok::<_, CoreError>("late")
        })
        .await;

        assert_eq!(result.unwrap(), "late");
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn write_timeout_is_store_unavailable() {
        let result: Result<(), _> = guarded_write(&config(5), "insert", async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(())
        })
        .await;

        assert_matches!(result, Err(CoreError::StoreUnavailable(msg)) if msg.contains("insert"));
    }
}
