//! [`LeaseStore`] backed by PostgreSQL.

use async_trait::async_trait;
use locker_core::error::CoreError;
use locker_core::models::{
    ActivityLog, Area, Invoice, Lease, LeaseEvent, LeaseExpectation, LeaseMode, LeaseTransition,
    NewActivityLog, NewTransaction, Transaction, TransactionRange, Unit, UserProfile,
};
use locker_core::store::LeaseStore;
use locker_core::types::DbId;

use crate::repositories::{
    ActivityLogRepo, AreaRepo, ConsumptionRepo, InvoiceRepo, LeaseEventRepo, LeaseRepo,
    TransactionRepo, UnitRepo, UserRepo,
};
use crate::DbPool;

/// Lease store over a shared connection pool.
#[derive(Clone)]
pub struct PgLeaseStore {
    pool: DbPool,
}

impl PgLeaseStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

/// Log a database failure and report it as a store outage. The caller sees
/// only the operation name.
fn unavailable(op: &'static str) -> impl FnOnce(sqlx::Error) -> CoreError {
    move |e| {
        tracing::error!(op, error = %e, "Database operation failed");
        CoreError::StoreUnavailable(format!("{op} failed"))
    }
}

fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>, CoreError>
where
    T: TryFrom<R, Error = CoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

#[async_trait]
impl LeaseStore for PgLeaseStore {
    async fn ping(&self) -> Result<(), CoreError> {
        crate::health_check(&self.pool)
            .await
            .map_err(unavailable("ping"))
    }

    async fn list_areas(&self) -> Result<Vec<Area>, CoreError> {
        let rows = AreaRepo::list(&self.pool)
            .await
            .map_err(unavailable("list_areas"))?;
        Ok(rows.into_iter().map(Area::from).collect())
    }

    async fn find_area(&self, id: DbId) -> Result<Option<Area>, CoreError> {
        let row = AreaRepo::find_by_id(&self.pool, id)
            .await
            .map_err(unavailable("find_area"))?;
        Ok(row.map(Area::from))
    }

    async fn find_unit(&self, id: DbId) -> Result<Option<Unit>, CoreError> {
        let row = UnitRepo::find_by_id(&self.pool, id)
            .await
            .map_err(unavailable("find_unit"))?;
        Ok(row.map(Unit::from))
    }

    async fn list_units_in_area(&self, area_num: i32) -> Result<Vec<Unit>, CoreError> {
        let rows = UnitRepo::list_by_area(&self.pool, area_num)
            .await
            .map_err(unavailable("list_units_in_area"))?;
        Ok(rows.into_iter().map(Unit::from).collect())
    }

    async fn find_lease(&self, unit_id: DbId) -> Result<Option<Lease>, CoreError> {
        LeaseRepo::find_by_unit(&self.pool, unit_id)
            .await
            .map_err(unavailable("find_lease"))?
            .map(Lease::try_from)
            .transpose()
    }

    async fn list_leases_held_by(&self, user_id: DbId) -> Result<Vec<Lease>, CoreError> {
        let rows = LeaseRepo::list_held_by(&self.pool, user_id)
            .await
            .map_err(unavailable("list_leases_held_by"))?;
        convert_all(rows)
    }

    async fn list_leases_in_mode(&self, mode: LeaseMode) -> Result<Vec<Lease>, CoreError> {
        let rows = LeaseRepo::list_by_mode(&self.pool, mode)
            .await
            .map_err(unavailable("list_leases_in_mode"))?;
        convert_all(rows)
    }

    async fn reclaim_lease(
        &self,
        unit_id: DbId,
        expected: &LeaseExpectation,
    ) -> Result<bool, CoreError> {
        LeaseRepo::reclaim(&self.pool, unit_id, expected)
            .await
            .map_err(unavailable("reclaim_lease"))
    }

    async fn transition_lease(
        &self,
        unit_id: DbId,
        expected: &LeaseExpectation,
        next: &LeaseTransition,
    ) -> Result<Option<LeaseEvent>, CoreError> {
        let row = LeaseRepo::transition(&self.pool, unit_id, expected, next)
            .await
            .map_err(unavailable("transition_lease"))?;
        Ok(row.map(LeaseEvent::from))
    }

    async fn find_lease_event(&self, id: DbId) -> Result<Option<LeaseEvent>, CoreError> {
        let row = LeaseEventRepo::find_by_id(&self.pool, id)
            .await
            .map_err(unavailable("find_lease_event"))?;
        Ok(row.map(LeaseEvent::from))
    }

    async fn list_lease_events_for_user(
        &self,
        user_id: DbId,
    ) -> Result<Vec<LeaseEvent>, CoreError> {
        let rows = LeaseEventRepo::list_for_user(&self.pool, user_id)
            .await
            .map_err(unavailable("list_lease_events_for_user"))?;
        Ok(rows.into_iter().map(LeaseEvent::from).collect())
    }

    async fn insert_activity_log(&self, entry: &NewActivityLog) -> Result<ActivityLog, CoreError> {
        let row = ActivityLogRepo::insert(&self.pool, entry)
            .await
            .map_err(unavailable("insert_activity_log"))?;
        ActivityLog::try_from(row)
    }

    async fn find_activity_log(&self, id: DbId) -> Result<Option<ActivityLog>, CoreError> {
        ActivityLogRepo::find_by_id(&self.pool, id)
            .await
            .map_err(unavailable("find_activity_log"))?
            .map(ActivityLog::try_from)
            .transpose()
    }

    async fn list_authorized_auth_activity(
        &self,
        lease_event_ids: Option<&[DbId]>,
    ) -> Result<Vec<ActivityLog>, CoreError> {
        let rows = ActivityLogRepo::list_authorized_auth(&self.pool, lease_event_ids)
            .await
            .map_err(unavailable("list_authorized_auth_activity"))?;
        convert_all(rows)
    }

    async fn record_consumption(
        &self,
        activity_log_id: DbId,
        action: &str,
    ) -> Result<bool, CoreError> {
        ConsumptionRepo::record(&self.pool, activity_log_id, action)
            .await
            .map_err(unavailable("record_consumption"))
    }

    async fn insert_transaction(&self, entry: &NewTransaction) -> Result<Transaction, CoreError> {
        let row = TransactionRepo::insert(&self.pool, entry)
            .await
            .map_err(unavailable("insert_transaction"))?;
        Transaction::try_from(row)
    }

    async fn list_transactions(
        &self,
        range: &TransactionRange,
    ) -> Result<Vec<Transaction>, CoreError> {
        let rows = TransactionRepo::list_in_range(&self.pool, range)
            .await
            .map_err(unavailable("list_transactions"))?;
        convert_all(rows)
    }

    async fn find_invoice_for_activity(
        &self,
        activity_log_id: DbId,
    ) -> Result<Option<Invoice>, CoreError> {
        let row = InvoiceRepo::find_for_activity(&self.pool, activity_log_id)
            .await
            .map_err(unavailable("find_invoice_for_activity"))?;
        Ok(row.map(Invoice::from))
    }

    async fn find_user(&self, id: DbId) -> Result<Option<UserProfile>, CoreError> {
        let row = UserRepo::find_by_id(&self.pool, id)
            .await
            .map_err(unavailable("find_user"))?;
        Ok(row.map(UserProfile::from))
    }
}
