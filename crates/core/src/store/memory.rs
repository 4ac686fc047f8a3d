//! In-process [`LeaseStore`] used by tests and by the `memory` store backend
//! for local development.
//!
//! All state lives behind a single async mutex, so each trait method is
//! atomic. Optional latency and outage switches let tests exercise the
//! timeout and retry paths.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::LeaseStore;
use crate::error::CoreError;
use crate::models::{
    ActivityLog, Area, Invoice, Lease, LeaseEvent, LeaseExpectation, LeaseMode, LeaseTransition,
    NewActivityLog, NewTransaction, Transaction, TransactionRange, Unit, UserProfile,
};
use crate::types::{DbId, EpochSecs, Timestamp};

#[derive(Debug, Default)]
struct MemoryState {
    next_id: DbId,
    areas: BTreeMap<DbId, Area>,
    units: BTreeMap<DbId, Unit>,
    leases: BTreeMap<DbId, Lease>,
    lease_events: BTreeMap<DbId, LeaseEvent>,
    activity_logs: BTreeMap<DbId, ActivityLog>,
    consumed: HashSet<DbId>,
    transactions: BTreeMap<DbId, Transaction>,
    invoices: BTreeMap<DbId, Invoice>,
    users: BTreeMap<DbId, UserProfile>,
}

impl MemoryState {
    fn allocate_id(&mut self) -> DbId {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Debug, Default)]
pub struct MemoryLeaseStore {
    state: Mutex<MemoryState>,
    latency_ms: AtomicU64,
    unavailable: AtomicBool,
    reclamations: AtomicU64,
}

impl MemoryLeaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every store call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    /// Make every store call fail with [`CoreError::StoreUnavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of successful [`LeaseStore::reclaim_lease`] calls so far.
    pub fn reclamation_count(&self) -> u64 {
        self.reclamations.load(Ordering::SeqCst)
    }

    async fn enter(&self) -> Result<tokio::sync::MutexGuard<'_, MemoryState>, CoreError> {
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CoreError::StoreUnavailable(
                "memory store is offline".to_string(),
            ));
        }
        Ok(self.state.lock().await)
    }

    // -- Seeding -------------------------------------------------------------

    pub async fn insert_area(&self, area_num: i32, name: &str) -> Area {
        let mut state = self.state.lock().await;
        let area = Area {
            id: state.allocate_id(),
            area_num,
            name: name.to_string(),
        };
        state.areas.insert(area.id, area.clone());
        area
    }

    /// Provision a unit together with its (available) lease row.
    pub async fn insert_unit(&self, unit_num: i32, area_num: i32) -> Unit {
        let mut state = self.state.lock().await;
        let unit = Unit {
            id: state.allocate_id(),
            unit_num,
            area_num,
        };
        state.units.insert(unit.id, unit.clone());
        state.leases.insert(unit.id, Lease::available(unit.id));
        unit
    }

    pub async fn insert_user(
        &self,
        id_num: i64,
        first_name: &str,
        last_name: &str,
        college: &str,
    ) -> UserProfile {
        let mut state = self.state.lock().await;
        let user = UserProfile {
            id: state.allocate_id(),
            id_num,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            college: college.to_string(),
        };
        state.users.insert(user.id, user.clone());
        user
    }

    pub async fn insert_invoice(&self, activity_log_id: DbId, hours: f64, amount: f64) -> Invoice {
        let mut state = self.state.lock().await;
        let invoice = Invoice {
            id: state.allocate_id(),
            activity_log_id,
            hours,
            amount,
        };
        state.invoices.insert(invoice.id, invoice.clone());
        invoice
    }

    /// Write a lease event and point the unit's lease at it, bypassing the
    /// conditional transition. Fixture helper.
    pub async fn occupy(
        &self,
        unit_id: DbId,
        user_id: DbId,
        mode: LeaseMode,
        start_time: EpochSecs,
        end_time: Option<EpochSecs>,
    ) -> LeaseEvent {
        let mut state = self.state.lock().await;
        let event = LeaseEvent {
            id: state.allocate_id(),
            unit_id,
            user_id,
            start_time,
            end_time,
            created_at: Timestamp::default(),
        };
        state.lease_events.insert(event.id, event.clone());
        state.leases.insert(
            unit_id,
            Lease {
                unit_id,
                mode,
                lease_event_id: Some(event.id),
                holder_id: Some(user_id),
            },
        );
        event
    }

    /// Overwrite a lease row verbatim. Fixture helper for malformed states.
    pub async fn put_lease(&self, lease: Lease) {
        self.state.lock().await.leases.insert(lease.unit_id, lease);
    }

    // -- Inspection ----------------------------------------------------------

    pub async fn lease(&self, unit_id: DbId) -> Option<Lease> {
        self.state.lock().await.leases.get(&unit_id).cloned()
    }

    pub async fn activity_logs(&self) -> Vec<ActivityLog> {
        self.state.lock().await.activity_logs.values().cloned().collect()
    }

    pub async fn transactions(&self) -> Vec<Transaction> {
        self.state.lock().await.transactions.values().cloned().collect()
    }

    pub async fn lease_events(&self) -> Vec<LeaseEvent> {
        self.state.lock().await.lease_events.values().cloned().collect()
    }
}

#[async_trait]
impl LeaseStore for MemoryLeaseStore {
    async fn ping(&self) -> Result<(), CoreError> {
        self.enter().await.map(|_| ())
    }

    async fn list_areas(&self) -> Result<Vec<Area>, CoreError> {
        let state = self.enter().await?;
        let mut areas: Vec<Area> = state.areas.values().cloned().collect();
        areas.sort_by_key(|a| a.area_num);
        Ok(areas)
    }

    async fn find_area(&self, id: DbId) -> Result<Option<Area>, CoreError> {
        Ok(self.enter().await?.areas.get(&id).cloned())
    }

    async fn find_unit(&self, id: DbId) -> Result<Option<Unit>, CoreError> {
        Ok(self.enter().await?.units.get(&id).cloned())
    }

    async fn list_units_in_area(&self, area_num: i32) -> Result<Vec<Unit>, CoreError> {
        let state = self.enter().await?;
        let mut units: Vec<Unit> = state
            .units
            .values()
            .filter(|u| u.area_num == area_num)
            .cloned()
            .collect();
        units.sort_by_key(|u| u.unit_num);
        Ok(units)
    }

    async fn find_lease(&self, unit_id: DbId) -> Result<Option<Lease>, CoreError> {
        Ok(self.enter().await?.leases.get(&unit_id).cloned())
    }

    async fn list_leases_held_by(&self, user_id: DbId) -> Result<Vec<Lease>, CoreError> {
        let state = self.enter().await?;
        Ok(state
            .leases
            .values()
            .filter(|l| l.mode.is_active() && l.holder_id == Some(user_id))
            .cloned()
            .collect())
    }

    async fn list_leases_in_mode(&self, mode: LeaseMode) -> Result<Vec<Lease>, CoreError> {
        let state = self.enter().await?;
        Ok(state
            .leases
            .values()
            .filter(|l| l.mode == mode)
            .cloned()
            .collect())
    }

    async fn reclaim_lease(
        &self,
        unit_id: DbId,
        expected: &LeaseExpectation,
    ) -> Result<bool, CoreError> {
        let mut state = self.enter().await?;
        match state.leases.get_mut(&unit_id) {
            Some(lease) if expected.matches(lease) => {
                *lease = Lease::available(unit_id);
                self.reclamations.fetch_add(1, Ordering::SeqCst);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn transition_lease(
        &self,
        unit_id: DbId,
        expected: &LeaseExpectation,
        next: &LeaseTransition,
    ) -> Result<Option<LeaseEvent>, CoreError> {
        let mut state = self.enter().await?;
        let current = state
            .leases
            .get(&unit_id)
            .cloned()
            .unwrap_or_else(|| Lease::available(unit_id));
        if !expected.matches(&current) {
            return Ok(None);
        }

        let event = LeaseEvent {
            id: state.allocate_id(),
            unit_id,
            user_id: next.user_id,
            start_time: next.start_time,
            end_time: Some(next.end_time),
            created_at: next.created_at,
        };
        state.lease_events.insert(event.id, event.clone());
        state.leases.insert(
            unit_id,
            Lease {
                unit_id,
                mode: next.mode,
                lease_event_id: Some(event.id),
                holder_id: Some(next.user_id),
            },
        );
        Ok(Some(event))
    }

    async fn find_lease_event(&self, id: DbId) -> Result<Option<LeaseEvent>, CoreError> {
        Ok(self.enter().await?.lease_events.get(&id).cloned())
    }

    async fn list_lease_events_for_user(
        &self,
        user_id: DbId,
    ) -> Result<Vec<LeaseEvent>, CoreError> {
        let state = self.enter().await?;
        let mut events: Vec<LeaseEvent> = state
            .lease_events
            .values()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        events.sort_by(|a, b| b.start_time.cmp(&a.start_time).then(b.id.cmp(&a.id)));
        Ok(events)
    }

    async fn insert_activity_log(&self, entry: &NewActivityLog) -> Result<ActivityLog, CoreError> {
        let mut state = self.enter().await?;
        let log = ActivityLog {
            id: state.allocate_id(),
            kind: entry.kind,
            authorized: entry.authorized,
            user_id: entry.user_id,
            unit_id: entry.unit_id,
            lease_event_id: entry.lease_event_id,
            transaction_type: entry.transaction_type,
            created_at: entry.created_at,
        };
        state.activity_logs.insert(log.id, log.clone());
        Ok(log)
    }

    async fn find_activity_log(&self, id: DbId) -> Result<Option<ActivityLog>, CoreError> {
        Ok(self.enter().await?.activity_logs.get(&id).cloned())
    }

    async fn list_authorized_auth_activity(
        &self,
        lease_event_ids: Option<&[DbId]>,
    ) -> Result<Vec<ActivityLog>, CoreError> {
        let state = self.enter().await?;
        Ok(state
            .activity_logs
            .values()
            .filter(|log| log.authorized && log.kind.is_auth())
            .filter(|log| match (lease_event_ids, log.lease_event_id) {
                (None, Some(_)) => true,
                (Some(ids), Some(event_id)) => ids.contains(&event_id),
                (_, None) => false,
            })
            .cloned()
            .collect())
    }

    async fn record_consumption(
        &self,
        activity_log_id: DbId,
        _action: &str,
    ) -> Result<bool, CoreError> {
        Ok(self.enter().await?.consumed.insert(activity_log_id))
    }

    async fn insert_transaction(&self, entry: &NewTransaction) -> Result<Transaction, CoreError> {
        let mut state = self.enter().await?;
        let transaction = Transaction {
            id: state.allocate_id(),
            kind: entry.kind,
            amount: entry.amount,
            user_id: entry.user_id,
            activity_log_id: entry.activity_log_id,
            created_at: entry.created_at,
        };
        state
            .transactions
            .insert(transaction.id, transaction.clone());
        Ok(transaction)
    }

    async fn list_transactions(
        &self,
        range: &TransactionRange,
    ) -> Result<Vec<Transaction>, CoreError> {
        let state = self.enter().await?;
        let matching = state
            .transactions
            .values()
            .filter(|t| t.created_at >= range.from && t.created_at <= range.to)
            .skip(range.offset.max(0) as usize)
            .cloned();
        Ok(match range.limit {
            Some(limit) => matching.take(limit.max(0) as usize).collect(),
            None => matching.collect(),
        })
    }

    async fn find_invoice_for_activity(
        &self,
        activity_log_id: DbId,
    ) -> Result<Option<Invoice>, CoreError> {
        let state = self.enter().await?;
        Ok(state
            .invoices
            .values()
            .find(|i| i.activity_log_id == activity_log_id)
            .cloned())
    }

    async fn find_user(&self, id: DbId) -> Result<Option<UserProfile>, CoreError> {
        Ok(self.enter().await?.users.get(&id).cloned())
    }
}
