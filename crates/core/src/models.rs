//! Domain records shared by the engine, the store implementations and the
//! API layer.

use serde::Serialize;

use crate::activity::ActivityKind;
use crate::types::{DbId, EpochSecs, Timestamp};

// ---------------------------------------------------------------------------
// Catalogue
// ---------------------------------------------------------------------------

/// A zone holding a group of locker units.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Area {
    pub id: DbId,
    pub area_num: i32,
    pub name: String,
}

/// A physical locker. Its availability is derived from its [`Lease`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Unit {
    pub id: DbId,
    pub unit_num: i32,
    pub area_num: i32,
}

/// A unit together with its derived status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitStatus {
    pub unit_id: DbId,
    pub unit_num: i32,
    pub area_num: i32,
    pub status: LeaseMode,
}

// ---------------------------------------------------------------------------
// Leases
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaseMode {
    Available,
    Occupied,
    Reserved,
}

impl LeaseMode {
    pub fn as_str(self) -> &'static str {
        match self {
            LeaseMode::Available => "available",
            LeaseMode::Occupied => "occupied",
            LeaseMode::Reserved => "reserved",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "available" => Some(LeaseMode::Available),
            "occupied" => Some(LeaseMode::Occupied),
            "reserved" => Some(LeaseMode::Reserved),
            _ => None,
        }
    }

    pub fn is_active(self) -> bool {
        !matches!(self, LeaseMode::Available)
    }
}

/// The per-unit rental state (one row per unit, mutated in place).
///
/// Invariant: `mode == Available` exactly when `lease_event_id` and
/// `holder_id` are both `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Lease {
    pub unit_id: DbId,
    pub mode: LeaseMode,
    pub lease_event_id: Option<DbId>,
    pub holder_id: Option<DbId>,
}

impl Lease {
    pub fn available(unit_id: DbId) -> Self {
        Self {
            unit_id,
            mode: LeaseMode::Available,
            lease_event_id: None,
            holder_id: None,
        }
    }

    /// The state a conditional update must observe to apply.
    pub fn expectation(&self) -> LeaseExpectation {
        LeaseExpectation {
            mode: self.mode,
            lease_event_id: self.lease_event_id,
        }
    }
}

/// Expected prior state for a compare-and-swap on a lease row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaseExpectation {
    pub mode: LeaseMode,
    pub lease_event_id: Option<DbId>,
}

impl LeaseExpectation {
    pub const AVAILABLE: LeaseExpectation = LeaseExpectation {
        mode: LeaseMode::Available,
        lease_event_id: None,
    };

    pub fn matches(&self, lease: &Lease) -> bool {
        lease.mode == self.mode && lease.lease_event_id == self.lease_event_id
    }
}

/// Target state for a lease transition that opens a new lease event.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaseTransition {
    pub mode: LeaseMode,
    pub user_id: DbId,
    pub start_time: EpochSecs,
    pub end_time: EpochSecs,
    pub created_at: Timestamp,
}

/// One concrete occupancy or reservation. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaseEvent {
    pub id: DbId,
    pub unit_id: DbId,
    pub user_id: DbId,
    pub start_time: EpochSecs,
    pub end_time: Option<EpochSecs>,
    pub created_at: Timestamp,
}

impl LeaseEvent {
    /// Elapsed lease time in seconds, or `None` without an end time.
    pub fn usage_secs(&self) -> Option<i64> {
        self.end_time.map(|end| (end - self.start_time).max(0))
    }
}

// ---------------------------------------------------------------------------
// Activity log
// ---------------------------------------------------------------------------

/// An immutable unit activity log entry. Entries of kind
/// [`ActivityKind::RentAuthorize`] are authorization decisions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityLog {
    pub id: DbId,
    pub kind: ActivityKind,
    pub authorized: bool,
    pub user_id: DbId,
    pub unit_id: DbId,
    pub lease_event_id: Option<DbId>,
    pub transaction_type: Option<ActivityKind>,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewActivityLog {
    pub kind: ActivityKind,
    pub authorized: bool,
    pub user_id: DbId,
    pub unit_id: DbId,
    pub lease_event_id: Option<DbId>,
    pub transaction_type: Option<ActivityKind>,
    pub created_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Transactions, invoices, users
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    pub id: DbId,
    pub kind: ActivityKind,
    pub amount: f64,
    pub user_id: DbId,
    pub activity_log_id: DbId,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub kind: ActivityKind,
    pub amount: f64,
    pub user_id: DbId,
    pub activity_log_id: DbId,
    pub created_at: Timestamp,
}

/// Time window and page for transaction queries.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRange {
    pub from: Timestamp,
    pub to: Timestamp,
    /// `None` returns every matching row.
    pub limit: Option<i64>,
    pub offset: i64,
}

/// Billing metadata attached to an activity by the billing provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Invoice {
    pub id: DbId,
    pub activity_log_id: DbId,
    pub hours: f64,
    pub amount: f64,
}

/// Identity record used for display names and affiliation rollups.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserProfile {
    pub id: DbId,
    pub id_num: i64,
    pub first_name: String,
    pub last_name: String,
    pub college: String,
}
