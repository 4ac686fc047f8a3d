//! Usage accounting over the authorization audit trail.
//!
//! [`aggregate_shares`] groups authorized `*_auth` activity by lease event,
//! joins each group with its usage window, owner affiliation, unit area and
//! invoices, and rolls the result up per service, per area and per
//! affiliation. The transaction reports read the transaction log directly.
//! Everything here is read-only.

use std::collections::{BTreeMap, HashSet};

use futures::future::join_all;
use serde::Serialize;

use crate::activity::{ActivityKind, ServiceKind};
use crate::config::EngineConfig;
use crate::error::CoreError;
use crate::models::{Transaction, TransactionRange};
use crate::store::{guarded_read, LeaseStore};
use crate::types::{timestamp_from_epoch, DbId, EpochSecs};

/// Largest page a transaction summary will return.
pub const MAX_PAGE_SIZE: u32 = 500;

const SECS_PER_HOUR: f64 = 3600.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ServiceStat {
    pub num: u64,
    pub usage_hours: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CollegeHours {
    pub session_hours: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AreaStat {
    pub total_session_hours: f64,
    pub colleges: BTreeMap<String, CollegeHours>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CollegeShare {
    pub sessions: u64,
    pub usage_hours: f64,
    pub share: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RentalShares {
    pub service_stats: BTreeMap<ServiceKind, ServiceStat>,
    pub area_stats: BTreeMap<i32, AreaStat>,
    pub college_shares: BTreeMap<String, CollegeShare>,
}

/// One lease event with everything the rollup needs.
struct ResolvedGroup {
    usage_secs: i64,
    college: String,
    area_num: i32,
    /// `(service, invoice hours)` per activity record.
    records: Vec<(ServiceKind, f64)>,
}

/// Compute usage shares for the given lease events, or for all of them.
pub async fn aggregate_shares(
    store: &dyn LeaseStore,
    config: &EngineConfig,
    lease_event_ids: Option<&[DbId]>,
) -> Result<RentalShares, CoreError> {
    let activity = guarded_read(config, "list_authorized_auth_activity", move || {
        store.list_authorized_auth_activity(lease_event_ids)
    })
    .await?;

    let mut groups: BTreeMap<DbId, Vec<(ActivityKind, DbId)>> = BTreeMap::new();
    for log in activity {
        if let Some(event_id) = log.lease_event_id {
            groups.entry(event_id).or_default().push((log.kind, log.id));
        }
    }

    let resolved = join_all(
        groups
            .into_iter()
            .map(|(event_id, records)| resolve_group(store, config, event_id, records)),
    )
    .await;

    let mut shares = RentalShares::default();
    let mut total_sessions: u64 = 0;
    for group in resolved.into_iter().flatten() {
        for (service, hours) in &group.records {
            let stat = shares.service_stats.entry(*service).or_default();
            stat.num += 1;
            stat.usage_hours += hours;
        }

        let session_hours = group.usage_secs as f64 / SECS_PER_HOUR;
        let area = shares.area_stats.entry(group.area_num).or_default();
        area.total_session_hours += session_hours;
        area.colleges
            .entry(group.college.clone())
            .or_default()
            .session_hours += session_hours;

        let college = shares.college_shares.entry(group.college).or_default();
        college.sessions += 1;
        college.usage_hours += session_hours;
        total_sessions += 1;
    }

    if total_sessions > 0 {
        for college in shares.college_shares.values_mut() {
            college.share = college.sessions as f64 / total_sessions as f64;
        }
    }
    Ok(shares)
}

async fn resolve_group(
    store: &dyn LeaseStore,
    config: &EngineConfig,
    event_id: DbId,
    records: Vec<(ActivityKind, DbId)>,
) -> Option<ResolvedGroup> {
    let event = match guarded_read(config, "find_lease_event", move || {
        store.find_lease_event(event_id)
    })
    .await
    {
        Ok(Some(event)) => event,
        Ok(None) => {
            tracing::warn!(lease_event_id = event_id, "Lease event not found, skipping group");
            return None;
        }
        Err(e) => {
            tracing::warn!(lease_event_id = event_id, error = %e, "Failed to load lease event, skipping group");
            return None;
        }
    };

    let (user_id, unit_id) = (event.user_id, event.unit_id);
    let (user, unit, invoices) = tokio::join!(
        guarded_read(config, "find_user", move || store.find_user(user_id)),
        guarded_read(config, "find_unit", move || store.find_unit(unit_id)),
        join_all(records.iter().map(move |&(kind, log_id)| async move {
            let hours = match guarded_read(config, "find_invoice_for_activity", move || {
                store.find_invoice_for_activity(log_id)
            })
            .await
            {
                Ok(Some(invoice)) => invoice.hours,
                Ok(None) => {
                    tracing::warn!(activity_log_id = log_id, "No invoice for activity, counting 0 hours");
                    0.0
                }
                Err(e) => {
                    tracing::warn!(activity_log_id = log_id, error = %e, "Failed to load invoice, counting 0 hours");
                    0.0
                }
            };
            kind.service().map(|service| (service, hours))
        })),
    );

    let user = match user {
        Ok(Some(user)) => user,
        other => {
            tracing::warn!(lease_event_id = event_id, user_id, error = ?other.err(), "Lease owner unresolved, skipping group");
            return None;
        }
    };
    let unit = match unit {
        Ok(Some(unit)) => unit,
        other => {
            tracing::warn!(lease_event_id = event_id, unit_id, error = ?other.err(), "Unit unresolved, skipping group");
            return None;
        }
    };

    Some(ResolvedGroup {
        usage_secs: event.usage_secs().unwrap_or(0),
        college: user.college,
        area_num: unit.area_num,
        records: invoices.into_iter().flatten().collect(),
    })
}

// ---------------------------------------------------------------------------
// Transaction reports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionPage {
    pub page_cursor: u32,
    pub page_size: u32,
    pub transactions: Vec<Transaction>,
}

/// Transactions created within `[start, end]`, paged.
///
/// `page_cursor` is 1-based (0 is read as 1). A `page_size` of 0 returns
/// every row; larger sizes are capped at [`MAX_PAGE_SIZE`].
pub async fn transaction_summary(
    store: &dyn LeaseStore,
    config: &EngineConfig,
    start: EpochSecs,
    end: EpochSecs,
    page_cursor: u32,
    page_size: u32,
) -> Result<TransactionPage, CoreError> {
    let page_cursor = page_cursor.max(1);
    let page_size = page_size.min(MAX_PAGE_SIZE);
    let range = TransactionRange {
        from: timestamp_from_epoch(start),
        to: timestamp_from_epoch(end),
        limit: (page_size > 0).then_some(i64::from(page_size)),
        offset: if page_size > 0 {
            i64::from(page_cursor - 1) * i64::from(page_size)
        } else {
            0
        },
    };

    let range = &range;
    let transactions =
        guarded_read(config, "list_transactions", move || store.list_transactions(range)).await?;
    Ok(TransactionPage {
        page_cursor,
        page_size,
        transactions,
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransactionShare {
    pub amount: f64,
    pub transactions: u64,
    pub share: f64,
}

/// Per-affiliation transaction totals within `[start, end]`.
///
/// Transactions whose user cannot be resolved are left out of both the
/// totals and the share denominator.
pub async fn transaction_shares(
    store: &dyn LeaseStore,
    config: &EngineConfig,
    start: EpochSecs,
    end: EpochSecs,
) -> Result<BTreeMap<String, TransactionShare>, CoreError> {
    let range = TransactionRange {
        from: timestamp_from_epoch(start),
        to: timestamp_from_epoch(end),
        limit: None,
        offset: 0,
    };
    let range = &range;
    let transactions =
        guarded_read(config, "list_transactions", move || store.list_transactions(range)).await?;

    let user_ids: HashSet<DbId> = transactions.iter().map(|t| t.user_id).collect();
    let users = join_all(user_ids.into_iter().map(move |user_id| async move {
        let found = guarded_read(config, "find_user", move || store.find_user(user_id)).await;
        (user_id, found)
    }))
    .await;

    let mut colleges: BTreeMap<DbId, String> = BTreeMap::new();
    for (user_id, found) in users {
        match found {
            Ok(Some(user)) => {
                colleges.insert(user_id, user.college);
            }
            Ok(None) => tracing::warn!(user_id, "Transaction user not found, skipping"),
            Err(e) => tracing::warn!(user_id, error = %e, "Failed to load transaction user, skipping"),
        }
    }

    let mut shares: BTreeMap<String, TransactionShare> = BTreeMap::new();
    let mut total: u64 = 0;
    for transaction in &transactions {
        let Some(college) = colleges.get(&transaction.user_id) else {
            continue;
        };
        let share = shares.entry(college.clone()).or_default();
        share.amount += transaction.amount;
        share.transactions += 1;
        total += 1;
    }
    if total > 0 {
        for share in shares.values_mut() {
            share.share = share.transactions as f64 / total as f64;
        }
    }
    Ok(shares)
}
