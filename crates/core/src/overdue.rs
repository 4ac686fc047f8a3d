//! Overdue lease scanner.

use futures::future::join_all;
use serde::Serialize;

use crate::config::EngineConfig;
use crate::error::CoreError;
use crate::models::{Lease, LeaseMode};
use crate::store::{guarded_read, LeaseStore};
use crate::types::EpochSecs;

/// Grace period after expiry before a lease counts as over threshold (5 days).
pub const OVERDUE_GRACE_SECS: i64 = 432_000;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverdueEntry {
    pub unit_num: i32,
    /// Seconds past due, less the grace period for threshold scans.
    pub time_since: i64,
    pub suppressed_name: String,
}

/// List occupied leases whose end time has passed, most overdue first.
///
/// Lookups for individual leases that fail are logged and skipped; only a
/// failure to list the leases fails the scan.
pub async fn scan_overdue(
    store: &dyn LeaseStore,
    config: &EngineConfig,
    now: EpochSecs,
    over_threshold: bool,
) -> Result<Vec<OverdueEntry>, CoreError> {
    let leases = guarded_read(config, "list_leases_in_mode", move || {
        store.list_leases_in_mode(LeaseMode::Occupied)
    })
    .await?;

    let resolved = join_all(
        leases
            .into_iter()
            .map(|lease| resolve_entry(store, config, lease, now)),
    )
    .await;

    let mut entries: Vec<OverdueEntry> = resolved
        .into_iter()
        .flatten()
        .filter_map(|mut entry| {
            if over_threshold {
                entry.time_since -= OVERDUE_GRACE_SECS;
                if entry.time_since <= 0 {
                    return None;
                }
            }
            Some(entry)
        })
        .collect();
    entries.sort_by(|a, b| b.time_since.cmp(&a.time_since));

    tracing::debug!(count = entries.len(), over_threshold, "Overdue scan complete");
    Ok(entries)
}

/// Resolve one lease into an entry. `None` if it is not overdue or any of
/// its records cannot be read.
async fn resolve_entry(
    store: &dyn LeaseStore,
    config: &EngineConfig,
    lease: Lease,
    now: EpochSecs,
) -> Option<OverdueEntry> {
    let unit_id = lease.unit_id;
    let Some(event_id) = lease.lease_event_id else {
        tracing::warn!(unit_id, "Occupied lease has no lease event, skipping");
        return None;
    };

    let event = match guarded_read(config, "find_lease_event", move || {
        store.find_lease_event(event_id)
    })
    .await
    {
        Ok(Some(event)) => event,
        Ok(None) => {
            tracing::warn!(unit_id, lease_event_id = event_id, "Lease event not found, skipping");
            return None;
        }
        Err(e) => {
            tracing::warn!(unit_id, error = %e, "Failed to load lease event, skipping");
            return None;
        }
    };

    let Some(end_time) = event.end_time else {
        tracing::warn!(unit_id, lease_event_id = event_id, "Lease event has no end time, skipping");
        return None;
    };
    if end_time >= now {
        return None;
    }

    let user_id = event.user_id;
    let (unit, user) = tokio::join!(
        guarded_read(config, "find_unit", move || store.find_unit(unit_id)),
        guarded_read(config, "find_user", move || store.find_user(user_id)),
    );
    let unit = match unit {
        Ok(Some(unit)) => unit,
        Ok(None) => {
            tracing::warn!(unit_id, "Unit not found, skipping");
            return None;
        }
        Err(e) => {
            tracing::warn!(unit_id, error = %e, "Failed to load unit, skipping");
            return None;
        }
    };
    let user = match user {
        Ok(Some(user)) => user,
        Ok(None) => {
            tracing::warn!(unit_id, user_id, "Lease holder not found, skipping");
            return None;
        }
        Err(e) => {
            tracing::warn!(unit_id, user_id, error = %e, "Failed to load lease holder, skipping");
            return None;
        }
    };

    Some(OverdueEntry {
        unit_num: unit.unit_num,
        time_since: now - end_time,
        suppressed_name: redact_name(&user.first_name, &user.last_name),
    })
}

/// `"maria", "santos"` becomes `"Maria S."`.
pub fn redact_name(first_name: &str, last_name: &str) -> String {
    let first = capitalize(first_name.trim());
    match last_name.trim().chars().next() {
        Some(initial) => format!("{first} {}.", initial.to_uppercase()),
        None => first,
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(head) => head.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
