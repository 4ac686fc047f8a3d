//! Authorization decision engine.
//!
//! [`authorize`] decides whether a unit and a user may enter the requested
//! activity, lazily reclaiming expired leases on the way, and records the
//! decision as an immutable `rent_authorize` activity log entry. That entry
//! is the only thing later actions are gated on (see [`crate::gate`]).

use serde::Serialize;

use crate::activity::ActivityKind;
use crate::config::EngineConfig;
use crate::error::CoreError;
use crate::ids::parse_id;
use crate::models::{Lease, NewActivityLog};
use crate::store::{guarded_read, guarded_write, LeaseStore};
use crate::types::{timestamp_from_epoch, DbId, EpochSecs};

/// How many times a lost reclamation race is re-evaluated before the lease
/// is reported as busy.
pub const MAX_RECLAIM_ATTEMPTS: u32 = 3;

/// Raw authorization input as received from a client.
#[derive(Debug, Clone, Default)]
pub struct AuthorizationRequest {
    pub unit_id: Option<String>,
    pub user_id: Option<String>,
    pub transaction_type: Option<String>,
}

/// Diagnostic attached to a verdict, independent of whether it authorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiMsgCode {
    UnitBusy,
    UserBusy,
}

/// Outcome of a single lease eligibility evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    /// No active lease.
    Available,
    /// The lease had expired and this call reset it.
    Reclaimed,
    /// The lease is still running, or kept changing under contention.
    Busy,
}

impl Eligibility {
    pub fn is_eligible(self) -> bool {
        !matches!(self, Eligibility::Busy)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthorizationVerdict {
    pub activity_log_id: DbId,
    pub authorized: bool,
    pub unit_eligible: bool,
    pub user_eligible: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub api_msg_code: Vec<ApiMsgCode>,
}

struct ValidatedRequest {
    unit_id: DbId,
    user_id: DbId,
    kind: ActivityKind,
}

/// Validate every input and collect all faults, without touching the store.
fn validate(request: &AuthorizationRequest) -> Result<ValidatedRequest, CoreError> {
    let unit_id = parse_id("Unit ID", request.unit_id.as_deref());
    let user_id = parse_id("User ID", request.user_id.as_deref());
    let kind = match request
        .transaction_type
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        Some(raw) => ActivityKind::parse_transaction_type(raw),
        None => Err(CoreError::MissingParameter {
            param: "Transaction Type",
        }),
    };

    match (unit_id, user_id, kind) {
        (Ok(unit_id), Ok(user_id), Ok(kind)) => Ok(ValidatedRequest {
            unit_id,
            user_id,
            kind,
        }),
        (unit_id, user_id, kind) => {
            Err(CoreError::rejected(
                [unit_id.err(), user_id.err(), kind.err()].into_iter().flatten(),
            ))
        }
    }
}

/// Decide an authorization request and record the decision.
///
/// Parameter faults are all reported together and nothing is read or
/// written. Hard faults raised while checking eligibility also abort the
/// call before the audit record is written. A busy unit or user is not a
/// fault: it yields an unauthorized verdict with a diagnostic code.
pub async fn authorize(
    store: &dyn LeaseStore,
    config: &EngineConfig,
    request: &AuthorizationRequest,
    now: EpochSecs,
) -> Result<AuthorizationVerdict, CoreError> {
    let ValidatedRequest {
        unit_id,
        user_id,
        kind,
    } = validate(request)?;

    let (unit, user) = if kind.is_entry() {
        tokio::join!(
            check_unit(store, config, unit_id, now),
            check_user(store, config, user_id, now),
        )
    } else {
        (
            ensure_unit_exists(store, config, unit_id)
                .await
                .map(|_| Eligibility::Available),
            Ok(Eligibility::Available),
        )
    };

    let (unit, user) = match (unit, user) {
        (Ok(unit), Ok(user)) => (unit, user),
        (unit, user) => {
            return Err(CoreError::rejected(
                [unit.err(), user.err()].into_iter().flatten(),
            ));
        }
    };

    let unit_eligible = unit.is_eligible();
    let user_eligible = user.is_eligible();
    let authorized = unit_eligible && user_eligible;

    let mut api_msg_code = Vec::new();
    if !unit_eligible {
        api_msg_code.push(ApiMsgCode::UnitBusy);
    }
    if !user_eligible {
        api_msg_code.push(ApiMsgCode::UserBusy);
    }

    let entry = NewActivityLog {
        kind: ActivityKind::RentAuthorize,
        authorized,
        user_id,
        unit_id,
        lease_event_id: None,
        transaction_type: Some(kind),
        created_at: timestamp_from_epoch(now),
    };
    let log = guarded_write(config, "insert_activity_log", store.insert_activity_log(&entry))
        .await?;

    tracing::info!(
        activity_log_id = log.id,
        unit_id,
        user_id,
        transaction_type = %kind,
        authorized,
        "Authorization decided"
    );

    Ok(AuthorizationVerdict {
        activity_log_id: log.id,
        authorized,
        unit_eligible,
        user_eligible,
        api_msg_code,
    })
}

async fn ensure_unit_exists(
    store: &dyn LeaseStore,
    config: &EngineConfig,
    unit_id: DbId,
) -> Result<(), CoreError> {
    guarded_read(config, "find_unit", move || store.find_unit(unit_id))
        .await?
        .map(|_| ())
        .ok_or(CoreError::NotFound {
            entity: "Unit",
            id: unit_id,
        })
}

async fn check_unit(
    store: &dyn LeaseStore,
    config: &EngineConfig,
    unit_id: DbId,
    now: EpochSecs,
) -> Result<Eligibility, CoreError> {
    ensure_unit_exists(store, config, unit_id).await?;
    let lease = guarded_read(config, "find_lease", move || store.find_lease(unit_id)).await?;
    match lease {
        None => Ok(Eligibility::Available),
        Some(lease) => evaluate_lease(store, config, lease, now).await,
    }
}

/// A user is eligible only if every lease they hold is free or reclaimable.
/// All held leases are evaluated, so every expired one is reclaimed.
async fn check_user(
    store: &dyn LeaseStore,
    config: &EngineConfig,
    user_id: DbId,
    now: EpochSecs,
) -> Result<Eligibility, CoreError> {
    let held = guarded_read(config, "list_leases_held_by", move || {
        store.list_leases_held_by(user_id)
    })
    .await?;

    let mut result = Eligibility::Available;
    let mut faults = Vec::new();
    for lease in held {
        match evaluate_lease(store, config, lease, now).await {
            Ok(Eligibility::Busy) => result = Eligibility::Busy,
            Ok(Eligibility::Reclaimed) if result == Eligibility::Available => {
                result = Eligibility::Reclaimed
            }
            Ok(_) => {}
            Err(err) => faults.push(err),
        }
    }
    CoreError::collect(faults)?;
    Ok(result)
}

/// Evaluate one lease row, reclaiming it if it has expired.
///
/// Reclamation is a conditional reset keyed on the observed mode and lease
/// event. When another request changes the row first, the row is re-read
/// and evaluated again, up to [`MAX_RECLAIM_ATTEMPTS`] times.
pub async fn evaluate_lease(
    store: &dyn LeaseStore,
    config: &EngineConfig,
    mut lease: Lease,
    now: EpochSecs,
) -> Result<Eligibility, CoreError> {
    let unit_id = lease.unit_id;
    for attempt in 1..=MAX_RECLAIM_ATTEMPTS {
        if !lease.mode.is_active() {
            return Ok(Eligibility::Available);
        }

        let event_id = lease
            .lease_event_id
            .ok_or(CoreError::SessionIdRequired { unit_id })?;
        let event = guarded_read(config, "find_lease_event", move || {
            store.find_lease_event(event_id)
        })
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Lease event",
            id: event_id,
        })?;
        let end_time = event
            .end_time
            .ok_or(CoreError::SessionIdRequired { unit_id })?;

        if end_time > now {
            return Ok(Eligibility::Busy);
        }

        let expected = lease.expectation();
        let reclaimed = guarded_write(
            config,
            "reclaim_lease",
            store.reclaim_lease(unit_id, &expected),
        )
        .await?;
        if reclaimed {
            tracing::info!(unit_id, lease_event_id = event_id, end_time, "Reclaimed expired lease");
            return Ok(Eligibility::Reclaimed);
        }

        tracing::debug!(unit_id, attempt, "Lost reclamation race, re-reading lease");
        lease = match guarded_read(config, "find_lease", move || store.find_lease(unit_id)).await? {
            Some(lease) => lease,
            None => return Ok(Eligibility::Available),
        };
    }

    tracing::warn!(unit_id, "Lease kept changing during reclamation, treating as busy");
    Ok(Eligibility::Busy)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use assert_matches::assert_matches;

    use super::*;
    use crate::error::ErrorCode;
    use crate::models::LeaseMode;
    use crate::store::memory::MemoryLeaseStore;

    const NOW: EpochSecs = 1_700_000_000;

    fn request(unit: &str, user: &str, kind: &str) -> AuthorizationRequest {
        AuthorizationRequest {
            unit_id: Some(unit.to_string()),
            user_id: Some(user.to_string()),
            transaction_type: Some(kind.to_string()),
        }
    }

    #[tokio::test]
    async fn unit_without_lease_is_eligible() {
        let store = MemoryLeaseStore::new();
        let unit = store.insert_unit(101, 1).await;

        let verdict = authorize(
            &store,
            &EngineConfig::default(),
            &request(&unit.id.to_string(), "500", "rent_auth"),
            NOW,
        )
        .await
        .unwrap();

        assert!(verdict.authorized);
        assert!(verdict.api_msg_code.is_empty());

        let logs = store.activity_logs().await;
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].id, verdict.activity_log_id);
        assert_eq!(logs[0].kind, ActivityKind::RentAuthorize);
        assert_eq!(logs[0].transaction_type, Some(ActivityKind::RentAuth));
        assert!(logs[0].authorized);
    }

    #[tokio::test]
    async fn expired_lease_is_reclaimed() {
        let store = MemoryLeaseStore::new();
        let unit = store.insert_unit(101, 1).await;
        store
            .occupy(unit.id, 77, LeaseMode::Occupied, NOW - 7200, Some(NOW - 60))
            .await;

        let verdict = authorize(
            &store,
            &EngineConfig::default(),
            &request(&unit.id.to_string(), "500", "rent_auth"),
            NOW,
        )
        .await
        .unwrap();

        assert!(verdict.authorized);
        assert_eq!(store.lease(unit.id).await.unwrap(), Lease::available(unit.id));
        assert_eq!(store.reclamation_count(), 1);
    }

    #[tokio::test]
    async fn active_lease_keeps_unit_busy() {
        let store = MemoryLeaseStore::new();
        let unit = store.insert_unit(101, 1).await;
        store
            .occupy(unit.id, 77, LeaseMode::Occupied, NOW - 60, Some(NOW + 3600))
            .await;
        let before = store.lease(unit.id).await.unwrap();

        let verdict = authorize(
            &store,
            &EngineConfig::default(),
            &request(&unit.id.to_string(), "500", "rent_auth"),
            NOW,
        )
        .await
        .unwrap();

        assert!(!verdict.authorized);
        assert!(!verdict.unit_eligible);
        assert!(verdict.user_eligible);
        assert_eq!(verdict.api_msg_code, vec![ApiMsgCode::UnitBusy]);
        assert_eq!(store.lease(unit.id).await.unwrap(), before);

        // The refusal is still recorded.
        let logs = store.activity_logs().await;
        assert_eq!(logs.len(), 1);
        assert!(!logs[0].authorized);
    }

    #[tokio::test]
    async fn user_holding_active_lease_is_busy() {
        let store = MemoryLeaseStore::new();
        let held = store.insert_unit(101, 1).await;
        let wanted = store.insert_unit(102, 1).await;
        store
            .occupy(held.id, 500, LeaseMode::Reserved, NOW, Some(NOW + 600))
            .await;

        let verdict = authorize(
            &store,
            &EngineConfig::default(),
            &request(&wanted.id.to_string(), "500", "reserve_auth"),
            NOW,
        )
        .await
        .unwrap();

        assert!(!verdict.authorized);
        assert!(verdict.unit_eligible);
        assert_eq!(verdict.api_msg_code, vec![ApiMsgCode::UserBusy]);
    }

    #[tokio::test]
    async fn non_entry_kinds_skip_eligibility() {
        let store = MemoryLeaseStore::new();
        let unit = store.insert_unit(101, 1).await;
        store
            .occupy(unit.id, 500, LeaseMode::Occupied, NOW, Some(NOW + 600))
            .await;

        let verdict = authorize(
            &store,
            &EngineConfig::default(),
            &request(&unit.id.to_string(), "500", "extend_auth"),
            NOW,
        )
        .await
        .unwrap();

        assert!(verdict.authorized);
        assert_eq!(store.reclamation_count(), 0);
    }

    #[tokio::test]
    async fn unknown_transaction_type_writes_nothing() {
        let store = MemoryLeaseStore::new();
        let unit = store.insert_unit(101, 1).await;

        let err = authorize(
            &store,
            &EngineConfig::default(),
            &request(&unit.id.to_string(), "500", "rent_authorize"),
            NOW,
        )
        .await
        .unwrap_err();

        assert_matches!(err, CoreError::InvalidTransactionType(_));
        assert!(store.activity_logs().await.is_empty());
    }

    #[tokio::test]
    async fn all_parameter_faults_are_collected() {
        let store = MemoryLeaseStore::new();
        store.set_unavailable(true);

        let err = authorize(
            &store,
            &EngineConfig::default(),
            &AuthorizationRequest {
                unit_id: Some("abc".into()),
                user_id: None,
                transaction_type: Some("bogus".into()),
            },
            NOW,
        )
        .await
        .unwrap_err();

        let codes: Vec<_> = err.faults().into_iter().map(|f| f.code).collect();
        assert_eq!(
            codes,
            vec![
                ErrorCode::InvalidIdentifier,
                ErrorCode::MissingParameter,
                ErrorCode::InvalidTransactionType,
            ]
        );
    }

    #[tokio::test]
    async fn unknown_unit_is_not_found_and_unrecorded() {
        let store = MemoryLeaseStore::new();

        let err = authorize(
            &store,
            &EngineConfig::default(),
            &request("999", "500", "rent_auth"),
            NOW,
        )
        .await
        .unwrap_err();

        assert_matches!(err, CoreError::NotFound { entity: "Unit", id: 999 });
        assert!(store.activity_logs().await.is_empty());
    }

    #[tokio::test]
    async fn lease_without_end_time_is_a_fault() {
        let store = MemoryLeaseStore::new();
        let unit = store.insert_unit(101, 1).await;
        store
            .occupy(unit.id, 77, LeaseMode::Occupied, NOW - 60, None)
            .await;

        let err = authorize(
            &store,
            &EngineConfig::default(),
            &request(&unit.id.to_string(), "500", "rent_session"),
            NOW,
        )
        .await
        .unwrap_err();

        assert_matches!(err, CoreError::SessionIdRequired { unit_id } if unit_id == unit.id);
        assert!(store.activity_logs().await.is_empty());
    }

    #[tokio::test]
    async fn active_lease_without_event_reference_is_a_fault() {
        let store = MemoryLeaseStore::new();
        let unit = store.insert_unit(101, 1).await;
        store
            .put_lease(Lease {
                unit_id: unit.id,
                mode: LeaseMode::Reserved,
                lease_event_id: None,
                holder_id: Some(3),
            })
            .await;

        let err = authorize(
            &store,
            &EngineConfig::default(),
            &request(&unit.id.to_string(), "500", "rent_auth"),
            NOW,
        )
        .await
        .unwrap_err();

        assert_matches!(err, CoreError::SessionIdRequired { .. });
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_requests_reclaim_exactly_once() {
        let store = Arc::new(MemoryLeaseStore::new());
        let unit = store.insert_unit(101, 1).await;
        store
            .occupy(unit.id, 77, LeaseMode::Occupied, NOW - 7200, Some(NOW - 1))
            .await;

        let mut handles = Vec::new();
        for user in 0..8 {
            let store = Arc::clone(&store);
            let req = request(&unit.id.to_string(), &(1000 + user).to_string(), "rent_auth");
            handles.push(tokio::spawn(async move {
                authorize(store.as_ref(), &EngineConfig::default(), &req, NOW).await
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().unwrap().authorized);
        }

        assert_eq!(store.reclamation_count(), 1);
        assert_eq!(store.activity_logs().await.len(), 8);
    }

    #[tokio::test]
    async fn unavailable_store_aborts_before_audit() {
        let store = MemoryLeaseStore::new();
        let unit = store.insert_unit(101, 1).await;
        store.set_unavailable(true);

        let config = EngineConfig {
            read_retries: 0,
            ..EngineConfig::default()
        };
        let err = authorize(
            &store,
            &config,
            &request(&unit.id.to_string(), "500", "rent_auth"),
            NOW,
        )
        .await
        .unwrap_err();

        // Both the unit and the user check report the outage.
        assert_eq!(err.faults().len(), 2);
        assert_eq!(err.code(), ErrorCode::StoreUnavailable);

        store.set_unavailable(false);
        assert!(store.activity_logs().await.is_empty());
    }
}
