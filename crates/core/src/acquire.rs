//! Physical acquisition of a unit after a successful authorization.
//!
//! Rent and Reserve open a new lease on an available unit; Extend moves the
//! caller's running lease onto a new, later lease event. Each is a single
//! conditional transition, so two requests racing for the same unit cannot
//! both succeed.

use serde::Serialize;

use crate::activity::{AcquireType, ActivityKind};
use crate::config::{EngineConfig, MAX_LEASE_SECS};
use crate::error::{BusyResource, CoreError};
use crate::gate::{claim_authorization, require_prior_authorization, AUTHORIZATION_PARAM};
use crate::ids::parse_id;
use crate::models::{LeaseExpectation, LeaseMode, LeaseTransition, NewActivityLog};
use crate::store::{guarded_read, guarded_write, LeaseStore};
use crate::types::{timestamp_from_epoch, DbId, EpochSecs};

#[derive(Debug, Clone, Default)]
pub struct AcquireRequest {
    pub auth_activity_log_id: Option<String>,
    pub acquire_type: Option<String>,
    /// Lease length in seconds. Defaults to the configured lease length.
    pub duration_secs: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AcquireReceipt {
    pub acquire_type: ActivityKind,
    pub activity_log_id: DbId,
    pub lease_event_id: DbId,
    pub unit_id: DbId,
    pub user_id: DbId,
    pub start_time: EpochSecs,
    pub end_time: EpochSecs,
}

fn validate(request: &AcquireRequest, config: &EngineConfig) -> Result<(AcquireType, i64), CoreError> {
    let acquire_type = match request
        .acquire_type
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        Some(raw) => AcquireType::parse(raw),
        None => Err(CoreError::MissingParameter {
            param: "Acquire Type",
        }),
    };
    let duration = match request.duration_secs {
        None => Ok(config.default_lease_secs),
        Some(secs) if (1..=MAX_LEASE_SECS).contains(&secs) => Ok(secs),
        Some(_) => Err(CoreError::InvalidDuration {
            max: MAX_LEASE_SECS,
        }),
    };

    match (acquire_type, duration) {
        (Ok(acquire_type), Ok(duration)) => Ok((acquire_type, duration)),
        (acquire_type, duration) => {
            Err(CoreError::rejected(
                [acquire_type.err(), duration.err()].into_iter().flatten(),
            ))
        }
    }
}

/// Acquire the unit named by a prior authorization for `user_id`.
pub async fn acquire(
    store: &dyn LeaseStore,
    config: &EngineConfig,
    user_id: DbId,
    request: &AcquireRequest,
    now: EpochSecs,
) -> Result<AcquireReceipt, CoreError> {
    let (acquire_type, duration) = match (
        validate(request, config),
        parse_id(AUTHORIZATION_PARAM, request.auth_activity_log_id.as_deref()),
    ) {
        (Ok(valid), Ok(_)) => valid,
        (valid, id) => {
            return Err(CoreError::rejected([id.err(), valid.err()].into_iter().flatten()));
        }
    };

    let record =
        require_prior_authorization(store, config, request.auth_activity_log_id.as_deref()).await?;
    if record.user_id != user_id {
        tracing::warn!(
            activity_log_id = record.id,
            owner = record.user_id,
            caller = user_id,
            "Authorization presented by another user"
        );
        return Err(CoreError::NotAuthorized(record.id));
    }
    if !record
        .transaction_type
        .is_some_and(|kind| acquire_type.is_covered_by(kind))
    {
        tracing::warn!(
            activity_log_id = record.id,
            requested = ?record.transaction_type,
            ?acquire_type,
            "Authorization does not cover this acquisition"
        );
        return Err(CoreError::NotAuthorized(record.id));
    }
    let unit_id = record.unit_id;
    let extend_by = |from: EpochSecs| {
        from.checked_add(duration).ok_or(CoreError::InvalidDuration {
            max: MAX_LEASE_SECS,
        })
    };

    let lease = guarded_read(config, "find_lease", move || store.find_lease(unit_id)).await?;

    let (expected, transition) = match acquire_type {
        AcquireType::Rent | AcquireType::Reserve => {
            if lease.as_ref().is_some_and(|l| l.mode.is_active()) {
                return Err(CoreError::ResourceBusy {
                    resource: BusyResource::Unit,
                    id: unit_id,
                });
            }
            let mode = if acquire_type == AcquireType::Rent {
                LeaseMode::Occupied
            } else {
                LeaseMode::Reserved
            };
            (
                LeaseExpectation::AVAILABLE,
                LeaseTransition {
                    mode,
                    user_id,
                    start_time: now,
                    end_time: extend_by(now)?,
                    created_at: timestamp_from_epoch(now),
                },
            )
        }
        AcquireType::Extend => {
            let lease = lease
                .filter(|l| l.mode.is_active() && l.holder_id == Some(user_id))
                .ok_or(CoreError::NotFound {
                    entity: "Lease",
                    id: unit_id,
                })?;
            let event_id = lease
                .lease_event_id
                .ok_or(CoreError::SessionIdRequired { unit_id })?;
            let current = guarded_read(config, "find_lease_event", move || {
                store.find_lease_event(event_id)
            })
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Lease event",
                id: event_id,
            })?;
            let start_time = current.end_time.unwrap_or(now).max(now);
            (
                lease.expectation(),
                LeaseTransition {
                    mode: LeaseMode::Occupied,
                    user_id,
                    start_time,
                    end_time: extend_by(start_time)?,
                    created_at: timestamp_from_epoch(now),
                },
            )
        }
    };

    claim_authorization(store, config, &record, "acquire").await?;

    let event = guarded_write(
        config,
        "transition_lease",
        store.transition_lease(unit_id, &expected, &transition),
    )
    .await?
    .ok_or_else(|| {
        tracing::info!(unit_id, user_id, "Lost lease transition race");
        CoreError::ResourceBusy {
            resource: BusyResource::Unit,
            id: unit_id,
        }
    })?;

    let session_kind = acquire_type.session_kind();
    let log = guarded_write(
        config,
        "insert_activity_log",
        store.insert_activity_log(&NewActivityLog {
            kind: session_kind,
            authorized: true,
            user_id,
            unit_id,
            lease_event_id: Some(event.id),
            transaction_type: None,
            created_at: timestamp_from_epoch(now),
        }),
    )
    .await?;

    tracing::info!(
        unit_id,
        user_id,
        lease_event_id = event.id,
        kind = %session_kind,
        end_time = transition.end_time,
        "Unit acquired"
    );

    Ok(AcquireReceipt {
        acquire_type: session_kind,
        activity_log_id: log.id,
        lease_event_id: event.id,
        unit_id,
        user_id,
        start_time: transition.start_time,
        end_time: transition.end_time,
    })
}
