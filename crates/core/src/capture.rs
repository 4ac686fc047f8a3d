//! Fee capture gated on a prior authorization decision.

use serde::Serialize;

use crate::activity::ActivityKind;
use crate::config::EngineConfig;
use crate::error::CoreError;
use crate::gate::{claim_authorization, require_prior_authorization, AUTHORIZATION_PARAM};
use crate::ids::{parse_id, parse_optional_id};
use crate::models::{NewActivityLog, NewTransaction};
use crate::store::{guarded_read, guarded_write, LeaseStore};
use crate::types::{timestamp_from_epoch, DbId, EpochSecs, Timestamp};

#[derive(Debug, Clone, Default)]
pub struct CaptureRequest {
    pub auth_activity_log_id: Option<String>,
    pub transaction_amount: Option<f64>,
    pub transaction_type: Option<String>,
    pub lease_event_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaptureReceipt {
    pub transaction_authorized: bool,
    pub transaction_id: DbId,
    pub activity_log_id: DbId,
    pub user_id: DbId,
    pub date: Timestamp,
}

struct ValidatedCapture {
    amount: f64,
    kind: ActivityKind,
    lease_event_id: Option<DbId>,
}

fn validate(request: &CaptureRequest) -> Result<ValidatedCapture, CoreError> {
    let mut faults = Vec::new();

    // The gate parses the id again; this pass only collects the fault.
    if let Err(err) = parse_id(AUTHORIZATION_PARAM, request.auth_activity_log_id.as_deref()) {
        faults.push(err);
    }

    let amount = match request.transaction_amount {
        None => Err(CoreError::MissingParameter {
            param: "Transaction Amount",
        }),
        Some(amount) if amount.is_finite() && amount > 0.0 => Ok(amount),
        Some(_) => Err(CoreError::InvalidAmount),
    };

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

    let lease_event_id = parse_optional_id("Session ID", request.lease_event_id.as_deref());

    match (amount, kind, lease_event_id) {
        (Ok(amount), Ok(kind), Ok(lease_event_id)) if faults.is_empty() => Ok(ValidatedCapture {
            amount,
            kind,
            lease_event_id,
        }),
        (amount, kind, lease_event_id) => {
            faults.extend(amount.err());
            faults.extend(kind.err());
            faults.extend(lease_event_id.err());
            Err(CoreError::rejected(faults))
        }
    }
}

/// Record a fee transaction for `user_id`.
///
/// The referenced authorization must pass the gate and belong to the
/// caller. The transaction row and the fee activity entry are written only
/// after every check has passed.
pub async fn capture_transaction(
    store: &dyn LeaseStore,
    config: &EngineConfig,
    user_id: DbId,
    request: &CaptureRequest,
    now: EpochSecs,
) -> Result<CaptureReceipt, CoreError> {
    let ValidatedCapture {
        amount,
        kind,
        lease_event_id,
    } = validate(request)?;

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

    if let Some(event_id) = lease_event_id {
        let event = guarded_read(config, "find_lease_event", move || {
            store.find_lease_event(event_id)
        })
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Lease event",
            id: event_id,
        })?;
        if event.user_id != user_id {
            return Err(CoreError::Forbidden(format!(
                "lease event {event_id} belongs to another user"
            )));
        }
    }

    claim_authorization(store, config, &record, "capture").await?;

    let created_at = timestamp_from_epoch(now);
    let transaction = guarded_write(
        config,
        "insert_transaction",
        store.insert_transaction(&NewTransaction {
            kind,
            amount,
            user_id,
            activity_log_id: record.id,
            created_at,
        }),
    )
    .await?;

    let fee_entry = NewActivityLog {
        kind,
        authorized: true,
        user_id,
        unit_id: record.unit_id,
        lease_event_id,
        transaction_type: None,
        created_at,
    };
    let log = guarded_write(config, "insert_activity_log", store.insert_activity_log(&fee_entry))
        .await?;

    tracing::info!(
        transaction_id = transaction.id,
        activity_log_id = log.id,
        user_id,
        amount,
        kind = %kind,
        "Transaction captured"
    );

    Ok(CaptureReceipt {
        transaction_authorized: true,
        transaction_id: transaction.id,
        activity_log_id: log.id,
        user_id,
        date: created_at,
    })
}
