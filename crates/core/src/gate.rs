//! Gate for actions that require a prior authorization decision.
//!
//! Fee capture and physical acquisition both present the id of a
//! `rent_authorize` activity log entry. The entry must exist, be of that
//! category and carry a positive verdict before the caller may write its
//! side effect.

use crate::activity::ActivityKind;
use crate::config::{AuthorizationReuse, EngineConfig};
use crate::error::CoreError;
use crate::ids::parse_id;
use crate::models::ActivityLog;
use crate::store::{guarded_read, guarded_write, LeaseStore};

pub const AUTHORIZATION_PARAM: &str = "Authorization Activity Log ID";

/// Load and verify the authorization record referenced by `raw_id`.
///
/// Errors, in evaluation order: [`CoreError::MissingParameter`],
/// [`CoreError::InvalidIdentifier`], [`CoreError::NotFound`],
/// [`CoreError::WrongCategory`], [`CoreError::NotAuthorized`].
pub async fn require_prior_authorization(
    store: &dyn LeaseStore,
    config: &EngineConfig,
    raw_id: Option<&str>,
) -> Result<ActivityLog, CoreError> {
    let id = parse_id(AUTHORIZATION_PARAM, raw_id)?;
    let record = guarded_read(config, "find_activity_log", move || {
        store.find_activity_log(id)
    })
    .await?
    .ok_or(CoreError::NotFound {
        entity: "Activity log",
        id,
    })?;

    if record.kind != ActivityKind::RentAuthorize {
        return Err(CoreError::WrongCategory(id));
    }
    if !record.authorized {
        return Err(CoreError::NotAuthorized(id));
    }
    Ok(record)
}

/// Boolean form of [`require_prior_authorization`].
pub async fn check_prior_authorization(
    store: &dyn LeaseStore,
    config: &EngineConfig,
    raw_id: Option<&str>,
) -> Result<bool, CoreError> {
    require_prior_authorization(store, config, raw_id)
        .await
        .map(|_| true)
}

/// Mark `record` as used by `action` when records are single use.
///
/// Must be called after every check on the request has passed and before
/// the side effect is written. Under [`AuthorizationReuse::Reusable`] this
/// is a no-op.
pub async fn claim_authorization(
    store: &dyn LeaseStore,
    config: &EngineConfig,
    record: &ActivityLog,
    action: &str,
) -> Result<(), CoreError> {
    if config.authorization_reuse == AuthorizationReuse::Reusable {
        return Ok(());
    }
    let claimed = guarded_write(
        config,
        "record_consumption",
        store.record_consumption(record.id, action),
    )
    .await?;
    if !claimed {
        tracing::warn!(activity_log_id = record.id, action, "Authorization already consumed");
        return Err(CoreError::AlreadyConsumed(record.id));
    }
    Ok(())
}
