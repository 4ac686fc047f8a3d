use serde::Serialize;

use crate::types::DbId;

/// Named, closed set of error codes returned to API callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    MissingParameter,
    InvalidIdentifier,
    InvalidTransactionType,
    InvalidAmount,
    InvalidAcquireType,
    InvalidDuration,
    ResourceBusy,
    NotFound,
    WrongCategory,
    NotAuthorized,
    AlreadyConsumed,
    SessionIdRequired,
    StoreUnavailable,
    Unauthorized,
    Forbidden,
    InvalidRequest,
    Internal,
}

/// Which side of a rental is already leased.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BusyResource {
    Unit,
    User,
}

impl std::fmt::Display for BusyResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BusyResource::Unit => f.write_str("Unit"),
            BusyResource::User => f.write_str("User"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoreError {
    #[error("{param} parameter is required.")]
    MissingParameter { param: &'static str },

    #[error("Please encode a valid {param} format and value.")]
    InvalidIdentifier { param: &'static str },

    #[error("Unrecognized transaction type '{0}'.")]
    InvalidTransactionType(String),

    #[error("Amount must be a positive number.")]
    InvalidAmount,

    #[error("Unrecognized acquire type '{0}'. Expected Rent, Extend or Reserve.")]
    InvalidAcquireType(String),

    #[error("Lease duration must be between 1 and {max} seconds.")]
    InvalidDuration { max: i64 },

    #[error("{resource} {id} is currently leased.")]
    ResourceBusy { resource: BusyResource, id: DbId },

    #[error("{entity} with id {id} not found.")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Activity log {0} is not of rent authorization type.")]
    WrongCategory(DbId),

    #[error("Rental transaction {0} is not authorized.")]
    NotAuthorized(DbId),

    #[error("Activity log {0} has already been used.")]
    AlreadyConsumed(DbId),

    #[error("Lease on unit {unit_id} has no session end time.")]
    SessionIdRequired { unit_id: DbId },

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),

    /// Several independent faults, reported together.
    #[error("{}", join_messages(.0))]
    Rejected(Vec<CoreError>),
}

/// One reportable `(code, message)` pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fault {
    pub code: ErrorCode,
    pub message: String,
}

impl CoreError {
    /// Combine collected faults into one error.
    ///
    /// Nested [`CoreError::Rejected`] values are flattened and a single fault
    /// is returned as itself. Callers pass at least one fault.
    pub fn rejected(faults: impl IntoIterator<Item = CoreError>) -> CoreError {
        let mut flat = Vec::new();
        for fault in faults {
            match fault {
                CoreError::Rejected(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        if flat.len() == 1 {
            flat.remove(0)
        } else {
            CoreError::Rejected(flat)
        }
    }

    /// `Ok` when nothing was collected, otherwise [`CoreError::rejected`].
    pub fn collect(faults: Vec<CoreError>) -> Result<(), CoreError> {
        if faults.is_empty() {
            Ok(())
        } else {
            Err(CoreError::rejected(faults))
        }
    }

    /// The error code of a single fault. `Rejected` reports the code of its
    /// first member.
    pub fn code(&self) -> ErrorCode {
        match self {
            CoreError::MissingParameter { .. } => ErrorCode::MissingParameter,
            CoreError::InvalidIdentifier { .. } => ErrorCode::InvalidIdentifier,
            CoreError::InvalidTransactionType(_) => ErrorCode::InvalidTransactionType,
            CoreError::InvalidAmount => ErrorCode::InvalidAmount,
            CoreError::InvalidAcquireType(_) => ErrorCode::InvalidAcquireType,
            CoreError::InvalidDuration { .. } => ErrorCode::InvalidDuration,
            CoreError::ResourceBusy { .. } => ErrorCode::ResourceBusy,
            CoreError::NotFound { .. } => ErrorCode::NotFound,
            CoreError::WrongCategory(_) => ErrorCode::WrongCategory,
            CoreError::NotAuthorized(_) => ErrorCode::NotAuthorized,
            CoreError::AlreadyConsumed(_) => ErrorCode::AlreadyConsumed,
            CoreError::SessionIdRequired { .. } => ErrorCode::SessionIdRequired,
            CoreError::StoreUnavailable(_) => ErrorCode::StoreUnavailable,
            CoreError::Unauthorized(_) => ErrorCode::Unauthorized,
            CoreError::Forbidden(_) => ErrorCode::Forbidden,
            CoreError::Internal(_) => ErrorCode::Internal,
            CoreError::Rejected(inner) => inner
                .first()
                .map(CoreError::code)
                .unwrap_or(ErrorCode::Internal),
        }
    }

    /// Every fault carried by this error, flattened, as `(code, message)` pairs.
    pub fn faults(&self) -> Vec<Fault> {
        match self {
            CoreError::Rejected(inner) => inner.iter().flat_map(CoreError::faults).collect(),
            other => vec![Fault {
                code: other.code(),
                message: other.to_string(),
            }],
        }
    }
}

fn join_messages(errors: &[CoreError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn collect_empty_is_ok() {
        assert!(CoreError::collect(Vec::new()).is_ok());
    }

    #[test]
    fn collect_single_fault_is_unwrapped() {
        let err = CoreError::collect(vec![CoreError::InvalidAmount]).unwrap_err();
        assert_matches!(err, CoreError::InvalidAmount);
    }

    #[test]
    fn collect_flattens_nested_rejections() {
        let nested = CoreError::Rejected(vec![
            CoreError::MissingParameter { param: "Unit ID" },
            CoreError::InvalidAmount,
        ]);
        let err = CoreError::collect(vec![nested, CoreError::NotAuthorized(7)]).unwrap_err();

        let faults = err.faults();
        assert_eq!(faults.len(), 3);
        assert_eq!(faults[0].code, ErrorCode::MissingParameter);
        assert_eq!(faults[1].code, ErrorCode::InvalidAmount);
        assert_eq!(faults[2].code, ErrorCode::NotAuthorized);
    }

    #[test]
    fn rejected_skips_absent_results() {
        let missing: Result<(), CoreError> = Err(CoreError::InvalidAmount);
        let present: Result<(), CoreError> = Ok(());
        let err = CoreError::rejected([missing.err(), present.err()].into_iter().flatten());
        assert_matches!(err, CoreError::InvalidAmount);
    }

    #[test]
    fn fault_messages_are_human_readable() {
        let faults = CoreError::InvalidIdentifier { param: "User ID" }.faults();
        assert_eq!(
            faults[0].message,
            "Please encode a valid User ID format and value."
        );
    }

    #[test]
    fn error_codes_serialize_as_names() {
        let json = serde_json::to_string(&ErrorCode::WrongCategory).unwrap();
        assert_eq!(json, "\"wrong_category\"");
    }
}
