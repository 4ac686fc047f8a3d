//! Activity categories recorded in the unit activity log.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Category of an activity log entry.
///
/// The first nine variants are the transaction types a client may request.
/// [`ActivityKind::RentAuthorize`] is reserved for authorization decisions
/// written by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    RentAuth,
    ExtendAuth,
    OverdueAuth,
    ReserveAuth,
    RentSession,
    ExtendSession,
    OverdueSession,
    ReserveSession,
    UnitUsage,
    RentAuthorize,
}

/// The nine transaction types accepted from clients.
pub const TRANSACTION_KINDS: [ActivityKind; 9] = [
    ActivityKind::RentAuth,
    ActivityKind::ExtendAuth,
    ActivityKind::OverdueAuth,
    ActivityKind::ReserveAuth,
    ActivityKind::RentSession,
    ActivityKind::ExtendSession,
    ActivityKind::OverdueSession,
    ActivityKind::ReserveSession,
    ActivityKind::UnitUsage,
];

/// Categories counted by usage accounting (the `*_auth` pattern).
pub const AUTH_KINDS: [ActivityKind; 4] = [
    ActivityKind::RentAuth,
    ActivityKind::ExtendAuth,
    ActivityKind::OverdueAuth,
    ActivityKind::ReserveAuth,
];

impl ActivityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityKind::RentAuth => "rent_auth",
            ActivityKind::ExtendAuth => "extend_auth",
            ActivityKind::OverdueAuth => "overdue_auth",
            ActivityKind::ReserveAuth => "reserve_auth",
            ActivityKind::RentSession => "rent_session",
            ActivityKind::ExtendSession => "extend_session",
            ActivityKind::OverdueSession => "overdue_session",
            ActivityKind::ReserveSession => "reserve_session",
            ActivityKind::UnitUsage => "unit_usage",
            ActivityKind::RentAuthorize => "rent_authorize",
        }
    }

    /// Parse any stored category name, including `rent_authorize`.
    pub fn parse(value: &str) -> Option<Self> {
        TRANSACTION_KINDS
            .into_iter()
            .chain(std::iter::once(ActivityKind::RentAuthorize))
            .find(|kind| kind.as_str() == value)
    }

    /// Parse a client-requested transaction type. `rent_authorize` is not
    /// a transaction type and is rejected.
    pub fn parse_transaction_type(value: &str) -> Result<Self, CoreError> {
        TRANSACTION_KINDS
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| CoreError::InvalidTransactionType(value.to_string()))
    }

    /// Categories that start a new occupancy or reservation and therefore
    /// require both the unit and the user to be free.
    pub fn is_entry(self) -> bool {
        matches!(
            self,
            ActivityKind::RentAuth
                | ActivityKind::RentSession
                | ActivityKind::ReserveAuth
                | ActivityKind::ReserveSession
        )
    }

    /// Whether the category matches the `*_auth` accounting pattern.
    pub fn is_auth(self) -> bool {
        AUTH_KINDS.contains(&self)
    }

    /// The billable service behind an `*_auth` or `*_session` category.
    pub fn service(self) -> Option<ServiceKind> {
        match self {
            ActivityKind::RentAuth | ActivityKind::RentSession => Some(ServiceKind::Rent),
            ActivityKind::ExtendAuth | ActivityKind::ExtendSession => Some(ServiceKind::Extend),
            ActivityKind::OverdueAuth | ActivityKind::OverdueSession => Some(ServiceKind::Overdue),
            ActivityKind::ReserveAuth | ActivityKind::ReserveSession => Some(ServiceKind::Reserve),
            ActivityKind::UnitUsage | ActivityKind::RentAuthorize => None,
        }
    }
}

impl std::fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Billable service, used as the key of per-service usage statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    Rent,
    Extend,
    Overdue,
    Reserve,
}

/// Physical acquisition requested after a successful authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AcquireType {
    Rent,
    Extend,
    Reserve,
}

impl AcquireType {
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "Rent" => Ok(AcquireType::Rent),
            "Extend" => Ok(AcquireType::Extend),
            "Reserve" => Ok(AcquireType::Reserve),
            other => Err(CoreError::InvalidAcquireType(other.to_string())),
        }
    }

    /// Whether an authorization requested as `kind` covers this acquisition.
    pub fn is_covered_by(self, kind: ActivityKind) -> bool {
        let service = match self {
            AcquireType::Rent => ServiceKind::Rent,
            AcquireType::Extend => ServiceKind::Extend,
            AcquireType::Reserve => ServiceKind::Reserve,
        };
        kind.service() == Some(service)
    }

    /// Activity category recorded for the acquisition.
    pub fn session_kind(self) -> ActivityKind {
        match self {
            AcquireType::Rent => ActivityKind::RentSession,
            AcquireType::Extend => ActivityKind::ExtendSession,
            AcquireType::Reserve => ActivityKind::ReserveSession,
        }
    }
}
