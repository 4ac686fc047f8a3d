//! Tunables for the leasing engine.

use std::time::Duration;

/// Default bound on a single store operation.
pub const DEFAULT_STORE_TIMEOUT_MS: u64 = 5_000;

/// Default number of retries for a read that timed out or hit an
/// unavailable store.
pub const DEFAULT_READ_RETRIES: u32 = 2;

/// Default lease length granted by `acquire` when the caller omits one.
pub const DEFAULT_LEASE_SECS: i64 = 60 * 60;

/// Longest lease a single acquisition may grant (30 days).
pub const MAX_LEASE_SECS: i64 = 60 * 60 * 24 * 30;

/// Whether an authorization record may gate more than one downstream action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthorizationReuse {
    /// A record may be presented any number of times.
    #[default]
    Reusable,
    /// The first successful action consumes the record.
    SingleUse,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub store_timeout: Duration,
    pub read_retries: u32,
    pub default_lease_secs: i64,
    pub authorization_reuse: AuthorizationReuse,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            store_timeout: Duration::from_millis(DEFAULT_STORE_TIMEOUT_MS),
            read_retries: DEFAULT_READ_RETRIES,
            default_lease_secs: DEFAULT_LEASE_SECS,
            authorization_reuse: AuthorizationReuse::Reusable,
        }
    }
}
