//! Request handlers.
//!
//! Each submodule decodes the request, delegates to the matching operation
//! in `locker_core` against the configured [`LeaseStore`], and wraps the
//! result in the standard envelope.
//!
//! [`LeaseStore`]: locker_core::store::LeaseStore

pub mod catalogue;
pub mod stats;
pub mod transaction;
