//! Database row structs.
//!
//! Each submodule contains a `FromRow` struct matching the table row and a
//! `TryFrom` conversion into the domain type. Text columns holding enums are
//! parsed during conversion; an unknown value is reported as
//! `CoreError::Internal`.

pub mod activity;
pub mod catalogue;
pub mod lease;
pub mod transaction;
pub mod user;
