//! Locker leasing domain logic.
//!
//! Everything in this crate is independent of the database and the HTTP
//! layer. Persistence is reached only through the [`store::LeaseStore`]
//! trait, implemented by `locker_db` for PostgreSQL and by
//! [`store::memory::MemoryLeaseStore`] for tests and local development.

pub mod accounting;
pub mod acquire;
pub mod activity;
pub mod capture;
pub mod catalogue;
pub mod config;
pub mod engine;
pub mod error;
pub mod gate;
pub mod ids;
pub mod models;
pub mod overdue;
pub mod roles;
pub mod store;
pub mod types;
