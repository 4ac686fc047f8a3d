//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async query methods
//! that accept `&PgPool` (or a connection inside a transaction) as the
//! first argument and return row models.

pub mod activity_repo;
pub mod catalogue_repo;
pub mod lease_repo;
pub mod transaction_repo;
pub mod user_repo;

pub use activity_repo::{ActivityLogRepo, ConsumptionRepo};
pub use catalogue_repo::{AreaRepo, UnitRepo};
pub use lease_repo::{LeaseEventRepo, LeaseRepo};
pub use transaction_repo::{InvoiceRepo, TransactionRepo};
pub use user_repo::UserRepo;
