//! Transaction and invoice rows.

use locker_core::error::CoreError;
use locker_core::models::{Invoice, Transaction};
use locker_core::types::{DbId, Timestamp};
use sqlx::FromRow;

use super::activity::parse_kind;

#[derive(Debug, Clone, FromRow)]
pub struct TransactionRow {
    pub id: DbId,
    pub kind: String,
    pub amount: f64,
    pub user_id: DbId,
    pub activity_log_id: DbId,
    pub created_at: Timestamp,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = CoreError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        Ok(Transaction {
            id: row.id,
            kind: parse_kind(row.id, &row.kind)?,
            amount: row.amount,
            user_id: row.user_id,
            activity_log_id: row.activity_log_id,
            created_at: row.created_at,
        })
    }
}

/// Billing metadata written by the billing provider. Read-only here.
#[derive(Debug, Clone, FromRow)]
pub struct InvoiceRow {
    pub id: DbId,
    pub activity_log_id: DbId,
    pub hours: f64,
    pub amount: f64,
    pub created_at: Timestamp,
}

impl From<InvoiceRow> for Invoice {
    fn from(row: InvoiceRow) -> Self {
        Invoice {
            id: row.id,
            activity_log_id: row.activity_log_id,
            hours: row.hours,
            amount: row.amount,
        }
    }
}
