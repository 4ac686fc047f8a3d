//! Repositories for `transactions` and `invoices`.

use locker_core::models::{NewTransaction, TransactionRange};
use locker_core::types::DbId;
use sqlx::PgPool;

use crate::models::transaction::{InvoiceRow, TransactionRow};

const TRANSACTION_COLUMNS: &str = "id, kind, amount, user_id, activity_log_id, created_at";

const INVOICE_COLUMNS: &str = "id, activity_log_id, hours, amount, created_at";

pub struct TransactionRepo;

impl TransactionRepo {
    pub async fn insert(pool: &PgPool, entry: &NewTransaction) -> Result<TransactionRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO transactions (kind, amount, user_id, activity_log_id, created_at) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {TRANSACTION_COLUMNS}"
        );
        sqlx::query_as::<_, TransactionRow>(&query)
            .bind(entry.kind.as_str())
            .bind(entry.amount)
            .bind(entry.user_id)
            .bind(entry.activity_log_id)
            .bind(entry.created_at)
            .fetch_one(pool)
            .await
    }

    /// Transactions created within the range, oldest first. A `NULL` limit
    /// returns every row.
    pub async fn list_in_range(
        pool: &PgPool,
        range: &TransactionRange,
    ) -> Result<Vec<TransactionRow>, sqlx::Error> {
        let query = format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions \
             WHERE created_at BETWEEN $1 AND $2 \
             ORDER BY created_at, id \
             LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, TransactionRow>(&query)
            .bind(range.from)
            .bind(range.to)
            .bind(range.limit)
            .bind(range.offset)
            .fetch_all(pool)
            .await
    }
}

pub struct InvoiceRepo;

impl InvoiceRepo {
    /// The invoice attached to an activity log entry, if billing produced one.
    pub async fn find_for_activity(
        pool: &PgPool,
        activity_log_id: DbId,
    ) -> Result<Option<InvoiceRow>, sqlx::Error> {
        let query = format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices \
             WHERE activity_log_id = $1 ORDER BY id LIMIT 1"
        );
        sqlx::query_as::<_, InvoiceRow>(&query)
            .bind(activity_log_id)
            .fetch_optional(pool)
            .await
    }
}
