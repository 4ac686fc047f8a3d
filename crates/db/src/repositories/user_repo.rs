//! Repository for the read-only `users` table.

use locker_core::types::DbId;
use sqlx::PgPool;

use crate::models::user::UserRow;

const COLUMNS: &str = "id, id_num, first_name, last_name, college, created_at";

pub struct UserRepo;

impl UserRepo {
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<UserRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, UserRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
