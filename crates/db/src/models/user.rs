use locker_core::models::UserProfile;
use locker_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row of the externally maintained `users` table.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: DbId,
    pub id_num: i64,
    pub first_name: String,
    pub last_name: String,
    pub college: String,
    pub created_at: Timestamp,
}

impl From<UserRow> for UserProfile {
    fn from(row: UserRow) -> Self {
        UserProfile {
            id: row.id,
            id_num: row.id_num,
            first_name: row.first_name,
            last_name: row.last_name,
            college: row.college,
        }
    }
}
