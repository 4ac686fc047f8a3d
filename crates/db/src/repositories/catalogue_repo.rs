//! Repositories for the `areas` and `units` tables.

use locker_core::types::DbId;
use sqlx::PgPool;

use crate::models::catalogue::{AreaRow, UnitRow};

const AREA_COLUMNS: &str = "id, area_num, name, created_at";

const UNIT_COLUMNS: &str = "id, unit_num, area_num, created_at";

pub struct AreaRepo;

impl AreaRepo {
    /// All areas ordered by area number.
    pub async fn list(pool: &PgPool) -> Result<Vec<AreaRow>, sqlx::Error> {
        let query = format!("SELECT {AREA_COLUMNS} FROM areas ORDER BY area_num");
        sqlx::query_as::<_, AreaRow>(&query).fetch_all(pool).await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<AreaRow>, sqlx::Error> {
        let query = format!("SELECT {AREA_COLUMNS} FROM areas WHERE id = $1");
        sqlx::query_as::<_, AreaRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}

pub struct UnitRepo;

impl UnitRepo {
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<UnitRow>, sqlx::Error> {
        let query = format!("SELECT {UNIT_COLUMNS} FROM units WHERE id = $1");
        sqlx::query_as::<_, UnitRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Units of one area ordered by unit number.
    pub async fn list_by_area(pool: &PgPool, area_num: i32) -> Result<Vec<UnitRow>, sqlx::Error> {
        let query = format!(
            "SELECT {UNIT_COLUMNS} FROM units WHERE area_num = $1 ORDER BY unit_num"
        );
        sqlx::query_as::<_, UnitRow>(&query)
            .bind(area_num)
            .fetch_all(pool)
            .await
    }
}
