//! Area and unit rows.

use locker_core::models::{Area, Unit};
use locker_core::types::{DbId, Timestamp};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct AreaRow {
    pub id: DbId,
    pub area_num: i32,
    pub name: String,
    pub created_at: Timestamp,
}

impl From<AreaRow> for Area {
    fn from(row: AreaRow) -> Self {
        Area {
            id: row.id,
            area_num: row.area_num,
            name: row.name,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct UnitRow {
    pub id: DbId,
    pub unit_num: i32,
    pub area_num: i32,
    pub created_at: Timestamp,
}

impl From<UnitRow> for Unit {
    fn from(row: UnitRow) -> Self {
        Unit {
            id: row.id,
            unit_num: row.unit_num,
            area_num: row.area_num,
        }
    }
}
