//! Read-only views over areas, units and a user's lease history.

use futures::future::join_all;
use rand::seq::IndexedRandom;

use crate::config::EngineConfig;
use crate::error::CoreError;
use crate::ids::parse_id;
use crate::models::{Area, LeaseEvent, LeaseMode, UnitStatus};
use crate::store::{guarded_read, LeaseStore};
use crate::types::DbId;

/// Parse a client-supplied area number.
pub fn parse_area_num(raw: Option<&str>) -> Result<i32, CoreError> {
    let num = parse_id("Area Number", raw)?;
    i32::try_from(num).map_err(|_| CoreError::InvalidIdentifier {
        param: "Area Number",
    })
}

/// Every unit in an area with its status derived from the lease.
pub async fn list_units(
    store: &dyn LeaseStore,
    config: &EngineConfig,
    area_num: i32,
) -> Result<Vec<UnitStatus>, CoreError> {
    let units = guarded_read(config, "list_units_in_area", move || {
        store.list_units_in_area(area_num)
    })
    .await?;
    if units.is_empty() {
        return Err(CoreError::NotFound {
            entity: "Area",
            id: DbId::from(area_num),
        });
    }

    let leases = join_all(units.iter().map(move |unit| {
        let unit_id = unit.id;
        guarded_read(config, "find_lease", move || store.find_lease(unit_id))
    }))
    .await;

    units
        .into_iter()
        .zip(leases)
        .map(|(unit, lease)| {
            Ok(UnitStatus {
                unit_id: unit.id,
                unit_num: unit.unit_num,
                area_num: unit.area_num,
                status: lease?.map_or(LeaseMode::Available, |l| l.mode),
            })
        })
        .collect()
}

pub async fn list_areas(
    store: &dyn LeaseStore,
    config: &EngineConfig,
) -> Result<Vec<Area>, CoreError> {
    guarded_read(config, "list_areas", move || store.list_areas()).await
}

pub async fn area_info(
    store: &dyn LeaseStore,
    config: &EngineConfig,
    raw_id: Option<&str>,
) -> Result<Area, CoreError> {
    let id = parse_id("Area ID", raw_id)?;
    guarded_read(config, "find_area", move || store.find_area(id))
        .await?
        .ok_or(CoreError::NotFound { entity: "Area", id })
}

/// Pick a random available unit in the area.
pub async fn suggest_unit(
    store: &dyn LeaseStore,
    config: &EngineConfig,
    area_num: i32,
) -> Result<UnitStatus, CoreError> {
    let candidates: Vec<UnitStatus> = list_units(store, config, area_num)
        .await?
        .into_iter()
        .filter(|unit| unit.status == LeaseMode::Available)
        .collect();

    let pick = candidates.choose(&mut rand::rng()).cloned();
    pick.ok_or(CoreError::NotFound {
        entity: "Available unit in area",
        id: DbId::from(area_num),
    })
}

/// A user's lease events, newest first.
pub async fn user_sessions(
    store: &dyn LeaseStore,
    config: &EngineConfig,
    user_id: DbId,
) -> Result<Vec<LeaseEvent>, CoreError> {
    guarded_read(config, "list_lease_events_for_user", move || {
        store.list_lease_events_for_user(user_id)
    })
    .await
}
