//! Handlers for areas and units.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use locker_core::catalogue::{area_info, list_areas, list_units, parse_area_num, suggest_unit};
use locker_core::models::{Area, UnitStatus};
use serde::Deserialize;

use crate::error::AppResult;
use crate::middleware::rbac::RequireAuth;
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct AreaParams {
    pub area_num: Option<String>,
}

/// GET /api/v1/units?area_num=
pub async fn units(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    params: Result<Query<AreaParams>, QueryRejection>,
) -> AppResult<Json<ApiResponse<Vec<UnitStatus>>>> {
    let Query(params) = params?;
    let area_num = parse_area_num(params.area_num.as_deref())?;

    let units = list_units(state.store(), state.engine(), area_num).await?;
    Ok(Json(ApiResponse::ok(units)))
}

/// GET /api/v1/units/suggest?area_num=
///
/// A random available unit in the area.
pub async fn suggest(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    params: Result<Query<AreaParams>, QueryRejection>,
) -> AppResult<Json<ApiResponse<UnitStatus>>> {
    let Query(params) = params?;
    let area_num = parse_area_num(params.area_num.as_deref())?;

    let unit = suggest_unit(state.store(), state.engine(), area_num).await?;
    Ok(Json(ApiResponse::ok(unit)))
}

/// GET /api/v1/areas
pub async fn areas(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
) -> AppResult<Json<ApiResponse<Vec<Area>>>> {
    let areas = list_areas(state.store(), state.engine()).await?;
    Ok(Json(ApiResponse::ok(areas)))
}

/// GET /api/v1/areas/{id}
pub async fn area(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<Area>>> {
    let area = area_info(state.store(), state.engine(), Some(&id)).await?;
    Ok(Json(ApiResponse::ok(area)))
}
