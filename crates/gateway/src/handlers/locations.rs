//! Country, province and city handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use validator::Validate;

use crate::middleware::actor::CurrentActor;
use crate::AppState;
use paperdesk_common::{
    db::{
        models::{City, Country, Province},
        CityFields, ProvinceFields, TitleFields,
    },
    errors::Result,
    rbac::{Action, ResourceKind},
};

#[derive(Debug, Default, Deserialize)]
pub struct ProvinceFilter {
    pub country_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CityFilter {
    pub province_id: Option<i64>,
}

// ============================================================================
// Countries
// ============================================================================

pub async fn list_countries(
    State(state): State<AppState>,
    current: CurrentActor,
) -> Result<Json<Vec<Country>>> {
    current.require(ResourceKind::Country, Action::ViewAny)?;
    Ok(Json(state.repo.list_countries().await?))
}

pub async fn create_country(
    State(state): State<AppState>,
    current: CurrentActor,
    Json(input): Json<TitleFields>,
) -> Result<(StatusCode, Json<Country>)> {
    current.require(ResourceKind::Country, Action::Create)?;
    input.validate()?;

    Ok((StatusCode::CREATED, Json(state.repo.create_country(input).await?)))
}

pub async fn get_country(
    State(state): State<AppState>,
    current: CurrentActor,
    Path(id): Path<i64>,
) -> Result<Json<Country>> {
    current.require(ResourceKind::Country, Action::View)?;
    Ok(Json(state.repo.get_country(id).await?))
}

pub async fn update_country(
    State(state): State<AppState>,
    current: CurrentActor,
    Path(id): Path<i64>,
    Json(input): Json<TitleFields>,
) -> Result<Json<Country>> {
    current.require(ResourceKind::Country, Action::Update)?;
    input.validate()?;

    Ok(Json(state.repo.update_country(id, input).await?))
}

/// Delete a country; fails with 409 while provinces or papers reference it
pub async fn delete_country(
    State(state): State<AppState>,
    current: CurrentActor,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    current.require(ResourceKind::Country, Action::Delete)?;

    state.repo.delete_country(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Provinces
// ============================================================================

pub async fn list_provinces(
    State(state): State<AppState>,
    current: CurrentActor,
    Query(filter): Query<ProvinceFilter>,
) -> Result<Json<Vec<Province>>> {
    current.require(ResourceKind::Province, Action::ViewAny)?;
    Ok(Json(state.repo.list_provinces(filter.country_id).await?))
}

pub async fn create_province(
    State(state): State<AppState>,
    current: CurrentActor,
    Json(input): Json<ProvinceFields>,
) -> Result<(StatusCode, Json<Province>)> {
    current.require(ResourceKind::Province, Action::Create)?;
    input.validate()?;

    Ok((StatusCode::CREATED, Json(state.repo.create_province(input).await?)))
}

pub async fn get_province(
    State(state): State<AppState>,
    current: CurrentActor,
    Path(id): Path<i64>,
) -> Result<Json<Province>> {
    current.require(ResourceKind::Province, Action::View)?;
    Ok(Json(state.repo.get_province(id).await?))
}

pub async fn update_province(
    State(state): State<AppState>,
    current: CurrentActor,
    Path(id): Path<i64>,
    Json(input): Json<ProvinceFields>,
) -> Result<Json<Province>> {
    current.require(ResourceKind::Province, Action::Update)?;
    input.validate()?;

    Ok(Json(state.repo.update_province(id, input).await?))
}

pub async fn delete_province(
    State(state): State<AppState>,
    current: CurrentActor,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    current.require(ResourceKind::Province, Action::Delete)?;

    state.repo.delete_province(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Cities
// ============================================================================

pub async fn list_cities(
    State(state): State<AppState>,
    current: CurrentActor,
    Query(filter): Query<CityFilter>,
) -> Result<Json<Vec<City>>> {
    current.require(ResourceKind::City, Action::ViewAny)?;
    Ok(Json(state.repo.list_cities(filter.province_id).await?))
}

pub async fn create_city(
    State(state): State<AppState>,
    current: CurrentActor,
    Json(input): Json<CityFields>,
) -> Result<(StatusCode, Json<City>)> {
    current.require(ResourceKind::City, Action::Create)?;
    input.validate()?;

    Ok((StatusCode::CREATED, Json(state.repo.create_city(input).await?)))
}

pub async fn get_city(
    State(state): State<AppState>,
    current: CurrentActor,
    Path(id): Path<i64>,
) -> Result<Json<City>> {
    current.require(ResourceKind::City, Action::View)?;
    Ok(Json(state.repo.get_city(id).await?))
}

pub async fn update_city(
    State(state): State<AppState>,
    current: CurrentActor,
    Path(id): Path<i64>,
    Json(input): Json<CityFields>,
) -> Result<Json<City>> {
    current.require(ResourceKind::City, Action::Update)?;
    input.validate()?;

    Ok(Json(state.repo.update_city(id, input).await?))
}

pub async fn delete_city(
    State(state): State<AppState>,
    current: CurrentActor,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    current.require(ResourceKind::City, Action::Delete)?;

    state.repo.delete_city(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
