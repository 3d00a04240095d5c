//! Person record handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use super::{ListParams, Paginated};
use crate::middleware::actor::CurrentActor;
use crate::AppState;
use paperdesk_common::{
    db::{models::Person, PersonFields},
    errors::Result,
    rbac::{Action, ResourceKind},
};

pub async fn list_people(
    State(state): State<AppState>,
    current: CurrentActor,
    Query(params): Query<ListParams>,
) -> Result<Json<Paginated<Person>>> {
    current.require(ResourceKind::Person, Action::ViewAny)?;

    let (page, per_page) = params.resolve();
    let (people, total) = state.repo.list_people(page, per_page).await?;

    Ok(Json(Paginated::new(people, params, total)))
}

/// Create a person; the national code is checksum-validated
pub async fn create_person(
    State(state): State<AppState>,
    current: CurrentActor,
    Json(fields): Json<PersonFields>,
) -> Result<(StatusCode, Json<Person>)> {
    current.require(ResourceKind::Person, Action::Create)?;
    fields.validate()?;

    let person = state.repo.create_person(fields).await?;
    Ok((StatusCode::CREATED, Json(person)))
}

pub async fn get_person(
    State(state): State<AppState>,
    current: CurrentActor,
    Path(person_id): Path<i64>,
) -> Result<Json<Person>> {
    current.require(ResourceKind::Person, Action::View)?;

    Ok(Json(state.repo.get_person(person_id).await?))
}

pub async fn update_person(
    State(state): State<AppState>,
    current: CurrentActor,
    Path(person_id): Path<i64>,
    Json(fields): Json<PersonFields>,
) -> Result<Json<Person>> {
    current.require(ResourceKind::Person, Action::Update)?;
    fields.validate()?;

    Ok(Json(state.repo.update_person(person_id, fields).await?))
}

pub async fn delete_person(
    State(state): State<AppState>,
    current: CurrentActor,
    Path(person_id): Path<i64>,
) -> Result<StatusCode> {
    current.require(ResourceKind::Person, Action::Delete)?;

    state.repo.delete_person(person_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
