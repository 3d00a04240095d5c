//! User account handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{ListParams, Paginated};
use crate::middleware::actor::CurrentActor;
use crate::AppState;
use paperdesk_common::{
    db::{
        models::{Role, User},
        NewUser,
    },
    errors::Result,
    rbac::{Action, ResourceKind},
};

#[derive(Debug, Deserialize)]
pub struct SetRolesRequest {
    pub role_ids: Vec<i64>,
}

/// A user with their assigned roles
#[derive(Serialize)]
pub struct UserResponse {
    #[serde(flatten)]
    pub user: User,
    pub roles: Vec<Role>,
}

pub async fn list_users(
    State(state): State<AppState>,
    current: CurrentActor,
    Query(params): Query<ListParams>,
) -> Result<Json<Paginated<User>>> {
    current.require(ResourceKind::User, Action::ViewAny)?;

    let (page, per_page) = params.resolve();
    let (users, total) = state.repo.list_users(page, per_page).await?;

    Ok(Json(Paginated::new(users, params, total)))
}

pub async fn create_user(
    State(state): State<AppState>,
    current: CurrentActor,
    Json(input): Json<NewUser>,
) -> Result<(StatusCode, Json<User>)> {
    current.require(ResourceKind::User, Action::Create)?;
    input.validate()?;

    let user = state.repo.create_user(input).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn get_user(
    State(state): State<AppState>,
    current: CurrentActor,
    Path(user_id): Path<i64>,
) -> Result<Json<UserResponse>> {
    current.require(ResourceKind::User, Action::View)?;

    let user = state.repo.get_user(user_id).await?;
    let roles = state.repo.user_roles(user_id).await?;

    Ok(Json(UserResponse { user, roles }))
}

/// Delete a user. Nobody may delete their own account.
pub async fn delete_user(
    State(state): State<AppState>,
    current: CurrentActor,
    Path(user_id): Path<i64>,
) -> Result<StatusCode> {
    let actor = current.require_on_record(ResourceKind::User, Action::Delete, user_id)?;

    state.repo.delete_user(user_id).await?;
    tracing::info!(user_id, by = actor.user_id, "User deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Replace the roles assigned to a user
pub async fn set_user_roles(
    State(state): State<AppState>,
    current: CurrentActor,
    Path(user_id): Path<i64>,
    Json(request): Json<SetRolesRequest>,
) -> Result<Json<UserResponse>> {
    current.require(ResourceKind::User, Action::Update)?;

    let roles = state.repo.set_user_roles(user_id, &request.role_ids).await?;
    let user = state.repo.get_user(user_id).await?;

    Ok(Json(UserResponse { user, roles }))
}
