//! Role and permission grant handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use validator::Validate;

use crate::middleware::actor::CurrentActor;
use crate::AppState;
use paperdesk_common::{
    db::{
        models::{Permission, Role},
        TitleFields,
    },
    errors::{AppError, Result},
    rbac::{Action, ResourceKind},
};

/// A role with the permissions it grants
#[derive(Serialize)]
pub struct RoleResponse {
    #[serde(flatten)]
    pub role: Role,
    pub permissions: Vec<Permission>,
}

#[derive(Serialize)]
pub struct GrantResponse {
    pub role_id: i64,
    pub permission_id: i64,
    /// False when the role already held the permission
    pub granted: bool,
}

pub async fn list_roles(
    State(state): State<AppState>,
    current: CurrentActor,
) -> Result<Json<Vec<Role>>> {
    current.require(ResourceKind::Role, Action::ViewAny)?;
    Ok(Json(state.repo.list_roles().await?))
}

pub async fn create_role(
    State(state): State<AppState>,
    current: CurrentActor,
    Json(input): Json<TitleFields>,
) -> Result<(StatusCode, Json<Role>)> {
    current.require(ResourceKind::Role, Action::Create)?;
    input.validate()?;

    Ok((StatusCode::CREATED, Json(state.repo.create_role(input).await?)))
}

pub async fn get_role(
    State(state): State<AppState>,
    current: CurrentActor,
    Path(role_id): Path<i64>,
) -> Result<Json<RoleResponse>> {
    current.require(ResourceKind::Role, Action::View)?;

    let role = state.repo.get_role(role_id).await?;
    let permissions = state.repo.role_permissions(role_id).await?;

    Ok(Json(RoleResponse { role, permissions }))
}

pub async fn update_role(
    State(state): State<AppState>,
    current: CurrentActor,
    Path(role_id): Path<i64>,
    Json(input): Json<TitleFields>,
) -> Result<Json<Role>> {
    current.require(ResourceKind::Role, Action::Update)?;
    input.validate()?;

    Ok(Json(state.repo.update_role(role_id, input).await?))
}

pub async fn delete_role(
    State(state): State<AppState>,
    current: CurrentActor,
    Path(role_id): Path<i64>,
) -> Result<StatusCode> {
    current.require(ResourceKind::Role, Action::Delete)?;

    state.repo.delete_role(role_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Every persisted permission name
pub async fn list_permissions(
    State(state): State<AppState>,
    current: CurrentActor,
) -> Result<Json<Vec<Permission>>> {
    current.require(ResourceKind::PermissionRole, Action::ViewAny)?;
    Ok(Json(state.repo.list_permissions().await?))
}

/// Attach a permission to a role
pub async fn grant_permission(
    State(state): State<AppState>,
    current: CurrentActor,
    Path((role_id, permission_id)): Path<(i64, i64)>,
) -> Result<(StatusCode, Json<GrantResponse>)> {
    let actor = current.require(ResourceKind::PermissionRole, Action::Create)?;

    let granted = state.repo.grant_permission(role_id, permission_id).await?;
    tracing::info!(role_id, permission_id, granted, by = actor.user_id, "Permission granted");

    let status = if granted { StatusCode::CREATED } else { StatusCode::OK };
    Ok((
        status,
        Json(GrantResponse {
            role_id,
            permission_id,
            granted,
        }),
    ))
}

/// Detach a permission from a role
pub async fn revoke_permission(
    State(state): State<AppState>,
    current: CurrentActor,
    Path((role_id, permission_id)): Path<(i64, i64)>,
) -> Result<StatusCode> {
    let actor = current.require(ResourceKind::PermissionRole, Action::Delete)?;

    if !state.repo.revoke_permission(role_id, permission_id).await? {
        return Err(AppError::NotFound {
            resource_type: "permission_role".to_string(),
            id: format!("{}/{}", role_id, permission_id),
        });
    }

    tracing::info!(role_id, permission_id, by = actor.user_id, "Permission revoked");
    Ok(StatusCode::NO_CONTENT)
}
