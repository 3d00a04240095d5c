//! Paper type handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::middleware::actor::CurrentActor;
use crate::AppState;
use paperdesk_common::{
    db::{models::PaperType, TitleFields},
    errors::Result,
    rbac::{Action, ResourceKind},
};

pub async fn list_paper_types(
    State(state): State<AppState>,
    current: CurrentActor,
) -> Result<Json<Vec<PaperType>>> {
    current.require(ResourceKind::PaperType, Action::ViewAny)?;
    Ok(Json(state.repo.list_paper_types().await?))
}

pub async fn create_paper_type(
    State(state): State<AppState>,
    current: CurrentActor,
    Json(input): Json<TitleFields>,
) -> Result<(StatusCode, Json<PaperType>)> {
    current.require(ResourceKind::PaperType, Action::Create)?;
    input.validate()?;

    Ok((StatusCode::CREATED, Json(state.repo.create_paper_type(input).await?)))
}

/// Delete a paper type; 409 while papers still use it
pub async fn delete_paper_type(
    State(state): State<AppState>,
    current: CurrentActor,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    current.require(ResourceKind::PaperType, Action::Delete)?;

    state.repo.delete_paper_type(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
