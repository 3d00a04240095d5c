//! Paper management handlers

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
    db::{models::Paper, PaperDetails, PaperFields},
    errors::Result,
    rbac::{Action, ResourceKind},
};

/// List papers, newest first
pub async fn list_papers(
    State(state): State<AppState>,
    current: CurrentActor,
    Query(params): Query<ListParams>,
) -> Result<Json<Paginated<Paper>>> {
    current.require(ResourceKind::Paper, Action::ViewAny)?;

    let (page, per_page) = params.resolve();
    let (papers, total) = state.repo.list_papers(page, per_page).await?;

    Ok(Json(Paginated::new(papers, params, total)))
}

/// Create a paper stamped with the acting user
pub async fn create_paper(
    State(state): State<AppState>,
    current: CurrentActor,
    Json(fields): Json<PaperFields>,
) -> Result<(StatusCode, Json<PaperDetails>)> {
    let actor = current.require(ResourceKind::Paper, Action::Create)?;
    fields.validate()?;

    let paper = state.repo.create_paper(fields, actor.user_id).await?;
    let details = state.repo.paper_details(paper.id).await?;

    Ok((StatusCode::CREATED, Json(details)))
}

/// Get a paper with its tags, subjects and resource links
pub async fn get_paper(
    State(state): State<AppState>,
    current: CurrentActor,
    Path(paper_id): Path<i64>,
) -> Result<Json<PaperDetails>> {
    current.require(ResourceKind::Paper, Action::View)?;

    Ok(Json(state.repo.paper_details(paper_id).await?))
}

/// Save a paper; files replaced by the edit are removed from storage
pub async fn update_paper(
    State(state): State<AppState>,
    current: CurrentActor,
    Path(paper_id): Path<i64>,
    Json(fields): Json<PaperFields>,
) -> Result<Json<PaperDetails>> {
    let actor = current.require(ResourceKind::Paper, Action::Update)?;
    fields.validate()?;

    state
        .repo
        .update_paper(paper_id, fields, actor.user_id, state.files.as_ref())
        .await?;

    Ok(Json(state.repo.paper_details(paper_id).await?))
}

/// Delete a paper and its stored files
pub async fn delete_paper(
    State(state): State<AppState>,
    current: CurrentActor,
    Path(paper_id): Path<i64>,
) -> Result<StatusCode> {
    current.require(ResourceKind::Paper, Action::Delete)?;

    state.repo.delete_paper(paper_id, state.files.as_ref()).await?;

    Ok(StatusCode::NO_CONTENT)
}
