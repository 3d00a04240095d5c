//! Tag extraction handlers

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::middleware::actor::CurrentActor;
use crate::AppState;
use paperdesk_common::{
    db::models::{Paper, Tag},
    errors::Result,
    rbac::{Action, ResourceKind},
    TagExtraction,
};

#[derive(Debug, Deserialize, Validate)]
pub struct ExtractTagsRequest {
    #[validate(length(max = 50000))]
    pub text: Option<String>,
}

#[derive(Serialize)]
pub struct PaperTagsResponse {
    pub paper_id: i64,
    pub extraction: TagExtraction,
    /// Tags attached to the paper by this call
    pub applied: Vec<Tag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Text used for a paper's tags: the description, else the abstract
fn paper_text(paper: &Paper) -> Option<&str> {
    [paper.description.as_deref(), paper.abstract_text.as_deref()]
        .into_iter()
        .flatten()
        .find(|text| !text.trim().is_empty())
}

/// Extract tags for a paper and attach them.
///
/// Keyword-fallback tags are returned for review but not attached.
pub async fn extract_paper_tags(
    State(state): State<AppState>,
    current: CurrentActor,
    Path(paper_id): Path<i64>,
) -> Result<Json<PaperTagsResponse>> {
    current.require(ResourceKind::Paper, Action::Update)?;

    let paper = state.repo.get_paper(paper_id).await?;
    let extraction = state.tagger.extract(paper_text(&paper)).await;

    if let Some(reason) = &extraction.fallback_reason {
        tracing::warn!(paper_id, reason = %reason, "Tags not applied, keyword fallback used");
        return Ok(Json(PaperTagsResponse {
            paper_id,
            warning: Some(format!("Tags were not applied: {}", reason)),
            extraction,
            applied: Vec::new(),
        }));
    }

    let applied = state.repo.apply_tags(paper_id, &extraction.tags).await?;

    Ok(Json(PaperTagsResponse {
        paper_id,
        extraction,
        applied,
        warning: None,
    }))
}

/// Extract tags from free text without touching any paper
pub async fn extract_tags(
    State(state): State<AppState>,
    current: CurrentActor,
    Json(request): Json<ExtractTagsRequest>,
) -> Result<Json<TagExtraction>> {
    current.require(ResourceKind::Paper, Action::Create)?;
    request.validate()?;

    Ok(Json(state.tagger.extract(request.text.as_deref()).await))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paper(description: Option<&str>, abstract_text: Option<&str>) -> Paper {
        Paper {
            description: description.map(str::to_string),
            abstract_text: abstract_text.map(str::to_string),
            ..test_paper()
        }
    }

    fn test_paper() -> Paper {
        let now = chrono::Utc::now().fixed_offset();
        Paper {
            id: 1,
            title: "Protein folding".to_string(),
            paper_type_id: None,
            country_id: None,
            title_url: None,
            priority: None,
            image_path1: None,
            image_path2: None,
            paper_file: None,
            paper_word_file: None,
            paper_date: None,
            doi: None,
            count_page: None,
            reference_link: None,
            is_accepted: false,
            is_visible: false,
            is_archived: false,
            abstract_text: None,
            description: None,
            insert_user_id: None,
            edit_user_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_paper_text_prefers_description() {
        let p = paper(Some("Graph neural networks"), Some("An abstract"));
        assert_eq!(paper_text(&p), Some("Graph neural networks"));
    }

    #[test]
    fn test_paper_text_skips_blank_description() {
        let p = paper(Some("   "), Some("An abstract"));
        assert_eq!(paper_text(&p), Some("An abstract"));

        assert_eq!(paper_text(&paper(None, None)), None);
    }
}
