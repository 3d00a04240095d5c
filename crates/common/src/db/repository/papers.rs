//! Papers, their tags, subjects and resource links

use super::{ensure_deleted, now, Repository, TitleFields};
use crate::db::models::*;
use crate::errors::{AppError, Result};
use crate::storage::{delete_all, FileStore};
use crate::validation::safe_file_name;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

/// Editable paper fields. Audit columns are never taken from input.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct PaperFields {
    #[validate(length(min = 1, max = 500))]
    pub title: String,

    pub paper_type_id: Option<i64>,

    pub country_id: Option<i64>,

    #[validate(url)]
    pub title_url: Option<String>,

    pub priority: Option<i32>,

    #[validate(custom(function = "safe_file_name"))]
    pub image_path1: Option<String>,

    #[validate(custom(function = "safe_file_name"))]
    pub image_path2: Option<String>,

    #[validate(custom(function = "safe_file_name"))]
    pub paper_file: Option<String>,

    #[validate(custom(function = "safe_file_name"))]
    pub paper_word_file: Option<String>,

    pub paper_date: Option<chrono::NaiveDate>,

    #[validate(length(max = 255))]
    pub doi: Option<String>,

    #[validate(range(min = 0))]
    pub count_page: Option<i32>,

    #[validate(url)]
    pub reference_link: Option<String>,

    #[serde(default)]
    pub is_accepted: bool,

    #[serde(default)]
    pub is_visible: bool,

    #[serde(default)]
    pub is_archived: bool,

    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,

    pub description: Option<String>,

    #[serde(default)]
    pub subject_ids: Vec<i64>,

    #[serde(default)]
    #[validate(nested)]
    pub resources: Vec<ResourceLink>,
}

/// A titled external link
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct ResourceLink {
    #[validate(length(min = 1, max = 255))]
    pub title: String,

    #[validate(url)]
    pub link: String,
}

/// A paper with its related records
#[derive(Debug, Clone, Serialize)]
pub struct PaperDetails {
    #[serde(flatten)]
    pub paper: Paper,
    pub tags: Vec<Tag>,
    pub subjects: Vec<Subject>,
    pub resources: Vec<PaperResource>,
}

impl PaperFields {
    fn apply(&self, model: &mut PaperActiveModel) {
        model.title = Set(self.title.clone());
        model.paper_type_id = Set(self.paper_type_id);
        model.country_id = Set(self.country_id);
        model.title_url = Set(self.title_url.clone());
        model.priority = Set(self.priority);
        model.image_path1 = Set(self.image_path1.clone());
        model.image_path2 = Set(self.image_path2.clone());
        model.paper_file = Set(self.paper_file.clone());
        model.paper_word_file = Set(self.paper_word_file.clone());
        model.paper_date = Set(self.paper_date);
        model.doi = Set(self.doi.clone());
        model.count_page = Set(self.count_page);
        model.reference_link = Set(self.reference_link.clone());
        model.is_accepted = Set(self.is_accepted);
        model.is_visible = Set(self.is_visible);
        model.is_archived = Set(self.is_archived);
        model.abstract_text = Set(self.abstract_text.clone());
        model.description = Set(self.description.clone());
    }
}

/// Active model for a new paper, stamped with its creator
fn new_paper_model(fields: &PaperFields, actor_id: i64) -> PaperActiveModel {
    let mut model = PaperActiveModel {
        insert_user_id: Set(Some(actor_id)),
        edit_user_id: Set(None),
        created_at: Set(now()),
        updated_at: Set(now()),
        ..Default::default()
    };
    fields.apply(&mut model);
    model
}

/// Active model for saving an existing paper, stamped with its editor
fn edited_paper_model(existing: Paper, fields: &PaperFields, actor_id: i64) -> PaperActiveModel {
    let mut model: PaperActiveModel = existing.into();
    fields.apply(&mut model);
    model.edit_user_id = Set(Some(actor_id));
    model.updated_at = Set(now());
    model
}

/// Deduplicate tag names, keeping first-seen order
fn distinct_names(names: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    names
        .iter()
        .map(|n| n.trim())
        .filter(|n| !n.is_empty())
        .filter(|n| seen.insert(n.to_string()))
        .map(str::to_string)
        .collect()
}

impl Repository {
    // ========================================================================
    // Paper Operations
    // ========================================================================

    pub async fn find_paper(&self, id: i64) -> Result<Option<Paper>> {
        PaperEntity::find_by_id(id)
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    pub async fn get_paper(&self, id: i64) -> Result<Paper> {
        self.find_paper(id)
            .await?
            .ok_or(AppError::PaperNotFound { id })
    }

    /// List papers, newest first (0-based page)
    pub async fn list_papers(&self, page: u64, per_page: u64) -> Result<(Vec<Paper>, u64)> {
        let paginator = PaperEntity::find()
            .order_by_desc(PaperColumn::CreatedAt)
            .order_by_desc(PaperColumn::Id)
            .paginate(self.conn(), per_page);

        let total = paginator.num_items().await?;
        let papers = paginator.fetch_page(page).await?;

        Ok((papers, total))
    }

    /// Paper with tags, subjects and resource links
    pub async fn paper_details(&self, id: i64) -> Result<PaperDetails> {
        let paper = self.get_paper(id).await?;

        let tags = paper
            .find_related(TagEntity)
            .order_by_asc(TagColumn::Name)
            .all(self.conn())
            .await?;
        let subjects = paper
            .find_related(SubjectEntity)
            .order_by_asc(SubjectColumn::Title)
            .all(self.conn())
            .await?;
        let resources = paper
            .find_related(PaperResourceEntity)
            .order_by_asc(PaperResourceColumn::Id)
            .all(self.conn())
            .await?;

        Ok(PaperDetails { paper, tags, subjects, resources })
    }

    /// Create a paper on behalf of `actor_id`
    pub async fn create_paper(&self, fields: PaperFields, actor_id: i64) -> Result<Paper> {
        let txn = self.conn().begin().await?;

        let paper = new_paper_model(&fields, actor_id).insert(&txn).await?;
        replace_paper_links(&txn, paper.id, &fields).await?;

        txn.commit().await?;

        info!(paper_id = paper.id, user_id = actor_id, "Paper created");
        Ok(paper)
    }

    /// Save a paper on behalf of `actor_id`. Stored files whose field
    /// changed are deleted after the save commits.
    pub async fn update_paper(
        &self,
        id: i64,
        fields: PaperFields,
        actor_id: i64,
        files: &dyn FileStore,
    ) -> Result<Paper> {
        let existing = self.get_paper(id).await?;
        let txn = self.conn().begin().await?;

        let updated = edited_paper_model(existing.clone(), &fields, actor_id)
            .update(&txn)
            .await?;
        replace_paper_links(&txn, id, &fields).await?;

        txn.commit().await?;

        let replaced = existing.replaced_files(&updated);
        delete_all(files, replaced.iter().map(String::as_str)).await;

        info!(
            paper_id = id,
            user_id = actor_id,
            replaced_files = replaced.len(),
            "Paper updated"
        );
        Ok(updated)
    }

    /// Delete a paper and its stored files
    pub async fn delete_paper(&self, id: i64, files: &dyn FileStore) -> Result<()> {
        let paper = self.get_paper(id).await?;

        let result = PaperEntity::delete_by_id(id).exec(self.conn()).await?;
        ensure_deleted(result, "paper", id)?;

        delete_all(files, paper.file_paths()).await;

        info!(paper_id = id, "Paper deleted");
        Ok(())
    }

    // ========================================================================
    // Tag Operations
    // ========================================================================

    /// Find tags by name, creating the missing ones. Returned in input order.
    pub async fn find_or_create_tags(&self, names: &[String]) -> Result<Vec<Tag>> {
        let names = distinct_names(names);
        if names.is_empty() {
            return Ok(Vec::new());
        }

        TagEntity::insert_many(names.iter().map(|name| TagActiveModel {
            name: Set(name.clone()),
            ..Default::default()
        }))
        .on_conflict(OnConflict::column(TagColumn::Name).do_nothing().to_owned())
        .exec_without_returning(self.conn())
        .await?;

        let mut tags = TagEntity::find()
            .filter(TagColumn::Name.is_in(names.clone()))
            .all(self.conn())
            .await?;
        tags.sort_by_key(|tag| names.iter().position(|n| *n == tag.name));

        Ok(tags)
    }

    /// Link tags to a paper, ignoring links that already exist
    pub async fn attach_tags(&self, paper_id: i64, tag_ids: &[i64]) -> Result<u64> {
        if tag_ids.is_empty() {
            return Ok(0);
        }

        let attached = PaperTagEntity::insert_many(tag_ids.iter().map(|tag_id| PaperTagActiveModel {
            paper_id: Set(paper_id),
            tag_id: Set(*tag_id),
        }))
        .on_conflict(
            OnConflict::columns([PaperTagColumn::PaperId, PaperTagColumn::TagId])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(self.conn())
        .await?;

        Ok(attached)
    }

    /// Find-or-create each tag by name and attach it to the paper
    pub async fn apply_tags(&self, paper_id: i64, names: &[String]) -> Result<Vec<Tag>> {
        self.get_paper(paper_id).await?;

        let tags = self.find_or_create_tags(names).await?;
        let ids: Vec<i64> = tags.iter().map(|t| t.id).collect();
        let attached = self.attach_tags(paper_id, &ids).await?;

        info!(paper_id, tags = tags.len(), attached, "Tags applied to paper");
        Ok(tags)
    }

    pub async fn paper_tags(&self, paper_id: i64) -> Result<Vec<Tag>> {
        let paper = self.get_paper(paper_id).await?;
        paper
            .find_related(TagEntity)
            .order_by_asc(TagColumn::Name)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Paper Type Operations
    // ========================================================================

    pub async fn list_paper_types(&self) -> Result<Vec<PaperType>> {
        PaperTypeEntity::find()
            .order_by_asc(PaperTypeColumn::Title)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    pub async fn create_paper_type(&self, input: TitleFields) -> Result<PaperType> {
        PaperTypeActiveModel {
            title: Set(input.title),
            created_at: Set(now()),
            updated_at: Set(now()),
            ..Default::default()
        }
        .insert(self.conn())
        .await
        .map_err(Into::into)
    }

    pub async fn delete_paper_type(&self, id: i64) -> Result<()> {
        let result = PaperTypeEntity::delete_by_id(id).exec(self.conn()).await?;
        ensure_deleted(result, "paper_type", id)
    }
}

/// Replace a paper's subject links and resource rows with those in `fields`
async fn replace_paper_links<C: ConnectionTrait>(
    conn: &C,
    paper_id: i64,
    fields: &PaperFields,
) -> Result<()> {
    PaperSubjectEntity::delete_many()
        .filter(PaperSubjectColumn::PaperId.eq(paper_id))
        .exec(conn)
        .await?;

    let mut subject_ids = fields.subject_ids.clone();
    subject_ids.sort_unstable();
    subject_ids.dedup();

    if !subject_ids.is_empty() {
        PaperSubjectEntity::insert_many(subject_ids.into_iter().map(|subject_id| {
            PaperSubjectActiveModel {
                paper_id: Set(paper_id),
                subject_id: Set(subject_id),
            }
        }))
        .exec_without_returning(conn)
        .await?;
    }

    PaperResourceEntity::delete_many()
        .filter(PaperResourceColumn::PaperId.eq(paper_id))
        .exec(conn)
        .await?;

    if !fields.resources.is_empty() {
        PaperResourceEntity::insert_many(fields.resources.iter().map(|r| PaperResourceActiveModel {
            paper_id: Set(paper_id),
            title: Set(r.title.clone()),
            link: Set(r.link.clone()),
            ..Default::default()
        }))
        .exec_without_returning(conn)
        .await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::testing::{mock_repository, postgres};
    use super::*;
    use async_trait::async_trait;
    use sea_orm::MockExecResult;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingStore {
        deleted: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl FileStore for RecordingStore {
        async fn delete(&self, reference: &str) -> Result<()> {
            self.deleted.lock().unwrap().push(reference.to_string());
            Ok(())
        }

        async fn delete_dir(&self, reference: &str) -> Result<()> {
            self.deleted.lock().unwrap().push(format!("{}/", reference));
            Ok(())
        }

        async fn exists(&self, _reference: &str) -> Result<bool> {
            Ok(true)
        }
    }

    fn stored_paper() -> Paper {
        Paper {
            id: 3,
            title: "Sparse attention".into(),
            paper_type_id: Some(1),
            country_id: None,
            title_url: None,
            priority: Some(2),
            image_path1: Some("images/cover.png".into()),
            image_path2: None,
            paper_file: Some("papers/sparse.pdf".into()),
            paper_word_file: None,
            paper_date: None,
            doi: None,
            count_page: Some(12),
            reference_link: None,
            is_accepted: true,
            is_visible: true,
            is_archived: false,
            abstract_text: Some("We study sparse attention.".into()),
            description: None,
            insert_user_id: Some(1),
            edit_user_id: None,
            created_at: now(),
            updated_at: now(),
        }
    }

    fn fields() -> PaperFields {
        PaperFields {
            title: "Sparse attention, revisited".into(),
            paper_file: Some("papers/sparse-v2.pdf".into()),
            ..PaperFields::default()
        }
    }

    #[test]
    fn test_new_paper_is_stamped_with_creator() {
        let model = new_paper_model(&fields(), 7);

        assert_eq!(model.insert_user_id.clone().unwrap(), Some(7));
        assert_eq!(model.edit_user_id.clone().unwrap(), None);
        assert_eq!(model.title.clone().unwrap(), "Sparse attention, revisited");
    }

    #[test]
    fn test_edit_stamps_editor_and_keeps_creator() {
        let model = edited_paper_model(stored_paper(), &fields(), 9);

        assert!(!model.insert_user_id.is_set());
        assert_eq!(model.insert_user_id.clone().unwrap(), Some(1));
        assert_eq!(model.edit_user_id.clone().unwrap(), Some(9));
    }

    #[test]
    fn test_audit_columns_not_accepted_from_input() {
        let json = r#"{"title": "A", "insert_user_id": 99, "edit_user_id": 99}"#;
        let fields: PaperFields = serde_json::from_str(json).unwrap();
        let model = new_paper_model(&fields, 7);

        assert_eq!(model.insert_user_id.clone().unwrap(), Some(7));
    }

    #[test]
    fn test_field_validation() {
        let mut input = fields();
        assert!(input.validate().is_ok());

        input.paper_file = Some("../../etc/passwd".into());
        assert!(input.validate().is_err());

        input.paper_file = None;
        input.resources = vec![ResourceLink { title: "Code".into(), link: "not a url".into() }];
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_distinct_names() {
        let names = vec![" AI ".to_string(), "AI".to_string(), "".to_string(), "NLP".to_string()];
        assert_eq!(distinct_names(&names), vec!["AI", "NLP"]);
    }

    #[tokio::test]
    async fn test_delete_paper_removes_files() {
        let db = postgres()
            .append_query_results([vec![stored_paper()]])
            .append_exec_results([MockExecResult { last_insert_id: 0, rows_affected: 1 }]);
        let (repo, _) = mock_repository(db);
        let store = RecordingStore::default();

        repo.delete_paper(3, &store).await.unwrap();

        let deleted = store.deleted.lock().unwrap().clone();
        assert_eq!(deleted, vec!["papers/sparse.pdf", "images/cover.png"]);
    }

    #[tokio::test]
    async fn test_delete_missing_paper() {
        let db = postgres().append_query_results([Vec::<Paper>::new()]);
        let (repo, _) = mock_repository(db);
        let store = RecordingStore::default();

        let err = repo.delete_paper(3, &store).await.unwrap_err();
        assert!(matches!(err, AppError::PaperNotFound { id: 3 }));
        assert!(store.deleted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_find_or_create_tags_keeps_input_order() {
        let db = postgres()
            .append_exec_results([MockExecResult { last_insert_id: 0, rows_affected: 1 }])
            .append_query_results([vec![
                Tag { id: 1, name: "nlp".into() },
                Tag { id: 2, name: "transformers".into() },
            ]]);
        let (repo, _) = mock_repository(db);

        let tags = repo
            .find_or_create_tags(&["transformers".to_string(), "nlp".to_string()])
            .await
            .unwrap();

        let names: Vec<_> = tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["transformers", "nlp"]);
    }

    #[tokio::test]
    async fn test_find_or_create_no_names() {
        let (repo, _) = mock_repository(postgres());
        assert!(repo.find_or_create_tags(&[]).await.unwrap().is_empty());
    }
}
