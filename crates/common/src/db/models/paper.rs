//! Paper entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "papers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    #[sea_orm(column_type = "Text")]
    pub title: String,

    pub paper_type_id: Option<i64>,

    pub country_id: Option<i64>,

    pub title_url: Option<String>,

    pub priority: Option<i32>,

    pub image_path1: Option<String>,

    pub image_path2: Option<String>,

    pub paper_file: Option<String>,

    pub paper_word_file: Option<String>,

    pub paper_date: Option<Date>,

    pub doi: Option<String>,

    pub count_page: Option<i32>,

    pub reference_link: Option<String>,

    pub is_accepted: bool,

    pub is_visible: bool,

    pub is_archived: bool,

    #[sea_orm(column_name = "abstract", column_type = "Text", nullable)]
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    /// User who created the record
    pub insert_user_id: Option<i64>,

    /// User who last saved the record
    pub edit_user_id: Option<i64>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    fn file_fields(&self) -> [&Option<String>; 4] {
        [
            &self.paper_file,
            &self.paper_word_file,
            &self.image_path1,
            &self.image_path2,
        ]
    }

    /// Stored file references held by this paper
    pub fn file_paths(&self) -> Vec<&str> {
        self.file_fields()
            .into_iter()
            .filter_map(|f| f.as_deref())
            .filter(|f| !f.is_empty())
            .collect()
    }

    /// Old file references that `updated` no longer points at
    pub fn replaced_files(&self, updated: &Model) -> Vec<String> {
        self.file_fields()
            .into_iter()
            .zip(updated.file_fields())
            .filter(|(old, new)| old != new)
            .filter_map(|(old, _)| old.clone())
            .filter(|old| !old.is_empty())
            .collect()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::paper_type::Entity",
        from = "Column::PaperTypeId",
        to = "super::paper_type::Column::Id"
    )]
    PaperType,

    #[sea_orm(
        belongs_to = "super::country::Entity",
        from = "Column::CountryId",
        to = "super::country::Column::Id"
    )]
    Country,

    #[sea_orm(has_many = "super::paper_resource::Entity")]
    Resources,

    #[sea_orm(has_many = "super::paper_tag::Entity")]
    PaperTags,

    #[sea_orm(has_many = "super::paper_subject::Entity")]
    PaperSubjects,
}

impl Related<super::paper_type::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PaperType.def()
    }
}

impl Related<super::country::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Country.def()
    }
}

impl Related<super::paper_resource::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Resources.def()
    }
}

impl Related<super::tag::Entity> for Entity {
    fn to() -> RelationDef {
        super::paper_tag::Relation::Tag.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::paper_tag::Relation::Paper.def().rev())
    }
}

impl Related<super::subject::Entity> for Entity {
    fn to() -> RelationDef {
        super::paper_subject::Relation::Subject.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::paper_subject::Relation::Paper.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
