//! Export run record
//!
//! Each export writes its artifacts under `exports/<id>` on the private
//! disk. Rows are short-lived and pruned together with their directory.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "exports")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub file_disk: String,

    pub file_name: Option<String>,

    pub user_id: Option<i64>,

    pub created_at: DateTimeWithTimeZone,

    pub completed_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    /// Directory holding an export's files
    pub fn directory_for(id: i64) -> String {
        format!("exports/{}", id)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
