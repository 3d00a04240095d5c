//! People (researchers)

use super::{ensure_deleted, not_found, now, Repository};
use crate::db::models::*;
use crate::errors::Result;
use crate::validation::safe_file_name;
use sea_orm::{ActiveModelTrait, EntityTrait, PaginatorTrait, QueryOrder, Set};
use serde::Deserialize;
use tracing::info;
use validator::Validate;

/// Editable person fields
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct PersonFields {
    #[validate(length(min = 1, max = 255))]
    pub name: String,

    #[validate(length(min = 1, max = 255))]
    pub family: String,

    #[validate(email)]
    pub email: Option<String>,

    #[validate(custom(function = "crate::validation::national_code"))]
    pub national_code: Option<String>,

    pub passport_number: Option<String>,

    pub father_name: Option<String>,

    #[validate(range(min = 1200, max = 2100))]
    pub birth_year: Option<i32>,

    #[validate(custom(function = "safe_file_name"))]
    pub photo: Option<String>,

    #[validate(url)]
    pub website: Option<String>,

    pub mobile: Option<String>,

    pub tel: Option<String>,

    pub fax: Option<String>,

    pub postal_code: Option<String>,

    pub address: Option<String>,

    pub country_id: Option<i64>,

    pub province_id: Option<i64>,

    pub city_id: Option<i64>,

    pub gender: Option<String>,
}

impl PersonFields {
    fn apply(self, model: &mut PersonActiveModel) {
        model.name = Set(self.name);
        model.family = Set(self.family);
        model.email = Set(self.email);
        model.national_code = Set(self.national_code);
        model.passport_number = Set(self.passport_number);
        model.father_name = Set(self.father_name);
        model.birth_year = Set(self.birth_year);
        model.photo = Set(self.photo);
        model.website = Set(self.website);
        model.mobile = Set(self.mobile);
        model.tel = Set(self.tel);
        model.fax = Set(self.fax);
        model.postal_code = Set(self.postal_code);
        model.address = Set(self.address);
        model.country_id = Set(self.country_id);
        model.province_id = Set(self.province_id);
        model.city_id = Set(self.city_id);
        model.gender = Set(self.gender);
        model.updated_at = Set(now());
    }
}

impl Repository {
    // ========================================================================
    // Person Operations
    // ========================================================================

    /// List people by family name (0-based page)
    pub async fn list_people(&self, page: u64, per_page: u64) -> Result<(Vec<Person>, u64)> {
        let paginator = PersonEntity::find()
            .order_by_asc(PersonColumn::Family)
            .order_by_asc(PersonColumn::Name)
            .paginate(self.conn(), per_page);

        let total = paginator.num_items().await?;
        let people = paginator.fetch_page(page).await?;

        Ok((people, total))
    }

    pub async fn get_person(&self, id: i64) -> Result<Person> {
        PersonEntity::find_by_id(id)
            .one(self.conn())
            .await?
            .ok_or_else(|| not_found("person", id))
    }

    pub async fn create_person(&self, fields: PersonFields) -> Result<Person> {
        let mut model = PersonActiveModel {
            created_at: Set(now()),
            ..Default::default()
        };
        fields.apply(&mut model);

        let person = model.insert(self.conn()).await?;
        info!(person_id = person.id, "Person created");
        Ok(person)
    }

    pub async fn update_person(&self, id: i64, fields: PersonFields) -> Result<Person> {
        let mut model: PersonActiveModel = self.get_person(id).await?.into();
        fields.apply(&mut model);

        model.update(self.conn()).await.map_err(Into::into)
    }

    pub async fn delete_person(&self, id: i64) -> Result<()> {
        let result = PersonEntity::delete_by_id(id).exec(self.conn()).await?;
        ensure_deleted(result, "person", id)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{mock_repository, postgres};
    use super::*;
    use crate::errors::AppError;
    use sea_orm::{DbErr, RuntimeErr};

    fn person_fields() -> PersonFields {
        PersonFields {
            name: "Leila".into(),
            family: "Karimi".into(),
            email: Some("leila@example.org".into()),
            national_code: Some("0084575948".into()),
            ..PersonFields::default()
        }
    }

    #[test]
    fn test_person_validation() {
        assert!(person_fields().validate().is_ok());

        let mut bad = person_fields();
        bad.national_code = Some("0084575947".into());
        let errors = bad.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("national_code"));

        let mut bad = person_fields();
        bad.email = Some("not-an-email".into());
        assert!(bad.validate().is_err());
    }

    #[tokio::test]
    async fn test_get_missing_person() {
        let db = postgres().append_query_results([Vec::<Person>::new()]);
        let (repo, _) = mock_repository(db);

        let err = repo.get_person(12).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::NotFound { ref resource_type, .. } if resource_type == "person"
        ));
    }

    #[tokio::test]
    async fn test_delete_failure_surfaces_database_error() {
        let db = postgres().append_exec_errors([DbErr::Exec(RuntimeErr::Internal(
            "connection reset".into(),
        ))]);
        let (repo, _) = mock_repository(db);

        let err = repo.delete_person(12).await.unwrap_err();
        assert!(matches!(err, AppError::Database(_)));
    }
}
