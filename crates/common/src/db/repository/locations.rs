//! Countries, provinces and cities

use super::{ensure_deleted, not_found, now, Repository};
use crate::db::models::*;
use crate::errors::Result;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::Deserialize;
use validator::Validate;

/// Input for records that only carry a title
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TitleFields {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProvinceFields {
    #[validate(length(min = 1, max = 255))]
    pub title: String,

    pub country_id: i64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CityFields {
    #[validate(length(min = 1, max = 255))]
    pub title: String,

    pub province_id: i64,
}

impl Repository {
    // ========================================================================
    // Country Operations
    // ========================================================================

    pub async fn list_countries(&self) -> Result<Vec<Country>> {
        CountryEntity::find()
            .order_by_asc(CountryColumn::Title)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    pub async fn get_country(&self, id: i64) -> Result<Country> {
        CountryEntity::find_by_id(id)
            .one(self.conn())
            .await?
            .ok_or_else(|| not_found("country", id))
    }

    pub async fn create_country(&self, input: TitleFields) -> Result<Country> {
        CountryActiveModel {
            title: Set(input.title),
            created_at: Set(now()),
            updated_at: Set(now()),
            ..Default::default()
        }
        .insert(self.conn())
        .await
        .map_err(Into::into)
    }

    pub async fn update_country(&self, id: i64, input: TitleFields) -> Result<Country> {
        let mut model: CountryActiveModel = self.get_country(id).await?.into();
        model.title = Set(input.title);
        model.updated_at = Set(now());

        model.update(self.conn()).await.map_err(Into::into)
    }

    pub async fn delete_country(&self, id: i64) -> Result<()> {
        let result = CountryEntity::delete_by_id(id).exec(self.conn()).await?;
        ensure_deleted(result, "country", id)
    }

    // ========================================================================
    // Province Operations
    // ========================================================================

    /// List provinces, optionally within one country
    pub async fn list_provinces(&self, country_id: Option<i64>) -> Result<Vec<Province>> {
        let mut query = ProvinceEntity::find();
        if let Some(country_id) = country_id {
            query = query.filter(ProvinceColumn::CountryId.eq(country_id));
        }

        query
            .order_by_asc(ProvinceColumn::Title)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    pub async fn get_province(&self, id: i64) -> Result<Province> {
        ProvinceEntity::find_by_id(id)
            .one(self.conn())
            .await?
            .ok_or_else(|| not_found("province", id))
    }

    pub async fn create_province(&self, input: ProvinceFields) -> Result<Province> {
        ProvinceActiveModel {
            title: Set(input.title),
            country_id: Set(input.country_id),
            created_at: Set(now()),
            updated_at: Set(now()),
            ..Default::default()
        }
        .insert(self.conn())
        .await
        .map_err(Into::into)
    }

    pub async fn update_province(&self, id: i64, input: ProvinceFields) -> Result<Province> {
        let mut model: ProvinceActiveModel = self.get_province(id).await?.into();
        model.title = Set(input.title);
        model.country_id = Set(input.country_id);
        model.updated_at = Set(now());

        model.update(self.conn()).await.map_err(Into::into)
    }

    pub async fn delete_province(&self, id: i64) -> Result<()> {
        let result = ProvinceEntity::delete_by_id(id).exec(self.conn()).await?;
        ensure_deleted(result, "province", id)
    }

    // ========================================================================
    // City Operations
    // ========================================================================

    /// List cities, optionally within one province
    pub async fn list_cities(&self, province_id: Option<i64>) -> Result<Vec<City>> {
        let mut query = CityEntity::find();
        if let Some(province_id) = province_id {
            query = query.filter(CityColumn::ProvinceId.eq(province_id));
        }

        query
            .order_by_asc(CityColumn::Title)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    pub async fn get_city(&self, id: i64) -> Result<City> {
        CityEntity::find_by_id(id)
            .one(self.conn())
            .await?
            .ok_or_else(|| not_found("city", id))
    }

    pub async fn create_city(&self, input: CityFields) -> Result<City> {
        CityActiveModel {
            title: Set(input.title),
            province_id: Set(input.province_id),
            created_at: Set(now()),
            updated_at: Set(now()),
            ..Default::default()
        }
        .insert(self.conn())
        .await
        .map_err(Into::into)
    }

    pub async fn update_city(&self, id: i64, input: CityFields) -> Result<City> {
        let mut model: CityActiveModel = self.get_city(id).await?.into();
        model.title = Set(input.title);
        model.province_id = Set(input.province_id);
        model.updated_at = Set(now());

        model.update(self.conn()).await.map_err(Into::into)
    }

    pub async fn delete_city(&self, id: i64) -> Result<()> {
        let result = CityEntity::delete_by_id(id).exec(self.conn()).await?;
        ensure_deleted(result, "city", id)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{mock_repository, postgres, transaction_log};
    use super::*;
    use sea_orm::{DbBackend, MockExecResult, Transaction};

    #[tokio::test]
    async fn test_list_provinces_by_country() {
        let db = postgres().append_query_results([vec![Province {
            id: 4,
            title: "Tehran".into(),
            country_id: 1,
            created_at: now(),
            updated_at: now(),
        }]]);
        let (repo, conn) = mock_repository(db);

        let provinces = repo.list_provinces(Some(1)).await.unwrap();
        assert_eq!(provinces.len(), 1);

        assert_eq!(
            transaction_log(repo, conn),
            vec![Transaction::from_sql_and_values(
                DbBackend::Postgres,
                concat!(
                    r#"SELECT "provinces"."id", "provinces"."title", "provinces"."country_id", "#,
                    r#""provinces"."created_at", "provinces"."updated_at" FROM "provinces" "#,
                    r#"WHERE "provinces"."country_id" = $1 ORDER BY "provinces"."title" ASC"#,
                ),
                [1i64.into()],
            )]
        );
    }

    #[tokio::test]
    async fn test_delete_missing_city() {
        let db = postgres().append_exec_results([MockExecResult {
            last_insert_id: 0,
            rows_affected: 0,
        }]);
        let (repo, _) = mock_repository(db);

        let err = repo.delete_city(8).await.unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::NOT_FOUND);
    }
}
