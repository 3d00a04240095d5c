//! Repository pattern for database operations
//!
//! One `Repository` type, with operations grouped by area:
//! access control, papers, people, locations and exports.

mod access;
mod exports;
mod locations;
mod papers;
mod people;

pub use access::{NewUser, SeedReport};
pub use locations::{CityFields, ProvinceFields, TitleFields};
pub use papers::{PaperDetails, PaperFields, ResourceLink};
pub use people::PersonFields;

use crate::db::DbPool;
use crate::errors::{AppError, Result};
use sea_orm::{DatabaseConnection, DeleteResult};

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> &DatabaseConnection {
        self.pool.conn()
    }

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }
}

/// Current time as a database timestamp
fn now() -> sea_orm::prelude::DateTimeWithTimeZone {
    chrono::Utc::now().into()
}

/// Turn an empty delete into a not-found error
fn ensure_deleted(result: DeleteResult, resource_type: &str, id: i64) -> Result<()> {
    if result.rows_affected == 0 {
        return Err(AppError::NotFound {
            resource_type: resource_type.to_string(),
            id: id.to_string(),
        });
    }
    Ok(())
}

fn not_found(resource_type: &str, id: i64) -> AppError {
    AppError::NotFound {
        resource_type: resource_type.to_string(),
        id: id.to_string(),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, Transaction};
    use std::sync::Arc;

    /// Repository over a mock connection, plus a handle for reading the
    /// mock's transaction log afterwards
    pub fn mock_repository(db: MockDatabase) -> (Repository, Arc<DatabaseConnection>) {
        let conn = Arc::new(db.into_connection());
        let repo = Repository::new(DbPool::from_shared(conn.clone()));
        (repo, conn)
    }

    /// Statements the repository issued, in order
    pub fn transaction_log(repo: Repository, conn: Arc<DatabaseConnection>) -> Vec<Transaction> {
        drop(repo);
        Arc::into_inner(conn)
            .expect("repository still shares the mock connection")
            .into_transaction_log()
    }

    pub fn postgres() -> MockDatabase {
        MockDatabase::new(DatabaseBackend::Postgres)
    }
}
