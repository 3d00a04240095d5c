//! Export runs and their on-disk artifacts

use super::{ensure_deleted, Repository};
use crate::db::models::*;
use crate::errors::{AppError, Result};
use crate::storage::FileStore;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use std::time::Duration;
use tracing::{debug, info, warn};

impl Repository {
    // ========================================================================
    // Export Operations
    // ========================================================================

    /// Delete an export row and its directory
    pub async fn delete_export(&self, id: i64, files: &dyn FileStore) -> Result<()> {
        let result = ExportEntity::delete_by_id(id).exec(self.conn()).await?;
        ensure_deleted(result, "export", id)?;

        let directory = Export::directory_for(id);
        if let Err(e) = files.delete_dir(&directory).await {
            warn!(export_id = id, error = %e, "Failed to delete export directory");
        }

        Ok(())
    }

    /// Delete exports older than `retention`, returning how many were removed
    pub async fn prune_exports(&self, retention: Duration, files: &dyn FileStore) -> Result<u64> {
        let retention = chrono::Duration::from_std(retention).unwrap_or(chrono::Duration::MAX);
        let cutoff = chrono::Utc::now()
            .checked_sub_signed(retention)
            .unwrap_or(chrono::DateTime::<chrono::Utc>::MIN_UTC);

        let stale = ExportEntity::find()
            .filter(ExportColumn::CreatedAt.lt(cutoff))
            .order_by_asc(ExportColumn::Id)
            .all(self.conn())
            .await?;

        let mut pruned = 0;
        for export in stale {
            match self.delete_export(export.id, files).await {
                Ok(()) => pruned += 1,
                Err(AppError::NotFound { .. }) => {
                    // row already removed elsewhere; its directory may not be
                    debug!(export_id = export.id, "Export already pruned");
                    if let Err(e) = files.delete_dir(&Export::directory_for(export.id)).await {
                        warn!(
                            export_id = export.id,
                            error = %e,
                            "Failed to delete export directory"
                        );
                    }
                }
                Err(e) => {
                    warn!(export_id = export.id, error = %e, "Failed to prune export");
                }
            }
        }

        if pruned > 0 {
            info!(pruned, "Stale exports pruned");
        }
        Ok(pruned)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{mock_repository, postgres};
    use super::*;
    use async_trait::async_trait;
    use sea_orm::{DbErr, MockExecResult, RuntimeErr};
    use std::sync::Mutex;

    #[derive(Default)]
    struct DirRecorder {
        removed: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl FileStore for DirRecorder {
        async fn delete(&self, _reference: &str) -> Result<()> {
            Ok(())
        }

        async fn delete_dir(&self, reference: &str) -> Result<()> {
            self.removed.lock().unwrap().push(reference.to_string());
            Ok(())
        }

        async fn exists(&self, _reference: &str) -> Result<bool> {
            Ok(false)
        }
    }

    fn export(id: i64, age: chrono::Duration) -> Export {
        Export {
            id,
            file_disk: "private".into(),
            file_name: Some(format!("export-{}", id)),
            user_id: Some(1),
            created_at: (chrono::Utc::now() - age).into(),
            completed_at: None,
        }
    }

    #[tokio::test]
    async fn test_delete_export_removes_directory() {
        let db = postgres().append_exec_results([MockExecResult {
            last_insert_id: 0,
            rows_affected: 1,
        }]);
        let (repo, _) = mock_repository(db);
        let store = DirRecorder::default();

        repo.delete_export(11, &store).await.unwrap();
        assert_eq!(*store.removed.lock().unwrap(), vec!["exports/11"]);
    }

    #[tokio::test]
    async fn test_prune_exports() {
        let db = postgres()
            .append_query_results([vec![
                export(1, chrono::Duration::hours(3)),
                export(2, chrono::Duration::hours(2)),
            ]])
            .append_exec_results([
                MockExecResult { last_insert_id: 0, rows_affected: 1 },
                MockExecResult { last_insert_id: 0, rows_affected: 1 },
            ]);
        let (repo, _) = mock_repository(db);
        let store = DirRecorder::default();

        let pruned = repo.prune_exports(Duration::from_secs(3600), &store).await.unwrap();

        assert_eq!(pruned, 2);
        assert_eq!(*store.removed.lock().unwrap(), vec!["exports/1", "exports/2"]);
    }

    #[tokio::test]
    async fn test_prune_continues_past_rows_deleted_elsewhere() {
        let db = postgres()
            .append_query_results([vec![
                export(1, chrono::Duration::hours(3)),
                export(2, chrono::Duration::hours(2)),
            ]])
            .append_exec_results([
                MockExecResult { last_insert_id: 0, rows_affected: 0 },
                MockExecResult { last_insert_id: 0, rows_affected: 1 },
            ]);
        let (repo, _) = mock_repository(db);
        let store = DirRecorder::default();

        let pruned = repo.prune_exports(Duration::from_secs(3600), &store).await.unwrap();

        assert_eq!(pruned, 1);
        assert_eq!(*store.removed.lock().unwrap(), vec!["exports/1", "exports/2"]);
    }

    #[tokio::test]
    async fn test_prune_continues_past_failed_row() {
        let db = postgres()
            .append_query_results([vec![
                export(1, chrono::Duration::hours(3)),
                export(2, chrono::Duration::hours(2)),
            ]])
            .append_exec_errors([DbErr::Exec(RuntimeErr::Internal("lock timeout".into()))])
            .append_exec_results([MockExecResult { last_insert_id: 0, rows_affected: 1 }]);
        let (repo, _) = mock_repository(db);
        let store = DirRecorder::default();

        let pruned = repo.prune_exports(Duration::from_secs(3600), &store).await.unwrap();

        assert_eq!(pruned, 1);
        assert_eq!(*store.removed.lock().unwrap(), vec!["exports/2"]);
    }
}
