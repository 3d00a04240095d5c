//! File storage for paper attachments and export artifacts
//!
//! Files are addressed by relative references (e.g. `papers/abc.pdf`)
//! under a configured root. References that would escape the root are
//! rejected before touching the filesystem.

use crate::errors::{AppError, Result};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

/// Storage backend for files referenced by records
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Delete a single file. Missing files are not an error.
    async fn delete(&self, reference: &str) -> Result<()>;

    /// Recursively delete a directory. Missing directories are not an error.
    async fn delete_dir(&self, reference: &str) -> Result<()>;

    /// Whether a file exists
    async fn exists(&self, reference: &str) -> Result<bool>;
}

/// Filesystem-backed store rooted at a directory
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a reference under the root
    pub fn resolve(&self, reference: &str) -> Result<PathBuf> {
        let relative = Path::new(reference);

        let escapes = reference.trim().is_empty()
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));

        if escapes {
            return Err(AppError::Storage {
                message: format!("Refusing to resolve file reference '{}'", reference),
            });
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn delete(&self, reference: &str) -> Result<()> {
        let path = self.resolve(reference)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "File deleted");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_dir(&self, reference: &str) -> Result<()> {
        let path = self.resolve(reference)?;
        match tokio::fs::remove_dir_all(&path).await {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "Directory deleted");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, reference: &str) -> Result<bool> {
        let path = self.resolve(reference)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }
}

/// Delete every reference, logging failures instead of returning them
pub async fn delete_all<'a, I>(store: &dyn FileStore, references: I)
where
    I: IntoIterator<Item = &'a str>,
{
    for reference in references {
        if let Err(e) = store.delete(reference).await {
            tracing::warn!(file = reference, error = %e, "Failed to delete stored file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("paperdesk-{}-{}", name, uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let store = LocalFileStore::new("/srv/files");

        assert_ok!(store.resolve("papers/a.pdf"));
        assert!(store.resolve("../secret").is_err());
        assert!(store.resolve("papers/../../secret").is_err());
        assert!(store.resolve("/etc/passwd").is_err());
        assert!(store.resolve("").is_err());
    }

    #[tokio::test]
    async fn test_delete_file_and_missing_file() {
        let root = scratch_dir("delete");
        std::fs::create_dir_all(root.join("papers")).unwrap();
        std::fs::write(root.join("papers/a.pdf"), b"%PDF").unwrap();

        let store = LocalFileStore::new(&root);
        assert!(store.exists("papers/a.pdf").await.unwrap());

        assert_ok!(store.delete("papers/a.pdf").await);
        assert!(!store.exists("papers/a.pdf").await.unwrap());

        // already gone
        assert_ok!(store.delete("papers/a.pdf").await);

        std::fs::remove_dir_all(root).unwrap();
    }

    #[tokio::test]
    async fn test_delete_dir() {
        let root = scratch_dir("export");
        std::fs::create_dir_all(root.join("exports/7")).unwrap();
        std::fs::write(root.join("exports/7/part-1.csv"), b"id\n1\n").unwrap();

        let store = LocalFileStore::new(&root);
        assert_ok!(store.delete_dir("exports/7").await);
        assert!(!root.join("exports/7").exists());

        assert_ok!(store.delete_dir("exports/7").await);

        std::fs::remove_dir_all(root).unwrap();
    }
}
