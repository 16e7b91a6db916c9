//! Media catalog for Lumina.
//!
//! The catalog answers two questions for the access core: which folders a
//! file lives in, and where a file or folder sits on disk. The access checks
//! only see the [`FolderCatalog`] trait; [`SqliteFolderCatalog`] is the
//! implementation backed by the scanner's tables.

mod file;
mod folder;

pub use file::{FileRepository, MediaFile, NewMediaFile};
pub use folder::{Folder, FolderRepository, NewFolder};

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::db::Database;
use crate::{LuminaError, Result};

/// Resolves files and folders to their catalog locations.
#[async_trait]
pub trait FolderCatalog: Send + Sync {
    /// Every folder the file belongs to. Unknown files yield an empty list.
    async fn resolve_folders_for_file(&self, file_id: i64) -> Result<Vec<i64>>;

    /// Absolute path of a file on disk.
    async fn resolve_absolute_path(&self, file_id: i64) -> Result<PathBuf>;

    /// Absolute path of a folder on disk.
    async fn resolve_folder_path(&self, folder_id: i64) -> Result<PathBuf>;
}

/// Folder catalog backed by the `folders`, `files` and `file_folders` tables.
#[derive(Debug, Clone)]
pub struct SqliteFolderCatalog {
    db: Database,
    media_root: PathBuf,
}

impl SqliteFolderCatalog {
    /// Create a catalog; relative folder paths resolve against the working directory.
    pub fn new(db: Database) -> Self {
        Self {
            db,
            media_root: PathBuf::new(),
        }
    }

    /// Resolve relative folder paths against `media_root`.
    pub fn with_media_root(mut self, media_root: impl Into<PathBuf>) -> Self {
        self.media_root = media_root.into();
        self
    }

    fn absolute(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.media_root.join(path)
        }
    }
}

#[async_trait]
impl FolderCatalog for SqliteFolderCatalog {
    async fn resolve_folders_for_file(&self, file_id: i64) -> Result<Vec<i64>> {
        FileRepository::new(self.db.pool())
            .list_locations(file_id)
            .await
    }

    async fn resolve_absolute_path(&self, file_id: i64) -> Result<PathBuf> {
        let file = FileRepository::new(self.db.pool())
            .get_by_id(file_id)
            .await?
            .ok_or_else(|| LuminaError::NotFound("file".to_string()))?;
        let folder_path = self.resolve_folder_path(file.folder_id).await?;
        Ok(folder_path.join(file.name))
    }

    async fn resolve_folder_path(&self, folder_id: i64) -> Result<PathBuf> {
        let folder = FolderRepository::new(self.db.pool())
            .get_by_id(folder_id)
            .await?
            .ok_or_else(|| LuminaError::NotFound("folder".to_string()))?;
        Ok(self.absolute(&folder.path))
    }
}
