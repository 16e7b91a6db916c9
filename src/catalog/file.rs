//! Media file metadata and folder mapping.
//!
//! A file is owned by one folder and may additionally be mapped into other
//! folders (e.g. a photo linked into several collections).

use crate::datetime;
use crate::db::DbPool;
use crate::{LuminaError, Result};

/// A media file known to the catalog.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MediaFile {
    /// Unique file ID.
    pub id: i64,
    /// Owning folder ID.
    pub folder_id: i64,
    /// File name within the owning folder.
    pub name: String,
    /// When the file was catalogued.
    pub created_at: String,
}

/// Data for cataloguing a new file.
#[derive(Debug, Clone)]
pub struct NewMediaFile {
    /// Owning folder ID.
    pub folder_id: i64,
    /// File name.
    pub name: String,
}

impl NewMediaFile {
    /// Create a new file entry.
    pub fn new(folder_id: i64, name: impl Into<String>) -> Self {
        Self {
            folder_id,
            name: name.into(),
        }
    }
}

/// Repository for file operations.
pub struct FileRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> FileRepository<'a> {
    /// Create a new FileRepository with the given database pool reference.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Catalogue a new file.
    pub async fn create(&self, file: &NewMediaFile) -> Result<MediaFile> {
        if file.name.is_empty() || file.name.contains('/') {
            return Err(LuminaError::Validation(format!(
                "invalid file name: {:?}",
                file.name
            )));
        }

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO files (folder_id, name, created_at) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(file.folder_id)
        .bind(&file.name)
        .bind(datetime::now_db())
        .fetch_one(self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                LuminaError::NotFound("folder".to_string())
            }
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                LuminaError::Conflict(format!("file {} already exists in folder", file.name))
            }
            _ => LuminaError::Database(e.to_string()),
        })?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| LuminaError::NotFound("file".to_string()))
    }

    /// Get a file by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<MediaFile>> {
        let file = sqlx::query_as::<_, MediaFile>(
            "SELECT id, folder_id, name, created_at FROM files WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(file)
    }

    /// List files owned by a folder.
    pub async fn list_by_folder(&self, folder_id: i64) -> Result<Vec<MediaFile>> {
        let files = sqlx::query_as::<_, MediaFile>(
            "SELECT id, folder_id, name, created_at FROM files WHERE folder_id = ? ORDER BY name",
        )
        .bind(folder_id)
        .fetch_all(self.pool)
        .await?;

        Ok(files)
    }

    /// Map a file into an additional folder. Mapping twice is a no-op.
    pub async fn add_location(&self, file_id: i64, folder_id: i64) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO file_folders (file_id, folder_id) VALUES (?, ?)")
            .bind(file_id)
            .bind(folder_id)
            .execute(self.pool)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                    LuminaError::NotFound("file or folder".to_string())
                }
                _ => LuminaError::Database(e.to_string()),
            })?;
        Ok(())
    }

    /// Remove an additional folder mapping.
    pub async fn remove_location(&self, file_id: i64, folder_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM file_folders WHERE file_id = ? AND folder_id = ?")
            .bind(file_id)
            .bind(folder_id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// All folders the file appears in: its owner plus extra mappings.
    pub async fn list_locations(&self, file_id: i64) -> Result<Vec<i64>> {
        let folder_ids: Vec<i64> = sqlx::query_scalar(
            "SELECT folder_id FROM files WHERE id = ?
             UNION
             SELECT folder_id FROM file_folders WHERE file_id = ?
             ORDER BY 1",
        )
        .bind(file_id)
        .bind(file_id)
        .fetch_all(self.pool)
        .await?;

        Ok(folder_ids)
    }

    /// Delete a file entry.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM files WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
