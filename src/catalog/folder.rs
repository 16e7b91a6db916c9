//! Folder types and repository for the media catalog.

use chrono::{DateTime, Utc};

use crate::datetime;
use crate::db::DbPool;
use crate::{LuminaError, Result};

/// A scanned folder in the media library.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Folder {
    /// Unique folder ID.
    pub id: i64,
    /// Folder name.
    pub name: String,
    /// Path on disk (absolute, or relative to the media root).
    pub path: String,
    /// Parent folder ID (None for root folders).
    pub parent_id: Option<i64>,
    /// When the folder was created.
    pub created_at: String,
}

impl Folder {
    /// Get the created_at as DateTime<Utc>.
    pub fn created_at_datetime(&self) -> Result<DateTime<Utc>> {
        datetime::from_db(&self.created_at)
    }
}

/// Data for creating a new folder.
#[derive(Debug, Clone)]
pub struct NewFolder {
    /// Folder name.
    pub name: String,
    /// Path on disk.
    pub path: String,
    /// Parent folder ID (None for root folders).
    pub parent_id: Option<i64>,
}

impl NewFolder {
    /// Create a new root folder.
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            parent_id: None,
        }
    }

    /// Set the parent folder.
    pub fn with_parent(mut self, parent_id: i64) -> Self {
        self.parent_id = Some(parent_id);
        self
    }
}

/// Repository for folder operations.
pub struct FolderRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> FolderRepository<'a> {
    /// Create a new FolderRepository with the given database pool reference.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create a new folder.
    pub async fn create(&self, folder: &NewFolder) -> Result<Folder> {
        if folder.name.trim().is_empty() {
            return Err(LuminaError::Validation("folder name must not be empty".into()));
        }

        let result = sqlx::query(
            "INSERT INTO folders (name, path, parent_id, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&folder.name)
        .bind(&folder.path)
        .bind(folder.parent_id)
        .bind(datetime::now_db())
        .execute(self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                LuminaError::Conflict(format!("folder path {} already exists", folder.path))
            }
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                LuminaError::NotFound("parent folder".to_string())
            }
            _ => LuminaError::Database(e.to_string()),
        })?;

        let id = result.last_insert_rowid();
        self.get_by_id(id)
            .await?
            .ok_or_else(|| LuminaError::NotFound("folder".to_string()))
    }

    /// Get a folder by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Folder>> {
        let folder = sqlx::query_as::<_, Folder>(
            "SELECT id, name, path, parent_id, created_at FROM folders WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(folder)
    }

    /// Get a folder by its path.
    pub async fn get_by_path(&self, path: &str) -> Result<Option<Folder>> {
        let folder = sqlx::query_as::<_, Folder>(
            "SELECT id, name, path, parent_id, created_at FROM folders WHERE path = ?",
        )
        .bind(path)
        .fetch_optional(self.pool)
        .await?;

        Ok(folder)
    }

    /// Check whether a folder exists.
    pub async fn exists(&self, id: i64) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM folders WHERE id = ?)")
            .bind(id)
            .fetch_one(self.pool)
            .await?;
        Ok(exists)
    }

    /// IDs of every folder in the catalog.
    pub async fn list_ids(&self) -> Result<Vec<i64>> {
        let ids = sqlx::query_scalar("SELECT id FROM folders ORDER BY id")
            .fetch_all(self.pool)
            .await?;
        Ok(ids)
    }

    /// List all root folders (parent_id is NULL).
    pub async fn list_root(&self) -> Result<Vec<Folder>> {
        let folders = sqlx::query_as::<_, Folder>(
            "SELECT id, name, path, parent_id, created_at
             FROM folders WHERE parent_id IS NULL ORDER BY name, id",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(folders)
    }

    /// List child folders of a parent folder.
    pub async fn list_by_parent(&self, parent_id: i64) -> Result<Vec<Folder>> {
        let folders = sqlx::query_as::<_, Folder>(
            "SELECT id, name, path, parent_id, created_at
             FROM folders WHERE parent_id = ? ORDER BY name, id",
        )
        .bind(parent_id)
        .fetch_all(self.pool)
        .await?;

        Ok(folders)
    }

    /// Delete a folder by ID.
    ///
    /// Child folders, files and group links are removed by cascade.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM folders WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
