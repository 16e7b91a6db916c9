//! Shared fixtures for integration tests.

#![allow(dead_code)]

use chrono::{DateTime, Utc};

use lumina::catalog::{FileRepository, FolderRepository, NewFolder, NewMediaFile};
use lumina::share::ShareRepository;
use lumina::{Database, SqliteFolderCatalog};

/// An in-memory library with a catalog over it.
pub struct TestLibrary {
    pub db: Database,
    pub catalog: SqliteFolderCatalog,
}

impl TestLibrary {
    pub async fn new() -> Self {
        let db = Database::open_in_memory().await.unwrap();
        let catalog = SqliteFolderCatalog::new(db.clone());
        Self { db, catalog }
    }

    /// Create a root folder and return its ID.
    pub async fn folder(&self, path: &str) -> i64 {
        FolderRepository::new(self.db.pool())
            .create(&NewFolder::new(path.trim_start_matches('/'), path))
            .await
            .unwrap()
            .id
    }

    /// Create a file owned by `folder_id` and return its ID.
    pub async fn file(&self, folder_id: i64, name: &str) -> i64 {
        FileRepository::new(self.db.pool())
            .create(&NewMediaFile::new(folder_id, name))
            .await
            .unwrap()
            .id
    }

    /// Map an existing file into another folder.
    pub async fn add_location(&self, file_id: i64, folder_id: i64) {
        FileRepository::new(self.db.pool())
            .add_location(file_id, folder_id)
            .await
            .unwrap();
    }

    /// Force a share's deadline, including into the past.
    pub async fn set_share_expiry(&self, share_id: &str, expires_at: DateTime<Utc>) {
        ShareRepository::new(self.db.pool())
            .set_expiry(share_id, Some(&expires_at))
            .await
            .unwrap();
    }
}
