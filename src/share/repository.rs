//! Share repository.
//!
//! Every mutation of `view_count` and `expires_at` is a single conditional
//! statement, so concurrent callers never interleave a read and a write.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite};

use super::types::{NewShare, Share, ShareAccessLog, ShareRow, ShareType, ShareUpdate};
use crate::datetime;
use crate::db::DbPool;
use crate::{LuminaError, Result};

const SHARE_COLUMNS: &str = "id, share_type, resource_id, owner_id, access_type, password_hash, \
                             requires_auth, expires_at, max_views, view_count, enabled, created_at";

fn share_fk_error(e: sqlx::Error) -> LuminaError {
    match &e {
        sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
            LuminaError::NotFound("share".to_string())
        }
        _ => LuminaError::Database(e.to_string()),
    }
}

/// Repository for share records, allow-lists and access logs.
pub struct ShareRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> ShareRepository<'a> {
    /// Create a new ShareRepository with the given database pool reference.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Insert a share under `id`.
    ///
    /// An existing row with the same ID is never overwritten; the insert fails
    /// with `Conflict` instead.
    pub async fn insert(
        &self,
        id: &str,
        share: &NewShare,
        password_hash: Option<&str>,
    ) -> Result<Share> {
        sqlx::query(
            "INSERT INTO shares (id, share_type, resource_id, owner_id, access_type,
                                 password_hash, requires_auth, expires_at, max_views,
                                 view_count, enabled, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 0, 1, ?)",
        )
        .bind(id)
        .bind(share.share_type.as_str())
        .bind(share.resource_id)
        .bind(share.owner_id)
        .bind(share.access_type.as_str())
        .bind(password_hash)
        .bind(share.requires_auth)
        .bind(share.expires_at.as_ref().map(datetime::to_db))
        .bind(share.max_views)
        .bind(datetime::now_db())
        .execute(self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                LuminaError::Conflict(format!("share ID {id:?} already exists"))
            }
            _ => LuminaError::Database(e.to_string()),
        })?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| LuminaError::NotFound("share".to_string()))
    }

    /// Get a share by ID.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<Share>> {
        let row = sqlx::query_as::<_, ShareRow>(&format!(
            "SELECT {SHARE_COLUMNS} FROM shares WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(Share::try_from).transpose()
    }

    /// List shares created by a user, newest first.
    pub async fn list_by_owner(&self, owner_id: i64) -> Result<Vec<Share>> {
        let rows = sqlx::query_as::<_, ShareRow>(&format!(
            "SELECT {SHARE_COLUMNS} FROM shares WHERE owner_id = ? ORDER BY created_at DESC, id"
        ))
        .bind(owner_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Share::try_from).collect()
    }

    /// List shares pointing at a resource.
    pub async fn list_for_resource(
        &self,
        share_type: ShareType,
        resource_id: i64,
    ) -> Result<Vec<Share>> {
        let rows = sqlx::query_as::<_, ShareRow>(&format!(
            "SELECT {SHARE_COLUMNS} FROM shares
             WHERE share_type = ? AND resource_id = ?
             ORDER BY created_at DESC, id"
        ))
        .bind(share_type.as_str())
        .bind(resource_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Share::try_from).collect()
    }

    /// Apply an update. `password_hash` replaces `update.password`, which is
    /// never stored: `Some(None)` clears the gate, `Some(Some(h))` sets it.
    ///
    /// Returns None if the share does not exist.
    pub async fn update(
        &self,
        id: &str,
        update: &ShareUpdate,
        password_hash: Option<Option<String>>,
    ) -> Result<Option<Share>> {
        if password_hash.is_none()
            && update.requires_auth.is_none()
            && update.max_views.is_none()
            && update.access_type.is_none()
        {
            return self.get_by_id(id).await;
        }

        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE shares SET ");
        let mut separated = query.separated(", ");

        if let Some(hash) = password_hash {
            separated.push("password_hash = ");
            separated.push_bind_unseparated(hash);
        }
        if let Some(requires_auth) = update.requires_auth {
            separated.push("requires_auth = ");
            separated.push_bind_unseparated(requires_auth);
        }
        if let Some(max_views) = update.max_views {
            separated.push("max_views = ");
            separated.push_bind_unseparated(max_views);
        }
        if let Some(access_type) = update.access_type {
            separated.push("access_type = ");
            separated.push_bind_unseparated(access_type.as_str());
        }

        query.push(" WHERE id = ");
        query.push_bind(id.to_string());

        let result = query.build().execute(self.pool).await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get_by_id(id).await
    }

    /// Switch a share on or off. Returns whether the share exists.
    pub async fn set_enabled(&self, id: &str, enabled: bool) -> Result<bool> {
        let result = sqlx::query("UPDATE shares SET enabled = ? WHERE id = ?")
            .bind(enabled)
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Set `expires_at` only if it still equals `expected`.
    ///
    /// Returns false when another writer changed the deadline first (or the
    /// share is gone).
    pub async fn compare_and_set_expiry(
        &self,
        id: &str,
        expected: Option<&DateTime<Utc>>,
        new: &DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query("UPDATE shares SET expires_at = ? WHERE id = ? AND expires_at IS ?")
            .bind(datetime::to_db(new))
            .bind(id)
            .bind(expected.map(datetime::to_db))
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Overwrite `expires_at` unconditionally.
    pub async fn set_expiry(&self, id: &str, expires_at: Option<&DateTime<Utc>>) -> Result<bool> {
        let result = sqlx::query("UPDATE shares SET expires_at = ? WHERE id = ?")
            .bind(expires_at.map(datetime::to_db))
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a share. Allow-list and log rows are removed by cascade.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM shares WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Count one view if the share is enabled, unexpired at `now` and under
    /// quota. Returns the new count, or None if nothing was updated.
    pub async fn record_view(&self, id: &str, now: &DateTime<Utc>) -> Result<Option<i64>> {
        let count: Option<i64> = sqlx::query_scalar(
            "UPDATE shares SET view_count = view_count + 1
             WHERE id = ?
               AND enabled = 1
               AND (expires_at IS NULL OR expires_at > ?)
               AND (max_views IS NULL OR view_count < max_views)
             RETURNING view_count",
        )
        .bind(id)
        .bind(datetime::to_db(now))
        .fetch_optional(self.pool)
        .await?;
        Ok(count)
    }

    /// Append an access log row.
    pub async fn append_log(
        &self,
        share_id: &str,
        accessed_by: Option<i64>,
        ip_address: &str,
        user_agent: &str,
    ) -> Result<i64> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO share_access_logs (share_id, accessed_by, ip_address, user_agent, accessed_at)
             VALUES (?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(share_id)
        .bind(accessed_by)
        .bind(ip_address)
        .bind(user_agent)
        .bind(datetime::now_db())
        .fetch_one(self.pool)
        .await
        .map_err(share_fk_error)?;
        Ok(id)
    }

    /// Most recent access log rows for a share.
    pub async fn list_logs(&self, share_id: &str, limit: i64) -> Result<Vec<ShareAccessLog>> {
        let logs = sqlx::query_as::<_, ShareAccessLog>(
            "SELECT id, share_id, accessed_by, ip_address, user_agent, accessed_at
             FROM share_access_logs
             WHERE share_id = ?
             ORDER BY id DESC
             LIMIT ?",
        )
        .bind(share_id)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(logs)
    }

    /// Add a user to a share's allow-list. Adding twice is a no-op.
    pub async fn add_permission(&self, share_id: &str, user_id: i64) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO share_permissions (share_id, user_id) VALUES (?, ?)")
            .bind(share_id)
            .bind(user_id)
            .execute(self.pool)
            .await
            .map_err(share_fk_error)?;
        Ok(())
    }

    /// Remove a user from a share's allow-list.
    pub async fn remove_permission(&self, share_id: &str, user_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM share_permissions WHERE share_id = ? AND user_id = ?")
            .bind(share_id)
            .bind(user_id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Whether a user is on a share's allow-list.
    pub async fn has_permission(&self, share_id: &str, user_id: i64) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM share_permissions WHERE share_id = ? AND user_id = ?)",
        )
        .bind(share_id)
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;
        Ok(exists)
    }

    /// Users on a share's allow-list.
    pub async fn list_permissions(&self, share_id: &str) -> Result<Vec<i64>> {
        let user_ids: Vec<i64> = sqlx::query_scalar(
            "SELECT user_id FROM share_permissions WHERE share_id = ? ORDER BY user_id",
        )
        .bind(share_id)
        .fetch_all(self.pool)
        .await?;
        Ok(user_ids)
    }

    /// Delete every share whose deadline is at or before `now`.
    pub async fn delete_expired(&self, now: &DateTime<Utc>) -> Result<u64> {
        let result =
            sqlx::query("DELETE FROM shares WHERE expires_at IS NOT NULL AND expires_at <= ?")
                .bind(datetime::to_db(now))
                .execute(self.pool)
                .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::share::types::AccessType;
    use crate::Database;

    async fn setup() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = setup().await;
        let repo = ShareRepository::new(db.pool());

        let share = repo
            .insert("abc", &NewShare::file(7, 1).with_max_views(3), Some("hash"))
            .await
            .unwrap();

        assert_eq!(share.id, "abc");
        assert_eq!(share.share_type, ShareType::File);
        assert_eq!(share.resource_id, 7);
        assert_eq!(share.access_type, AccessType::Public);
        assert_eq!(share.password_hash.as_deref(), Some("hash"));
        assert_eq!(share.max_views, Some(3));
        assert_eq!(share.view_count, 0);
        assert!(share.enabled);

        assert!(repo.get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_id_conflicts() {
        let db = setup().await;
        let repo = ShareRepository::new(db.pool());

        repo.insert("abc", &NewShare::file(7, 1), None).await.unwrap();
        let result = repo.insert("abc", &NewShare::album(8, 2), None).await;
        assert!(matches!(result, Err(LuminaError::Conflict(_))));

        let kept = repo.get_by_id("abc").await.unwrap().unwrap();
        assert_eq!(kept.resource_id, 7);
    }

    #[tokio::test]
    async fn test_record_view_respects_quota() {
        let db = setup().await;
        let repo = ShareRepository::new(db.pool());
        repo.insert("abc", &NewShare::file(7, 1).with_max_views(2), None)
            .await
            .unwrap();
        let now = Utc::now();

        assert_eq!(repo.record_view("abc", &now).await.unwrap(), Some(1));
        assert_eq!(repo.record_view("abc", &now).await.unwrap(), Some(2));
        assert_eq!(repo.record_view("abc", &now).await.unwrap(), None);
        assert_eq!(repo.record_view("missing", &now).await.unwrap(), None);

        let share = repo.get_by_id("abc").await.unwrap().unwrap();
        assert_eq!(share.view_count, 2);
    }

    #[tokio::test]
    async fn test_record_view_skips_disabled_and_expired() {
        let db = setup().await;
        let repo = ShareRepository::new(db.pool());
        let now = Utc::now();
        repo.insert("off", &NewShare::file(1, 1), None).await.unwrap();
        repo.insert("old", &NewShare::file(1, 1), None).await.unwrap();
        repo.set_enabled("off", false).await.unwrap();
        repo.set_expiry("old", Some(&(now - Duration::minutes(1))))
            .await
            .unwrap();

        assert_eq!(repo.record_view("off", &now).await.unwrap(), None);
        assert_eq!(repo.record_view("old", &now).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_compare_and_set_expiry() {
        let db = setup().await;
        let repo = ShareRepository::new(db.pool());
        repo.insert("abc", &NewShare::file(1, 1), None).await.unwrap();
        let t1 = Utc::now() + Duration::hours(1);
        let t2 = t1 + Duration::hours(1);

        assert!(repo.compare_and_set_expiry("abc", None, &t1).await.unwrap());
        assert!(!repo.compare_and_set_expiry("abc", None, &t2).await.unwrap());
        assert!(repo.compare_and_set_expiry("abc", Some(&t1), &t2).await.unwrap());

        let share = repo.get_by_id("abc").await.unwrap().unwrap();
        assert_eq!(share.expires_at.map(|t| datetime::to_db(&t)), Some(datetime::to_db(&t2)));
    }

    #[tokio::test]
    async fn test_update_fields() {
        let db = setup().await;
        let repo = ShareRepository::new(db.pool());
        repo.insert("abc", &NewShare::file(1, 1), Some("h")).await.unwrap();

        let update = ShareUpdate::new()
            .requires_auth(true)
            .max_views(Some(5))
            .access_type(AccessType::Private);
        let share = repo.update("abc", &update, Some(None)).await.unwrap().unwrap();

        assert!(share.requires_auth);
        assert_eq!(share.max_views, Some(5));
        assert_eq!(share.access_type, AccessType::Private);
        assert!(share.password_hash.is_none());

        assert!(repo
            .update("missing", &update, None)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_permissions_and_logs_cascade() {
        let db = setup().await;
        let repo = ShareRepository::new(db.pool());
        repo.insert("abc", &NewShare::file(1, 1).private(), None)
            .await
            .unwrap();

        repo.add_permission("abc", 2).await.unwrap();
        repo.add_permission("abc", 2).await.unwrap();
        assert_eq!(repo.list_permissions("abc").await.unwrap(), vec![2]);
        assert!(repo.has_permission("abc", 2).await.unwrap());

        repo.append_log("abc", Some(2), "127.0.0.1", "test").await.unwrap();
        assert_eq!(repo.list_logs("abc", 10).await.unwrap().len(), 1);

        assert!(matches!(
            repo.add_permission("missing", 2).await,
            Err(LuminaError::NotFound(_))
        ));

        assert!(repo.delete("abc").await.unwrap());
        assert!(repo.list_permissions("abc").await.unwrap().is_empty());
        assert!(repo.list_logs("abc", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_expired() {
        let db = setup().await;
        let repo = ShareRepository::new(db.pool());
        let now = Utc::now();
        repo.insert("old", &NewShare::file(1, 1), None).await.unwrap();
        repo.insert("new", &NewShare::file(1, 1).expires_at(now + Duration::days(1)), None)
            .await
            .unwrap();
        repo.insert("forever", &NewShare::file(1, 1), None).await.unwrap();
        repo.set_expiry("old", Some(&(now - Duration::seconds(1))))
            .await
            .unwrap();

        assert_eq!(repo.delete_expired(&now).await.unwrap(), 1);
        assert!(repo.get_by_id("old").await.unwrap().is_none());
        assert!(repo.get_by_id("new").await.unwrap().is_some());
        assert!(repo.get_by_id("forever").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_list_by_owner_and_resource() {
        let db = setup().await;
        let repo = ShareRepository::new(db.pool());
        repo.insert("a", &NewShare::file(7, 1), None).await.unwrap();
        repo.insert("b", &NewShare::album(7, 1), None).await.unwrap();
        repo.insert("c", &NewShare::file(7, 2), None).await.unwrap();

        assert_eq!(repo.list_by_owner(1).await.unwrap().len(), 2);
        let ids: Vec<String> = repo
            .list_for_resource(ShareType::File, 7)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&"a".to_string()) && ids.contains(&"c".to_string()));
    }
}
