//! Permission group repository.
//!
//! Holds the three relations behind group access: groups, group↔folder
//! links and group↔user grants. Access checks are a single indexed join
//! (user → grant → group → folder link) per call.

use sqlx::{QueryBuilder, Sqlite};

use super::types::{GroupMember, GroupUpdate, NewGroup, PermissionGroup, PermissionLevel};
use crate::datetime;
use crate::db::DbPool;
use crate::{LuminaError, Result};

const GROUP_COLUMNS: &str = "id, name, description, created_by, created_at, updated_at";

fn map_name_conflict(e: sqlx::Error, name: &str) -> LuminaError {
    match &e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            LuminaError::Conflict(format!("group name {name:?} is already taken"))
        }
        _ => LuminaError::Database(e.to_string()),
    }
}

/// Repository for permission group operations.
pub struct GroupRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> GroupRepository<'a> {
    /// Create a new GroupRepository with the given database pool reference.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Insert a group and grant `write` to its creator in one transaction.
    pub async fn create(&self, group: &NewGroup) -> Result<PermissionGroup> {
        let now = datetime::now_db();
        let mut tx = self.pool.begin().await?;

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO permission_groups (name, description, created_by, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(&group.name)
        .bind(&group.description)
        .bind(group.created_by)
        .bind(&now)
        .bind(&now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_name_conflict(e, &group.name))?;

        sqlx::query(
            "INSERT INTO group_user_permissions (group_id, user_id, permission) VALUES (?, ?, ?)",
        )
        .bind(id)
        .bind(group.created_by)
        .bind(PermissionLevel::Write.as_str())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| LuminaError::NotFound("group".to_string()))
    }

    /// Get a group by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<PermissionGroup>> {
        let group = sqlx::query_as::<_, PermissionGroup>(&format!(
            "SELECT {GROUP_COLUMNS} FROM permission_groups WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(group)
    }

    /// Check whether a group exists.
    pub async fn exists(&self, id: i64) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM permission_groups WHERE id = ?)")
                .bind(id)
                .fetch_one(self.pool)
                .await?;
        Ok(exists)
    }

    /// List all groups ordered by name.
    pub async fn list_all(&self) -> Result<Vec<PermissionGroup>> {
        let groups = sqlx::query_as::<_, PermissionGroup>(&format!(
            "SELECT {GROUP_COLUMNS} FROM permission_groups ORDER BY name"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(groups)
    }

    /// List groups in which the user holds any grant.
    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<PermissionGroup>> {
        let groups = sqlx::query_as::<_, PermissionGroup>(
            "SELECT g.id, g.name, g.description, g.created_by, g.created_at, g.updated_at
             FROM permission_groups g
             JOIN group_user_permissions gup ON gup.group_id = g.id
             WHERE gup.user_id = ?
             ORDER BY g.name",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(groups)
    }

    /// Update a group. Returns None if the group does not exist.
    pub async fn update(&self, id: i64, update: &GroupUpdate) -> Result<Option<PermissionGroup>> {
        if update.is_empty() {
            return self.get_by_id(id).await;
        }

        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE permission_groups SET ");
        let mut separated = query.separated(", ");

        if let Some(ref name) = update.name {
            separated.push("name = ");
            separated.push_bind_unseparated(name.clone());
        }
        if let Some(ref description) = update.description {
            separated.push("description = ");
            separated.push_bind_unseparated(description.clone());
        }
        separated.push("updated_at = ");
        separated.push_bind_unseparated(datetime::now_db());

        query.push(" WHERE id = ");
        query.push_bind(id);

        let result = query
            .build()
            .execute(self.pool)
            .await
            .map_err(|e| map_name_conflict(e, update.name.as_deref().unwrap_or_default()))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get_by_id(id).await
    }

    /// Delete a group. Folder links and grants are removed by cascade.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM permission_groups WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Link a folder to a group. Linking twice is a no-op.
    pub async fn add_folder(&self, group_id: i64, folder_id: i64) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO group_folders (group_id, folder_id) VALUES (?, ?)")
            .bind(group_id)
            .bind(folder_id)
            .execute(self.pool)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                    LuminaError::NotFound("folder".to_string())
                }
                _ => LuminaError::Database(e.to_string()),
            })?;
        Ok(())
    }

    /// Unlink a folder from a group. Returns whether a link was removed.
    pub async fn remove_folder(&self, group_id: i64, folder_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM group_folders WHERE group_id = ? AND folder_id = ?")
            .bind(group_id)
            .bind(folder_id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// List the folder IDs linked to a group.
    pub async fn list_folders(&self, group_id: i64) -> Result<Vec<i64>> {
        let folder_ids: Vec<i64> = sqlx::query_scalar(
            "SELECT folder_id FROM group_folders WHERE group_id = ? ORDER BY folder_id",
        )
        .bind(group_id)
        .fetch_all(self.pool)
        .await?;
        Ok(folder_ids)
    }

    /// Grant or re-grant a level. The latest grant wins.
    pub async fn upsert_permission(
        &self,
        group_id: i64,
        user_id: i64,
        level: PermissionLevel,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO group_user_permissions (group_id, user_id, permission) VALUES (?, ?, ?)
             ON CONFLICT(group_id, user_id) DO UPDATE SET permission = excluded.permission",
        )
        .bind(group_id)
        .bind(user_id)
        .bind(level.as_str())
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Remove a user's grant. Returns whether a grant was removed.
    pub async fn delete_permission(&self, group_id: i64, user_id: i64) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM group_user_permissions WHERE group_id = ? AND user_id = ?")
                .bind(group_id)
                .bind(user_id)
                .execute(self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Get the level a user holds on a group.
    pub async fn get_permission(
        &self,
        group_id: i64,
        user_id: i64,
    ) -> Result<Option<PermissionLevel>> {
        let level: Option<String> = sqlx::query_scalar(
            "SELECT permission FROM group_user_permissions WHERE group_id = ? AND user_id = ?",
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        level
            .map(|s| s.parse().map_err(LuminaError::Internal))
            .transpose()
    }

    /// List all grants on a group.
    pub async fn list_members(&self, group_id: i64) -> Result<Vec<GroupMember>> {
        let members = sqlx::query_as::<_, GroupMember>(
            "SELECT user_id, permission FROM group_user_permissions
             WHERE group_id = ? ORDER BY user_id",
        )
        .bind(group_id)
        .fetch_all(self.pool)
        .await?;
        Ok(members)
    }

    /// Whether the user reaches `folder_id` through any group at `required` level or above.
    pub async fn has_folder_access(
        &self,
        user_id: i64,
        folder_id: i64,
        required: PermissionLevel,
    ) -> Result<bool> {
        self.has_any_folder_access(user_id, &[folder_id], required)
            .await
    }

    /// Whether the user reaches any of `folder_ids` through any group.
    pub async fn has_any_folder_access(
        &self,
        user_id: i64,
        folder_ids: &[i64],
        required: PermissionLevel,
    ) -> Result<bool> {
        if folder_ids.is_empty() {
            return Ok(false);
        }

        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT EXISTS(
                SELECT 1 FROM group_user_permissions gup
                JOIN group_folders gf ON gf.group_id = gup.group_id
                WHERE gup.user_id = ",
        );
        query.push_bind(user_id);
        query.push(" AND (gup.permission = 'write' OR ");
        query.push_bind(required.as_str());
        query.push(" = 'read') AND gf.folder_id IN (");
        let mut separated = query.separated(", ");
        for folder_id in folder_ids {
            separated.push_bind(*folder_id);
        }
        separated.push_unseparated("))");

        let exists: bool = query
            .build_query_scalar::<bool>()
            .fetch_one(self.pool)
            .await?;
        Ok(exists)
    }

    /// Folder IDs the user can reach at `required` level or above.
    pub async fn list_accessible_folder_ids(
        &self,
        user_id: i64,
        required: PermissionLevel,
    ) -> Result<Vec<i64>> {
        let folder_ids: Vec<i64> = sqlx::query_scalar(
            "SELECT DISTINCT gf.folder_id
             FROM group_user_permissions gup
             JOIN group_folders gf ON gf.group_id = gup.group_id
             WHERE gup.user_id = ? AND (gup.permission = 'write' OR ? = 'read')
             ORDER BY gf.folder_id",
        )
        .bind(user_id)
        .bind(required.as_str())
        .fetch_all(self.pool)
        .await?;
        Ok(folder_ids)
    }
}
