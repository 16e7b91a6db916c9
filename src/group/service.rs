//! Permission group registry.
//!
//! Decides whether a non-privileged user may read or write a folder or file
//! through the group overlay. Every check starts with the admin bypass and
//! otherwise treats missing evidence (unknown IDs, unresolvable files) as a
//! denial rather than an error.

use tracing::{debug, info, warn};

use super::repository::GroupRepository;
use super::types::{GroupMember, GroupUpdate, NewGroup, PermissionGroup, PermissionLevel};
use super::{MAX_DESCRIPTION_LENGTH, MAX_GROUP_NAME_LENGTH};
use crate::catalog::{FolderCatalog, FolderRepository};
use crate::db::Database;
use crate::{LuminaError, Result};

/// Folder-based access control through permission groups.
pub struct PermissionGroupRegistry<'a> {
    db: &'a Database,
    catalog: &'a dyn FolderCatalog,
}

impl<'a> PermissionGroupRegistry<'a> {
    /// Create a registry over the given database and folder catalog.
    pub fn new(db: &'a Database, catalog: &'a dyn FolderCatalog) -> Self {
        Self { db, catalog }
    }

    fn repo(&self) -> GroupRepository<'_> {
        GroupRepository::new(self.db.pool())
    }

    fn validate_name(name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(LuminaError::Validation("group name must not be empty".into()));
        }
        if name.chars().count() > MAX_GROUP_NAME_LENGTH {
            return Err(LuminaError::Validation(format!(
                "group name must be at most {MAX_GROUP_NAME_LENGTH} characters"
            )));
        }
        Ok(())
    }

    fn validate_description(description: Option<&str>) -> Result<()> {
        if let Some(desc) = description {
            if desc.chars().count() > MAX_DESCRIPTION_LENGTH {
                return Err(LuminaError::Validation(format!(
                    "description must be at most {MAX_DESCRIPTION_LENGTH} characters"
                )));
            }
        }
        Ok(())
    }

    async fn require_group(&self, group_id: i64) -> Result<()> {
        if self.repo().exists(group_id).await? {
            Ok(())
        } else {
            Err(LuminaError::NotFound("group".to_string()))
        }
    }

    /// Create a group; the creator is granted `write`.
    pub async fn create_group(
        &self,
        name: &str,
        description: Option<&str>,
        creator_id: i64,
    ) -> Result<PermissionGroup> {
        Self::validate_name(name)?;
        Self::validate_description(description)?;

        let mut new_group = NewGroup::new(name.trim(), creator_id);
        if let Some(desc) = description {
            new_group = new_group.with_description(desc);
        }

        let group = self.repo().create(&new_group).await?;
        info!(group_id = group.id, creator_id, "Created permission group {:?}", group.name);
        Ok(group)
    }

    /// Get a group by ID.
    pub async fn get_group(&self, group_id: i64) -> Result<PermissionGroup> {
        self.repo()
            .get_by_id(group_id)
            .await?
            .ok_or_else(|| LuminaError::NotFound("group".to_string()))
    }

    /// List all groups.
    pub async fn list_groups(&self) -> Result<Vec<PermissionGroup>> {
        self.repo().list_all().await
    }

    /// List groups the user holds a grant on.
    pub async fn list_groups_for_user(&self, user_id: i64) -> Result<Vec<PermissionGroup>> {
        self.repo().list_for_user(user_id).await
    }

    /// Rename a group or change its description.
    ///
    /// Names are trimmed before they are stored, as in `create_group`.
    pub async fn update_group(&self, group_id: i64, update: &GroupUpdate) -> Result<PermissionGroup> {
        if let Some(ref name) = update.name {
            Self::validate_name(name)?;
        }
        if let Some(ref description) = update.description {
            Self::validate_description(description.as_deref())?;
        }

        let update = GroupUpdate {
            name: update.name.as_deref().map(|n| n.trim().to_string()),
            description: update.description.clone(),
        };
        self.repo()
            .update(group_id, &update)
            .await?
            .ok_or_else(|| LuminaError::NotFound("group".to_string()))
    }

    /// Delete a group together with its folder links and grants.
    pub async fn delete_group(&self, group_id: i64) -> Result<()> {
        if !self.repo().delete(group_id).await? {
            return Err(LuminaError::NotFound("group".to_string()));
        }
        info!(group_id, "Deleted permission group");
        Ok(())
    }

    /// Link a folder into a group. Linking an already linked folder is a no-op.
    pub async fn add_folder(&self, group_id: i64, folder_id: i64) -> Result<()> {
        self.require_group(group_id).await?;
        self.repo().add_folder(group_id, folder_id).await?;
        debug!(group_id, folder_id, "Folder linked to group");
        Ok(())
    }

    /// Unlink a folder from a group. Unlinking a missing link is a no-op.
    pub async fn remove_folder(&self, group_id: i64, folder_id: i64) -> Result<()> {
        let removed = self.repo().remove_folder(group_id, folder_id).await?;
        debug!(group_id, folder_id, removed, "Folder unlinked from group");
        Ok(())
    }

    /// List the folders linked to a group.
    pub async fn list_group_folders(&self, group_id: i64) -> Result<Vec<i64>> {
        self.require_group(group_id).await?;
        self.repo().list_folders(group_id).await
    }

    /// Grant a user a level on a group, replacing any previous grant.
    pub async fn grant_permission(
        &self,
        group_id: i64,
        user_id: i64,
        level: PermissionLevel,
    ) -> Result<()> {
        self.require_group(group_id).await?;
        self.repo().upsert_permission(group_id, user_id, level).await?;
        debug!(group_id, user_id, %level, "Granted group permission");
        Ok(())
    }

    /// Revoke a user's grant on a group. Revoking a missing grant is a no-op.
    pub async fn revoke_permission(&self, group_id: i64, user_id: i64) -> Result<()> {
        let removed = self.repo().delete_permission(group_id, user_id).await?;
        debug!(group_id, user_id, removed, "Revoked group permission");
        Ok(())
    }

    /// The level a user holds on a group, if any.
    pub async fn get_user_permission(
        &self,
        group_id: i64,
        user_id: i64,
    ) -> Result<Option<PermissionLevel>> {
        self.repo().get_permission(group_id, user_id).await
    }

    /// List every grant on a group.
    pub async fn list_group_members(&self, group_id: i64) -> Result<Vec<GroupMember>> {
        self.require_group(group_id).await?;
        self.repo().list_members(group_id).await
    }

    /// Whether the user may read the folder.
    pub async fn check_folder_access(
        &self,
        user_id: i64,
        folder_id: i64,
        is_admin: bool,
    ) -> Result<bool> {
        self.check_folder_access_level(user_id, folder_id, PermissionLevel::Read, is_admin)
            .await
    }

    /// Whether the user holds at least `required` on the folder through any group.
    pub async fn check_folder_access_level(
        &self,
        user_id: i64,
        folder_id: i64,
        required: PermissionLevel,
        is_admin: bool,
    ) -> Result<bool> {
        if is_admin {
            return Ok(true);
        }

        let allowed = self
            .repo()
            .has_folder_access(user_id, folder_id, required)
            .await?;
        debug!(user_id, folder_id, %required, allowed, "Folder access check");
        Ok(allowed)
    }

    /// Whether the user may read the file.
    ///
    /// A file mapped into several folders is readable if any one of them is.
    pub async fn check_file_access(&self, user_id: i64, file_id: i64, is_admin: bool) -> Result<bool> {
        self.check_file_access_level(user_id, file_id, PermissionLevel::Read, is_admin)
            .await
    }

    /// Whether the user holds at least `required` on any folder containing the file.
    pub async fn check_file_access_level(
        &self,
        user_id: i64,
        file_id: i64,
        required: PermissionLevel,
        is_admin: bool,
    ) -> Result<bool> {
        if is_admin {
            return Ok(true);
        }

        let folder_ids = match self.catalog.resolve_folders_for_file(file_id).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!(file_id, "Could not resolve folders for file, denying: {}", e);
                return Ok(false);
            }
        };

        let allowed = self
            .repo()
            .has_any_folder_access(user_id, &folder_ids, required)
            .await?;
        debug!(user_id, file_id, %required, allowed, "File access check");
        Ok(allowed)
    }

    /// Folders the user can browse, or every folder for admins.
    pub async fn list_accessible_folders(&self, user_id: i64, is_admin: bool) -> Result<Vec<i64>> {
        if is_admin {
            return FolderRepository::new(self.db.pool()).list_ids().await;
        }
        self.repo()
            .list_accessible_folder_ids(user_id, PermissionLevel::Read)
            .await
    }
}
