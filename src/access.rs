//! Request-level authorization for Lumina.
//!
//! Handlers call into [`Authorizer`] once per request: signed-in browsing goes
//! through the permission-group overlay, public links go through the share
//! gates. The privileged-role bypass lives here and nowhere else above the
//! registries.

use tracing::debug;

use crate::auth::{caller_id, Caller, IdentityContext};
use crate::catalog::FolderCatalog;
use crate::db::Database;
use crate::group::{PermissionGroupRegistry, PermissionLevel};
use crate::share::{AccessToken, Share, ShareRegistry};
use crate::{AccessError, LuminaError, Result};

/// A share that passed every gate and had its view counted.
#[derive(Debug, Clone)]
pub struct OpenedShare {
    /// The share as it was validated.
    pub share: Share,
    /// Token for fetching the shared resource.
    pub token: AccessToken,
    /// View count including this view.
    pub view_count: i64,
    /// Whether the access log row was written.
    pub log_written: bool,
}

/// Combines the identity context with the group and share registries.
pub struct Authorizer<'a> {
    groups: PermissionGroupRegistry<'a>,
    shares: ShareRegistry<'a>,
}

impl<'a> Authorizer<'a> {
    /// Create an authorizer over the given database and folder catalog.
    pub fn new(db: &'a Database, catalog: &'a dyn FolderCatalog) -> Self {
        Self {
            groups: PermissionGroupRegistry::new(db, catalog),
            shares: ShareRegistry::new(db),
        }
    }

    /// The permission group registry.
    pub fn groups(&self) -> &PermissionGroupRegistry<'a> {
        &self.groups
    }

    /// The share registry.
    pub fn shares(&self) -> &ShareRegistry<'a> {
        &self.shares
    }

    fn require_caller(identity: &dyn IdentityContext) -> Result<Caller> {
        identity
            .caller()
            .ok_or(LuminaError::Access(AccessError::AuthRequired))
    }

    /// Require the caller to be able to read a file.
    pub async fn authorize_file(&self, identity: &dyn IdentityContext, file_id: i64) -> Result<()> {
        self.authorize_file_level(identity, file_id, PermissionLevel::Read)
            .await
    }

    /// Require the caller to hold at least `required` on a file.
    ///
    /// Anonymous callers get `AuthRequired`; signed-in callers without a
    /// qualifying group grant get `Forbidden`.
    pub async fn authorize_file_level(
        &self,
        identity: &dyn IdentityContext,
        file_id: i64,
        required: PermissionLevel,
    ) -> Result<()> {
        let caller = Self::require_caller(identity)?;

        let allowed = self
            .groups
            .check_file_access_level(caller.user_id, file_id, required, caller.is_privileged())
            .await?;

        if allowed {
            Ok(())
        } else {
            debug!(user_id = caller.user_id, file_id, %required, "File access denied");
            Err(LuminaError::Access(AccessError::Forbidden))
        }
    }

    /// Require the caller to be able to read a folder.
    pub async fn authorize_folder(
        &self,
        identity: &dyn IdentityContext,
        folder_id: i64,
    ) -> Result<()> {
        let caller = Self::require_caller(identity)?;

        let allowed = self
            .groups
            .check_folder_access(caller.user_id, folder_id, caller.is_privileged())
            .await?;

        if allowed {
            Ok(())
        } else {
            debug!(user_id = caller.user_id, folder_id, "Folder access denied");
            Err(LuminaError::Access(AccessError::Forbidden))
        }
    }

    /// Folders the caller can browse. Anonymous callers see none.
    pub async fn accessible_folders(&self, identity: &dyn IdentityContext) -> Result<Vec<i64>> {
        match identity.caller() {
            Some(caller) => {
                self.groups
                    .list_accessible_folders(caller.user_id, caller.is_privileged())
                    .await
            }
            None => Ok(Vec::new()),
        }
    }

    /// Open a share link: run the gates, count the view and mint a token.
    ///
    /// A view that passes validation can still lose the quota race in
    /// `log_access`; that surfaces as `QuotaExceeded` here.
    pub async fn open_share(
        &self,
        identity: &dyn IdentityContext,
        share_id: &str,
        password: Option<&str>,
        ip_address: &str,
        user_agent: &str,
    ) -> Result<OpenedShare> {
        let caller = caller_id(identity);

        let share = self
            .shares
            .validate_access(share_id, password, caller)
            .await?;
        let logged = self
            .shares
            .log_access(share_id, caller, ip_address, user_agent)
            .await?;
        let token = AccessToken::mint(share.id.clone(), share.resource_id);

        Ok(OpenedShare {
            share,
            token,
            view_count: logged.view_count,
            log_written: logged.log_written,
        })
    }

    /// Check a share token against the resource about to be served.
    pub async fn authorize_share_token(&self, token: &str, resource_id: i64) -> Result<String> {
        self.shares
            .authorize_token_for_resource(token, resource_id)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::catalog::{FileRepository, FolderRepository, NewFolder, NewMediaFile, SqliteFolderCatalog};
    use crate::share::NewShare;

    struct Fixture {
        db: Database,
        catalog: SqliteFolderCatalog,
    }

    impl Fixture {
        async fn new() -> Self {
            let db = Database::open_in_memory().await.unwrap();
            let catalog = SqliteFolderCatalog::new(db.clone());
            Self { db, catalog }
        }

        fn authorizer(&self) -> Authorizer<'_> {
            Authorizer::new(&self.db, &self.catalog)
        }

        async fn file_in_new_folder(&self, path: &str) -> (i64, i64) {
            let folder = FolderRepository::new(self.db.pool())
                .create(&NewFolder::new(path.trim_start_matches('/'), path))
                .await
                .unwrap();
            let file = FileRepository::new(self.db.pool())
                .create(&NewMediaFile::new(folder.id, "a.jpg"))
                .await
                .unwrap();
            (folder.id, file.id)
        }
    }

    fn denial(result: Result<()>) -> Option<AccessError> {
        result.err().and_then(|e| e.access_error())
    }

    #[tokio::test]
    async fn test_anonymous_needs_auth() {
        let fx = Fixture::new().await;
        let authz = fx.authorizer();
        let (_, file) = fx.file_in_new_folder("/a").await;

        let anonymous: Option<Caller> = None;
        assert_eq!(
            denial(authz.authorize_file(&anonymous, file).await),
            Some(AccessError::AuthRequired)
        );
        assert!(authz.accessible_folders(&anonymous).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_group_grant_allows_file() {
        let fx = Fixture::new().await;
        let authz = fx.authorizer();
        let (folder, file) = fx.file_in_new_folder("/a").await;

        let viewer = Caller::user(2);
        assert_eq!(
            denial(authz.authorize_file(&viewer, file).await),
            Some(AccessError::Forbidden)
        );

        let group = authz.groups().create_group("g", None, 1).await.unwrap();
        authz.groups().add_folder(group.id, folder).await.unwrap();
        authz
            .groups()
            .grant_permission(group.id, 2, PermissionLevel::Read)
            .await
            .unwrap();

        authz.authorize_file(&viewer, file).await.unwrap();
        authz.authorize_folder(&viewer, folder).await.unwrap();
        assert_eq!(
            denial(
                authz
                    .authorize_file_level(&viewer, file, PermissionLevel::Write)
                    .await
            ),
            Some(AccessError::Forbidden)
        );
    }

    #[tokio::test]
    async fn test_privileged_roles_bypass_groups() {
        let fx = Fixture::new().await;
        let authz = fx.authorizer();
        let (folder, file) = fx.file_in_new_folder("/a").await;

        for role in [Role::Admin, Role::ServerOwner] {
            let caller = Caller::new(9, role);
            authz.authorize_file(&caller, file).await.unwrap();
            authz
                .authorize_file_level(&caller, file, PermissionLevel::Write)
                .await
                .unwrap();
            assert_eq!(authz.accessible_folders(&caller).await.unwrap(), vec![folder]);
        }
    }

    #[tokio::test]
    async fn test_open_share_counts_and_mints_token() {
        let fx = Fixture::new().await;
        let authz = fx.authorizer();
        let share = authz
            .shares()
            .create_share(&NewShare::file(7, 1).with_max_views(1))
            .await
            .unwrap();

        let anonymous: Option<Caller> = None;
        let opened = authz
            .open_share(&anonymous, &share.id, None, "127.0.0.1", "test")
            .await
            .unwrap();
        assert_eq!(opened.view_count, 1);
        assert!(opened.log_written);
        assert_eq!(opened.token.resource_id, 7);

        let encoded = opened.token.encode();
        assert_eq!(authz.authorize_share_token(&encoded, 7).await.unwrap(), share.id);
        assert!(authz.authorize_share_token(&encoded, 8).await.is_err());

        let err = authz
            .open_share(&anonymous, &share.id, None, "127.0.0.1", "test")
            .await
            .unwrap_err();
        assert_eq!(err.access_error(), Some(AccessError::QuotaExceeded));
    }

    #[tokio::test]
    async fn test_open_share_passes_caller_to_gates() {
        let fx = Fixture::new().await;
        let authz = fx.authorizer();
        let share = authz
            .shares()
            .create_share(&NewShare::album(3, 1).requiring_auth())
            .await
            .unwrap();

        let anonymous: Option<Caller> = None;
        let err = authz
            .open_share(&anonymous, &share.id, None, "ip", "ua")
            .await
            .unwrap_err();
        assert_eq!(err.access_error(), Some(AccessError::AuthRequired));

        let opened = authz
            .open_share(&Caller::user(4), &share.id, None, "ip", "ua")
            .await
            .unwrap();
        let logs = authz
            .shares()
            .list_access_logs(&share.id, 10)
            .await
            .unwrap();
        assert_eq!(opened.view_count, 1);
        assert_eq!(logs[0].accessed_by, Some(4));
    }
}
