//! Share registry.
//!
//! Gates are evaluated in a fixed order so the first failing one is what the
//! caller sees: existence, enabled, expiry, quota, sign-in, password,
//! allow-list. Validation never mutates; `log_access` counts the view with a
//! single conditional update so the quota cannot be overrun.

use chrono::{Duration, Utc};
use tracing::{debug, error, info, warn};

use super::repository::ShareRepository;
use super::token::{generate_share_id, AccessToken};
use super::types::{
    AccessType, LoggedAccess, NewShare, Share, ShareAccessLog, ShareType, ShareUpdate,
};
use crate::auth::{hash_password, verify_password, PasswordError};
use crate::datetime;
use crate::db::Database;
use crate::{AccessError, LuminaError, Result};

/// Number of compare-and-set rounds before `extend_share` gives up.
const MAX_EXTEND_ATTEMPTS: usize = 5;

/// Default number of log rows returned by `list_access_logs`.
pub const DEFAULT_LOG_LIMIT: i64 = 100;

fn deny(share_id: &str, reason: AccessError) -> LuminaError {
    debug!(share_id, %reason, "Share access denied");
    LuminaError::Access(reason)
}

fn hash_share_password(password: &str) -> Result<String> {
    hash_password(password).map_err(|e| match e {
        PasswordError::Empty | PasswordError::TooLong => LuminaError::Validation(e.to_string()),
        other => LuminaError::Internal(other.to_string()),
    })
}

/// Share link lifecycle, gates, allow-lists, access logging and tokens.
pub struct ShareRegistry<'a> {
    db: &'a Database,
}

impl<'a> ShareRegistry<'a> {
    /// Create a registry over the given database.
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    fn repo(&self) -> ShareRepository<'_> {
        ShareRepository::new(self.db.pool())
    }

    /// Create a share with a fresh random ID.
    ///
    /// An empty password means no password gate. A generated ID that already
    /// exists fails with `Conflict`; nothing is overwritten.
    pub async fn create_share(&self, share: &NewShare) -> Result<Share> {
        if let Some(max_views) = share.max_views {
            if max_views < 1 {
                return Err(LuminaError::Validation(
                    "max_views must be at least 1".to_string(),
                ));
            }
        }
        if let Some(expires_at) = share.expires_at {
            if expires_at <= Utc::now() {
                return Err(LuminaError::Validation(
                    "expires_at must be in the future".to_string(),
                ));
            }
            datetime::ensure_storable(&expires_at)?;
        }

        let password_hash = if share.password.is_empty() {
            None
        } else {
            Some(hash_share_password(&share.password)?)
        };

        let id = generate_share_id();
        let created = self
            .repo()
            .insert(&id, share, password_hash.as_deref())
            .await?;

        info!(
            share_id = %created.id,
            share_type = %created.share_type,
            resource_id = created.resource_id,
            owner_id = created.owner_id,
            "Created share"
        );
        Ok(created)
    }

    /// Get a share by ID.
    pub async fn get_share(&self, share_id: &str) -> Result<Share> {
        self.repo()
            .get_by_id(share_id)
            .await?
            .ok_or_else(|| LuminaError::NotFound("share".to_string()))
    }

    /// List shares created by a user.
    pub async fn list_shares_by_owner(&self, owner_id: i64) -> Result<Vec<Share>> {
        self.repo().list_by_owner(owner_id).await
    }

    /// List shares pointing at a resource.
    pub async fn list_shares_for_resource(
        &self,
        share_type: ShareType,
        resource_id: i64,
    ) -> Result<Vec<Share>> {
        self.repo().list_for_resource(share_type, resource_id).await
    }

    /// Change a share's password, sign-in requirement, quota or access type.
    pub async fn update_share(&self, share_id: &str, update: &ShareUpdate) -> Result<Share> {
        if let Some(Some(max_views)) = update.max_views {
            if max_views < 1 {
                return Err(LuminaError::Validation(
                    "max_views must be at least 1".to_string(),
                ));
            }
        }

        let password_hash = match update.password.as_deref() {
            None => None,
            Some("") => Some(None),
            Some(password) => Some(Some(hash_share_password(password)?)),
        };

        let share = self
            .repo()
            .update(share_id, update, password_hash)
            .await?
            .ok_or_else(|| LuminaError::NotFound("share".to_string()))?;
        debug!(share_id, "Updated share");
        Ok(share)
    }

    /// Switch a share on or off.
    pub async fn set_enabled(&self, share_id: &str, enabled: bool) -> Result<()> {
        if !self.repo().set_enabled(share_id, enabled).await? {
            return Err(LuminaError::NotFound("share".to_string()));
        }
        info!(share_id, enabled, "Share enabled state changed");
        Ok(())
    }

    /// Delete a share together with its allow-list and access log.
    pub async fn delete_share(&self, share_id: &str) -> Result<()> {
        if !self.repo().delete(share_id).await? {
            return Err(LuminaError::NotFound("share".to_string()));
        }
        info!(share_id, "Deleted share");
        Ok(())
    }

    /// Run every gate for a caller opening the share.
    ///
    /// Returns the share on success and an `Access` error naming the first
    /// failing gate otherwise. The view counter is not touched.
    pub async fn validate_access(
        &self,
        share_id: &str,
        password: Option<&str>,
        caller: Option<i64>,
    ) -> Result<Share> {
        let repo = self.repo();

        let share = match repo.get_by_id(share_id).await? {
            Some(share) => share,
            None => return Err(deny(share_id, AccessError::NotFound)),
        };

        if !share.enabled {
            return Err(deny(share_id, AccessError::Disabled));
        }
        if share.is_expired_at(Utc::now()) {
            return Err(deny(share_id, AccessError::Expired));
        }
        if share.quota_reached() {
            return Err(deny(share_id, AccessError::QuotaExceeded));
        }
        if share.requires_auth && caller.is_none() {
            return Err(deny(share_id, AccessError::AuthRequired));
        }

        if let Some(ref hash) = share.password_hash {
            let supplied = password.unwrap_or_default();
            if supplied.is_empty() {
                return Err(deny(share_id, AccessError::InvalidPassword));
            }
            match verify_password(supplied, hash) {
                Ok(()) => {}
                Err(PasswordError::VerificationFailed) => {
                    return Err(deny(share_id, AccessError::InvalidPassword));
                }
                Err(e) => {
                    error!(share_id, "Stored share password hash is unusable: {}", e);
                    return Err(LuminaError::Internal(
                        "share password could not be verified".to_string(),
                    ));
                }
            }
        }

        if share.access_type == AccessType::Private {
            let allowed = match caller {
                Some(user_id) if user_id == share.owner_id => true,
                Some(user_id) => repo.has_permission(share_id, user_id).await?,
                None => false,
            };
            if !allowed {
                return Err(deny(share_id, AccessError::Forbidden));
            }
        }

        debug!(share_id, ?caller, "Share access granted");
        Ok(share)
    }

    /// Count one view and append an access log row.
    ///
    /// The counter is bumped only while the share is enabled, unexpired and
    /// under quota; when that update matches nothing the share is re-read to
    /// report why. A failed log write after a counted view does not undo the
    /// view: it is reported through `LoggedAccess::log_written`.
    pub async fn log_access(
        &self,
        share_id: &str,
        caller: Option<i64>,
        ip_address: &str,
        user_agent: &str,
    ) -> Result<LoggedAccess> {
        let repo = self.repo();
        let now = Utc::now();

        let view_count = match repo.record_view(share_id, &now).await? {
            Some(count) => count,
            None => {
                let reason = match repo.get_by_id(share_id).await? {
                    None => AccessError::NotFound,
                    Some(share) if !share.enabled => AccessError::Disabled,
                    Some(share) if share.is_expired_at(now) => AccessError::Expired,
                    Some(_) => AccessError::QuotaExceeded,
                };
                return Err(deny(share_id, reason));
            }
        };

        let log_written = match repo
            .append_log(share_id, caller, ip_address, user_agent)
            .await
        {
            Ok(_) => true,
            Err(e) => {
                warn!(share_id, view_count, "Failed to write share access log: {}", e);
                false
            }
        };

        debug!(share_id, view_count, ?caller, "Share view recorded");
        Ok(LoggedAccess {
            view_count,
            log_written,
        })
    }

    /// Most recent access log rows for a share.
    pub async fn list_access_logs(&self, share_id: &str, limit: i64) -> Result<Vec<ShareAccessLog>> {
        self.repo().list_logs(share_id, limit.max(0)).await
    }

    /// Mint a token for an existing share.
    pub async fn generate_access_token(&self, share_id: &str) -> Result<AccessToken> {
        let share = match self.repo().get_by_id(share_id).await? {
            Some(share) => share,
            None => return Err(deny(share_id, AccessError::NotFound)),
        };
        Ok(AccessToken::mint(share.id, share.resource_id))
    }

    /// Check a token against the current state of its share.
    ///
    /// Only the enabled flag, expiry and resource binding are checked again;
    /// password, sign-in and quota were settled when the token was minted.
    pub async fn validate_access_token(&self, token: &str) -> Result<(String, i64)> {
        let token = AccessToken::decode(token)?;

        let share = match self.repo().get_by_id(&token.share_id).await? {
            Some(share) => share,
            None => return Err(deny(&token.share_id, AccessError::NotFound)),
        };
        if !share.enabled {
            return Err(deny(&share.id, AccessError::Disabled));
        }
        if share.is_expired_at(Utc::now()) {
            return Err(deny(&share.id, AccessError::Expired));
        }
        if share.resource_id != token.resource_id {
            return Err(deny(&share.id, AccessError::Forbidden));
        }

        Ok((share.id, share.resource_id))
    }

    /// Validate a token and require it to cover `resource_id`.
    pub async fn authorize_token_for_resource(&self, token: &str, resource_id: i64) -> Result<String> {
        let (share_id, token_resource_id) = self.validate_access_token(token).await?;
        if token_resource_id != resource_id {
            return Err(deny(&share_id, AccessError::Forbidden));
        }
        Ok(share_id)
    }

    /// Put a user on a private share's allow-list. Granting twice is a no-op.
    pub async fn grant_share_permission(&self, share_id: &str, user_id: i64) -> Result<()> {
        self.repo().add_permission(share_id, user_id).await?;
        debug!(share_id, user_id, "Granted share permission");
        Ok(())
    }

    /// Take a user off a share's allow-list. Revoking a missing grant is a no-op.
    pub async fn revoke_share_permission(&self, share_id: &str, user_id: i64) -> Result<()> {
        let removed = self.repo().remove_permission(share_id, user_id).await?;
        debug!(share_id, user_id, removed, "Revoked share permission");
        Ok(())
    }

    /// Users on a share's allow-list.
    pub async fn list_share_permissions(&self, share_id: &str) -> Result<Vec<i64>> {
        self.repo().list_permissions(share_id).await
    }

    /// Push a share's deadline back by `duration`.
    ///
    /// Extends from the current deadline when one is set and still ahead,
    /// otherwise from now. Concurrent extensions both apply.
    pub async fn extend_share(&self, share_id: &str, duration: Duration) -> Result<Share> {
        if duration <= Duration::zero() {
            return Err(LuminaError::Validation(
                "extension must be positive".to_string(),
            ));
        }

        let repo = self.repo();
        for _ in 0..MAX_EXTEND_ATTEMPTS {
            let share = repo
                .get_by_id(share_id)
                .await?
                .ok_or_else(|| LuminaError::NotFound("share".to_string()))?;

            let now = Utc::now();
            let base = share.expires_at.filter(|exp| *exp > now).unwrap_or(now);
            let new_deadline = datetime::checked_deadline(base, duration)?;

            if repo
                .compare_and_set_expiry(share_id, share.expires_at.as_ref(), &new_deadline)
                .await?
            {
                info!(share_id, expires_at = %new_deadline, "Extended share");
                return self.get_share(share_id).await;
            }
            debug!(share_id, "Share deadline changed during extend, retrying");
        }

        Err(LuminaError::Conflict(
            "share deadline kept changing during extend".to_string(),
        ))
    }

    /// Delete every expired share. Returns how many were removed.
    pub async fn delete_expired_shares(&self) -> Result<u64> {
        let deleted = self.repo().delete_expired(&Utc::now()).await?;
        if deleted > 0 {
            info!(deleted, "Deleted expired shares");
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    async fn expire(db: &Database, share_id: &str) {
        ShareRepository::new(db.pool())
            .set_expiry(share_id, Some(&(Utc::now() - Duration::minutes(5))))
            .await
            .unwrap();
    }

    fn access_err(result: Result<Share>) -> AccessError {
        result.unwrap_err().access_error().expect("access error")
    }

    #[tokio::test]
    async fn test_create_share_defaults() {
        let db = setup().await;
        let registry = ShareRegistry::new(&db);

        let share = registry.create_share(&NewShare::file(7, 1)).await.unwrap();
        assert_eq!(share.id.len(), 16);
        assert!(share.enabled);
        assert!(!share.has_password());
        assert_eq!(share.view_count, 0);

        let fetched = registry.get_share(&share.id).await.unwrap();
        assert_eq!(fetched.resource_id, 7);
    }

    #[tokio::test]
    async fn test_create_share_hashes_password() {
        let db = setup().await;
        let registry = ShareRegistry::new(&db);

        let share = registry
            .create_share(&NewShare::file(7, 1).with_password("secret"))
            .await
            .unwrap();
        let hash = share.password_hash.unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(!hash.contains("secret"));
    }

    #[tokio::test]
    async fn test_create_share_validation() {
        let db = setup().await;
        let registry = ShareRegistry::new(&db);

        assert!(matches!(
            registry.create_share(&NewShare::file(1, 1).with_max_views(0)).await,
            Err(LuminaError::Validation(_))
        ));
        assert!(matches!(
            registry
                .create_share(&NewShare::file(1, 1).expires_at(Utc::now() - Duration::hours(1)))
                .await,
            Err(LuminaError::Validation(_))
        ));
        assert!(matches!(
            registry
                .create_share(&NewShare::file(1, 1).with_password("x".repeat(129)))
                .await,
            Err(LuminaError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_gate_order() {
        let db = setup().await;
        let registry = ShareRegistry::new(&db);

        assert_eq!(
            access_err(registry.validate_access("missing", None, None).await),
            AccessError::NotFound
        );

        let share = registry
            .create_share(
                &NewShare::file(1, 1)
                    .private()
                    .with_password("pw")
                    .requiring_auth()
                    .with_max_views(1),
            )
            .await
            .unwrap();

        assert_eq!(
            access_err(registry.validate_access(&share.id, None, None).await),
            AccessError::AuthRequired
        );
        assert_eq!(
            access_err(registry.validate_access(&share.id, Some("bad"), Some(2)).await),
            AccessError::InvalidPassword
        );
        assert_eq!(
            access_err(registry.validate_access(&share.id, Some("pw"), Some(2)).await),
            AccessError::Forbidden
        );
        registry.validate_access(&share.id, Some("pw"), Some(1)).await.unwrap();

        registry.log_access(&share.id, Some(1), "1.1.1.1", "ua").await.unwrap();
        assert_eq!(
            access_err(registry.validate_access(&share.id, None, None).await),
            AccessError::QuotaExceeded
        );

        expire(&db, &share.id).await;
        assert_eq!(
            access_err(registry.validate_access(&share.id, None, None).await),
            AccessError::Expired
        );

        registry.set_enabled(&share.id, false).await.unwrap();
        assert_eq!(
            access_err(registry.validate_access(&share.id, None, None).await),
            AccessError::Disabled
        );
    }

    #[tokio::test]
    async fn test_missing_password_is_invalid() {
        let db = setup().await;
        let registry = ShareRegistry::new(&db);
        let share = registry
            .create_share(&NewShare::file(1, 1).with_password("pw"))
            .await
            .unwrap();

        assert_eq!(
            access_err(registry.validate_access(&share.id, None, None).await),
            AccessError::InvalidPassword
        );
        assert_eq!(
            access_err(registry.validate_access(&share.id, Some(""), None).await),
            AccessError::InvalidPassword
        );
    }

    #[tokio::test]
    async fn test_validate_does_not_count_views() {
        let db = setup().await;
        let registry = ShareRegistry::new(&db);
        let share = registry
            .create_share(&NewShare::file(1, 1).with_max_views(1))
            .await
            .unwrap();

        for _ in 0..3 {
            registry.validate_access(&share.id, None, None).await.unwrap();
        }
        assert_eq!(registry.get_share(&share.id).await.unwrap().view_count, 0);
    }

    #[tokio::test]
    async fn test_log_access_counts_and_logs() {
        let db = setup().await;
        let registry = ShareRegistry::new(&db);
        let share = registry
            .create_share(&NewShare::file(1, 1).with_max_views(2))
            .await
            .unwrap();

        let first = registry
            .log_access(&share.id, None, "10.0.0.1", "curl")
            .await
            .unwrap();
        assert_eq!(first, LoggedAccess { view_count: 1, log_written: true });
        registry.log_access(&share.id, Some(3), "10.0.0.2", "firefox").await.unwrap();

        let err = registry
            .log_access(&share.id, None, "10.0.0.3", "curl")
            .await
            .unwrap_err();
        assert_eq!(err.access_error(), Some(AccessError::QuotaExceeded));

        let logs = registry.list_access_logs(&share.id, DEFAULT_LOG_LIMIT).await.unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].accessed_by, Some(3));
        assert_eq!(logs[0].user_agent, "firefox");
    }

    #[tokio::test]
    async fn test_log_access_reports_reason() {
        let db = setup().await;
        let registry = ShareRegistry::new(&db);
        let share = registry.create_share(&NewShare::file(1, 1)).await.unwrap();

        let missing = registry.log_access("missing", None, "ip", "ua").await.unwrap_err();
        assert_eq!(missing.access_error(), Some(AccessError::NotFound));

        expire(&db, &share.id).await;
        let expired = registry.log_access(&share.id, None, "ip", "ua").await.unwrap_err();
        assert_eq!(expired.access_error(), Some(AccessError::Expired));

        registry.set_enabled(&share.id, false).await.unwrap();
        let disabled = registry.log_access(&share.id, None, "ip", "ua").await.unwrap_err();
        assert_eq!(disabled.access_error(), Some(AccessError::Disabled));
    }

    #[tokio::test]
    async fn test_log_access_keeps_view_when_log_insert_fails() {
        let db = setup().await;
        let registry = ShareRegistry::new(&db);
        let share = registry
            .create_share(&NewShare::file(1, 1).with_max_views(3))
            .await
            .unwrap();
        sqlx::query("DROP TABLE share_access_logs")
            .execute(db.pool())
            .await
            .unwrap();

        let logged = registry
            .log_access(&share.id, None, "10.0.0.1", "curl")
            .await
            .unwrap();
        assert_eq!(logged, LoggedAccess { view_count: 1, log_written: false });
        assert_eq!(registry.get_share(&share.id).await.unwrap().view_count, 1);
        registry.validate_access(&share.id, None, None).await.unwrap();
    }

    #[tokio::test]
    async fn test_private_allow_list() {
        let db = setup().await;
        let registry = ShareRegistry::new(&db);
        let share = registry
            .create_share(&NewShare::album(4, 1).private())
            .await
            .unwrap();

        assert_eq!(
            access_err(registry.validate_access(&share.id, None, Some(2)).await),
            AccessError::Forbidden
        );
        assert_eq!(
            access_err(registry.validate_access(&share.id, None, None).await),
            AccessError::Forbidden
        );

        registry.grant_share_permission(&share.id, 2).await.unwrap();
        registry.grant_share_permission(&share.id, 2).await.unwrap();
        registry.validate_access(&share.id, None, Some(2)).await.unwrap();
        assert_eq!(registry.list_share_permissions(&share.id).await.unwrap(), vec![2]);

        registry.revoke_share_permission(&share.id, 2).await.unwrap();
        registry.revoke_share_permission(&share.id, 2).await.unwrap();
        assert_eq!(
            access_err(registry.validate_access(&share.id, None, Some(2)).await),
            AccessError::Forbidden
        );
    }

    #[tokio::test]
    async fn test_token_round_trip() {
        let db = setup().await;
        let registry = ShareRegistry::new(&db);
        let share = registry.create_share(&NewShare::file(7, 1)).await.unwrap();

        let token = registry.generate_access_token(&share.id).await.unwrap();
        let (share_id, resource_id) = registry
            .validate_access_token(&token.encode())
            .await
            .unwrap();
        assert_eq!(share_id, share.id);
        assert_eq!(resource_id, 7);

        assert_eq!(
            registry
                .authorize_token_for_resource(&token.encode(), 7)
                .await
                .unwrap(),
            share.id
        );
        let err = registry
            .authorize_token_for_resource(&token.encode(), 8)
            .await
            .unwrap_err();
        assert_eq!(err.access_error(), Some(AccessError::Forbidden));
    }

    #[tokio::test]
    async fn test_token_checks_current_share_state() {
        let db = setup().await;
        let registry = ShareRegistry::new(&db);
        let share = registry
            .create_share(&NewShare::file(7, 1).with_max_views(1))
            .await
            .unwrap();
        let token = registry.generate_access_token(&share.id).await.unwrap().encode();

        registry.log_access(&share.id, None, "ip", "ua").await.unwrap();
        registry.validate_access_token(&token).await.unwrap();

        let forged = AccessToken {
            share_id: share.id.clone(),
            resource_id: 8,
            nonce: "n".into(),
        };
        let err = registry.validate_access_token(&forged.encode()).await.unwrap_err();
        assert_eq!(err.access_error(), Some(AccessError::Forbidden));

        registry.set_enabled(&share.id, false).await.unwrap();
        let err = registry.validate_access_token(&token).await.unwrap_err();
        assert_eq!(err.access_error(), Some(AccessError::Disabled));

        registry.delete_share(&share.id).await.unwrap();
        let err = registry.validate_access_token(&token).await.unwrap_err();
        assert_eq!(err.access_error(), Some(AccessError::NotFound));

        assert!(matches!(
            registry.validate_access_token("garbage").await,
            Err(LuminaError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_extend_share() {
        let db = setup().await;
        let registry = ShareRegistry::new(&db);

        let deadline = Utc::now() + Duration::hours(1);
        let share = registry
            .create_share(&NewShare::file(1, 1).expires_at(deadline))
            .await
            .unwrap();
        let extended = registry
            .extend_share(&share.id, Duration::hours(2))
            .await
            .unwrap();
        assert_eq!(
            datetime::to_db(&extended.expires_at.unwrap()),
            datetime::to_db(&(deadline + Duration::hours(2)))
        );

        let open = registry.create_share(&NewShare::file(1, 1)).await.unwrap();
        let before = Utc::now();
        let extended = registry.extend_share(&open.id, Duration::days(1)).await.unwrap();
        let after = Utc::now();
        let new_deadline = extended.expires_at.unwrap();
        assert!(new_deadline >= before + Duration::days(1) - Duration::seconds(1));
        assert!(new_deadline <= after + Duration::days(1));

        assert!(matches!(
            registry.extend_share(&open.id, Duration::zero()).await,
            Err(LuminaError::Validation(_))
        ));
        assert!(matches!(
            registry.extend_share("missing", Duration::hours(1)).await,
            Err(LuminaError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_extend_expired_share_starts_from_now() {
        let db = setup().await;
        let registry = ShareRegistry::new(&db);
        let share = registry.create_share(&NewShare::file(1, 1)).await.unwrap();
        expire(&db, &share.id).await;

        let extended = registry.extend_share(&share.id, Duration::hours(1)).await.unwrap();
        assert!(extended.expires_at.unwrap() > Utc::now() + Duration::minutes(59));
        registry.validate_access(&share.id, None, None).await.unwrap();
    }

    #[tokio::test]
    async fn test_deadlines_past_year_9999_rejected() {
        let db = setup().await;
        let registry = ShareRegistry::new(&db);

        let far = datetime::max_storable() + Duration::days(1);
        assert!(matches!(
            registry.create_share(&NewShare::file(1, 1).expires_at(far)).await,
            Err(LuminaError::Validation(_))
        ));

        let open = registry.create_share(&NewShare::file(1, 1)).await.unwrap();
        assert!(matches!(
            registry.extend_share(&open.id, Duration::MAX).await,
            Err(LuminaError::Validation(_))
        ));

        let edge = datetime::max_storable() - Duration::hours(1);
        let share = registry
            .create_share(&NewShare::file(1, 1).expires_at(edge))
            .await
            .unwrap();
        assert!(matches!(
            registry.extend_share(&share.id, Duration::hours(2)).await,
            Err(LuminaError::Validation(_))
        ));
        let unchanged = registry.get_share(&share.id).await.unwrap();
        assert_eq!(
            datetime::to_db(&unchanged.expires_at.unwrap()),
            datetime::to_db(&edge)
        );
        registry.validate_access(&share.id, None, None).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_share_password() {
        let db = setup().await;
        let registry = ShareRegistry::new(&db);
        let share = registry.create_share(&NewShare::file(1, 1)).await.unwrap();

        registry
            .update_share(&share.id, &ShareUpdate::new().password("pw"))
            .await
            .unwrap();
        assert_eq!(
            access_err(registry.validate_access(&share.id, None, None).await),
            AccessError::InvalidPassword
        );
        registry.validate_access(&share.id, Some("pw"), None).await.unwrap();

        let cleared = registry
            .update_share(&share.id, &ShareUpdate::new().password(""))
            .await
            .unwrap();
        assert!(!cleared.has_password());
        registry.validate_access(&share.id, None, None).await.unwrap();

        assert!(matches!(
            registry
                .update_share(&share.id, &ShareUpdate::new().max_views(Some(0)))
                .await,
            Err(LuminaError::Validation(_))
        ));
        assert!(matches!(
            registry
                .update_share("missing", &ShareUpdate::new().requires_auth(true))
                .await,
            Err(LuminaError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_corrupt_password_hash_is_internal() {
        let db = setup().await;
        let registry = ShareRegistry::new(&db);
        let share = registry.create_share(&NewShare::file(1, 1)).await.unwrap();
        sqlx::query("UPDATE shares SET password_hash = 'not-a-hash' WHERE id = ?")
            .bind(&share.id)
            .execute(db.pool())
            .await
            .unwrap();

        let err = registry
            .validate_access(&share.id, Some("pw"), None)
            .await
            .unwrap_err();
        assert!(err.is_internal());
    }

    #[tokio::test]
    async fn test_delete_expired_shares() {
        let db = setup().await;
        let registry = ShareRegistry::new(&db);
        let old = registry.create_share(&NewShare::file(1, 1)).await.unwrap();
        let live = registry.create_share(&NewShare::file(2, 1)).await.unwrap();
        registry.grant_share_permission(&old.id, 5).await.unwrap();
        expire(&db, &old.id).await;

        assert_eq!(registry.delete_expired_shares().await.unwrap(), 1);
        assert!(matches!(
            registry.get_share(&old.id).await,
            Err(LuminaError::NotFound(_))
        ));
        assert!(registry.list_share_permissions(&old.id).await.unwrap().is_empty());
        registry.get_share(&live.id).await.unwrap();
        assert_eq!(registry.delete_expired_shares().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_listings() {
        let db = setup().await;
        let registry = ShareRegistry::new(&db);
        registry.create_share(&NewShare::file(1, 1)).await.unwrap();
        registry.create_share(&NewShare::album(1, 1)).await.unwrap();
        registry.create_share(&NewShare::file(1, 2)).await.unwrap();

        assert_eq!(registry.list_shares_by_owner(1).await.unwrap().len(), 2);
        assert_eq!(
            registry
                .list_shares_for_resource(ShareType::File, 1)
                .await
                .unwrap()
                .len(),
            2
        );
        assert!(matches!(
            registry.delete_share("missing").await,
            Err(LuminaError::NotFound(_))
        ));
    }
}
