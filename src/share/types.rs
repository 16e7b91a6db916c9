//! Share link types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::datetime;
use crate::{LuminaError, Result};

/// What a share points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ShareType {
    /// A single file.
    File,
    /// An album.
    Album,
}

impl ShareType {
    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ShareType::File => "file",
            ShareType::Album => "album",
        }
    }
}

impl fmt::Display for ShareType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShareType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "file" => Ok(ShareType::File),
            "album" => Ok(ShareType::Album),
            _ => Err(format!("unknown share type: {s}")),
        }
    }
}

/// Who may open a share.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessType {
    /// Anyone holding the link.
    #[default]
    Public,
    /// Only the owner and allow-listed users.
    Private,
}

impl AccessType {
    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessType::Public => "public",
            AccessType::Private => "private",
        }
    }
}

impl fmt::Display for AccessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "public" => Ok(AccessType::Public),
            "private" => Ok(AccessType::Private),
            _ => Err(format!("unknown access type: {s}")),
        }
    }
}

/// A share link.
#[derive(Debug, Clone, Serialize)]
pub struct Share {
    /// Random opaque ID; the only lookup key.
    pub id: String,
    /// Kind of shared resource.
    pub share_type: ShareType,
    /// Shared file or album ID.
    pub resource_id: i64,
    /// Creating user.
    pub owner_id: i64,
    /// Public or allow-list only.
    pub access_type: AccessType,
    /// Argon2 hash of the share password, if any.
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    /// Whether viewers must be signed in.
    pub requires_auth: bool,
    /// Expiry time, if any.
    pub expires_at: Option<DateTime<Utc>>,
    /// View quota, if any.
    pub max_views: Option<i64>,
    /// Number of logged views.
    pub view_count: i64,
    /// Whether the share is switched on.
    pub enabled: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl Share {
    /// Whether a password gate is set.
    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }

    /// Whether the share has expired at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }

    /// Whether the view quota is used up.
    pub fn quota_reached(&self) -> bool {
        self.max_views.is_some_and(|max| self.view_count >= max)
    }

    /// Views left before the quota is reached, if a quota is set.
    pub fn remaining_views(&self) -> Option<i64> {
        self.max_views.map(|max| (max - self.view_count).max(0))
    }
}

/// Raw `shares` row.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ShareRow {
    pub id: String,
    pub share_type: String,
    pub resource_id: i64,
    pub owner_id: i64,
    pub access_type: String,
    pub password_hash: Option<String>,
    pub requires_auth: bool,
    pub expires_at: Option<String>,
    pub max_views: Option<i64>,
    pub view_count: i64,
    pub enabled: bool,
    pub created_at: String,
}

impl TryFrom<ShareRow> for Share {
    type Error = LuminaError;

    fn try_from(row: ShareRow) -> Result<Self> {
        Ok(Share {
            share_type: row.share_type.parse().map_err(LuminaError::Internal)?,
            access_type: row.access_type.parse().map_err(LuminaError::Internal)?,
            expires_at: row.expires_at.as_deref().map(datetime::from_db).transpose()?,
            created_at: datetime::from_db(&row.created_at)?,
            id: row.id,
            resource_id: row.resource_id,
            owner_id: row.owner_id,
            password_hash: row.password_hash,
            requires_auth: row.requires_auth,
            max_views: row.max_views,
            view_count: row.view_count,
            enabled: row.enabled,
        })
    }
}

/// Data for creating a new share.
#[derive(Debug, Clone)]
pub struct NewShare {
    /// Kind of shared resource.
    pub share_type: ShareType,
    /// Shared file or album ID.
    pub resource_id: i64,
    /// Creating user.
    pub owner_id: i64,
    /// Public or allow-list only.
    pub access_type: AccessType,
    /// Plaintext password; empty means no password gate.
    pub password: String,
    /// Whether viewers must be signed in.
    pub requires_auth: bool,
    /// Expiry time.
    pub expires_at: Option<DateTime<Utc>>,
    /// View quota.
    pub max_views: Option<i64>,
}

impl NewShare {
    /// Create a public, unrestricted share definition.
    pub fn new(share_type: ShareType, resource_id: i64, owner_id: i64) -> Self {
        Self {
            share_type,
            resource_id,
            owner_id,
            access_type: AccessType::Public,
            password: String::new(),
            requires_auth: false,
            expires_at: None,
            max_views: None,
        }
    }

    /// Share a single file.
    pub fn file(file_id: i64, owner_id: i64) -> Self {
        Self::new(ShareType::File, file_id, owner_id)
    }

    /// Share an album.
    pub fn album(album_id: i64, owner_id: i64) -> Self {
        Self::new(ShareType::Album, album_id, owner_id)
    }

    /// Restrict to the owner and allow-listed users.
    pub fn private(mut self) -> Self {
        self.access_type = AccessType::Private;
        self
    }

    /// Set a password gate.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    /// Require a signed-in viewer.
    pub fn requiring_auth(mut self) -> Self {
        self.requires_auth = true;
        self
    }

    /// Set the expiry time.
    pub fn expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Set the view quota.
    pub fn with_max_views(mut self, max_views: i64) -> Self {
        self.max_views = Some(max_views);
        self
    }
}

/// Builder for changing a share's gates.
#[derive(Debug, Clone, Default)]
pub struct ShareUpdate {
    /// New password (`Some("")` clears the gate).
    pub password: Option<String>,
    /// New auth requirement.
    pub requires_auth: Option<bool>,
    /// New quota (`Some(None)` removes it).
    pub max_views: Option<Option<i64>>,
    /// New access type.
    pub access_type: Option<AccessType>,
}

impl ShareUpdate {
    /// Create an empty update.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or clear (with an empty string) the password.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set the auth requirement.
    pub fn requires_auth(mut self, requires_auth: bool) -> Self {
        self.requires_auth = Some(requires_auth);
        self
    }

    /// Set or remove the view quota.
    pub fn max_views(mut self, max_views: Option<i64>) -> Self {
        self.max_views = Some(max_views);
        self
    }

    /// Set the access type.
    pub fn access_type(mut self, access_type: AccessType) -> Self {
        self.access_type = Some(access_type);
        self
    }

    /// Check if any fields are set.
    pub fn is_empty(&self) -> bool {
        self.password.is_none()
            && self.requires_auth.is_none()
            && self.max_views.is_none()
            && self.access_type.is_none()
    }
}

/// One successful share access.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct ShareAccessLog {
    /// Log entry ID.
    pub id: i64,
    /// Accessed share.
    pub share_id: String,
    /// Signed-in viewer, if any.
    pub accessed_by: Option<i64>,
    /// Viewer IP address.
    pub ip_address: String,
    /// Viewer user agent.
    pub user_agent: String,
    /// Access time.
    pub accessed_at: String,
}

/// Outcome of recording a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoggedAccess {
    /// View count after this view.
    pub view_count: i64,
    /// Whether the access log row was written.
    pub log_written: bool,
}
