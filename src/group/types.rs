//! Permission group types.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::LuminaError;

/// Access level a user holds on a permission group.
///
/// Levels are ordered: `Write` implies `Read`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    /// View files in the group's folders.
    Read,
    /// View and modify files in the group's folders.
    Write,
}

impl PermissionLevel {
    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionLevel::Read => "read",
            PermissionLevel::Write => "write",
        }
    }

    /// Whether holding `self` satisfies a check for `required`.
    pub fn satisfies(&self, required: PermissionLevel) -> bool {
        *self >= required
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(PermissionLevel::Read),
            "write" => Ok(PermissionLevel::Write),
            _ => Err(format!("unknown permission level: {s}")),
        }
    }
}

impl TryFrom<String> for PermissionLevel {
    type Error = LuminaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse().map_err(LuminaError::Internal)
    }
}

/// A named set of folders with per-user grants.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct PermissionGroup {
    /// Unique group ID.
    pub id: i64,
    /// Group name (unique).
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// User who created the group.
    pub created_by: i64,
    /// Creation timestamp.
    pub created_at: String,
    /// Last modification timestamp.
    pub updated_at: String,
}

/// Data for creating a new group.
#[derive(Debug, Clone)]
pub struct NewGroup {
    /// Group name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Creating user; receives `write` on the group.
    pub created_by: i64,
}

impl NewGroup {
    /// Create a new group definition.
    pub fn new(name: impl Into<String>, created_by: i64) -> Self {
        Self {
            name: name.into(),
            description: None,
            created_by,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Builder for updating a group.
#[derive(Debug, Clone, Default)]
pub struct GroupUpdate {
    /// New name.
    pub name: Option<String>,
    /// New description (`Some(None)` clears it).
    pub description: Option<Option<String>>,
}

impl GroupUpdate {
    /// Create an empty update.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set or clear the description.
    pub fn description(mut self, description: Option<impl Into<String>>) -> Self {
        self.description = Some(description.map(|s| s.into()));
        self
    }

    /// Check if any fields are set.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none()
    }
}

/// A user's grant on a group.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, Serialize)]
pub struct GroupMember {
    /// User ID.
    pub user_id: i64,
    /// Granted level.
    #[sqlx(try_from = "String")]
    pub permission: PermissionLevel,
}
