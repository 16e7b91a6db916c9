//! Caller identity for Lumina.
//!
//! Authentication happens outside this crate. Request handlers hand the
//! access checks an [`IdentityContext`] that yields the already-authenticated
//! caller, or nothing for anonymous requests.

use std::fmt;
use std::str::FromStr;

/// Server-wide role of an authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Role {
    /// Regular user; sees folders only through permission groups.
    #[default]
    User = 0,
    /// Administrator.
    Admin = 1,
    /// Owner of the server installation.
    ServerOwner = 2,
}

impl Role {
    /// Convert role to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
            Role::ServerOwner => "server_owner",
        }
    }

    /// Whether this role skips permission-group checks entirely.
    ///
    /// This is the only place the privileged roles are enumerated.
    pub fn bypasses_groups(&self) -> bool {
        matches!(self, Role::Admin | Role::ServerOwner)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            "server_owner" => Ok(Role::ServerOwner),
            _ => Err(format!("unknown role: {s}")),
        }
    }
}

/// The authenticated caller of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    /// User ID.
    pub user_id: i64,
    /// Server-wide role.
    pub role: Role,
}

impl Caller {
    /// Create a caller.
    pub fn new(user_id: i64, role: Role) -> Self {
        Self { user_id, role }
    }

    /// Create a regular user caller.
    pub fn user(user_id: i64) -> Self {
        Self::new(user_id, Role::User)
    }

    /// Whether this caller skips permission-group checks.
    pub fn is_privileged(&self) -> bool {
        self.role.bypasses_groups()
    }
}

/// Source of the current request's caller.
pub trait IdentityContext: Send + Sync {
    /// The authenticated caller, or `None` for anonymous requests.
    fn caller(&self) -> Option<Caller>;
}

impl IdentityContext for Caller {
    fn caller(&self) -> Option<Caller> {
        Some(*self)
    }
}

impl IdentityContext for Option<Caller> {
    fn caller(&self) -> Option<Caller> {
        *self
    }
}

/// The user ID of an optional caller.
pub fn caller_id(identity: &dyn IdentityContext) -> Option<i64> {
    identity.caller().map(|c| c.user_id)
}
