//! Permission groups for Lumina.
//!
//! A permission group is a named set of folders plus a set of users, each
//! holding `read` or `write` on the whole set. A user sees a file when any
//! folder containing it belongs to a group they hold a grant on.

mod repository;
mod service;
mod types;

pub use repository::GroupRepository;
pub use service::PermissionGroupRegistry;
pub use types::{GroupMember, GroupUpdate, NewGroup, PermissionGroup, PermissionLevel};

/// Maximum length for a group name (in characters).
pub const MAX_GROUP_NAME_LENGTH: usize = 100;

/// Maximum length for a group description (in characters).
pub const MAX_DESCRIPTION_LENGTH: usize = 500;
