//! Lumina - access control core for a self-hosted media library.
//!
//! Decides who may see a file: signed-in users through permission groups
//! that map folders to read/write grants, and everyone else through share
//! links with password, sign-in, expiry, view-quota and allow-list gates.

pub mod access;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod datetime;
pub mod db;
pub mod error;
pub mod group;
pub mod logging;
pub mod share;

pub use access::{Authorizer, OpenedShare};
pub use auth::{Caller, IdentityContext, Role};
pub use catalog::{FolderCatalog, SqliteFolderCatalog};
pub use config::Config;
pub use db::Database;
pub use error::{AccessError, LuminaError, Result};
pub use group::{PermissionGroup, PermissionGroupRegistry, PermissionLevel};
pub use share::{AccessToken, NewShare, Share, ShareReaper, ShareRegistry};
