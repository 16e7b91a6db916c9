//! Share links for Lumina.
//!
//! A share exposes one file or album through a random link ID, optionally
//! gated by a password, a sign-in requirement, an expiry time, a view quota
//! and a private allow-list. Opening a share yields an [`AccessToken`] that a
//! resource server can check without repeating the interactive gates.

mod reaper;
mod repository;
mod service;
pub mod token;
mod types;

pub use reaper::{ShareReaper, DEFAULT_REAP_INTERVAL_SECS};
pub use repository::ShareRepository;
pub use service::{ShareRegistry, DEFAULT_LOG_LIMIT};
pub use token::AccessToken;
pub use types::{
    AccessType, LoggedAccess, NewShare, Share, ShareAccessLog, ShareType, ShareUpdate,
};
