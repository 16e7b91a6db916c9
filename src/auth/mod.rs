//! Caller identity and secret hashing for Lumina.

pub mod identity;
mod password;

pub use identity::{caller_id, Caller, IdentityContext, Role};
pub use password::{hash_password, validate_password, verify_password, PasswordError};
