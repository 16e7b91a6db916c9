//! Error types for Lumina.

use thiserror::Error;

/// Reason a share could not be opened.
///
/// These are expected, user-facing outcomes. They are listed in the order the
/// share gates are evaluated.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessError {
    /// No share with the given ID exists.
    #[error("share not found")]
    NotFound,

    /// The share has been switched off by its owner.
    #[error("share is disabled")]
    Disabled,

    /// The share's expiry time has passed.
    #[error("share has expired")]
    Expired,

    /// The share's view quota has been used up.
    #[error("share view limit reached")]
    QuotaExceeded,

    /// The share requires a signed-in caller.
    #[error("authentication required")]
    AuthRequired,

    /// The supplied password is missing or wrong.
    #[error("invalid password")]
    InvalidPassword,

    /// The caller is not on the share's allow-list.
    #[error("access forbidden")]
    Forbidden,
}

/// Common error type for Lumina.
#[derive(Error, Debug)]
pub enum LuminaError {
    /// Access to a share or shared resource was denied.
    #[error("access denied: {0}")]
    Access(#[from] AccessError),

    /// Validation error for caller input (including malformed tokens).
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// A uniqueness constraint was hit.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Database error.
    ///
    /// Errors from sqlx are automatically converted.
    #[error("database error: {0}")]
    Database(String),

    /// Database connection error.
    #[error("database connection error: {0}")]
    DatabaseConnection(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Unexpected server-side failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl LuminaError {
    /// The share denial carried by this error, if any.
    pub fn access_error(&self) -> Option<AccessError> {
        match self {
            LuminaError::Access(kind) => Some(*kind),
            _ => None,
        }
    }

    /// Whether this error is a server fault whose details must not reach the caller.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            LuminaError::Database(_)
                | LuminaError::DatabaseConnection(_)
                | LuminaError::Io(_)
                | LuminaError::Config(_)
                | LuminaError::Internal(_)
        )
    }
}

impl From<sqlx::Error> for LuminaError {
    fn from(e: sqlx::Error) -> Self {
        LuminaError::Database(e.to_string())
    }
}

/// Result type alias for Lumina operations.
pub type Result<T> = std::result::Result<T, LuminaError>;
