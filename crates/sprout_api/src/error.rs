//! API error types.

use sprout_core::SettingsError;
use sprout_engine::EngineError;
use sprout_store::StoreError;
use thiserror::Error;

/// Errors an API operation can fail with before it is flattened into an
/// envelope.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Caller lacks the role the operation requires. Deliberately generic:
    /// the message never says which check failed.
    #[error("permission denied")]
    Unauthorized,

    /// No user row for the given identifier.
    #[error("user not found: {0}")]
    UnknownUser(String),

    /// A request field failed validation.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An engine operation failed.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// A store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A settings patch or parse failed.
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// Result type for API operations before envelope flattening.
pub type ApiResult<T> = Result<T, ApiError>;
