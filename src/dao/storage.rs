use std::error::Error;
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by match-store backends regardless of the underlying
/// database.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend could not serve the operation.
    #[error("storage unavailable: {message}")]
    Unavailable {
        /// Human-readable context for the failure.
        message: String,
        /// Backend-specific cause.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The game code is already held by a live record; callers draw a new
    /// code and retry.
    #[error("game code `{code}` already in use")]
    CodeConflict {
        /// The colliding code.
        code: String,
    },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }

    /// Construct a code-collision error.
    pub fn code_conflict(code: impl Into<String>) -> Self {
        StorageError::CodeConflict { code: code.into() }
    }
}
