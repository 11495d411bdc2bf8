//! Error types for EcoSort

use crate::model::RemoteError;

/// Result type alias using EcoSort's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for EcoSort operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The uploaded image carried no bytes
    #[error("no image data")]
    EmptyPayload,

    /// The remote model failed with a non-retryable error or exhausted its retries
    #[error("remote model call failed after {attempts} attempt(s): {source}")]
    RemoteCallFailed {
        attempts: u32,
        #[source]
        source: RemoteError,
    },

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a new remote call failure
    pub fn remote(attempts: u32, source: RemoteError) -> Self {
        Self::RemoteCallFailed { attempts, source }
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether the caller is at fault (maps to a 4xx response)
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::EmptyPayload)
    }
}
