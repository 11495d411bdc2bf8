//! Remote vision model abstraction

use async_trait::async_trait;

use crate::types::ClassificationRequest;

/// Failure reported by a remote model call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// The provider is throttling requests
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// The provider rejected the requested model identifier
    #[error("model '{model}' is not supported: {message}")]
    UnsupportedModel { model: String, message: String },

    /// Anything else (auth, network, malformed request, server fault)
    #[error("{0}")]
    Other(String),
}

impl RemoteError {
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Short label for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RateLimited(_) => "rate_limited",
            Self::UnsupportedModel { .. } => "unsupported_model",
            Self::Other(_) => "other",
        }
    }
}

/// A multimodal model that answers an image plus prompt with free text
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Run one generation against `model` and return the raw reply text
    async fn generate(
        &self,
        model: &str,
        request: &ClassificationRequest,
    ) -> std::result::Result<String, RemoteError>;

    /// Provider name for logging
    fn name(&self) -> &str;
}
