//! Retry strategies for remote model calls

use std::time::Duration;

use crate::model::RemoteError;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(5);
pub const DEFAULT_FALLBACK_MODEL: &str = "gemini-1.5-flash";

/// What to do after a failed attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Surface the failure to the caller
    GiveUp,
    /// Wait, then retry with the same model
    RetryAfter(Duration),
    /// Retry immediately against a different model
    SwitchModel(String),
}

/// Decides whether a failed remote call is retried
pub trait RetryPolicy: Send + Sync {
    /// `attempt` is the number of attempts made so far, starting at 1
    fn decide(&self, attempt: u32, error: &RemoteError, current_model: &str) -> RetryDecision;

    /// Policy name for logging
    fn name(&self) -> &str;
}

/// Every failure is final
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRetry;

impl RetryPolicy for NoRetry {
    fn decide(&self, _attempt: u32, _error: &RemoteError, _current_model: &str) -> RetryDecision {
        RetryDecision::GiveUp
    }

    fn name(&self) -> &str {
        "none"
    }
}

/// Fixed backoff on rate limits and one-way substitution of a fallback model
#[derive(Debug, Clone)]
pub struct BackoffRetry {
    max_attempts: u32,
    backoff: Duration,
    fallback_model: Option<String>,
}

impl BackoffRetry {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
            fallback_model: None,
        }
    }

    /// Model to switch to when the current one is rejected as unsupported
    pub fn with_fallback_model(mut self, model: impl Into<String>) -> Self {
        self.fallback_model = Some(model.into());
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff(&self) -> Duration {
        self.backoff
    }
}

impl Default for BackoffRetry {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_BACKOFF).with_fallback_model(DEFAULT_FALLBACK_MODEL)
    }
}

impl RetryPolicy for BackoffRetry {
    fn decide(&self, attempt: u32, error: &RemoteError, current_model: &str) -> RetryDecision {
        if attempt >= self.max_attempts {
            return RetryDecision::GiveUp;
        }

        match error {
            RemoteError::RateLimited(_) => RetryDecision::RetryAfter(self.backoff),
            RemoteError::UnsupportedModel { .. } => match &self.fallback_model {
                Some(fallback) if fallback != current_model => {
                    RetryDecision::SwitchModel(fallback.clone())
                }
                _ => RetryDecision::GiveUp,
            },
            RemoteError::Other(_) => RetryDecision::GiveUp,
        }
    }

    fn name(&self) -> &str {
        "backoff"
    }
}
