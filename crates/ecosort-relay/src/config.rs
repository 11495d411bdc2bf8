//! Relay configuration

use ecosort_core::retry::{DEFAULT_BACKOFF, DEFAULT_FALLBACK_MODEL, DEFAULT_MAX_ATTEMPTS};
use ecosort_core::{BackoffRetry, NoRetry, PromptTemplate, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use url::Url;

use crate::cli::Cli;
use crate::endpoint::validate_endpoint;
use crate::upload::UploadMode;

/// Relay configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Gemini model identifier
    #[serde(default = "default_model")]
    pub model: String,

    /// Base URL of the Gemini REST API
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Permit http:// and local endpoints
    #[serde(default)]
    pub allow_insecure_endpoint: bool,

    /// Timeout for a single remote call
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Prompt wording
    #[serde(default)]
    pub prompt: PromptTemplate,

    #[serde(default)]
    pub upload: UploadConfig,

    #[serde(default)]
    pub retry: RetryConfig,
}

impl RelayConfig {
    /// Load configuration from file and CLI overrides
    pub fn load(config_path: &str, cli: &Cli) -> anyhow::Result<Self> {
        // Try to load from file, or use defaults
        let mut config = if Path::new(config_path).exists() {
            info!("Reading configuration from {}", config_path);
            let content = std::fs::read_to_string(config_path)?;
            serde_yaml::from_str(&content)?
        } else {
            Self::default()
        };

        // Apply CLI overrides
        if let Some(model) = &cli.model {
            config.model = model.clone();
        }

        if cli.allow_insecure_endpoint {
            config.allow_insecure_endpoint = true;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> ecosort_core::Result<()> {
        if self.model.trim().is_empty() {
            return Err(ecosort_core::Error::config("model must not be empty"));
        }
        if self.upload.max_upload_bytes == 0 {
            return Err(ecosort_core::Error::config("upload.max_upload_bytes must be > 0"));
        }
        if self.retry.max_attempts == 0 {
            return Err(ecosort_core::Error::config("retry.max_attempts must be >= 1"));
        }
        self.endpoint()?;
        Ok(())
    }

    /// Validated API base URL
    pub fn endpoint(&self) -> ecosort_core::Result<Url> {
        validate_endpoint(&self.api_base_url, self.allow_insecure_endpoint)
            .map_err(|e| ecosort_core::Error::config(format!("api_base_url: {}", e)))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_base_url: default_api_base_url(),
            allow_insecure_endpoint: false,
            request_timeout_secs: default_request_timeout(),
            prompt: PromptTemplate::default(),
            upload: UploadConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

/// Upload handling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    #[serde(default)]
    pub mode: UploadMode,

    /// Largest accepted request body
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            mode: UploadMode::default(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

/// Retry configuration for remote model calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Total attempts per request, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Wait after a rate-limit response
    #[serde(default = "default_backoff_secs")]
    pub backoff_secs: u64,

    /// Model substituted when the configured one is unsupported (null disables)
    #[serde(default = "default_fallback_model")]
    pub fallback_model: Option<String>,
}

impl RetryConfig {
    /// Build the retry strategy this configuration describes
    pub fn policy(&self) -> Arc<dyn RetryPolicy> {
        if !self.enabled {
            return Arc::new(NoRetry);
        }

        let mut policy = BackoffRetry::new(self.max_attempts, Duration::from_secs(self.backoff_secs));
        if let Some(fallback) = &self.fallback_model {
            policy = policy.with_fallback_model(fallback.clone());
        }
        Arc::new(policy)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: default_max_attempts(),
            backoff_secs: default_backoff_secs(),
            fallback_model: default_fallback_model(),
        }
    }
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_api_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_request_timeout() -> u64 {
    60
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_backoff_secs() -> u64 {
    DEFAULT_BACKOFF.as_secs()
}

fn default_fallback_model() -> Option<String> {
    Some(DEFAULT_FALLBACK_MODEL.to_string())
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use ecosort_core::RetryDecision;
    use ecosort_core::RemoteError;
    use std::io::Write;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["ecosort-relay", "--port", "3000"];
        argv.extend_from_slice(args);
        Cli::parse_from(argv)
    }

    #[test]
    fn test_defaults_when_file_missing() {
        let config = RelayConfig::load("/nonexistent/ecosort.yaml", &cli(&["--model", "gemini-2.5-flash"])).unwrap();
        assert_eq!(config.model, "gemini-2.5-flash");
        assert_eq!(config.upload.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.upload.mode, UploadMode::Auto);
        assert_eq!(config.prompt, PromptTemplate::Detailed);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.backoff_secs, 5);
    }

    #[test]
    fn test_yaml_file_with_cli_override() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "model: gemini-2.0-flash\nprompt: compact\nupload:\n  mode: raw\nretry:\n  max_attempts: 5\n  fallback_model: null"
        )
        .unwrap();
        let path = file.path().to_str().unwrap();

        let config = RelayConfig::load(path, &cli(&["--model", "gemini-2.5-pro"])).unwrap();
        assert_eq!(config.model, "gemini-2.5-pro");
        assert_eq!(config.prompt, PromptTemplate::Compact);
        assert_eq!(config.upload.mode, UploadMode::Raw);
        assert_eq!(config.upload.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.fallback_model, None);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = RelayConfig::default();
        config.retry.max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = RelayConfig::default();
        config.api_base_url = "http://127.0.0.1:9999".to_string();
        assert!(config.validate().is_err());
        config.allow_insecure_endpoint = true;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_disabled_retry_builds_no_retry() {
        let config = RetryConfig {
            enabled: false,
            ..Default::default()
        };
        let policy = config.policy();
        assert_eq!(policy.name(), "none");
        assert_eq!(
            policy.decide(1, &RemoteError::RateLimited("x".into()), "m"),
            RetryDecision::GiveUp
        );

        let policy = RetryConfig::default().policy();
        assert_eq!(policy.name(), "backoff");
    }
}
