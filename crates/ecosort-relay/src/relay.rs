//! Application state shared by the HTTP handlers

use anyhow::Result;
use ecosort_core::{ClassificationPrompt, Classifier, VisionModel};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tracing::info;

use crate::config::RelayConfig;
use crate::gemini::GeminiClient;

/// Application state shared across all requests
#[derive(Clone)]
pub struct AppState {
    /// Loaded configuration
    pub config: Arc<RelayConfig>,

    /// Classification pipeline (read-only, safe to share)
    pub classifier: Classifier,

    /// Prometheus metrics handle for rendering
    pub metrics_handle: Option<PrometheusHandle>,
}

impl AppState {
    /// Build state backed by the Gemini API
    pub fn new(config: RelayConfig, api_key: &str, metrics_handle: PrometheusHandle) -> Result<Self> {
        info!("Initializing application state");

        let endpoint = config.endpoint()?;
        let client = GeminiClient::new(endpoint, api_key, config.request_timeout())?;

        Ok(Self::with_model(config, Arc::new(client)).with_metrics(metrics_handle))
    }

    /// Build state around any vision model implementation
    pub fn with_model(config: RelayConfig, model: Arc<dyn VisionModel>) -> Self {
        let prompt = ClassificationPrompt::new(config.prompt);
        let retry = config.retry.policy();

        info!(
            "Classifier: provider={}, model={}, prompt={:?}, retry={}",
            model.name(),
            config.model,
            prompt.template(),
            retry.name()
        );

        let classifier = Classifier::new(model, config.model.clone())
            .with_prompt(prompt)
            .with_retry_policy(retry);

        Self {
            config: Arc::new(config),
            classifier,
            metrics_handle: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }
}

/// Generate a unique request ID
pub fn generate_request_id() -> String {
    format!("req_{}", uuid::Uuid::new_v4().simple())
}
