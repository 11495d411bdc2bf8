//! Classification pipeline
//!
//! Encodes the image, calls the remote model under a [`RetryPolicy`], and
//! normalizes the reply. The active model identifier is local to each call, so
//! a fallback substitution never leaks into concurrent requests.

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::extract::{extract, Extraction};
use crate::model::VisionModel;
use crate::prompt::ClassificationPrompt;
use crate::retry::{NoRetry, RetryDecision, RetryPolicy};
use crate::types::{ClassificationRequest, ClassificationResult, ImagePayload};

/// Image classifier backed by a remote vision model
#[derive(Clone)]
pub struct Classifier {
    model: Arc<dyn VisionModel>,
    model_id: String,
    prompt: ClassificationPrompt,
    retry: Arc<dyn RetryPolicy>,
}

impl Classifier {
    /// Create a classifier with the default prompt and no retries
    pub fn new(model: Arc<dyn VisionModel>, model_id: impl Into<String>) -> Self {
        Self {
            model,
            model_id: model_id.into(),
            prompt: ClassificationPrompt::default(),
            retry: Arc::new(NoRetry),
        }
    }

    pub fn with_prompt(mut self, prompt: ClassificationPrompt) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn with_retry_policy(mut self, retry: Arc<dyn RetryPolicy>) -> Self {
        self.retry = retry;
        self
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn prompt(&self) -> &ClassificationPrompt {
        &self.prompt
    }

    /// Classify one image.
    ///
    /// Unparseable replies produce an `unknown` result, not an error. Errors are
    /// limited to an empty payload and a failed remote call.
    pub async fn classify(&self, image: ImagePayload) -> Result<ClassificationResult> {
        if image.is_empty() {
            return Err(Error::EmptyPayload);
        }

        debug!(bytes = image.len(), mime = image.mime_type(), "Encoding image for remote model");
        let request = ClassificationRequest::new(&image, &self.prompt);
        drop(image);

        let reply = self.generate_with_retry(&request).await?;

        let extraction = extract(&reply);
        match &extraction {
            Extraction::Parsed(result) => {
                debug!(label = %result.label, "Parsed model reply");
            }
            Extraction::Fallback(reason) => {
                let preview: String = reply.chars().take(200).collect();
                warn!(%reason, reply = %preview, "Model reply not usable, returning unknown");
            }
        }

        let result = extraction.into_result();
        metrics::counter!("ecosort_results_total", "label" => result.label.as_str()).increment(1);
        Ok(result)
    }

    async fn generate_with_retry(&self, request: &ClassificationRequest) -> Result<String> {
        let mut model = self.model_id.clone();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let start = Instant::now();
            let outcome = self.model.generate(&model, request).await;
            metrics::histogram!("ecosort_remote_latency_ms")
                .record(start.elapsed().as_secs_f64() * 1000.0);

            let error = match outcome {
                Ok(reply) => {
                    metrics::counter!("ecosort_remote_attempts_total", "outcome" => "ok")
                        .increment(1);
                    info!(
                        attempt,
                        model = %model,
                        provider = self.model.name(),
                        latency_ms = start.elapsed().as_millis() as u64,
                        "Remote model replied"
                    );
                    return Ok(reply);
                }
                Err(error) => error,
            };

            metrics::counter!("ecosort_remote_attempts_total", "outcome" => error.kind())
                .increment(1);

            match self.retry.decide(attempt, &error, &model) {
                RetryDecision::GiveUp => {
                    warn!(attempt, model = %model, %error, policy = self.retry.name(), "Remote model call failed");
                    return Err(Error::remote(attempt, error));
                }
                RetryDecision::RetryAfter(delay) => {
                    warn!(attempt, model = %model, %error, ?delay, "Remote model throttled, backing off");
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::SwitchModel(next) => {
                    warn!(attempt, from = %model, to = %next, %error, "Model rejected, switching to fallback");
                    model = next;
                }
            }
        }
    }
}
