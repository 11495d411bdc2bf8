//! EcoSort Core
//!
//! Domain logic for the EcoSort relay, kept apart from the HTTP layer.
//!
//! This crate provides:
//! - Image payload, label and result types
//! - The classification prompt templates
//! - Two-stage extraction of a verdict from free-text model replies
//! - Pluggable retry strategies for remote model calls
//! - The [`Classifier`] pipeline tying these together

pub mod classifier;
pub mod error;
pub mod extract;
pub mod model;
pub mod prompt;
pub mod retry;
pub mod types;

pub use classifier::Classifier;
pub use error::{Error, Result};
pub use extract::{extract, Extraction, FallbackReason};
pub use model::{RemoteError, VisionModel};
pub use prompt::{ClassificationPrompt, PromptTemplate};
pub use retry::{BackoffRetry, NoRetry, RetryDecision, RetryPolicy};
pub use types::{ClassificationRequest, ClassificationResult, ImagePayload, Label};
