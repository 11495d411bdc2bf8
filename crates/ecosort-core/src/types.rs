//! Core types for EcoSort

use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::prompt::ClassificationPrompt;

/// MIME type assumed when the uploader does not name an image type
pub const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

/// An uploaded image, held only for the duration of one request
#[derive(Debug, Clone)]
pub struct ImagePayload {
    bytes: Bytes,
    mime_type: String,
}

impl ImagePayload {
    /// Create a payload, falling back to [`DEFAULT_IMAGE_MIME`] unless `mime_type` is an `image/*` type
    pub fn new(bytes: impl Into<Bytes>, mime_type: Option<&str>) -> Self {
        let mime_type = mime_type
            .map(|m| m.split(';').next().unwrap_or(m).trim().to_ascii_lowercase())
            .filter(|m| m.starts_with("image/") && m.len() > "image/".len())
            .unwrap_or_else(|| DEFAULT_IMAGE_MIME.to_string());

        Self {
            bytes: bytes.into(),
            mime_type,
        }
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Standard-alphabet base64 of the image bytes
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }
}

/// Canonical classification outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    Biodegradable,
    NonBiodegradable,
    Hazardous,
    /// Sentinel for replies that could not be classified
    Unknown,
}

impl Label {
    /// The three labels the model is asked to choose from
    pub const CANONICAL: [Label; 3] = [Label::Biodegradable, Label::NonBiodegradable, Label::Hazardous];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Biodegradable => "biodegradable",
            Self::NonBiodegradable => "non_biodegradable",
            Self::Hazardous => "hazardous",
            Self::Unknown => "unknown",
        }
    }

    /// Parse a label as spelled by a model.
    ///
    /// Matching ignores case and surrounding whitespace, and treats `-` and
    /// inner spaces as `_`, so `"Non-Biodegradable"` and `"non biodegradable"`
    /// both map to [`Label::NonBiodegradable`].
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized: String = raw
            .trim()
            .to_ascii_lowercase()
            .chars()
            .map(|c| if c == '-' || c.is_whitespace() { '_' } else { c })
            .collect();

        match normalized.as_str() {
            "biodegradable" => Some(Self::Biodegradable),
            "non_biodegradable" | "nonbiodegradable" | "not_biodegradable" => {
                Some(Self::NonBiodegradable)
            }
            "hazardous" => Some(Self::Hazardous),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized verdict returned to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub label: Label,

    /// Confidence score (0.0-1.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,

    /// Short rationale
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl ClassificationResult {
    pub fn new(label: Label) -> Self {
        Self {
            label,
            confidence: None,
            notes: None,
        }
    }

    /// Explicit "could not classify" result
    pub fn unknown(notes: impl Into<String>) -> Self {
        Self {
            label: Label::Unknown,
            confidence: None,
            notes: Some(notes.into()),
        }
    }

    /// Attach a confidence, clamped into [0.0, 1.0]. Non-finite values are dropped.
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence.is_finite().then(|| confidence.clamp(0.0, 1.0));
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// One multimodal call: an encoded image plus the instruction prompt
#[derive(Debug, Clone)]
pub struct ClassificationRequest {
    pub mime_type: String,
    pub image_base64: String,
    pub prompt: String,
}

impl ClassificationRequest {
    pub fn new(image: &ImagePayload, prompt: &ClassificationPrompt) -> Self {
        Self {
            mime_type: image.mime_type().to_string(),
            image_base64: image.to_base64(),
            prompt: prompt.text().to_string(),
        }
    }
}
