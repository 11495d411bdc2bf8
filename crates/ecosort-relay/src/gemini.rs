//! Gemini `generateContent` client

use async_trait::async_trait;
use ecosort_core::{ClassificationRequest, RemoteError, VisionModel};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

// --- generateContent serde structs ---

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData<'a>,
    },
    Text {
        text: &'a str,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

/// Client for the Gemini REST API
pub struct GeminiClient {
    client: Client,
    base_url: Url,
    api_key: String,
}

impl GeminiClient {
    /// Create a new client against an already validated base URL
    pub fn new(base_url: Url, api_key: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        info!("Gemini client configured: endpoint={}", base_url);

        Ok(Self {
            client,
            base_url,
            api_key: api_key.into(),
        })
    }

    fn generate_url(&self, model: &str) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.as_str().trim_end_matches('/'),
            model
        )
    }
}

#[async_trait]
impl VisionModel for GeminiClient {
    async fn generate(
        &self,
        model: &str,
        request: &ClassificationRequest,
    ) -> Result<String, RemoteError> {
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: &request.mime_type,
                            data: &request.image_base64,
                        },
                    },
                    Part::Text {
                        text: &request.prompt,
                    },
                ],
            }],
        };

        debug!(model, bytes = request.image_base64.len(), "Sending generateContent request");

        let response = self
            .client
            .post(self.generate_url(model))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| RemoteError::other(format!("request to Gemini failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| RemoteError::other(format!("failed to read Gemini response: {}", e)))?;

        if !status.is_success() {
            return Err(classify_failure(model, status, &text));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&text)
            .map_err(|e| RemoteError::other(format!("unexpected Gemini response: {}", e)))?;

        Ok(reply_text(parsed))
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

/// Concatenated text parts of the first candidate
fn reply_text(response: GenerateContentResponse) -> String {
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default()
}

/// Map an HTTP failure onto the retry taxonomy
fn classify_failure(model: &str, status: StatusCode, body: &str) -> RemoteError {
    let (message, api_status) = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => (envelope.error.message, envelope.error.status),
        Err(_) => (body.chars().take(300).collect(), String::new()),
    };
    let message = if message.is_empty() {
        format!("HTTP {}", status)
    } else {
        format!("HTTP {}: {}", status, message)
    };

    if status == StatusCode::TOO_MANY_REQUESTS || api_status == "RESOURCE_EXHAUSTED" {
        return RemoteError::RateLimited(message);
    }

    let lower = message.to_lowercase();
    let model_rejected = lower.contains("not found") || lower.contains("not supported");
    if matches!(status, StatusCode::NOT_FOUND | StatusCode::BAD_REQUEST) && model_rejected {
        return RemoteError::UnsupportedModel {
            model: model.to_string(),
            message,
        };
    }

    RemoteError::Other(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: "image/jpeg",
                            data: "AAAA",
                        },
                    },
                    Part::Text { text: "classify" },
                ],
            }],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(json["contents"][0]["parts"][0]["inlineData"]["data"], "AAAA");
        assert_eq!(json["contents"][0]["parts"][1]["text"], "classify");
    }

    #[test]
    fn test_reply_text_joins_parts() {
        let response: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"{\"label\":"},{"text":"\"hazardous\"}"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(reply_text(response), r#"{"label":"hazardous"}"#);

        let empty: GenerateContentResponse = serde_json::from_str(r#"{"promptFeedback":{}}"#).unwrap();
        assert_eq!(reply_text(empty), "");
    }

    #[test]
    fn test_rate_limit_classification() {
        let body = r#"{"error":{"code":429,"message":"Quota exceeded","status":"RESOURCE_EXHAUSTED"}}"#;
        let err = classify_failure("m", StatusCode::TOO_MANY_REQUESTS, body);
        assert!(matches!(err, RemoteError::RateLimited(ref msg) if msg.contains("Quota exceeded")));
    }

    #[test]
    fn test_unsupported_model_classification() {
        let body = r#"{"error":{"code":404,"message":"models/gemini-9 is not found for API version v1beta, or is not supported for generateContent.","status":"NOT_FOUND"}}"#;
        let err = classify_failure("gemini-9", StatusCode::NOT_FOUND, body);
        assert!(matches!(err, RemoteError::UnsupportedModel { ref model, .. } if model == "gemini-9"));
    }

    #[test]
    fn test_other_failures() {
        let body = r#"{"error":{"code":400,"message":"API key not valid. Please pass a valid API key.","status":"INVALID_ARGUMENT"}}"#;
        let err = classify_failure("m", StatusCode::BAD_REQUEST, body);
        assert!(matches!(err, RemoteError::Other(ref msg) if msg.contains("API key not valid")));

        let err = classify_failure("m", StatusCode::BAD_GATEWAY, "upstream down");
        assert!(matches!(err, RemoteError::Other(ref msg) if msg.contains("upstream down")));
    }
}
