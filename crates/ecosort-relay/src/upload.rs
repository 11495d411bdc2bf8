//! Image upload extraction
//!
//! Camera firmware posts either the raw JPEG body or a multipart form. The
//! configured [`UploadMode`] decides which of the two the relay accepts.

use axum::extract::{FromRequest, Multipart, Request};
use axum::http::{header::CONTENT_TYPE, StatusCode};
use bytes::Bytes;
use ecosort_core::ImagePayload;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Multipart field names recognized as the image, in priority order
const IMAGE_FIELD_NAMES: &[&str] = &["image", "file", "photo"];

/// Which upload encodings `/analyze` accepts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadMode {
    /// Multipart when the request says so, raw otherwise
    #[default]
    Auto,
    /// Raw image body only
    Raw,
    /// `multipart/form-data` only
    Multipart,
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("no image data")]
    NoImage,

    #[error("payload too large")]
    TooLarge,

    #[error("malformed upload: {0}")]
    Malformed(String),
}

impl UploadError {
    fn from_status(status: StatusCode, text: String) -> Self {
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            Self::TooLarge
        } else {
            Self::Malformed(text)
        }
    }
}

/// Pull the image out of an `/analyze` request
pub async fn read_image(mode: UploadMode, request: Request) -> Result<ImagePayload, UploadError> {
    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or(v).trim().to_ascii_lowercase());

    let is_multipart = content_type.as_deref() == Some("multipart/form-data");

    match (mode, is_multipart) {
        (UploadMode::Auto | UploadMode::Multipart, true) => read_multipart(request).await,
        (UploadMode::Auto | UploadMode::Raw, false) => {
            read_raw(content_type.as_deref(), request).await
        }
        (UploadMode::Raw, true) | (UploadMode::Multipart, false) => {
            debug!(?mode, content_type = ?content_type, "Upload encoding not accepted in this mode");
            Err(UploadError::NoImage)
        }
    }
}

async fn read_raw(content_type: Option<&str>, request: Request) -> Result<ImagePayload, UploadError> {
    let accepted = match content_type {
        None => true,
        Some(ct) => ct.starts_with("image/") || ct == "application/octet-stream",
    };
    if !accepted {
        debug!(content_type = ?content_type, "Raw body has a non-image content type");
        return Err(UploadError::NoImage);
    }

    let body = Bytes::from_request(request, &())
        .await
        .map_err(|rejection| UploadError::from_status(rejection.status(), rejection.body_text()))?;

    Ok(ImagePayload::new(body, content_type))
}

async fn read_multipart(request: Request) -> Result<ImagePayload, UploadError> {
    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|rejection| UploadError::from_status(rejection.status(), rejection.body_text()))?;

    let mut file_fallback: Option<ImagePayload> = None;

    loop {
        let field = multipart
            .next_field()
            .await
            .map_err(|e| UploadError::from_status(e.status(), e.body_text()))?;
        let Some(field) = field else { break };

        let named = field
            .name()
            .is_some_and(|name| IMAGE_FIELD_NAMES.iter().any(|n| name.eq_ignore_ascii_case(n)));
        let has_file = field.file_name().is_some();
        if !named && (!has_file || file_fallback.is_some()) {
            continue;
        }

        let field_name = field.name().unwrap_or_default().to_string();
        let mime = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| UploadError::from_status(e.status(), e.body_text()))?;
        let payload = ImagePayload::new(data, mime.as_deref());

        if named {
            debug!(field = %field_name, bytes = payload.len(), "Using named multipart field");
            return Ok(payload);
        }
        file_fallback = Some(payload);
    }

    file_fallback.ok_or(UploadError::NoImage)
}
