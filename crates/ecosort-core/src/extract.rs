//! Reply extraction
//!
//! Turns the model's free-text reply into a [`ClassificationResult`] in two
//! stages: a strict parse of the whole reply, then a parse of the span between
//! the first `{` and the last `}`. Anything that survives neither stage becomes
//! an explicit [`Extraction::Fallback`] rather than an error.

use serde_json::{Map, Value};
use std::fmt;

use crate::types::{ClassificationResult, Label};

/// Largest `{...}` span the scanning stage will try to parse
pub const MAX_SCAN_BYTES: usize = 64 * 1024;

const LABEL_KEYS: &[&str] = &["label", "class"];
const CONFIDENCE_KEYS: &[&str] = &["confidence", "score"];
const NOTES_KEYS: &[&str] = &["notes", "reason"];

/// Outcome of extracting a verdict from a model reply
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Parsed(ClassificationResult),
    Fallback(FallbackReason),
}

impl Extraction {
    /// Collapse into a result, mapping fallbacks to an `unknown` label with explanatory notes
    pub fn into_result(self) -> ClassificationResult {
        match self {
            Self::Parsed(result) => result,
            Self::Fallback(reason) => {
                ClassificationResult::unknown(format!("could not parse model reply: {}", reason))
            }
        }
    }
}

/// Why a reply could not be turned into a verdict
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    EmptyReply,
    NoJsonObject,
    InvalidJson(String),
    NotAnObject,
    MissingLabel,
    UnrecognizedLabel(String),
    TooLarge(usize),
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyReply => write!(f, "reply was empty"),
            Self::NoJsonObject => write!(f, "no JSON object found"),
            Self::InvalidJson(e) => write!(f, "invalid JSON ({})", e),
            Self::NotAnObject => write!(f, "JSON value is not an object"),
            Self::MissingLabel => write!(f, "no label field"),
            Self::UnrecognizedLabel(raw) => write!(f, "unrecognized label {}", raw),
            Self::TooLarge(len) => {
                write!(f, "JSON span of {} bytes exceeds {} byte limit", len, MAX_SCAN_BYTES)
            }
        }
    }
}

/// Extract a verdict from a raw model reply
pub fn extract(reply: &str) -> Extraction {
    let reply = reply.trim();
    if reply.is_empty() {
        return Extraction::Fallback(FallbackReason::EmptyReply);
    }

    // Stage 1: the whole reply is the document
    let strict_failure = match serde_json::from_str::<Value>(reply) {
        Ok(value) => match normalize(&value) {
            Ok(result) => return Extraction::Parsed(result),
            Err(reason) => Some(reason),
        },
        Err(_) => None,
    };

    // Stage 2: first '{' through last '}'
    let Some(span) = brace_span(reply) else {
        return Extraction::Fallback(strict_failure.unwrap_or(FallbackReason::NoJsonObject));
    };

    if span.len() > MAX_SCAN_BYTES {
        return Extraction::Fallback(FallbackReason::TooLarge(span.len()));
    }

    match serde_json::from_str::<Value>(span) {
        Ok(value) => match normalize(&value) {
            Ok(result) => Extraction::Parsed(result),
            Err(reason) => Extraction::Fallback(reason),
        },
        Err(e) => Extraction::Fallback(
            strict_failure.unwrap_or_else(|| FallbackReason::InvalidJson(e.to_string())),
        ),
    }
}

/// Slice from the first `{` to the last `}` inclusive
fn brace_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

/// Map any accepted reply shape onto the canonical result
fn normalize(value: &Value) -> Result<ClassificationResult, FallbackReason> {
    let object = value.as_object().ok_or(FallbackReason::NotAnObject)?;

    let label = match field(object, LABEL_KEYS) {
        None | Some(Value::Null) => return Err(FallbackReason::MissingLabel),
        Some(Value::String(raw)) => {
            Label::parse(raw).ok_or_else(|| FallbackReason::UnrecognizedLabel(format!("{:?}", raw)))?
        }
        Some(other) => return Err(FallbackReason::UnrecognizedLabel(other.to_string())),
    };

    let mut result = ClassificationResult::new(label);

    let confidence = field(object, CONFIDENCE_KEYS).and_then(|v| match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    });
    if let Some(confidence) = confidence {
        // Saturate in f64, narrowing first would overflow large values to inf
        result = result.with_confidence(confidence.clamp(0.0, 1.0) as f32);
    }

    if let Some(Value::String(notes)) = field(object, NOTES_KEYS) {
        let notes = notes.trim();
        if !notes.is_empty() {
            result = result.with_notes(notes);
        }
    }

    Ok(result)
}

/// First present key among `keys`, matched case-insensitively
fn field<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| {
        object.get(*key).or_else(|| {
            object
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| v)
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(reply: &str) -> ClassificationResult {
        match extract(reply) {
            Extraction::Parsed(result) => result,
            Extraction::Fallback(reason) => panic!("expected parse, got fallback: {}", reason),
        }
    }

    fn fallback(reply: &str) -> FallbackReason {
        match extract(reply) {
            Extraction::Fallback(reason) => reason,
            Extraction::Parsed(result) => panic!("expected fallback, got {:?}", result),
        }
    }

    #[test]
    fn test_strict_json_round_trips_label() {
        for label in Label::CANONICAL {
            let reply = format!(r#"{{"label":"{}","confidence":0.8,"notes":"ok"}}"#, label);
            let result = parsed(&reply);
            assert_eq!(result.label, label);
            assert_eq!(result.notes.as_deref(), Some("ok"));
        }
    }

    #[test]
    fn test_fenced_reply_recovered_by_scan() {
        let reply = "Sure! Here you go: ```json\n{\"label\":\"hazardous\",\"confidence\":0.92,\"notes\":\"battery\"}\n```";
        let result = parsed(reply);
        assert_eq!(result.label, Label::Hazardous);
        assert!((result.confidence.unwrap() - 0.92).abs() < 1e-6);
        assert_eq!(result.notes.as_deref(), Some("battery"));
    }

    #[test]
    fn test_prose_without_json_falls_back() {
        assert_eq!(fallback("I cannot classify this."), FallbackReason::NoJsonObject);

        let result = extract("I cannot classify this.").into_result();
        assert_eq!(result.label, Label::Unknown);
        assert!(!result.notes.unwrap().is_empty());
    }

    #[test]
    fn test_confidence_saturates_at_bounds() {
        let result = parsed(r#"{"label":"hazardous","confidence":1e300}"#);
        assert_eq!(result.confidence, Some(1.0));

        let result = parsed(r#"{"label":"hazardous","confidence":-1e300}"#);
        assert_eq!(result.confidence, Some(0.0));

        let result = parsed(r#"{"label":"hazardous","score":"1.7"}"#);
        assert_eq!(result.confidence, Some(1.0));
    }

    #[test]
    fn test_legacy_class_key() {
        let result = parsed(r#"{"class": "Non-Biodegradable", "reason": "plastic wrapper"}"#);
        assert_eq!(result.label, Label::NonBiodegradable);
        assert_eq!(result.confidence, None);
        assert_eq!(result.notes.as_deref(), Some("plastic wrapper"));
    }

    #[test]
    fn test_label_takes_precedence_over_class() {
        let result = parsed(r#"{"class": "hazardous", "label": "biodegradable"}"#);
        assert_eq!(result.label, Label::Biodegradable);
    }

    #[test]
    fn test_missing_label_falls_back() {
        assert_eq!(fallback(r#"{"confidence": 0.4}"#), FallbackReason::MissingLabel);
        assert_eq!(fallback(r#"{"label": null}"#), FallbackReason::MissingLabel);
    }

    #[test]
    fn test_unrecognized_label_never_surfaces() {
        let reason = fallback(r#"Result: {"label": "recyclable"}"#);
        assert!(matches!(reason, FallbackReason::UnrecognizedLabel(ref raw) if raw.contains("recyclable")));

        let reason = fallback(r#"{"label": 3}"#);
        assert!(matches!(reason, FallbackReason::UnrecognizedLabel(_)));
    }

    #[test]
    fn test_truncated_reply_falls_back() {
        let reason = fallback(r#"{"label": "hazardous", "confidence": 0.9"#);
        assert_eq!(reason, FallbackReason::NoJsonObject);

        let reason = fallback(r#"text {"label": "hazardous", "notes": "cut} off"#);
        assert!(matches!(reason, FallbackReason::InvalidJson(_)));
    }

    #[test]
    fn test_empty_and_non_object_replies() {
        assert_eq!(fallback("   \n"), FallbackReason::EmptyReply);
        assert_eq!(fallback("[1, 2, 3]"), FallbackReason::NotAnObject);
    }

    #[test]
    fn test_oversized_span_rejected() {
        let padding = "x".repeat(MAX_SCAN_BYTES);
        let reply = format!(r#"note: {{"label": "hazardous", "notes": "{}"}} trailing"#, padding);
        assert!(matches!(fallback(&reply), FallbackReason::TooLarge(_)));
    }

    #[test]
    fn test_confidence_as_string_and_clamped() {
        let result = parsed(r#"{"label": "biodegradable", "confidence": "0.75"}"#);
        assert_eq!(result.confidence, Some(0.75));

        let result = parsed(r#"{"label": "biodegradable", "confidence": 3}"#);
        assert_eq!(result.confidence, Some(1.0));

        let result = parsed(r#"{"label": "biodegradable", "confidence": "high"}"#);
        assert_eq!(result.confidence, None);
    }

    #[test]
    fn test_case_insensitive_keys() {
        let result = parsed(r#"{"Label": "HAZARDOUS", "Notes": "paint can"}"#);
        assert_eq!(result.label, Label::Hazardous);
        assert_eq!(result.notes.as_deref(), Some("paint can"));
    }
}
