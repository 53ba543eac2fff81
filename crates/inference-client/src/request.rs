//! Request and response payloads

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use camera_capture::EncodedImage;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::InferenceError;

/// Body of a detection request: exactly one field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DetectionRequest {
    /// Base64 JPEG frame
    Image { image: String },
    /// Precomputed eye aspect ratio
    Features { ear: f64 },
}

impl DetectionRequest {
    /// Build an image request from an encoded frame
    pub fn from_image(image: &EncodedImage) -> Self {
        DetectionRequest::Image {
            image: BASE64_STANDARD.encode(&image.bytes),
        }
    }

    /// Build a feature request from an eye aspect ratio.
    ///
    /// NaN and infinities have no JSON representation and are rejected.
    pub fn from_ear(ear: f64) -> Result<Self, InferenceError> {
        let request = DetectionRequest::Features { ear };
        request.validate()?;
        Ok(request)
    }

    /// Check the payload can be sent as-is
    pub fn validate(&self) -> Result<(), InferenceError> {
        match self {
            DetectionRequest::Features { ear } if !ear.is_finite() => {
                Err(InferenceError::InvalidEar(*ear))
            }
            _ => Ok(()),
        }
    }

    /// Endpoint path for this payload
    pub fn path(&self) -> &'static str {
        match self {
            DetectionRequest::Image { .. } => "/detect_drowsiness",
            DetectionRequest::Features { .. } => "/check_drowsiness",
        }
    }

    /// Short name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            DetectionRequest::Image { .. } => "image",
            DetectionRequest::Features { .. } => "ear",
        }
    }
}

/// Reply from the detection service
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DetectionResponse {
    /// Verdict; absent or non-boolean means "not drowsy"
    #[serde(default, deserialize_with = "lenient_bool")]
    pub drowsy: bool,
    /// Diagnostic message (e.g. "No face detected")
    #[serde(default)]
    pub error: Option<String>,
}

impl DetectionResponse {
    /// Parse a response body
    pub fn parse(body: &[u8]) -> Result<Self, InferenceError> {
        serde_json::from_slice(body).map_err(|e| InferenceError::MalformedBody(e.to_string()))
    }
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_bool().unwrap_or(false))
}

/// Why a request produced no verdict
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// Connection refused, reset, DNS failure, ...
    Transport(String),
    /// Non-success HTTP status
    Status(u16),
    /// Body was not valid JSON
    MalformedBody(String),
    /// Request was rejected before sending
    InvalidRequest(String),
}

impl From<InferenceError> for FailureReason {
    fn from(err: InferenceError) -> Self {
        match err {
            InferenceError::Status(code) => FailureReason::Status(code),
            InferenceError::MalformedBody(msg) => FailureReason::MalformedBody(msg),
            e @ InferenceError::InvalidEar(_) => FailureReason::InvalidRequest(e.to_string()),
            other => FailureReason::Transport(other.to_string()),
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Transport(msg) => write!(f, "transport error: {}", msg),
            FailureReason::Status(code) => write!(f, "status {}", code),
            FailureReason::MalformedBody(msg) => write!(f, "malformed body: {}", msg),
            FailureReason::InvalidRequest(msg) => write!(f, "invalid request: {}", msg),
        }
    }
}

/// Outcome of one detection request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectionResult {
    Drowsy,
    Awake,
    /// No verdict could be obtained
    Unknown(FailureReason),
}

impl DetectionResult {
    /// Fail-open view: only a confirmed verdict counts as drowsy
    pub fn is_drowsy(&self) -> bool {
        matches!(self, DetectionResult::Drowsy)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, DetectionResult::Unknown(_))
    }
}

impl From<bool> for DetectionResult {
    fn from(drowsy: bool) -> Self {
        if drowsy {
            DetectionResult::Drowsy
        } else {
            DetectionResult::Awake
        }
    }
}

impl From<DetectionResponse> for DetectionResult {
    fn from(response: DetectionResponse) -> Self {
        response.drowsy.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_image_request_has_single_field() {
        let image = EncodedImage {
            bytes: vec![0xFF, 0xD8, 0xFF],
            width: 1,
            height: 1,
            sequence: 0,
        };
        let request = DetectionRequest::from_image(&image);

        assert_eq!(request.path(), "/detect_drowsiness");
        assert_eq!(serde_json::to_value(&request).unwrap(), json!({ "image": "/9j/" }));
    }

    #[test]
    fn test_ear_request_has_single_field() {
        let request = DetectionRequest::from_ear(0.21).unwrap();

        assert_eq!(request.path(), "/check_drowsiness");
        assert_eq!(serde_json::to_value(&request).unwrap(), json!({ "ear": 0.21 }));
    }

    #[test]
    fn test_non_finite_ear_is_rejected() {
        for ear in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = DetectionRequest::from_ear(ear).unwrap_err();
            assert!(matches!(err, InferenceError::InvalidEar(_)));
            assert!(matches!(
                FailureReason::from(err),
                FailureReason::InvalidRequest(_)
            ));
        }
        assert!(DetectionRequest::Features { ear: f64::NAN }.validate().is_err());
        assert!(DetectionRequest::from_ear(0.0).is_ok());
    }

    #[test]
    fn test_response_parsing() {
        let drowsy = DetectionResponse::parse(br#"{"drowsy": true}"#).unwrap();
        assert!(drowsy.drowsy);

        let with_error =
            DetectionResponse::parse(br#"{"error": "No face detected", "drowsy": false}"#).unwrap();
        assert!(!with_error.drowsy);
        assert_eq!(with_error.error.as_deref(), Some("No face detected"));
    }

    #[test]
    fn test_missing_or_odd_field_is_not_drowsy() {
        assert!(!DetectionResponse::parse(b"{}").unwrap().drowsy);
        assert!(!DetectionResponse::parse(br#"{"drowsy": "yes"}"#).unwrap().drowsy);
        assert!(!DetectionResponse::parse(br#"{"drowsy": null}"#).unwrap().drowsy);
    }

    #[test]
    fn test_invalid_json_is_malformed() {
        assert!(matches!(
            DetectionResponse::parse(b"<html>"),
            Err(InferenceError::MalformedBody(_))
        ));
    }

    #[test]
    fn test_unknown_is_not_drowsy() {
        let result = DetectionResult::Unknown(FailureReason::Status(500));
        assert!(!result.is_drowsy());
        assert!(result.is_unknown());
        assert!(DetectionResult::from(true).is_drowsy());
    }
}
