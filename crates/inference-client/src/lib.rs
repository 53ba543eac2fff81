//! Remote Drowsiness Detection Client
//!
//! Sends encoded frames (or precomputed eye-aspect-ratio features) to the
//! detection service and turns the reply into a [`DetectionResult`].
//! Every submission is a single attempt; failures become an `Unknown` result
//! instead of an error.

mod client;
mod request;

pub use client::{InferenceClient, InferenceConfig};
pub use request::{DetectionRequest, DetectionResponse, DetectionResult, FailureReason};

use std::future::Future;
use thiserror::Error;

/// Errors talking to the detection service
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Invalid base URL {url}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("HTTP client setup failed: {0}")]
    ClientSetup(String),
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Service returned status {0}")]
    Status(u16),
    #[error("Malformed response body: {0}")]
    MalformedBody(String),
    #[error("Eye aspect ratio must be finite, got {0}")]
    InvalidEar(f64),
}

/// Anything that can classify a detection request.
///
/// Implementations never fail: problems are reported through
/// [`DetectionResult::Unknown`].
pub trait DetectionService: Send + Sync + 'static {
    /// Submit one request and wait for its verdict
    fn submit(&self, request: DetectionRequest) -> impl Future<Output = DetectionResult> + Send;
}
