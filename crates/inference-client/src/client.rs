//! HTTP client for the detection service

use camera_capture::EncodedImage;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::request::{DetectionRequest, DetectionResponse, DetectionResult};
use crate::{DetectionService, InferenceError};

/// Default service address (plain HTTP on the local network)
const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";

/// Detection service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Scheme, host and port of the service
    pub base_url: String,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

/// Client for `/detect_drowsiness` and `/check_drowsiness`.
///
/// One POST per submission: no retries and no timeout beyond the transport
/// defaults.
#[derive(Debug, Clone)]
pub struct InferenceClient {
    http: reqwest::Client,
    base_url: Url,
}

impl InferenceClient {
    /// Create a client for the configured service
    pub fn new(config: &InferenceConfig) -> Result<Self, InferenceError> {
        let base_url = Url::parse(&config.base_url).map_err(|e| InferenceError::InvalidBaseUrl {
            url: config.base_url.clone(),
            reason: e.to_string(),
        })?;

        match base_url.scheme() {
            "https" => {}
            "http" => warn!(
                "Detection service at {} uses plain HTTP; frames are sent unencrypted",
                base_url
            ),
            other => {
                return Err(InferenceError::InvalidBaseUrl {
                    url: config.base_url.clone(),
                    reason: format!("unsupported scheme {}", other),
                })
            }
        }

        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| InferenceError::ClientSetup(e.to_string()))?;

        info!("Detection service: {}", base_url);
        Ok(Self { http, base_url })
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Classify an encoded frame
    pub async fn detect_image(&self, image: &EncodedImage) -> DetectionResult {
        self.submit(DetectionRequest::from_image(image)).await
    }

    /// Classify a precomputed eye aspect ratio
    pub async fn check_ear(&self, ear: f64) -> DetectionResult {
        match DetectionRequest::from_ear(ear) {
            Ok(request) => self.submit(request).await,
            Err(e) => {
                warn!("Not sending ear request: {}", e);
                DetectionResult::Unknown(e.into())
            }
        }
    }

    fn endpoint(&self, request: &DetectionRequest) -> Result<Url, InferenceError> {
        self.base_url
            .join(request.path())
            .map_err(|e| InferenceError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: e.to_string(),
            })
    }

    async fn post(&self, request: &DetectionRequest) -> Result<DetectionResponse, InferenceError> {
        request.validate()?;
        let url = self.endpoint(request)?;
        let response = self.http.post(url).json(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(InferenceError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        DetectionResponse::parse(&body)
    }
}

impl DetectionService for InferenceClient {
    async fn submit(&self, request: DetectionRequest) -> DetectionResult {
        let start = Instant::now();
        let kind = request.kind();

        match self.post(&request).await {
            Ok(response) => {
                if let Some(message) = &response.error {
                    debug!("Detection service note: {}", message);
                }
                let result = DetectionResult::from(response);
                debug!(
                    "{} verdict {:?} in {}ms",
                    kind,
                    result,
                    start.elapsed().as_millis()
                );
                result
            }
            Err(e) => {
                warn!("{} detection failed: {}", kind, e);
                DetectionResult::Unknown(e.into())
            }
        }
    }
}
