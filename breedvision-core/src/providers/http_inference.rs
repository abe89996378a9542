//! HTTP inference client
//!
//! POSTs the raw image bytes (with their media type as `Content-Type`) to a
//! configured endpoint and expects a JSON `BreedResult` back.

use crate::error::InferenceError;
use crate::models::{BreedResult, ImagePayload};
use crate::providers::inference::InferenceService;
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;

const USER_AGENT: &str = concat!("BreedVision/", env!("CARGO_PKG_VERSION"));

/// Classify a non-success HTTP status
fn status_error(status: StatusCode, body: &str) -> InferenceError {
    match status {
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => InferenceError::Timeout,
        s if s.is_server_error() || s == StatusCode::TOO_MANY_REQUESTS => {
            InferenceError::Unavailable(format!("HTTP {}", s.as_u16()))
        }
        s => InferenceError::MalformedResponse(format!("HTTP {}: {}", s.as_u16(), body)),
    }
}

/// Decode and sanity-check a response body
fn decode_result(body: &[u8]) -> Result<BreedResult, InferenceError> {
    let result: BreedResult = serde_json::from_slice(body)
        .map_err(|e| InferenceError::MalformedResponse(e.to_string()))?;
    result.check().map_err(InferenceError::MalformedResponse)?;
    Ok(result)
}

pub struct HttpInferenceService {
    http_client: reqwest::Client,
    endpoint: String,
}

impl HttpInferenceService {
    /// `timeout` is the client-side request timeout; the orchestrator's own
    /// deadline still applies on top of it.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, InferenceError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| InferenceError::Unavailable(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl InferenceService for HttpInferenceService {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn submit(&self, image: ImagePayload) -> Result<BreedResult, InferenceError> {
        tracing::debug!(
            endpoint = %self.endpoint,
            handle_id = %image.handle_id,
            bytes = image.bytes.len(),
            "Submitting image for inference"
        );

        let response = self
            .http_client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, image.media_type.as_str())
            .body(image.bytes.to_vec())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    InferenceError::Timeout
                } else {
                    InferenceError::Unavailable(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                InferenceError::Timeout
            } else {
                InferenceError::Unavailable(e.to_string())
            }
        })?;

        if !status.is_success() {
            return Err(status_error(status, &String::from_utf8_lossy(&body)));
        }

        let result = decode_result(&body)?;
        tracing::info!(
            handle_id = %image.handle_id,
            breed = %result.name,
            confidence = result.confidence,
            "Inference service answered"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(status_error(StatusCode::GATEWAY_TIMEOUT, ""), InferenceError::Timeout);
        assert!(matches!(
            status_error(StatusCode::SERVICE_UNAVAILABLE, ""),
            InferenceError::Unavailable(_)
        ));
        assert!(matches!(
            status_error(StatusCode::TOO_MANY_REQUESTS, ""),
            InferenceError::Unavailable(_)
        ));
        assert!(matches!(
            status_error(StatusCode::BAD_REQUEST, "bad image"),
            InferenceError::MalformedResponse(_)
        ));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode_result(b"<html>oops</html>"),
            Err(InferenceError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_decode_rejects_out_of_range_confidence() {
        let mut json = serde_json::to_value(BreedResult::gir_cattle()).unwrap();
        json["confidence"] = serde_json::json!(250);
        let body = serde_json::to_vec(&json).unwrap();
        assert!(matches!(decode_result(&body), Err(InferenceError::MalformedResponse(_))));
    }

    #[test]
    fn test_decode_accepts_valid_result() {
        let body = serde_json::to_vec(&BreedResult::gir_cattle()).unwrap();
        assert_eq!(decode_result(&body).unwrap().name, "Gir Cattle");
    }
}
