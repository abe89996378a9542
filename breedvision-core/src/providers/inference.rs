//! Inference service contract and the simulated stand-in

use crate::error::InferenceError;
use crate::models::{BreedResult, ImagePayload};
use async_trait::async_trait;
use std::time::Duration;

/// Breed inference service
///
/// No latency bound is assumed: the orchestrator applies its own timeout and
/// may drop the returned future at any await point when a job is superseded.
#[async_trait]
pub trait InferenceService: Send + Sync {
    /// Service name for logging
    fn name(&self) -> &'static str;

    async fn submit(&self, image: ImagePayload) -> Result<BreedResult, InferenceError>;
}

/// Fixed-delay stand-in for a real model
///
/// Waits `delay`, then answers with the Gir cattle profile for every image.
pub struct SimulatedInferenceService {
    delay: Duration,
    result: BreedResult,
}

impl SimulatedInferenceService {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            result: BreedResult::gir_cattle(),
        }
    }

    /// Answer with a different profile
    pub fn with_result(mut self, result: BreedResult) -> Self {
        self.result = result;
        self
    }
}

#[async_trait]
impl InferenceService for SimulatedInferenceService {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn submit(&self, image: ImagePayload) -> Result<BreedResult, InferenceError> {
        tracing::debug!(
            handle_id = %image.handle_id,
            bytes = image.bytes.len(),
            delay_ms = self.delay.as_millis() as u64,
            "Simulating breed inference"
        );
        tokio::time::sleep(self.delay).await;
        Ok(self.result.clone())
    }
}
