//! Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use breedvision_common::config::TomlConfig;
use breedvision_common::events::BreedVisionEvent;
use breedvision_core::models::{BreedResult, ImagePayload, RawImageSource};
use breedvision_core::providers::{InMemoryIdentityProvider, InferenceService, MemoryLocaleStore};
use breedvision_core::{BreedVisionApp, Collaborators, InferenceError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, Notify};

pub const EMAIL: &str = "farmer@example.com";
pub const PASSWORD: &str = "gir-cattle-94";

pub const PNG_BYTES: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D, b'I', b'H', b'D', b'R'];

pub fn png(name: &str) -> RawImageSource {
    RawImageSource::new(PNG_BYTES.to_vec(), Some("image/png")).with_file_name(name)
}

/// Inference service that answers only when the test says so
#[derive(Default)]
pub struct GatedInference {
    release: Notify,
    started: Notify,
    calls: AtomicUsize,
}

impl GatedInference {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Let one pending (or the next) call answer
    pub fn release_one(&self) {
        self.release.notify_one();
    }

    /// Wait until a call has reached the service
    pub async fn wait_started(&self) {
        self.started.notified().await;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InferenceService for GatedInference {
    fn name(&self) -> &'static str {
        "gated"
    }

    async fn submit(&self, _image: ImagePayload) -> Result<BreedResult, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.started.notify_one();
        self.release.notified().await;
        Ok(BreedResult::gir_cattle())
    }
}

pub struct Harness {
    pub app: Arc<BreedVisionApp>,
    pub identity: Arc<InMemoryIdentityProvider>,
    pub store: Arc<MemoryLocaleStore>,
}

pub fn harness_with(inference: Arc<dyn InferenceService>, config: &TomlConfig) -> Harness {
    let identity = Arc::new(InMemoryIdentityProvider::new().with_user(EMAIL, PASSWORD, "Asha Patel"));
    let store = Arc::new(MemoryLocaleStore::new());
    let app = BreedVisionApp::new(
        config,
        Collaborators {
            identity: identity.clone(),
            inference,
            locale_store: store.clone(),
        },
    )
    .unwrap();
    Harness {
        app: Arc::new(app),
        identity,
        store,
    }
}

pub fn harness(inference: Arc<dyn InferenceService>) -> Harness {
    harness_with(inference, &TomlConfig::default())
}

pub async fn signed_in(inference: Arc<dyn InferenceService>) -> Harness {
    let harness = harness(inference);
    harness.app.auth().sign_in(EMAIL, PASSWORD).await.unwrap();
    harness
}

/// Everything published so far
pub fn drain(rx: &mut broadcast::Receiver<BreedVisionEvent>) -> Vec<BreedVisionEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
