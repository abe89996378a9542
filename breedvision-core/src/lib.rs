//! BreedVision orchestration core
//!
//! Three cooperating state machines behind one event bus:
//! - `AuthSessionManager`: who is signed in, gates uploads
//! - `AnalysisOrchestrator`: at most one analysis job, superseded on re-upload
//! - `LocaleResolver`: active UI language, persisted across runs
//!
//! `BreedVisionApp` wires them to their external collaborators (identity
//! provider, inference service, locale storage) and exposes the gated
//! upload → analyze → view workflow.

pub mod error;
pub mod models;
pub mod providers;
pub mod services;

pub use crate::error::{
    AuthError, InferenceError, LocaleError, OrchestratorError, ProviderError, SetupError,
    UploadError, ValidationError,
};

use breedvision_common::config::{TomlConfig, PREFERENCES_FILE};
use breedvision_common::events::{BreedVisionEvent, EventBus};
use models::{AnalysisJob, RawImageSource};
use providers::{
    FileLocaleStore, FirebaseIdentityProvider, HttpInferenceService, IdentityProvider,
    InMemoryIdentityProvider, InferenceService, LocaleStore, SimulatedInferenceService,
};
use services::{
    ui_gate, AnalysisOrchestrator, AuthSessionManager, GateDecision, LocaleCatalog, LocaleResolver,
    SessionView, StartOutcome, UploadCoordinator,
};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

/// Lock a mutex, recovering the data if a holder panicked
///
/// State behind these locks is updated in single assignments, so a poisoned
/// guard still holds a consistent value.
pub(crate) fn lock_or_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// External services the core depends on
pub struct Collaborators {
    pub identity: Arc<dyn IdentityProvider>,
    pub inference: Arc<dyn InferenceService>,
    pub locale_store: Arc<dyn LocaleStore>,
}

impl Collaborators {
    /// Choose adapters from configuration
    ///
    /// Firebase when an API key is configured, else an in-memory provider
    /// that starts with no accounts (sign up before signing in);
    /// HTTP inference when an endpoint is configured, else the simulated
    /// service. The locale selection lives in the root folder.
    pub fn from_config(config: &TomlConfig, root_folder: &Path) -> Result<Self, SetupError> {
        let identity: Arc<dyn IdentityProvider> = match &config.auth.firebase_api_key {
            Some(api_key) => Arc::new(FirebaseIdentityProvider::new(api_key.clone())?),
            None => Arc::new(InMemoryIdentityProvider::new()),
        };

        let inference: Arc<dyn InferenceService> = match &config.analysis.endpoint {
            Some(endpoint) => Arc::new(HttpInferenceService::new(
                endpoint.clone(),
                config.analysis.timeout(),
            )?),
            None => Arc::new(SimulatedInferenceService::new(config.analysis.simulated_delay())),
        };

        let locale_store: Arc<dyn LocaleStore> =
            Arc::new(FileLocaleStore::new(root_folder.join(PREFERENCES_FILE)));

        info!(
            identity = identity.name(),
            inference = inference.name(),
            root_folder = %root_folder.display(),
            "Collaborators selected"
        );

        Ok(Self {
            identity,
            inference,
            locale_store,
        })
    }
}

/// One user session of the application
pub struct BreedVisionApp {
    event_bus: EventBus,
    auth: Arc<AuthSessionManager>,
    orchestrator: Arc<AnalysisOrchestrator>,
    uploads: UploadCoordinator,
    locale: Arc<LocaleResolver>,
    shutdown: CancellationToken,
}

impl BreedVisionApp {
    pub fn new(config: &TomlConfig, collaborators: Collaborators) -> Result<Self, SetupError> {
        let event_bus = EventBus::new(config.event_capacity);

        let orchestrator = Arc::new(AnalysisOrchestrator::new(
            collaborators.inference,
            config.analysis.timeout(),
            event_bus.clone(),
        ));
        let auth = Arc::new(AuthSessionManager::new(
            collaborators.identity,
            Arc::clone(&orchestrator),
            event_bus.clone(),
            config.auth.min_password_length,
        ));
        let locale = Arc::new(LocaleResolver::new(
            LocaleCatalog::builtin()?,
            &config.locale.default_locale,
            collaborators.locale_store,
            event_bus.clone(),
        )?);
        let uploads = UploadCoordinator::new(Arc::clone(&orchestrator));

        Ok(Self {
            event_bus,
            auth,
            orchestrator,
            uploads,
            locale,
            shutdown: CancellationToken::new(),
        })
    }

    /// Follow provider-side sign-outs; stops when the app is dropped
    pub fn start_provider_watch(&self) -> JoinHandle<()> {
        self.auth.watch_provider(self.shutdown.child_token())
    }

    pub fn auth(&self) -> &Arc<AuthSessionManager> {
        &self.auth
    }

    pub fn orchestrator(&self) -> &Arc<AnalysisOrchestrator> {
        &self.orchestrator
    }

    pub fn locale(&self) -> &Arc<LocaleResolver> {
        &self.locale
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// All state changes across the three machines, in order
    pub fn subscribe(&self) -> broadcast::Receiver<BreedVisionEvent> {
        self.event_bus.subscribe()
    }

    pub fn gate(&self) -> GateDecision {
        ui_gate::evaluate(&self.auth.current())
    }

    /// Stage an upload, if the current session may upload
    ///
    /// The session is held steady while staging, so a concurrent sign-out
    /// either lands first (and this fails) or cancels the new job.
    pub fn upload(&self, source: RawImageSource) -> Result<StartOutcome, UploadError> {
        match self.auth.while_signed_in(|| self.uploads.stage(source)) {
            Some(staged) => Ok(staged?),
            None => {
                warn!(status = %self.auth.current().status(), "Upload refused by gate");
                Err(UploadError::NotPermitted)
            }
        }
    }

    /// Submit a staged job and wait for it to finish
    ///
    /// Drive the returned future to completion: the timeout only runs while
    /// it is polled, and a dropped future leaves the job `InFlight` until a
    /// new upload or sign-out supersedes it (`reset` refuses live jobs).
    pub async fn analyze(&self, job_id: Uuid) -> Result<AnalysisJob, OrchestratorError> {
        self.orchestrator.submit(job_id).await
    }

    /// Release a finished job ("analyze another image")
    pub fn reset(&self) -> Result<Option<Uuid>, OrchestratorError> {
        self.orchestrator.reset()
    }

    /// Render-ready snapshot in the active locale
    pub fn view(&self) -> SessionView {
        SessionView::build(
            &self.auth.current(),
            self.orchestrator.current().as_ref(),
            &self.locale,
        )
    }
}

impl Drop for BreedVisionApp {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
