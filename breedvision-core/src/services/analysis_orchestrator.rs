//! Analysis orchestration
//!
//! Owns at most one analysis job at a time. A new upload supersedes the
//! current job: a staged job is cancelled on the spot, an in-flight one is
//! cancelled and its eventual answer discarded.
//!
//! Every transition happens under the slot lock and is published on the
//! event bus before the lock is released, so observers see transitions in
//! the order they were applied.
//!
//! The in-flight inference call races a oneshot cancellation channel. The
//! canceller sends the cancelled job snapshot while holding the lock; the
//! submitting task re-checks job identity under the same lock before
//! applying an outcome, so a result computed for a superseded job is never
//! delivered.

use crate::error::OrchestratorError;
use crate::lock_or_recover;
use crate::models::{AnalysisJob, BreedResult, ImageHandle, JobTransition};
use crate::providers::InferenceService;
use breedvision_common::events::{AnalysisErrorKind, BreedVisionEvent, EventBus, JobStatus};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, oneshot};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Result of staging a new image
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StartOutcome {
    /// The freshly staged job
    pub job: AnalysisJob,
    /// Previous job, if it was still live and got cancelled
    pub superseded: Option<AnalysisJob>,
}

struct InFlightCall {
    job_id: Uuid,
    cancel_tx: oneshot::Sender<AnalysisJob>,
}

#[derive(Default)]
struct JobSlot {
    job: Option<AnalysisJob>,
    /// Released once the job leaves the live states
    handle: Option<ImageHandle>,
    in_flight: Option<InFlightCall>,
}

pub struct AnalysisOrchestrator {
    inference: Arc<dyn InferenceService>,
    timeout: Duration,
    slot: Mutex<JobSlot>,
    event_bus: EventBus,
}

impl AnalysisOrchestrator {
    pub fn new(inference: Arc<dyn InferenceService>, timeout: Duration, event_bus: EventBus) -> Self {
        Self {
            inference,
            timeout,
            slot: Mutex::new(JobSlot::default()),
            event_bus,
        }
    }

    fn publish(&self, transition: JobTransition) {
        self.event_bus.emit_lossy(transition.into_event());
    }

    /// Cancel the live job, if any, and signal its in-flight call
    fn cancel_locked(&self, slot: &mut JobSlot) -> Option<AnalysisJob> {
        let job = slot.job.as_mut().filter(|job| job.is_active())?;
        let transition = match job.cancel() {
            Ok(transition) => transition,
            Err(e) => {
                warn!(job_id = %job.id, error = %e, "Live job refused cancellation");
                return None;
            }
        };
        self.publish(transition);

        let snapshot = job.clone();
        if let Some(call) = slot.in_flight.take() {
            if call.job_id == snapshot.id {
                // Receiver gone means the submit future was dropped
                let _ = call.cancel_tx.send(snapshot.clone());
            }
        }
        slot.handle = None;

        info!(job_id = %snapshot.id, "Analysis job cancelled");
        Some(snapshot)
    }

    /// Stage a new image, superseding whatever job is current
    ///
    /// A live job is cancelled first; any previous job (live or terminal) is
    /// then released before the new one is staged.
    pub fn start(&self, handle: ImageHandle) -> StartOutcome {
        let mut guard = lock_or_recover(&self.slot);
        let slot = &mut *guard;

        let superseded = self.cancel_locked(slot);
        self.release_locked(slot);

        let (job, transition) = AnalysisJob::new(handle.id());
        self.publish(transition);
        info!(
            job_id = %job.id,
            handle_id = %handle.id(),
            media_type = %handle.media_type(),
            bytes = handle.len(),
            superseded = ?superseded.as_ref().map(|j| j.id),
            "Analysis job staged"
        );

        slot.job = Some(job.clone());
        slot.handle = Some(handle);
        StartOutcome { job, superseded }
    }

    /// Submit the staged job and wait for its terminal state
    ///
    /// Returns the job as it ended: `Completed`, `Failed`, or `Cancelled` if
    /// it was superseded while waiting. Fails with `UnknownJob` when
    /// `job_id` is not the current job and `InvalidTransition` when it is
    /// not staged.
    pub async fn submit(&self, job_id: Uuid) -> Result<AnalysisJob, OrchestratorError> {
        let (payload, mut cancel_rx) = {
            let mut guard = lock_or_recover(&self.slot);
            let slot = &mut *guard;

            let job = slot
                .job
                .as_mut()
                .filter(|job| job.id == job_id)
                .ok_or(OrchestratorError::UnknownJob(job_id))?;
            if job.status != JobStatus::Staged {
                return Err(OrchestratorError::InvalidTransition {
                    from: job.status,
                    to: JobStatus::Submitted,
                });
            }
            let payload = slot
                .handle
                .as_ref()
                .map(ImageHandle::payload)
                .ok_or_else(|| OrchestratorError::Internal(format!("staged job {} has no image", job_id)))?;

            let submitted = job.transition_to(JobStatus::Submitted)?;
            self.publish(submitted);
            let in_flight = job.transition_to(JobStatus::InFlight)?;
            self.publish(in_flight);

            let (cancel_tx, cancel_rx) = oneshot::channel();
            slot.in_flight = Some(InFlightCall { job_id, cancel_tx });
            (payload, cancel_rx)
        };

        info!(
            job_id = %job_id,
            service = self.inference.name(),
            timeout_ms = self.timeout.as_millis() as u64,
            "Analysis job in flight"
        );

        let answer = tokio::select! {
            biased;
            cancelled = &mut cancel_rx => {
                return cancelled.map_err(|_| {
                    OrchestratorError::Internal(format!("job {} lost its cancellation channel", job_id))
                });
            }
            answer = tokio::time::timeout(self.timeout, self.inference.submit(payload)) => answer,
        };

        let outcome = match answer {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(e)) => {
                warn!(job_id = %job_id, error = %e, "Inference service failed");
                Err(e.kind())
            }
            Err(_) => {
                warn!(job_id = %job_id, timeout_ms = self.timeout.as_millis() as u64, "Inference timed out");
                Err(AnalysisErrorKind::Timeout)
            }
        };

        self.settle(job_id, outcome, &mut cancel_rx)
    }

    fn settle(
        &self,
        job_id: Uuid,
        outcome: Result<BreedResult, AnalysisErrorKind>,
        cancel_rx: &mut oneshot::Receiver<AnalysisJob>,
    ) -> Result<AnalysisJob, OrchestratorError> {
        let mut guard = lock_or_recover(&self.slot);
        let slot = &mut *guard;

        let still_current = matches!(&slot.in_flight, Some(call) if call.job_id == job_id);
        if !still_current {
            // Superseded after the service answered but before we got the lock
            debug!(job_id = %job_id, "Discarding answer for superseded job");
            return cancel_rx
                .try_recv()
                .map_err(|_| OrchestratorError::UnknownJob(job_id));
        }
        slot.in_flight = None;

        let job = slot
            .job
            .as_mut()
            .filter(|job| job.id == job_id)
            .ok_or_else(|| OrchestratorError::Internal(format!("in-flight job {} missing", job_id)))?;

        let transition = match outcome {
            Ok(result) => {
                let breed = result.name.clone();
                let confidence = result.confidence;
                let transition = job.complete(result)?;
                info!(
                    job_id = %job_id,
                    breed = %breed,
                    confidence,
                    duration_ms = ?job.duration_ms(),
                    "Analysis completed"
                );
                transition
            }
            Err(kind) => {
                let transition = job.fail(kind)?;
                info!(job_id = %job_id, error = %kind, duration_ms = ?job.duration_ms(), "Analysis failed");
                transition
            }
        };
        self.publish(transition);
        slot.handle = None;

        Ok(job.clone())
    }

    /// Stage and submit in one call
    pub async fn run(&self, handle: ImageHandle) -> Result<AnalysisJob, OrchestratorError> {
        let StartOutcome { job, .. } = self.start(handle);
        self.submit(job.id).await
    }

    /// Drop the current job because its session ended
    ///
    /// A live job is cancelled first (its call sees the cancellation), then
    /// whatever job remains is released, so nothing from the old session
    /// survives into the next one. Returns the released job id.
    pub fn end_session_release(&self) -> Option<Uuid> {
        let mut guard = lock_or_recover(&self.slot);
        let slot = &mut *guard;
        self.cancel_locked(slot);
        self.release_locked(slot)
    }

    /// Release a terminal job and return to idle
    ///
    /// Returns the released job id, or `None` when already idle. A live job
    /// must be cancelled or superseded instead.
    pub fn reset(&self) -> Result<Option<Uuid>, OrchestratorError> {
        let mut guard = lock_or_recover(&self.slot);
        if let Some(job) = guard.job.as_ref().filter(|job| job.is_active()) {
            return Err(OrchestratorError::JobActive(job.id));
        }
        Ok(self.release_locked(&mut guard))
    }

    fn release_locked(&self, slot: &mut JobSlot) -> Option<Uuid> {
        let job_id = slot.job.take()?.id;
        slot.handle = None;
        slot.in_flight = None;
        self.event_bus.emit_lossy(BreedVisionEvent::JobReleased {
            job_id,
            timestamp: breedvision_common::time::now(),
        });
        debug!(job_id = %job_id, "Analysis job released");
        Some(job_id)
    }

    /// Snapshot of the current job (`None` when idle)
    pub fn current(&self) -> Option<AnalysisJob> {
        lock_or_recover(&self.slot).job.clone()
    }

    pub fn status(&self) -> Option<JobStatus> {
        lock_or_recover(&self.slot).job.as_ref().map(|job| job.status)
    }

    /// Whether the current job still holds its image
    pub fn holds_image(&self) -> bool {
        lock_or_recover(&self.slot).handle.is_some()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BreedVisionEvent> {
        self.event_bus.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InferenceError;
    use crate::models::{ImagePayload, RawImageSource};
    use crate::providers::SimulatedInferenceService;
    use async_trait::async_trait;

    fn handle() -> ImageHandle {
        ImageHandle::new(
            RawImageSource::new(vec![0x89, b'P', b'N', b'G'], Some("image/png")),
            "image/png".to_string(),
        )
    }

    fn orchestrator(service: impl InferenceService + 'static) -> AnalysisOrchestrator {
        AnalysisOrchestrator::new(Arc::new(service), Duration::from_secs(30), EventBus::new(64))
    }

    struct Refusing;

    #[async_trait]
    impl InferenceService for Refusing {
        fn name(&self) -> &'static str {
            "refusing"
        }

        async fn submit(&self, _image: ImagePayload) -> Result<BreedResult, InferenceError> {
            Err(InferenceError::Unavailable("model offline".to_string()))
        }
    }

    fn statuses(rx: &mut broadcast::Receiver<BreedVisionEvent>) -> Vec<(Option<JobStatus>, JobStatus)> {
        let mut seen = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let BreedVisionEvent::JobStatusChanged { old_status, new_status, .. } = event {
                seen.push((old_status, new_status));
            }
        }
        seen
    }

    #[tokio::test]
    async fn test_happy_path_transitions() {
        let orchestrator = orchestrator(SimulatedInferenceService::new(Duration::ZERO));
        let mut rx = orchestrator.subscribe();

        let job = orchestrator.run(handle()).await.unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.result.as_ref().unwrap().name, "Gir Cattle");
        assert!(!orchestrator.holds_image());

        assert_eq!(
            statuses(&mut rx),
            vec![
                (None, JobStatus::Staged),
                (Some(JobStatus::Staged), JobStatus::Submitted),
                (Some(JobStatus::Submitted), JobStatus::InFlight),
                (Some(JobStatus::InFlight), JobStatus::Completed),
            ]
        );
    }

    #[tokio::test]
    async fn test_service_failure_is_classified() {
        let orchestrator = orchestrator(Refusing);
        let job = orchestrator.run(handle()).await.unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error, Some(AnalysisErrorKind::ServiceUnavailable));
        assert!(job.result.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_fails_job() {
        let orchestrator = AnalysisOrchestrator::new(
            Arc::new(SimulatedInferenceService::new(Duration::from_secs(60))),
            Duration::from_secs(5),
            EventBus::new(16),
        );
        let job = orchestrator.run(handle()).await.unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error, Some(AnalysisErrorKind::Timeout));
    }

    #[tokio::test]
    async fn test_restaging_supersedes_staged_job() {
        let orchestrator = orchestrator(SimulatedInferenceService::new(Duration::ZERO));
        let first = orchestrator.start(handle());
        assert!(first.superseded.is_none());

        let second = orchestrator.start(handle());
        let superseded = second.superseded.unwrap();
        assert_eq!(superseded.id, first.job.id);
        assert_eq!(superseded.status, JobStatus::Cancelled);
        assert_eq!(orchestrator.current().unwrap().id, second.job.id);

        // The superseded id can no longer be submitted
        assert_eq!(
            orchestrator.submit(first.job.id).await,
            Err(OrchestratorError::UnknownJob(first.job.id))
        );
    }

    #[tokio::test]
    async fn test_double_submit_rejected() {
        let orchestrator = orchestrator(SimulatedInferenceService::new(Duration::ZERO));
        let job_id = orchestrator.start(handle()).job.id;
        orchestrator.submit(job_id).await.unwrap();
        assert!(matches!(
            orchestrator.submit(job_id).await,
            Err(OrchestratorError::InvalidTransition { from: JobStatus::Completed, .. })
        ));
    }

    #[tokio::test]
    async fn test_reset_rules() {
        let orchestrator = orchestrator(SimulatedInferenceService::new(Duration::ZERO));
        assert_eq!(orchestrator.reset(), Ok(None));

        let job_id = orchestrator.start(handle()).job.id;
        assert_eq!(orchestrator.reset(), Err(OrchestratorError::JobActive(job_id)));

        orchestrator.submit(job_id).await.unwrap();
        let mut rx = orchestrator.subscribe();
        assert_eq!(orchestrator.reset(), Ok(Some(job_id)));
        assert!(orchestrator.current().is_none());
        assert!(matches!(
            rx.try_recv().unwrap(),
            BreedVisionEvent::JobReleased { job_id: released, .. } if released == job_id
        ));
    }

    #[tokio::test]
    async fn test_end_session_release_clears_terminal_job() {
        let orchestrator = orchestrator(SimulatedInferenceService::new(Duration::ZERO));
        assert!(orchestrator.end_session_release().is_none());

        let job = orchestrator.run(handle()).await.unwrap();
        assert_eq!(job.status, JobStatus::Completed);

        let mut rx = orchestrator.subscribe();
        assert_eq!(orchestrator.end_session_release(), Some(job.id));
        assert!(orchestrator.current().is_none());
        assert!(matches!(
            rx.try_recv().unwrap(),
            BreedVisionEvent::JobReleased { job_id, .. } if job_id == job.id
        ));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_end_session_release_cancels_live_job_first() {
        let orchestrator = orchestrator(SimulatedInferenceService::new(Duration::ZERO));
        let staged = orchestrator.start(handle()).job;

        let mut rx = orchestrator.subscribe();
        assert_eq!(orchestrator.end_session_release(), Some(staged.id));
        assert_eq!(
            statuses(&mut rx),
            vec![(Some(JobStatus::Staged), JobStatus::Cancelled)]
        );
        assert!(orchestrator.current().is_none());
        assert!(!orchestrator.holds_image());
    }
}
