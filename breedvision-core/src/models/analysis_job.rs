//! Analysis job state machine
//!
//! One job analyzes one staged image:
//! STAGED → SUBMITTED → IN_FLIGHT → { COMPLETED | FAILED | CANCELLED }
//!
//! Any non-terminal state may go straight to CANCELLED when superseded.

use crate::error::OrchestratorError;
use crate::models::BreedResult;
use breedvision_common::events::{AnalysisErrorKind, BreedVisionEvent, JobStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// State transition record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobTransition {
    pub job_id: Uuid,
    pub image_handle_id: Uuid,
    /// `None` when the job was created from `Idle`
    pub old_status: Option<JobStatus>,
    pub new_status: JobStatus,
    pub error: Option<AnalysisErrorKind>,
    pub transitioned_at: DateTime<Utc>,
}

impl JobTransition {
    pub fn into_event(self) -> BreedVisionEvent {
        BreedVisionEvent::JobStatusChanged {
            job_id: self.job_id,
            image_handle_id: self.image_handle_id,
            old_status: self.old_status,
            new_status: self.new_status,
            error: self.error,
            timestamp: self.transitioned_at,
        }
    }
}

/// Analysis job (in-memory state)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisJob {
    /// Unique job identifier, distinct from the image handle id
    pub id: Uuid,

    /// Handle this job analyzes
    pub image_handle_id: Uuid,

    /// Current workflow state
    pub status: JobStatus,

    /// When the job was staged
    pub created_at: DateTime<Utc>,

    /// Set on entering IN_FLIGHT
    pub started_at: Option<DateTime<Utc>>,

    /// Set on entering any terminal state
    pub completed_at: Option<DateTime<Utc>>,

    /// Present only when COMPLETED
    pub result: Option<BreedResult>,

    /// Present only when FAILED
    pub error: Option<AnalysisErrorKind>,
}

impl AnalysisJob {
    /// Create a new STAGED job for an image handle
    pub fn new(image_handle_id: Uuid) -> (Self, JobTransition) {
        let now = Utc::now();
        let job = Self {
            id: Uuid::new_v4(),
            image_handle_id,
            status: JobStatus::Staged,
            created_at: now,
            started_at: None,
            completed_at: None,
            result: None,
            error: None,
        };
        let transition = JobTransition {
            job_id: job.id,
            image_handle_id,
            old_status: None,
            new_status: JobStatus::Staged,
            error: None,
            transitioned_at: now,
        };
        (job, transition)
    }

    /// Whether `from -> to` is an edge of the job state machine
    pub fn is_legal(from: JobStatus, to: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (from, to),
            (Staged, Submitted)
                | (Submitted, InFlight)
                | (InFlight, Completed)
                | (InFlight, Failed)
                | (Staged, Cancelled)
                | (Submitted, Cancelled)
                | (InFlight, Cancelled)
        )
    }

    /// Transition to a non-terminal state
    pub fn transition_to(&mut self, new_status: JobStatus) -> Result<JobTransition, OrchestratorError> {
        self.apply(new_status, None)
    }

    /// IN_FLIGHT → COMPLETED, storing the result
    pub fn complete(&mut self, result: BreedResult) -> Result<JobTransition, OrchestratorError> {
        let transition = self.apply(JobStatus::Completed, None)?;
        self.result = Some(result);
        Ok(transition)
    }

    /// IN_FLIGHT → FAILED, storing the reason
    pub fn fail(&mut self, error: AnalysisErrorKind) -> Result<JobTransition, OrchestratorError> {
        debug_assert_ne!(error, AnalysisErrorKind::Cancelled, "cancellation is not a failure");
        self.apply(JobStatus::Failed, Some(error))
    }

    /// Any pre-emptible state → CANCELLED
    ///
    /// The reason travels on the transition only; a cancelled job holds no error.
    pub fn cancel(&mut self) -> Result<JobTransition, OrchestratorError> {
        let transition = self.apply(JobStatus::Cancelled, Some(AnalysisErrorKind::Cancelled))?;
        self.error = None;
        Ok(transition)
    }

    fn apply(
        &mut self,
        new_status: JobStatus,
        error: Option<AnalysisErrorKind>,
    ) -> Result<JobTransition, OrchestratorError> {
        if !Self::is_legal(self.status, new_status) {
            return Err(OrchestratorError::InvalidTransition {
                from: self.status,
                to: new_status,
            });
        }

        let now = Utc::now();
        let transition = JobTransition {
            job_id: self.id,
            image_handle_id: self.image_handle_id,
            old_status: Some(self.status),
            new_status,
            error,
            transitioned_at: now,
        };
        self.status = new_status;
        self.error = error;

        match new_status {
            JobStatus::InFlight => self.started_at = Some(now),
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled => {
                self.completed_at = Some(now);
            }
            _ => {}
        }

        Ok(transition)
    }

    /// Check if job is terminal (finished)
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Check if job may still be superseded
    pub fn is_active(&self) -> bool {
        self.status.is_preemptible()
    }

    /// Wall-clock inference time, once both ends are known
    pub fn duration_ms(&self) -> Option<u64> {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => Some(breedvision_common::time::elapsed_ms(start, end)),
            _ => None,
        }
    }
}
