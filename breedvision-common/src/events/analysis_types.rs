//! Analysis job type definitions
//!
//! Supporting types for the analysis job lifecycle.

use serde::{Deserialize, Serialize};

/// Analysis job status
///
/// `Idle` is not a job status: it is the absence of a job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "PascalCase")]
pub enum JobStatus {
    /// Image handle accepted, not yet sent for inference
    Staged,
    /// Inference call dispatched
    Submitted,
    /// Awaiting the inference outcome
    InFlight,
    /// Inference returned a result
    Completed,
    /// Inference failed (timeout, unavailable, malformed response)
    Failed,
    /// Superseded by a newer job or cancelled by sign-out
    Cancelled,
}

impl JobStatus {
    /// Terminal states are never left except by an explicit reset
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    /// States a new `start` may pre-empt
    pub fn is_preemptible(&self) -> bool {
        matches!(
            self,
            JobStatus::Staged | JobStatus::Submitted | JobStatus::InFlight
        )
    }

    /// States holding an outstanding external call
    pub fn is_awaiting_inference(&self) -> bool {
        matches!(self, JobStatus::Submitted | JobStatus::InFlight)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Staged => write!(f, "Staged"),
            JobStatus::Submitted => write!(f, "Submitted"),
            JobStatus::InFlight => write!(f, "InFlight"),
            JobStatus::Completed => write!(f, "Completed"),
            JobStatus::Failed => write!(f, "Failed"),
            JobStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// Why an analysis job did not complete
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "PascalCase")]
pub enum AnalysisErrorKind {
    Timeout,
    ServiceUnavailable,
    MalformedResponse,
    /// Deliberate supersession, never shown to the user as a failure
    Cancelled,
}

impl AnalysisErrorKind {
    /// Locale content key for the user-facing message
    pub fn content_key(&self) -> &'static str {
        match self {
            AnalysisErrorKind::Timeout => "analysis.error.timeout",
            AnalysisErrorKind::ServiceUnavailable => "analysis.error.unavailable",
            AnalysisErrorKind::MalformedResponse => "analysis.error.malformed",
            AnalysisErrorKind::Cancelled => "analysis.cancelled",
        }
    }
}

impl std::fmt::Display for AnalysisErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisErrorKind::Timeout => write!(f, "inference timed out"),
            AnalysisErrorKind::ServiceUnavailable => write!(f, "inference service unavailable"),
            AnalysisErrorKind::MalformedResponse => write!(f, "malformed inference response"),
            AnalysisErrorKind::Cancelled => write!(f, "analysis cancelled"),
        }
    }
}
