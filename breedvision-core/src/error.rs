//! Error types for breedvision-core
//!
//! Every condition here is local and recoverable: it is returned as a value
//! from the owning component and never escapes as a panic. The one fatal
//! class, an internal invariant violation, is guarded by `debug_assert!` at
//! the point where it could arise.

use breedvision_common::events::{AnalysisErrorKind, AuthErrorKind, JobStatus};
use thiserror::Error;
use uuid::Uuid;

/// Upload rejected before any workflow starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Declared or sniffed media type is not `image/*`
    #[error("source is not an image")]
    NotAnImage,

    /// Source has zero length
    #[error("source is empty")]
    Empty,
}

impl ValidationError {
    /// Locale content key for the user-facing message
    pub fn content_key(&self) -> &'static str {
        match self {
            ValidationError::NotAnImage => "upload.error.not_an_image",
            ValidationError::Empty => "upload.error.empty",
        }
    }
}

/// Authentication failure
///
/// `Validation` means the request never reached the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("invalid input: {0}")]
    Validation(AuthErrorKind),

    #[error("identity provider rejected request: {0}")]
    Provider(AuthErrorKind),

    /// A newer sign-in or sign-up attempt started before this one finished
    #[error("authentication attempt superseded")]
    Superseded,
}

impl AuthError {
    pub fn kind(&self) -> AuthErrorKind {
        match self {
            AuthError::Validation(kind) | AuthError::Provider(kind) => *kind,
            AuthError::Superseded => AuthErrorKind::Unknown,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, AuthError::Validation(_))
    }
}

/// Locale selection failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocaleError {
    #[error("unsupported locale: {0}")]
    Unsupported(String),
}

/// Illegal use of the analysis state machine
///
/// These indicate a caller bug (acting on a stale job id, resetting a live
/// job), not an external failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrchestratorError {
    /// Job id is not the current job (superseded or released)
    #[error("job {0} is not the current job")]
    UnknownJob(Uuid),

    #[error("illegal job transition {from} -> {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },

    /// Reset requested while the current job is still live
    #[error("job {0} is still active")]
    JobActive(Uuid),

    /// The in-flight call lost its cancellation channel without an outcome
    #[error("internal error: {0}")]
    Internal(String),
}

/// Gated upload failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    /// `UIGate.canUpload` is false for the current session
    #[error("upload not permitted in the current session state")]
    NotPermitted,

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Failure reported by an inference service
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InferenceError {
    #[error("inference timed out")]
    Timeout,

    #[error("inference service unavailable: {0}")]
    Unavailable(String),

    #[error("malformed inference response: {0}")]
    MalformedResponse(String),
}

impl InferenceError {
    pub fn kind(&self) -> AnalysisErrorKind {
        match self {
            InferenceError::Timeout => AnalysisErrorKind::Timeout,
            InferenceError::Unavailable(_) => AnalysisErrorKind::ServiceUnavailable,
            InferenceError::MalformedResponse(_) => AnalysisErrorKind::MalformedResponse,
        }
    }
}

/// Failure reported by an identity provider
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// Provider understood the request and rejected it
    #[error("rejected: {0}")]
    Rejected(AuthErrorKind),

    /// Provider could not be reached or answered unintelligibly
    #[error("transport error: {0}")]
    Transport(String),
}

impl ProviderError {
    pub fn kind(&self) -> AuthErrorKind {
        match self {
            ProviderError::Rejected(kind) => *kind,
            ProviderError::Transport(_) => AuthErrorKind::Unknown,
        }
    }
}

/// Failure assembling the application from configuration
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("identity provider: {0}")]
    Identity(#[from] ProviderError),

    #[error("inference service: {0}")]
    Inference(#[from] InferenceError),

    #[error("locale: {0}")]
    Locale(#[from] LocaleError),

    #[error(transparent)]
    Common(#[from] breedvision_common::Error),
}
