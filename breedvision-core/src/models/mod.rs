//! Data model for the orchestration core

pub mod analysis_job;
pub mod auth_session;
pub mod breed_result;
pub mod image_handle;
pub mod locale;

pub use analysis_job::{AnalysisJob, JobTransition};
pub use auth_session::AuthSession;
pub use breed_result::{BreedResult, PhysicalTraits};
pub use image_handle::{ImageHandle, ImageOrigin, ImagePayload, RawImageSource};
pub use locale::{find_locale, LocaleBundle, LocaleInfo, SUPPORTED_LOCALES};

pub use breedvision_common::events::{
    AnalysisErrorKind, AuthDialogMode, AuthErrorKind, AuthStatus, JobStatus,
};
