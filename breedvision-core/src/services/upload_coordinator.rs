//! Upload validation and staging
//!
//! Turns an unvalidated `RawImageSource` into an `ImageHandle` and hands it
//! to the orchestrator, which supersedes any job in progress.

use crate::error::ValidationError;
use crate::models::{ImageHandle, RawImageSource};
use crate::services::analysis_orchestrator::{AnalysisOrchestrator, StartOutcome};
use std::sync::Arc;
use tracing::{debug, warn};

/// Normalize a declared media type: lowercase, parameters stripped
fn normalize_media_type(declared: &str) -> String {
    declared
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

fn is_image_type(media_type: &str) -> bool {
    media_type
        .strip_prefix("image/")
        .is_some_and(|subtype| !subtype.is_empty())
}

/// Validate a source and determine its media type
///
/// A declared type is trusted when present; otherwise the type is sniffed
/// from the leading bytes.
pub fn validate(source: &RawImageSource) -> Result<String, ValidationError> {
    let declared = source
        .declared_media_type
        .as_deref()
        .map(normalize_media_type)
        .filter(|media_type| !media_type.is_empty());

    if let Some(media_type) = &declared {
        if !is_image_type(media_type) {
            return Err(ValidationError::NotAnImage);
        }
    }

    if source.bytes.is_empty() {
        return Err(ValidationError::Empty);
    }

    match declared {
        Some(media_type) => Ok(media_type),
        None => {
            let sniffed = infer::get(&source.bytes)
                .filter(|kind| kind.matcher_type() == infer::MatcherType::Image)
                .ok_or(ValidationError::NotAnImage)?;
            debug!(media_type = sniffed.mime_type(), "Media type sniffed from content");
            Ok(sniffed.mime_type().to_string())
        }
    }
}

pub struct UploadCoordinator {
    orchestrator: Arc<AnalysisOrchestrator>,
}

impl UploadCoordinator {
    pub fn new(orchestrator: Arc<AnalysisOrchestrator>) -> Self {
        Self { orchestrator }
    }

    /// Validate and stage an upload
    ///
    /// A rejected source leaves the current job untouched.
    pub fn stage(&self, source: RawImageSource) -> Result<StartOutcome, ValidationError> {
        let media_type = match validate(&source) {
            Ok(media_type) => media_type,
            Err(e) => {
                warn!(
                    file_name = ?source.file_name,
                    origin = ?source.origin,
                    error = %e,
                    "Upload rejected"
                );
                return Err(e);
            }
        };
        let handle = ImageHandle::new(source, media_type);
        Ok(self.orchestrator.start(handle))
    }
}
