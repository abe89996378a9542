//! Render-ready view of the session
//!
//! Built fresh from the auth session, the current job and the active
//! locale. Breed data is shown as returned; only the labels around it are
//! localized.

use crate::models::{AnalysisJob, AuthSession, BreedResult};
use crate::services::locale_resolver::LocaleResolver;
use crate::services::ui_gate;
use breedvision_common::events::{AnalysisErrorKind, JobStatus};
use serde::Serialize;
use std::fmt::Write as _;

/// A labelled value in the result card
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub label: String,
    pub value: String,
}

impl Field {
    fn new(resolver: &LocaleResolver, key: &str, value: &str) -> Self {
        Self {
            label: resolver.resolve(key),
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultView {
    pub breed: String,
    /// e.g. "94% Match"
    pub confidence_badge: String,
    pub origin: Field,
    pub milk_heading: String,
    pub milk_yield: Field,
    pub traits_heading: String,
    pub traits: Vec<Field>,
    pub characteristics_heading: String,
    pub characteristics: Vec<String>,
    pub description: String,
}

impl ResultView {
    fn build(resolver: &LocaleResolver, result: &BreedResult) -> Self {
        let traits = &result.physical_traits;
        Self {
            breed: result.name.clone(),
            confidence_badge: format!("{}% {}", result.confidence, resolver.resolve("result.match")),
            origin: Field::new(resolver, "result.origin", &result.origin),
            milk_heading: resolver.resolve("result.milk_production"),
            milk_yield: Field::new(resolver, "result.avg_daily_yield", &result.avg_milk_yield),
            traits_heading: resolver.resolve("result.physical_traits"),
            traits: vec![
                Field::new(resolver, "result.height", &traits.height),
                Field::new(resolver, "result.weight", &traits.weight),
                Field::new(resolver, "result.color", &traits.color),
                Field::new(resolver, "result.horns", &traits.horns),
            ],
            characteristics_heading: resolver.resolve("result.characteristics"),
            characteristics: result.characteristics.clone(),
            description: result.description.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionView {
    pub locale: String,
    pub title: String,
    pub can_upload: bool,
    pub gate_message: Option<String>,
    pub job_status: Option<JobStatus>,
    pub status_line: Option<String>,
    pub result: Option<ResultView>,
}

fn status_key(job: &AnalysisJob) -> Option<&'static str> {
    match (job.status, job.error) {
        (JobStatus::Staged, _) => Some("analysis.staged"),
        (JobStatus::Submitted | JobStatus::InFlight, _) => Some("analysis.in_progress"),
        (JobStatus::Completed, _) => Some("analysis.completed"),
        (JobStatus::Failed, Some(kind)) if kind != AnalysisErrorKind::Cancelled => Some(kind.content_key()),
        (JobStatus::Failed, _) => Some("analysis.failed"),
        // Superseded work is not reported to the user
        (JobStatus::Cancelled, _) => None,
    }
}

impl SessionView {
    pub fn build(auth: &AuthSession, job: Option<&AnalysisJob>, resolver: &LocaleResolver) -> Self {
        let gate = ui_gate::evaluate(auth);
        let gate_message = gate.message.map(|message| {
            let text = resolver.resolve(message.content_key());
            match message {
                ui_gate::GateMessage::AuthFailed(kind) => {
                    format!("{} {}", text, resolver.resolve(kind.content_key()))
                }
                _ => text,
            }
        });

        Self {
            locale: resolver.active_code(),
            title: resolver.resolve("app.title"),
            can_upload: gate.can_upload,
            gate_message,
            job_status: job.map(|job| job.status),
            status_line: job.and_then(status_key).map(|key| resolver.resolve(key)),
            result: job
                .and_then(|job| job.result.as_ref())
                .map(|result| ResultView::build(resolver, result)),
        }
    }

    /// Plain-text rendering for terminal output
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "== {} ==", self.title);
        if let Some(message) = &self.gate_message {
            let _ = writeln!(out, "{}", message);
        }
        if let Some(status) = &self.status_line {
            let _ = writeln!(out, "{}", status);
        }
        if let Some(result) = &self.result {
            let _ = writeln!(out, "{} ({})", result.breed, result.confidence_badge);
            let _ = writeln!(out, "{}: {}", result.origin.label, result.origin.value);
            let _ = writeln!(out, "{}", result.milk_heading);
            let _ = writeln!(out, "  {}: {}", result.milk_yield.label, result.milk_yield.value);
            let _ = writeln!(out, "{}", result.traits_heading);
            for field in &result.traits {
                let _ = writeln!(out, "  {}: {}", field.label, field.value);
            }
            let _ = writeln!(out, "{}", result.characteristics_heading);
            for item in &result.characteristics {
                let _ = writeln!(out, "  - {}", item);
            }
            let _ = writeln!(out, "{}", result.description);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MemoryLocaleStore;
    use crate::services::locale_resolver::LocaleCatalog;
    use breedvision_common::events::{AuthErrorKind, EventBus};
    use std::sync::Arc;
    use uuid::Uuid;

    fn resolver() -> LocaleResolver {
        LocaleResolver::new(
            LocaleCatalog::builtin().unwrap(),
            "en",
            Arc::new(MemoryLocaleStore::new()),
            EventBus::new(8),
        )
        .unwrap()
    }

    fn signed_in() -> AuthSession {
        AuthSession::SignedIn {
            user_id: "u-1".to_string(),
            email: "a@farm.in".to_string(),
        }
    }

    fn completed_job() -> AnalysisJob {
        let (mut job, _) = AnalysisJob::new(Uuid::new_v4());
        job.transition_to(JobStatus::Submitted).unwrap();
        job.transition_to(JobStatus::InFlight).unwrap();
        job.complete(BreedResult::gir_cattle()).unwrap();
        job
    }

    #[test]
    fn test_signed_out_view_is_gated() {
        let view = SessionView::build(&AuthSession::SignedOut, None, &resolver());
        assert!(!view.can_upload);
        assert_eq!(
            view.gate_message.as_deref(),
            Some("Please sign in or create an account to upload images.")
        );
        assert!(view.result.is_none());
    }

    #[test]
    fn test_auth_failure_message_includes_reason() {
        let session = AuthSession::AuthError {
            error: AuthErrorKind::RateLimited,
        };
        let view = SessionView::build(&session, None, &resolver());
        let message = view.gate_message.unwrap();
        assert!(message.starts_with("Sign-in failed."));
        assert!(message.ends_with("Too many attempts. Please wait and try again."));
    }

    #[test]
    fn test_completed_job_renders_result() {
        let job = completed_job();
        let view = SessionView::build(&signed_in(), Some(&job), &resolver());
        let result = view.result.as_ref().unwrap();
        assert_eq!(result.confidence_badge, "94% Match");
        assert_eq!(result.origin.label, "Origin");
        assert_eq!(result.traits.len(), 4);
        assert_eq!(view.status_line.as_deref(), Some("Analysis complete"));

        let text = view.to_text();
        assert!(text.contains("Gir Cattle (94% Match)"));
    }

    #[test]
    fn test_locale_switch_changes_labels_not_data() {
        let resolver = resolver();
        let job = completed_job();
        let before = SessionView::build(&signed_in(), Some(&job), &resolver);

        resolver.set_locale("hi").unwrap();
        let after = SessionView::build(&signed_in(), Some(&job), &resolver);

        let (before, after) = (before.result.unwrap(), after.result.unwrap());
        assert_eq!(after.confidence_badge, "94% मिलान");
        assert_eq!(before.breed, after.breed);
        assert_eq!(before.origin.value, after.origin.value);
        assert_ne!(before.origin.label, after.origin.label);
    }

    #[test]
    fn test_cancelled_job_has_no_status_line() {
        let (mut job, _) = AnalysisJob::new(Uuid::new_v4());
        job.cancel().unwrap();
        let view = SessionView::build(&signed_in(), Some(&job), &resolver());
        assert_eq!(view.job_status, Some(JobStatus::Cancelled));
        assert!(view.status_line.is_none());
    }
}
