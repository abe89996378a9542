//! State machines and the components that drive them

pub mod analysis_orchestrator;
pub mod auth_session_manager;
pub mod locale_resolver;
pub mod presenter;
pub mod ui_gate;
pub mod upload_coordinator;

pub use analysis_orchestrator::{AnalysisOrchestrator, StartOutcome};
pub use auth_session_manager::{is_valid_email, AuthSessionManager, SignUpForm};
pub use locale_resolver::{LocaleCatalog, LocaleResolver, LOCALE_STORAGE_KEY};
pub use presenter::{Field, ResultView, SessionView};
pub use ui_gate::{GateDecision, GateMessage};
pub use upload_coordinator::UploadCoordinator;
