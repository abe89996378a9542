//! Auth session state machine
//!
//! SignedOut → Authenticating → { SignedIn | AuthError }, and back to
//! SignedOut on sign-out. Credentials are checked locally before any
//! provider request; only rejections from the provider move the session
//! into `AuthError`.
//!
//! Signing out cancels any live analysis job and releases the current job in
//! the same step as the status change, so neither work nor results carry
//! over to a signed-out user or the next one. Lock order is
//! auth state, then the orchestrator's job slot.

use crate::error::{AuthError, ProviderError};
use crate::lock_or_recover;
use crate::models::AuthSession;
use crate::providers::{IdentityProvider, ProviderSession};
use crate::services::analysis_orchestrator::AnalysisOrchestrator;
use breedvision_common::events::{AuthDialogMode, AuthErrorKind, BreedVisionEvent, EventBus};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"));

/// Shape check only; the provider is the authority on real addresses
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

/// Sign-up form contents
#[derive(Debug, Clone, Copy)]
pub struct SignUpForm<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub confirm_password: &'a str,
    pub full_name: &'a str,
}

struct AuthState {
    session: AuthSession,
    dialog: Option<AuthDialogMode>,
    /// Bumped by every sign-in/sign-up attempt and every sign-out
    attempt: u64,
}

pub struct AuthSessionManager {
    provider: Arc<dyn IdentityProvider>,
    orchestrator: Arc<AnalysisOrchestrator>,
    event_bus: EventBus,
    min_password_length: usize,
    state: Mutex<AuthState>,
}

impl AuthSessionManager {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        orchestrator: Arc<AnalysisOrchestrator>,
        event_bus: EventBus,
        min_password_length: usize,
    ) -> Self {
        Self {
            provider,
            orchestrator,
            event_bus,
            min_password_length,
            state: Mutex::new(AuthState {
                session: AuthSession::SignedOut,
                dialog: None,
                attempt: 0,
            }),
        }
    }

    pub fn current(&self) -> AuthSession {
        lock_or_recover(&self.state).session.clone()
    }

    pub fn dialog(&self) -> Option<AuthDialogMode> {
        lock_or_recover(&self.state).dialog
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BreedVisionEvent> {
        self.event_bus.subscribe()
    }

    /// Apply a session change and announce it
    fn set_session(&self, state: &mut AuthState, session: AuthSession) {
        if state.session == session {
            return;
        }
        let old_status = state.session.status();
        self.event_bus.emit_lossy(BreedVisionEvent::AuthStatusChanged {
            old_status,
            new_status: session.status(),
            user_id: session.user_id().map(str::to_string),
            error: session.error(),
            timestamp: breedvision_common::time::now(),
        });
        debug!(from = %old_status, to = %session.status(), "Auth status changed");
        state.session = session;
    }

    fn set_dialog(&self, state: &mut AuthState, mode: Option<AuthDialogMode>) {
        if state.dialog == mode {
            return;
        }
        state.dialog = mode;
        self.event_bus.emit_lossy(BreedVisionEvent::AuthDialogChanged {
            mode,
            timestamp: breedvision_common::time::now(),
        });
    }

    /// Open the auth dialog, or switch its mode when already open
    pub fn open_dialog(&self, mode: AuthDialogMode) {
        let mut state = lock_or_recover(&self.state);
        self.set_dialog(&mut state, Some(mode));
    }

    pub fn close_dialog(&self) {
        let mut state = lock_or_recover(&self.state);
        self.set_dialog(&mut state, None);
    }

    /// Run `f` only while signed in, holding the session steady until it returns
    pub(crate) fn while_signed_in<R>(&self, f: impl FnOnce() -> R) -> Option<R> {
        let state = lock_or_recover(&self.state);
        let outcome = state.session.is_signed_in().then(f);
        drop(state);
        outcome
    }

    fn check_credentials(&self, email: &str, password: &str) -> Result<(), AuthError> {
        if !is_valid_email(email) {
            return Err(AuthError::Validation(AuthErrorKind::InvalidEmailFormat));
        }
        if password.chars().count() < self.min_password_length {
            return Err(AuthError::Validation(AuthErrorKind::WeakPassword));
        }
        Ok(())
    }

    /// Local checks for a sign-up form, in the order the form shows them
    pub fn check_sign_up(&self, form: &SignUpForm<'_>) -> Result<(), AuthError> {
        self.check_credentials(form.email.trim(), form.password)?;
        if form.password != form.confirm_password {
            return Err(AuthError::Validation(AuthErrorKind::PasswordMismatch));
        }
        if form.full_name.trim().is_empty() {
            return Err(AuthError::Validation(AuthErrorKind::MissingFullName));
        }
        Ok(())
    }

    fn begin_attempt(&self) -> u64 {
        let mut state = lock_or_recover(&self.state);
        state.attempt += 1;
        // Jobs never outlive the session that started them
        if state.session.is_signed_in() {
            if let Some(job_id) = self.orchestrator.end_session_release() {
                info!(job_id = %job_id, "Released analysis for re-authentication");
            }
        }
        self.set_session(&mut state, AuthSession::Authenticating);
        state.attempt
    }

    fn finish_attempt(
        &self,
        attempt: u64,
        outcome: Result<ProviderSession, ProviderError>,
    ) -> Result<AuthSession, AuthError> {
        let mut state = lock_or_recover(&self.state);
        if state.attempt != attempt {
            debug!(attempt, latest = state.attempt, "Discarding outcome of stale auth attempt");
            return Err(AuthError::Superseded);
        }

        match outcome {
            Ok(provider_session) => {
                let session = AuthSession::SignedIn {
                    user_id: provider_session.user_id,
                    email: provider_session.email,
                };
                info!(user_id = ?session.user_id(), provider = self.provider.name(), "Signed in");
                self.set_session(&mut state, session.clone());
                self.set_dialog(&mut state, None);
                Ok(session)
            }
            Err(e) => {
                let kind = e.kind();
                warn!(provider = self.provider.name(), error = %e, "Authentication rejected");
                self.set_session(&mut state, AuthSession::AuthError { error: kind });
                Err(AuthError::Provider(kind))
            }
        }
    }

    /// Sign in with email and password
    ///
    /// Fails locally with `Validation` (no provider call, session unchanged)
    /// for a malformed email or short password. When attempts overlap only
    /// the latest one is applied; earlier ones return `Superseded`.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let email = email.trim();
        self.check_credentials(email, password)?;

        let attempt = self.begin_attempt();
        let outcome = self.provider.sign_in_with_password(email, password).await;
        self.finish_attempt(attempt, outcome)
    }

    /// Create an account and sign in
    pub async fn sign_up(&self, form: SignUpForm<'_>) -> Result<AuthSession, AuthError> {
        self.check_sign_up(&form)?;

        let attempt = self.begin_attempt();
        let outcome = self
            .provider
            .sign_up_with_password(form.email.trim(), form.password, form.full_name.trim())
            .await;
        self.finish_attempt(attempt, outcome)
    }

    /// Sign out, cancelling any live analysis and releasing the current job
    ///
    /// A transport failure is reported as `Provider(Unknown)` and leaves both
    /// the session and the current job untouched.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        if let Err(e) = self.provider.sign_out().await {
            warn!(provider = self.provider.name(), error = %e, "Sign-out failed");
            return Err(AuthError::Provider(e.kind()));
        }

        let mut state = lock_or_recover(&self.state);
        self.end_session(&mut state, "signed out");
        Ok(())
    }

    fn end_session(&self, state: &mut AuthState, reason: &str) {
        state.attempt += 1;
        if let Some(job_id) = self.orchestrator.end_session_release() {
            info!(job_id = %job_id, reason, "Released analysis for ended session");
        }
        self.set_session(state, AuthSession::SignedOut);
        info!(reason, "Session ended");
    }

    /// Bring the session in line with what the provider currently holds
    ///
    /// Sign-in always goes through `sign_in`/`sign_up`; the provider can only
    /// end a session (remote sign-out, expiry) or swap the signed-in user.
    pub fn reconcile_with_provider(&self) -> AuthSession {
        let truth = self.provider.current_session();
        let mut state = lock_or_recover(&self.state);
        let signed_in_user = state.session.user_id().map(str::to_string);

        match (signed_in_user, truth) {
            (Some(_), None) => {
                self.end_session(&mut state, "provider ended session");
            }
            (Some(current_user), Some(provider_session)) if current_user != provider_session.user_id => {
                info!(user_id = %provider_session.user_id, "Provider switched signed-in user");
                if let Some(job_id) = self.orchestrator.end_session_release() {
                    info!(job_id = %job_id, "Released analysis for previous user");
                }
                self.set_session(
                    &mut state,
                    AuthSession::SignedIn {
                        user_id: provider_session.user_id,
                        email: provider_session.email,
                    },
                );
            }
            _ => {}
        }
        state.session.clone()
    }

    /// Follow provider-side session changes until `shutdown` fires
    pub fn watch_provider(self: &Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        let mut changes = self.provider.subscribe();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    change = changes.recv() => match change {
                        Ok(_) => {
                            manager.reconcile_with_provider();
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "Provider watcher lagged");
                            manager.reconcile_with_provider();
                        }
                        Err(RecvError::Closed) => break,
                    },
                }
            }
            debug!("Provider watcher stopped");
        })
    }
}
