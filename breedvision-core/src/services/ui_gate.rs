//! Upload gate
//!
//! Pure derivation from the auth session: no owned state, no side effects,
//! safe to recompute on every render.

use crate::models::AuthSession;
use breedvision_common::events::AuthErrorKind;
use serde::Serialize;

/// Message shown in place of the upload area
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GateMessage {
    /// Signed out: prompt to sign in or sign up
    SignInPrompt,
    /// Authentication in progress
    Checking,
    /// Last attempt rejected; prompt again with the reason
    AuthFailed(AuthErrorKind),
}

impl GateMessage {
    /// Locale content key for the message body
    pub fn content_key(&self) -> &'static str {
        match self {
            GateMessage::SignInPrompt => "gate.sign_in_prompt",
            GateMessage::Checking => "gate.checking",
            GateMessage::AuthFailed(_) => "gate.auth_failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GateDecision {
    pub can_upload: bool,
    pub message: Option<GateMessage>,
}

/// Upload is permitted exactly when a user is signed in
pub fn can_upload(session: &AuthSession) -> bool {
    session.is_signed_in()
}

pub fn gate_message(session: &AuthSession) -> Option<GateMessage> {
    match session {
        AuthSession::SignedOut => Some(GateMessage::SignInPrompt),
        AuthSession::Authenticating => Some(GateMessage::Checking),
        AuthSession::AuthError { error } => Some(GateMessage::AuthFailed(*error)),
        AuthSession::SignedIn { .. } => None,
    }
}

pub fn evaluate(session: &AuthSession) -> GateDecision {
    GateDecision {
        can_upload: can_upload(session),
        message: gate_message(session),
    }
}
