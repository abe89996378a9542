//! Auth session state
//!
//! Modelled as an enum so that `user_id`/`email` exist only while signed in
//! and `error` exists only in the error state.

use breedvision_common::events::{AuthErrorKind, AuthStatus};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "status")]
pub enum AuthSession {
    #[default]
    SignedOut,
    Authenticating,
    SignedIn { user_id: String, email: String },
    AuthError { error: AuthErrorKind },
}

impl AuthSession {
    pub fn status(&self) -> AuthStatus {
        match self {
            AuthSession::SignedOut => AuthStatus::SignedOut,
            AuthSession::Authenticating => AuthStatus::Authenticating,
            AuthSession::SignedIn { .. } => AuthStatus::SignedIn,
            AuthSession::AuthError { .. } => AuthStatus::AuthError,
        }
    }

    pub fn is_signed_in(&self) -> bool {
        matches!(self, AuthSession::SignedIn { .. })
    }

    pub fn user_id(&self) -> Option<&str> {
        match self {
            AuthSession::SignedIn { user_id, .. } => Some(user_id),
            _ => None,
        }
    }

    pub fn email(&self) -> Option<&str> {
        match self {
            AuthSession::SignedIn { email, .. } => Some(email),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<AuthErrorKind> {
        match self {
            AuthSession::AuthError { error } => Some(*error),
            _ => None,
        }
    }
}
