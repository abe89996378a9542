//! Authentication-related type definitions
//!
//! Supporting types for the auth session lifecycle.

use serde::{Deserialize, Serialize};

/// Session status as observed by the rest of the application
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "PascalCase")]
pub enum AuthStatus {
    /// No authenticated user (initial state)
    SignedOut,
    /// A sign-in or sign-up request is awaiting the identity provider
    Authenticating,
    /// A user is authenticated
    SignedIn,
    /// The last authentication attempt was rejected
    AuthError,
}

impl std::fmt::Display for AuthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthStatus::SignedOut => write!(f, "SignedOut"),
            AuthStatus::Authenticating => write!(f, "Authenticating"),
            AuthStatus::SignedIn => write!(f, "SignedIn"),
            AuthStatus::AuthError => write!(f, "AuthError"),
        }
    }
}

/// Reasons an authentication request fails
///
/// `PasswordMismatch` and `MissingFullName` are only ever produced by local
/// sign-up validation; the identity provider never reports them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "PascalCase")]
pub enum AuthErrorKind {
    InvalidCredentials,
    UserNotFound,
    InvalidEmailFormat,
    EmailInUse,
    WeakPassword,
    RateLimited,
    PasswordMismatch,
    MissingFullName,
    Unknown,
}

impl AuthErrorKind {
    /// Locale content key for the user-facing message
    pub fn content_key(&self) -> &'static str {
        match self {
            AuthErrorKind::InvalidCredentials => "auth.error.invalid_credentials",
            AuthErrorKind::UserNotFound => "auth.error.user_not_found",
            AuthErrorKind::InvalidEmailFormat => "auth.error.invalid_email",
            AuthErrorKind::EmailInUse => "auth.error.email_in_use",
            AuthErrorKind::WeakPassword => "auth.error.weak_password",
            AuthErrorKind::RateLimited => "auth.error.rate_limited",
            AuthErrorKind::PasswordMismatch => "auth.error.password_mismatch",
            AuthErrorKind::MissingFullName => "auth.error.missing_full_name",
            AuthErrorKind::Unknown => "auth.error.unknown",
        }
    }
}

impl std::fmt::Display for AuthErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            AuthErrorKind::InvalidCredentials => "invalid credentials",
            AuthErrorKind::UserNotFound => "user not found",
            AuthErrorKind::InvalidEmailFormat => "invalid email format",
            AuthErrorKind::EmailInUse => "email already in use",
            AuthErrorKind::WeakPassword => "password too weak",
            AuthErrorKind::RateLimited => "too many attempts",
            AuthErrorKind::PasswordMismatch => "passwords do not match",
            AuthErrorKind::MissingFullName => "full name is required",
            AuthErrorKind::Unknown => "unknown authentication error",
        };
        f.write_str(text)
    }
}

/// Which authentication dialog is open
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub enum AuthDialogMode {
    SignIn,
    SignUp,
}
