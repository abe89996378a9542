//! Firebase Authentication client (Identity Toolkit REST API)

use crate::error::ProviderError;
use crate::lock_or_recover;
use crate::providers::identity::{IdentityProvider, ProviderSession};
use async_trait::async_trait;
use breedvision_common::events::AuthErrorKind;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::broadcast;

const IDENTITY_TOOLKIT_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";
const REQUEST_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    display_name: Option<&'a str>,
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthResponse {
    local_id: String,
    email: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    id_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Map an Identity Toolkit error message onto an `AuthErrorKind`
///
/// Messages look like `EMAIL_NOT_FOUND` or
/// `WEAK_PASSWORD : Password should be at least 6 characters`.
pub fn map_error_message(message: &str) -> AuthErrorKind {
    let code = message.split(&[' ', ':'][..]).next().unwrap_or_default();
    match code {
        "EMAIL_NOT_FOUND" => AuthErrorKind::UserNotFound,
        "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" | "USER_DISABLED" => {
            AuthErrorKind::InvalidCredentials
        }
        "INVALID_EMAIL" | "MISSING_EMAIL" => AuthErrorKind::InvalidEmailFormat,
        "EMAIL_EXISTS" => AuthErrorKind::EmailInUse,
        "WEAK_PASSWORD" | "MISSING_PASSWORD" => AuthErrorKind::WeakPassword,
        "TOO_MANY_ATTEMPTS_TRY_LATER" => AuthErrorKind::RateLimited,
        _ => AuthErrorKind::Unknown,
    }
}

/// Firebase email/password identity provider
///
/// Firebase has no server-side sign-out for password sessions, so
/// `sign_out` only drops the local session and notifies subscribers.
pub struct FirebaseIdentityProvider {
    http_client: reqwest::Client,
    api_key: String,
    base_url: String,
    current: Mutex<Option<ProviderSession>>,
    changes: broadcast::Sender<Option<ProviderSession>>,
}

impl FirebaseIdentityProvider {
    pub fn new(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Self::with_base_url(api_key, IDENTITY_TOOLKIT_BASE_URL)
    }

    /// Point at a different endpoint (Firebase emulator)
    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        let (changes, _) = broadcast::channel(32);

        Ok(Self {
            http_client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            current: Mutex::new(None),
            changes,
        })
    }

    async fn post(
        &self,
        method: &str,
        request: &PasswordRequest<'_>,
    ) -> Result<ProviderSession, ProviderError> {
        let url = format!("{}/accounts:{}?key={}", self.base_url, method, self.api_key);

        tracing::debug!(method = %method, email = %request.email, "Calling Identity Toolkit");

        let response = self
            .http_client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match serde_json::from_str::<ErrorEnvelope>(&body) {
                Ok(envelope) => {
                    tracing::debug!(status = %status, message = %envelope.error.message, "Identity Toolkit rejected request");
                    ProviderError::Rejected(map_error_message(&envelope.error.message))
                }
                Err(_) => ProviderError::Transport(format!("HTTP {}: {}", status.as_u16(), body)),
            });
        }

        let auth: AuthResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let session = ProviderSession {
            user_id: auth.local_id,
            email: auth.email,
            display_name: auth.display_name.filter(|name| !name.is_empty()),
            id_token: auth.id_token,
        };
        *lock_or_recover(&self.current) = Some(session.clone());
        let _ = self.changes.send(Some(session.clone()));
        Ok(session)
    }
}

#[async_trait]
impl IdentityProvider for FirebaseIdentityProvider {
    fn name(&self) -> &'static str {
        "firebase"
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<ProviderSession, ProviderError> {
        let request = PasswordRequest {
            email,
            password,
            display_name: None,
            return_secure_token: true,
        };
        self.post("signInWithPassword", &request).await
    }

    async fn sign_up_with_password(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<ProviderSession, ProviderError> {
        let request = PasswordRequest {
            email,
            password,
            display_name: Some(full_name),
            return_secure_token: true,
        };
        self.post("signUp", &request).await
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        *lock_or_recover(&self.current) = None;
        let _ = self.changes.send(None);
        Ok(())
    }

    /// Session from the last successful request, if not signed out since
    fn current_session(&self) -> Option<ProviderSession> {
        lock_or_recover(&self.current).clone()
    }

    fn subscribe(&self) -> broadcast::Receiver<Option<ProviderSession>> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_mapping() {
        assert_eq!(map_error_message("EMAIL_NOT_FOUND"), AuthErrorKind::UserNotFound);
        assert_eq!(map_error_message("INVALID_PASSWORD"), AuthErrorKind::InvalidCredentials);
        assert_eq!(
            map_error_message("INVALID_LOGIN_CREDENTIALS"),
            AuthErrorKind::InvalidCredentials
        );
        assert_eq!(map_error_message("INVALID_EMAIL"), AuthErrorKind::InvalidEmailFormat);
        assert_eq!(map_error_message("EMAIL_EXISTS"), AuthErrorKind::EmailInUse);
        assert_eq!(
            map_error_message("WEAK_PASSWORD : Password should be at least 6 characters"),
            AuthErrorKind::WeakPassword
        );
        assert_eq!(
            map_error_message(
                "TOO_MANY_ATTEMPTS_TRY_LATER : Access to this account has been temporarily disabled"
            ),
            AuthErrorKind::RateLimited
        );
        assert_eq!(map_error_message("OPERATION_NOT_ALLOWED"), AuthErrorKind::Unknown);
        assert_eq!(map_error_message(""), AuthErrorKind::Unknown);
    }

    #[test]
    fn test_request_serialization() {
        let request = PasswordRequest {
            email: "a@b.in",
            password: "secret1",
            display_name: None,
            return_secure_token: true,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["returnSecureToken"], true);
        assert!(json.get("displayName").is_none());
    }

    #[test]
    fn test_response_deserialization() {
        let auth: AuthResponse = serde_json::from_str(
            r#"{"kind":"identitytoolkit#VerifyPasswordResponse","localId":"uid-7","email":"a@b.in","displayName":"","idToken":"tok","registered":true}"#,
        )
        .unwrap();
        assert_eq!(auth.local_id, "uid-7");
        assert_eq!(auth.id_token.as_deref(), Some("tok"));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let provider = FirebaseIdentityProvider::with_base_url("key", "http://localhost:9099/v1/").unwrap();
        assert_eq!(provider.base_url, "http://localhost:9099/v1");
    }
}
