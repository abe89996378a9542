//! Identity provider contract and in-memory implementation

use crate::error::ProviderError;
use crate::lock_or_recover;
use async_trait::async_trait;
use breedvision_common::events::AuthErrorKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Session as issued by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSession {
    pub user_id: String,
    pub email: String,
    pub display_name: Option<String>,
    /// Bearer token, when the provider issues one
    #[serde(skip_serializing)]
    pub id_token: Option<String>,
}

/// Identity provider contract
///
/// `subscribe` replaces the provider's change callback: every session change
/// the provider observes (including remote sign-out and token expiry) is
/// published as `Some(session)` / `None`.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Provider name for logging
    fn name(&self) -> &'static str;

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<ProviderSession, ProviderError>;

    async fn sign_up_with_password(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<ProviderSession, ProviderError>;

    async fn sign_out(&self) -> Result<(), ProviderError>;

    /// Session the provider currently holds, if any
    fn current_session(&self) -> Option<ProviderSession>;

    fn subscribe(&self) -> broadcast::Receiver<Option<ProviderSession>>;
}

#[derive(Debug, Clone)]
struct Account {
    user_id: String,
    password: String,
    full_name: String,
}

/// Process-local identity provider
///
/// Used by the CLI when no Firebase key is configured and by tests. Counts
/// every request so callers can assert that local validation short-circuits.
pub struct InMemoryIdentityProvider {
    accounts: Mutex<HashMap<String, Account>>,
    current: Mutex<Option<ProviderSession>>,
    changes: broadcast::Sender<Option<ProviderSession>>,
    calls: AtomicUsize,
    latency: Duration,
    fail_sign_out: AtomicBool,
    min_password_length: usize,
}

impl InMemoryIdentityProvider {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(32);
        Self {
            accounts: Mutex::new(HashMap::new()),
            current: Mutex::new(None),
            changes,
            calls: AtomicUsize::new(0),
            latency: Duration::ZERO,
            fail_sign_out: AtomicBool::new(false),
            min_password_length: 6,
        }
    }

    /// Pre-register an account
    pub fn with_user(self, email: &str, password: &str, full_name: &str) -> Self {
        lock_or_recover(&self.accounts).insert(
            email.to_lowercase(),
            Account {
                user_id: Uuid::new_v4().to_string(),
                password: password.to_string(),
                full_name: full_name.to_string(),
            },
        );
        self
    }

    /// Delay applied to every request
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Number of requests that reached the provider
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Make `sign_out` report a transport failure
    pub fn set_sign_out_failure(&self, fail: bool) {
        self.fail_sign_out.store(fail, Ordering::SeqCst);
    }

    /// Drop the current session as if it expired on the provider side
    pub fn expire_session(&self) {
        *lock_or_recover(&self.current) = None;
        let _ = self.changes.send(None);
    }

    async fn request(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn publish(&self, session: Option<ProviderSession>) {
        *lock_or_recover(&self.current) = session.clone();
        let _ = self.changes.send(session);
    }
}

impl Default for InMemoryIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    fn name(&self) -> &'static str {
        "in-memory"
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<ProviderSession, ProviderError> {
        self.request().await;

        let account = lock_or_recover(&self.accounts)
            .get(&email.to_lowercase())
            .cloned()
            .ok_or(ProviderError::Rejected(AuthErrorKind::UserNotFound))?;

        if account.password != password {
            return Err(ProviderError::Rejected(AuthErrorKind::InvalidCredentials));
        }

        let session = ProviderSession {
            user_id: account.user_id,
            email: email.to_lowercase(),
            display_name: Some(account.full_name),
            id_token: None,
        };
        self.publish(Some(session.clone()));
        Ok(session)
    }

    async fn sign_up_with_password(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<ProviderSession, ProviderError> {
        self.request().await;

        if password.chars().count() < self.min_password_length {
            return Err(ProviderError::Rejected(AuthErrorKind::WeakPassword));
        }

        let key = email.to_lowercase();
        let account = {
            let mut accounts = lock_or_recover(&self.accounts);
            if accounts.contains_key(&key) {
                return Err(ProviderError::Rejected(AuthErrorKind::EmailInUse));
            }
            let account = Account {
                user_id: Uuid::new_v4().to_string(),
                password: password.to_string(),
                full_name: full_name.to_string(),
            };
            accounts.insert(key.clone(), account.clone());
            account
        };

        let session = ProviderSession {
            user_id: account.user_id,
            email: key,
            display_name: Some(account.full_name),
            id_token: None,
        };
        self.publish(Some(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        self.request().await;
        if self.fail_sign_out.load(Ordering::SeqCst) {
            return Err(ProviderError::Transport("connection reset".to_string()));
        }
        self.publish(None);
        Ok(())
    }

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

    #[tokio::test]
    async fn test_sign_in_known_user() {
        let provider = InMemoryIdentityProvider::new().with_user("Farmer@Example.com", "secret1", "Asha");
        let session = provider
            .sign_in_with_password("farmer@example.com", "secret1")
            .await
            .unwrap();
        assert_eq!(session.email, "farmer@example.com");
        assert_eq!(session.display_name.as_deref(), Some("Asha"));
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_rejections() {
        let provider = InMemoryIdentityProvider::new().with_user("a@b.in", "secret1", "A");

        let err = provider.sign_in_with_password("x@b.in", "secret1").await.unwrap_err();
        assert_eq!(err.kind(), AuthErrorKind::UserNotFound);

        let err = provider.sign_in_with_password("a@b.in", "wrong!!").await.unwrap_err();
        assert_eq!(err.kind(), AuthErrorKind::InvalidCredentials);

        let err = provider
            .sign_up_with_password("a@b.in", "secret2", "A")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), AuthErrorKind::EmailInUse);
    }

    #[tokio::test]
    async fn test_changes_are_published() {
        let provider = InMemoryIdentityProvider::new();
        let mut rx = provider.subscribe();

        provider
            .sign_up_with_password("new@farm.in", "secret1", "New Farmer")
            .await
            .unwrap();
        assert!(matches!(rx.recv().await.unwrap(), Some(s) if s.email == "new@farm.in"));

        provider.expire_session();
        assert_eq!(rx.recv().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_sign_out_transport_failure() {
        let provider = InMemoryIdentityProvider::new();
        provider.set_sign_out_failure(true);
        let err = provider.sign_out().await.unwrap_err();
        assert_eq!(err.kind(), AuthErrorKind::Unknown);
    }
}
