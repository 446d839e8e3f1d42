//! Storage capabilities the WebAuthn ceremonies depend on.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use log::*;

use super::types::{CredentialDescriptor, WebAuthnCredential};
use crate::error::Error;

/// Where issued challenges wait for the verification request.
///
/// `get_challenge` must be single use: once returned, a challenge is gone.
#[async_trait]
pub trait ChallengeStore: Send + Sync {
    async fn store_challenge(&self, attempt_id: &str, challenge: &str) -> Result<(), Error>;

    async fn get_challenge(&self, attempt_id: &str) -> Result<Option<String>, Error>;
}

/// Lookup of registered credentials.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get_credential(&self, credential_id: &str)
        -> Result<Option<WebAuthnCredential>, Error>;

    /// Credentials a user may authenticate with.
    async fn allow_credentials(&self, user_name: &str) -> Result<Vec<CredentialDescriptor>, Error>;

    /// Credentials a user already registered, so authenticators don't create duplicates.
    async fn exclude_credentials(
        &self,
        user_name: &str,
    ) -> Result<Vec<CredentialDescriptor>, Error> {
        self.allow_credentials(user_name).await
    }
}

/// In-process challenge store with expiration.
pub struct MemoryChallengeStore {
    challenges: DashMap<String, (String, DateTime<Utc>)>,
    ttl: Duration,
}

impl MemoryChallengeStore {
    /// Create a new challenge store with default TTL of 5 minutes.
    pub fn new() -> Self {
        Self::with_ttl(Duration::minutes(5))
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            challenges: DashMap::new(),
            ttl,
        }
    }

    pub fn purge_expired(&self) {
        let now = Utc::now();
        self.challenges.retain(|_, (_, expires_at)| *expires_at > now);
    }

    pub fn len(&self) -> usize {
        self.challenges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.challenges.is_empty()
    }
}

impl Default for MemoryChallengeStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChallengeStore for MemoryChallengeStore {
    async fn store_challenge(&self, attempt_id: &str, challenge: &str) -> Result<(), Error> {
        self.purge_expired();
        self.challenges.insert(
            attempt_id.to_string(),
            (challenge.to_string(), Utc::now() + self.ttl),
        );
        Ok(())
    }

    async fn get_challenge(&self, attempt_id: &str) -> Result<Option<String>, Error> {
        let now = Utc::now();
        Ok(self
            .challenges
            .remove(attempt_id)
            .filter(|(_, (_, expires_at))| *expires_at > now)
            .map(|(_, (challenge, _))| challenge))
    }
}

/// In-process credential store keyed by credential id.
#[derive(Default)]
pub struct MemoryCredentialStore {
    credentials: DashMap<String, WebAuthnCredential>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a credential.
    pub fn save(&self, credential: WebAuthnCredential) {
        debug!(
            "Saving credential {} for {}",
            credential.id, credential.user_name
        );
        self.credentials.insert(credential.id.clone(), credential);
    }

    /// Record the counter and backup state of a successful assertion.
    pub fn update(&self, credential: &WebAuthnCredential) {
        if let Some(mut stored) = self.credentials.get_mut(&credential.id) {
            stored.counter = credential.counter;
            stored.backed_up = credential.backed_up;
        }
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get_credential(
        &self,
        credential_id: &str,
    ) -> Result<Option<WebAuthnCredential>, Error> {
        Ok(self
            .credentials
            .get(credential_id)
            .map(|entry| entry.value().clone()))
    }

    async fn allow_credentials(&self, user_name: &str) -> Result<Vec<CredentialDescriptor>, Error> {
        Ok(self
            .credentials
            .iter()
            .filter(|entry| entry.user_name == user_name)
            .map(|entry| entry.descriptor())
            .collect())
    }
}
