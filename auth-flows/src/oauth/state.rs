//! Pending authorization state for OAuth flows.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rand::Rng;

use crate::error::Error;

/// Data recorded when an authorization redirect is issued.
#[derive(Debug, Clone)]
pub struct PendingState {
    /// When the redirect was issued.
    pub created_at: DateTime<Utc>,
    /// When this state stops being accepted.
    pub expires_at: DateTime<Utc>,
    /// Where to send the user after a successful login.
    pub return_to: Option<String>,
}

impl PendingState {
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

/// Storage for pending authorization states.
///
/// Implementations must make `take` single use: a state handed out once is never
/// returned again.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Mint a fresh state token and remember it along with `return_to`.
    async fn issue(&self, return_to: Option<String>) -> Result<String, Error>;

    /// Remove a state token, returning its data if it was live.
    async fn take(&self, state: &str) -> Result<Option<PendingState>, Error>;
}

/// In-process state store with expiration.
///
/// Expired entries are purged every time a new state is issued, so the map never
/// holds more than the states issued within one TTL window.
pub struct MemoryStateStore {
    states: DashMap<String, PendingState>,
    ttl: Duration,
}

impl MemoryStateStore {
    /// Create a new state store with default TTL of 10 minutes.
    pub fn new() -> Self {
        Self::with_ttl(Duration::minutes(10))
    }

    /// Create a new state store with custom TTL.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            states: DashMap::new(),
            ttl,
        }
    }

    /// Clean up expired states.
    pub fn purge_expired(&self) {
        let now = Utc::now();
        self.states.retain(|_, data| data.expires_at > now);
    }

    /// Number of states currently held, expired or not.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Generate a cryptographically random state token.
    fn generate_token() -> String {
        let random_bytes: [u8; 32] = rand::thread_rng().gen();
        hex::encode(random_bytes)
    }
}

impl Default for MemoryStateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn issue(&self, return_to: Option<String>) -> Result<String, Error> {
        self.purge_expired();

        let state = Self::generate_token();
        let created_at = Utc::now();
        self.states.insert(
            state.clone(),
            PendingState {
                created_at,
                expires_at: created_at + self.ttl,
                return_to,
            },
        );
        Ok(state)
    }

    async fn take(&self, state: &str) -> Result<Option<PendingState>, Error> {
        Ok(self
            .states
            .remove(state)
            .map(|(_, data)| data)
            .filter(|data| !data.is_expired()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_issue_state() {
        let store = MemoryStateStore::new();
        let state = store.issue(None).await.unwrap();
        assert_eq!(state.len(), 64); // 32 bytes hex encoded
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_take_state_returns_return_to() {
        let store = MemoryStateStore::new();
        let state = store.issue(Some("/dashboard".to_string())).await.unwrap();

        let data = store.take(&state).await.unwrap().unwrap();
        assert_eq!(data.return_to.as_deref(), Some("/dashboard"));
    }

    #[tokio::test]
    async fn test_take_unknown_state() {
        let store = MemoryStateStore::new();
        assert!(store.take("unknown").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_state_consumed_after_take() {
        let store = MemoryStateStore::new();
        let state = store.issue(None).await.unwrap();

        store.take(&state).await.unwrap();
        assert!(store.take(&state).await.unwrap().is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_expired_state() {
        let store = MemoryStateStore::with_ttl(Duration::seconds(-1));
        let state = store.issue(None).await.unwrap();
        assert!(store.take(&state).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_issue_purges_expired_states() {
        let store = MemoryStateStore::with_ttl(Duration::seconds(-1));
        store.issue(None).await.unwrap();
        store.issue(None).await.unwrap();
        // The first state had already expired when the second was issued
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_states_are_unique() {
        let store = MemoryStateStore::new();
        let first = store.issue(None).await.unwrap();
        let second = store.issue(None).await.unwrap();
        assert_ne!(first, second);
    }
}
