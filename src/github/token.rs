//! Per-repository token acquisition and caching

use super::error::ApiError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Source of API credentials for a repository
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn token(&self, owner: &str, repo: &str) -> Result<String, ApiError>;
}

/// Serves the same token for every repository
pub struct StaticTokenProvider {
    token: Option<String>,
}

impl StaticTokenProvider {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn token(&self, owner: &str, repo: &str) -> Result<String, ApiError> {
        self.token.clone().ok_or_else(|| ApiError::MissingToken {
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }
}

impl std::fmt::Debug for StaticTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenProvider")
            .field("configured", &self.token.is_some())
            .finish()
    }
}

/// Process-scoped token cache keyed by `(owner, repo)`
///
/// Entries are filled on first use and never invalidated. Two concurrent misses
/// for the same key both fetch; the last write wins.
pub struct TokenCache {
    provider: Arc<dyn TokenProvider>,
    tokens: Mutex<HashMap<(String, String), String>>,
}

impl TokenCache {
    pub fn new(provider: Arc<dyn TokenProvider>) -> Self {
        Self {
            provider,
            tokens: Mutex::new(HashMap::new()),
        }
    }

    pub async fn get(&self, owner: &str, repo: &str) -> Result<String, ApiError> {
        let key = (owner.to_string(), repo.to_string());
        if let Some(token) = self.lock().get(&key) {
            return Ok(token.clone());
        }

        debug!(owner, repo, "Fetching token");
        let token = self.provider.token(owner, repo).await?;
        self.lock().insert(key, token.clone());
        Ok(token)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<(String, String), String>> {
        // A poisoned map still holds valid tokens
        self.tokens.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for TokenCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCache")
            .field("cached", &self.len())
            .finish()
    }
}
