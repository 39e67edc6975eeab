//! Sessions over a string key-value backend.

use async_trait::async_trait;
use stagehand_core::SessionData;
use tracing::trace;

use super::SessionStore;
use crate::error::{SessionError, SessionResult};

/// Raw string storage, e.g. a Redis connection.
#[async_trait]
pub trait KeyValueBackend: Send + Sync + 'static {
    /// Reads the value at `key`.
    async fn get(&self, key: &str) -> SessionResult<Option<String>>;

    /// Writes `value` at `key`.
    async fn set(&self, key: &str, value: &str) -> SessionResult<()>;

    /// Removes `key`.
    async fn delete(&self, key: &str) -> SessionResult<()>;
}

/// A [`SessionStore`] storing each session as JSON under `prefix + key`.
#[derive(Debug)]
pub struct KvSessionStore<B> {
    backend: B,
    prefix: String,
}

impl<B: KeyValueBackend> KvSessionStore<B> {
    /// Wraps `backend`.
    pub fn new(backend: B, prefix: impl Into<String>) -> Self {
        Self {
            backend,
            prefix: prefix.into(),
        }
    }

    /// Returns the backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{key}", self.prefix)
    }
}

#[async_trait]
impl<B: KeyValueBackend> SessionStore for KvSessionStore<B> {
    async fn get(&self, key: &str) -> SessionResult<Option<SessionData>> {
        let key = self.full_key(key);
        let Some(raw) = self.backend.get(&key).await? else {
            return Ok(None);
        };
        trace!(key = %key, bytes = raw.len(), "Session loaded");
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| SessionError::Codec { key, source })
    }

    async fn set(&self, key: &str, session: &SessionData) -> SessionResult<()> {
        let key = self.full_key(key);
        let raw = serde_json::to_string(session)
            .map_err(|source| SessionError::Codec { key: key.clone(), source })?;
        self.backend.set(&key, &raw).await
    }

    async fn delete(&self, key: &str) -> SessionResult<()> {
        self.backend.delete(&self.full_key(key)).await
    }
}
