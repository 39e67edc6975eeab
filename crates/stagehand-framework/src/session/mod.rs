//! Session adapter.
//!
//! Sessions are JSON objects keyed per chat and user. The
//! [`SessionMiddleware`] loads the session into the context before user code
//! runs and writes it back afterwards through a [`SessionStore`]:
//!
//! | Backend | Store | Survives restart |
//! |---------|-------|------------------|
//! | `external-store` | [`KvSessionStore`] over [`RedisBackend`] | yes |
//! | `in-memory` | [`MemorySessionStore`] | no |
//!
//! [`connect`] builds the store a [`SessionConfig`] asks for. An unreachable
//! external store fails with [`SessionError::LostConnection`](crate::error::SessionError::LostConnection).

mod config;
mod kv;
mod memory;
mod middleware;
#[cfg(feature = "redis-store")]
mod redis_store;

use std::sync::Arc;

use async_trait::async_trait;
use stagehand_core::SessionData;
use tracing::info;

pub use config::{SessionBackendKind, SessionConfig};
pub use kv::{KeyValueBackend, KvSessionStore};
pub use memory::MemorySessionStore;
pub use middleware::{SessionMiddleware, session_key};
#[cfg(feature = "redis-store")]
pub use redis_store::RedisBackend;

use crate::error::SessionResult;

/// Persistent session storage.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// Loads the session at `key`; `None` if there is none.
    async fn get(&self, key: &str) -> SessionResult<Option<SessionData>>;

    /// Stores `session` at `key`.
    async fn set(&self, key: &str, session: &SessionData) -> SessionResult<()>;

    /// Removes the session at `key`.
    async fn delete(&self, key: &str) -> SessionResult<()>;
}

/// Shared, type-erased session store.
pub type BoxedSessionStore = Arc<dyn SessionStore>;

/// Builds the store described by `config`.
pub async fn connect(config: &SessionConfig) -> SessionResult<BoxedSessionStore> {
    match config.backend {
        SessionBackendKind::InMemory => {
            info!("Using in-memory session store");
            Ok(Arc::new(MemorySessionStore::new()))
        }
        #[cfg(feature = "redis-store")]
        SessionBackendKind::ExternalStore => {
            let backend = RedisBackend::connect(&config.host, config.port).await?;
            Ok(Arc::new(KvSessionStore::new(backend, config.prefix.clone())))
        }
        #[cfg(not(feature = "redis-store"))]
        SessionBackendKind::ExternalStore => Err(crate::error::SessionError::Backend(
            "the external store needs the `redis-store` feature".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_connects_without_network() {
        let store = connect(&SessionConfig::in_memory()).await.unwrap();
        assert_eq!(store.get("1:1").await.unwrap(), None);
    }

    #[cfg(feature = "redis-store")]
    #[tokio::test]
    async fn test_unreachable_external_store_fails() {
        let config = SessionConfig {
            port: 1,
            ..SessionConfig::default()
        };
        let err = connect(&config).await.err().unwrap();
        assert!(matches!(
            err,
            crate::error::SessionError::LostConnection { .. }
        ));
    }
}
