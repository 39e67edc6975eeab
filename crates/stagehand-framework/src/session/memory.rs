//! In-process session store.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use stagehand_core::SessionData;

use super::SessionStore;
use crate::error::SessionResult;

/// Sessions kept in a map; lost when the process exits.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, SessionData>>,
}

impl MemorySessionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored sessions.
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// Returns `true` if no session is stored.
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, key: &str) -> SessionResult<Option<SessionData>> {
        Ok(self.sessions.read().get(key).cloned())
    }

    async fn set(&self, key: &str, session: &SessionData) -> SessionResult<()> {
        self.sessions
            .write()
            .insert(key.to_string(), session.clone());
        Ok(())
    }

    async fn delete(&self, key: &str) -> SessionResult<()> {
        self.sessions.write().remove(key);
        Ok(())
    }
}
