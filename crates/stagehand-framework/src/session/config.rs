//! Session adapter configuration.

use serde::{Deserialize, Serialize};

/// Where sessions are kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionBackendKind {
    /// A Redis server; sessions survive restarts.
    #[default]
    ExternalStore,
    /// Process memory; sessions are lost on restart.
    InMemory,
}

/// Configuration for the session adapter.
///
/// ```toml
/// [session]
/// backend = "external-store"
/// host = "127.0.0.1"
/// port = 6379
/// prefix = "session:"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Backend kind.
    pub backend: SessionBackendKind,
    /// Backend host.
    pub host: String,
    /// Backend port.
    pub port: u16,
    /// Prepended to every session key.
    pub prefix: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            backend: SessionBackendKind::default(),
            host: "127.0.0.1".to_string(),
            port: 6379,
            prefix: "session:".to_string(),
        }
    }
}

impl SessionConfig {
    /// An in-memory configuration.
    pub fn in_memory() -> Self {
        Self {
            backend: SessionBackendKind::InMemory,
            ..Self::default()
        }
    }

    /// Returns `host:port`.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
