//! Redis key-value backend.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, RedisError};
use tracing::info;

use super::KeyValueBackend;
use crate::error::{SessionError, SessionResult};

/// A shared multiplexed Redis connection, cloned per command.
#[derive(Clone)]
pub struct RedisBackend {
    conn: MultiplexedConnection,
    address: String,
}

impl RedisBackend {
    /// Connects to `host:port`. Fails with [`SessionError::LostConnection`]
    /// if the server cannot be reached.
    pub async fn connect(host: &str, port: u16) -> SessionResult<Self> {
        let address = format!("{host}:{port}");
        let lost = |e: RedisError| SessionError::LostConnection {
            address: address.clone(),
            reason: e.to_string(),
        };

        let client = redis::Client::open(format!("redis://{address}/")).map_err(lost)?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(lost)?;

        info!(address = %address, "Connected to session store");
        Ok(Self { conn, address })
    }

    /// Returns `host:port` of the server.
    pub fn address(&self) -> &str {
        &self.address
    }

    fn map_err(&self, e: RedisError) -> SessionError {
        if e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() {
            SessionError::LostConnection {
                address: self.address.clone(),
                reason: e.to_string(),
            }
        } else {
            SessionError::Backend(e.to_string())
        }
    }
}

impl std::fmt::Debug for RedisBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisBackend")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl KeyValueBackend for RedisBackend {
    async fn get(&self, key: &str) -> SessionResult<Option<String>> {
        let mut conn = self.conn.clone();
        conn.get::<_, Option<String>>(key)
            .await
            .map_err(|e| self.map_err(e))
    }

    async fn set(&self, key: &str, value: &str) -> SessionResult<()> {
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(key, value)
            .await
            .map_err(|e| self.map_err(e))
    }

    async fn delete(&self, key: &str) -> SessionResult<()> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key).await.map_err(|e| self.map_err(e))
    }
}
