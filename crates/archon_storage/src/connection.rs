//! Redis connection management.
//!
//! One [`RedisConnection`] is shared (behind an `Arc`) by every Redis-backed
//! store of a world. Commands are synchronous round trips serialised through
//! a mutex; the engine assumes a single logical writer anyway.

use std::sync::Mutex;

use redis::Commands;
use tracing::info;

use crate::config::RedisConfig;
use crate::error::StorageError;
use crate::keys;

/// A configured, timeout-bound Redis connection for one world namespace.
pub struct RedisConnection {
    config: RedisConfig,
    conn: Mutex<redis::Connection>,
}

impl std::fmt::Debug for RedisConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisConnection")
            .field("url", &self.config.url)
            .field("namespace", &self.config.namespace)
            .finish_non_exhaustive()
    }
}

impl RedisConnection {
    /// Connect using the given config. Read and write timeouts are set to
    /// the config's I/O timeout.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Redis`] if the URL is invalid or the server
    /// cannot be reached within the timeout.
    pub fn connect(config: RedisConfig) -> Result<Self, StorageError> {
        info!(url = %config.url, namespace = %config.namespace, "connecting to Redis");
        let client = redis::Client::open(config.url.as_str())?;
        let conn = client.get_connection_with_timeout(config.io_timeout)?;
        conn.set_read_timeout(Some(config.io_timeout))?;
        conn.set_write_timeout(Some(config.io_timeout))?;
        info!("Redis connection established");
        Ok(Self {
            config,
            conn: Mutex::new(conn),
        })
    }

    /// The config this connection was opened with.
    #[must_use]
    pub fn config(&self) -> &RedisConfig {
        &self.config
    }

    /// The world namespace embedded in every key.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.config.namespace
    }

    /// Whether multi-step mutations should be pipelined.
    #[must_use]
    pub fn pipelined(&self) -> bool {
        self.config.pipelined
    }

    /// Runs `f` with exclusive access to the underlying connection.
    ///
    /// # Errors
    ///
    /// Returns whatever `f` returns, converted, or [`StorageError::Poisoned`].
    pub fn with<R>(
        &self,
        f: impl FnOnce(&mut redis::Connection) -> redis::RedisResult<R>,
    ) -> Result<R, StorageError> {
        let mut conn = self.conn.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(f(&mut conn)?)
    }

    /// Deletes every key of this connection's namespace and returns how many
    /// were removed.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Redis`] on any command failure.
    pub fn clear_namespace(&self) -> Result<usize, StorageError> {
        let namespace = self.config.namespace.clone();
        let removed = self.with(|conn| {
            let mut found: Vec<String> = Vec::new();
            for pattern in keys::world_patterns(&namespace) {
                let batch: Vec<String> = conn.scan_match::<_, String>(pattern)?.collect();
                found.extend(batch);
            }
            if found.is_empty() {
                return Ok(0);
            }
            conn.del::<_, usize>(found)
        })?;
        info!(namespace = %self.config.namespace, removed, "cleared Redis namespace");
        Ok(removed)
    }
}
