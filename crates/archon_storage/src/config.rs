//! Redis backend configuration.

use std::time::Duration;

/// Default Redis server URL.
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

/// The environment variable used to override the Redis URL.
pub const REDIS_URL_ENV: &str = "REDIS_URL";

/// Default connect/read/write timeout.
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for one world's Redis storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisConfig {
    /// Server URL.
    pub url: String,
    /// World namespace embedded in every key.
    pub namespace: String,
    /// Applied to connect, read and write so a stuck call cannot hang a tick.
    pub io_timeout: Duration,
    /// Send multi-step mutations as one `MULTI`/`EXEC` round trip.
    pub pipelined: bool,
}

impl RedisConfig {
    /// Config for `namespace` against [`DEFAULT_REDIS_URL`].
    #[must_use]
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            url: DEFAULT_REDIS_URL.to_owned(),
            namespace: namespace.into(),
            io_timeout: DEFAULT_IO_TIMEOUT,
            pipelined: true,
        }
    }

    /// Config for `namespace` using the `REDIS_URL` environment variable,
    /// falling back to [`DEFAULT_REDIS_URL`].
    #[must_use]
    pub fn from_env(namespace: impl Into<String>) -> Self {
        let url = std::env::var(REDIS_URL_ENV).unwrap_or_else(|_| DEFAULT_REDIS_URL.to_owned());
        Self::new(namespace).with_url(url)
    }

    /// Override the server URL.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Override the I/O timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = timeout;
        self
    }

    /// Turn pipelining of multi-step mutations on or off.
    #[must_use]
    pub fn with_pipelining(mut self, pipelined: bool) -> Self {
        self.pipelined = pipelined;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RedisConfig::new("w1");
        assert_eq!(config.url, DEFAULT_REDIS_URL);
        assert_eq!(config.namespace, "w1");
        assert_eq!(config.io_timeout, DEFAULT_IO_TIMEOUT);
        assert!(config.pipelined);
    }

    #[test]
    fn test_builders_override() {
        let config = RedisConfig::new("w1")
            .with_url("redis://cache:6380")
            .with_timeout(Duration::from_millis(250))
            .with_pipelining(false);
        assert_eq!(config.url, "redis://cache:6380");
        assert_eq!(config.io_timeout, Duration::from_millis(250));
        assert!(!config.pipelined);
    }
}
