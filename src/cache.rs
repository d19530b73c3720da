//! Key-value cache client factory.
//!
//! Reads `redis.network`, `redis.addr`, `redis.db` and `redis.password`.
//! Building a handle always succeeds. Address, network and connection errors
//! surface on first use.

use crate::error::{DbError, DbResult};
use crate::models::Backend;
use crate::source::ConfigSource;
use redis::aio::MultiplexedConnection;
use redis::{ConnectionAddr, ConnectionInfo, RedisConnectionInfo};
use tracing::{debug, info};

pub const DEFAULT_CACHE_NETWORK: &str = "tcp";
pub const DEFAULT_CACHE_ADDR: &str = "localhost:6379";
pub const DEFAULT_CACHE_HOST: &str = "localhost";
pub const DEFAULT_CACHE_PORT: u16 = 6379;

/// Cache connection options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheOptions {
    /// `tcp` or `unix`
    pub network: String,
    /// `host:port`, or a socket path for `unix`
    pub addr: String,
    pub db: i64,
    /// Contains sensitive data - never log
    pub password: Option<String>,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            network: DEFAULT_CACHE_NETWORK.to_string(),
            addr: DEFAULT_CACHE_ADDR.to_string(),
            db: 0,
            password: None,
        }
    }
}

impl CacheOptions {
    /// Read options from the `redis.` namespace; unset values take defaults.
    pub fn from_config(config: &dyn ConfigSource) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| Some(config.get_str(key)).filter(|v| !v.is_empty());

        Self {
            network: non_empty("redis.network").unwrap_or(defaults.network),
            addr: non_empty("redis.addr").unwrap_or(defaults.addr),
            db: config.get_int("redis.db"),
            password: non_empty("redis.password"),
        }
    }

    /// Translate into a driver connection description.
    pub fn connection_info(&self) -> DbResult<ConnectionInfo> {
        let addr = match self.network.as_str() {
            "tcp" | "tcp4" | "tcp6" => {
                let (host, port) = split_host_port(&self.addr)?;
                ConnectionAddr::Tcp(host, port)
            }
            #[cfg(unix)]
            "unix" => ConnectionAddr::Unix(self.addr.clone().into()),
            other => {
                return Err(DbError::invalid_parameter(
                    "network",
                    Backend::Redis,
                    format!("'{}' is not a supported network (tcp, unix)", other),
                ));
            }
        };

        Ok(ConnectionInfo {
            addr,
            redis: RedisConnectionInfo {
                db: self.db,
                password: self.password.clone(),
                ..Default::default()
            },
        })
    }
}

fn split_host_port(addr: &str) -> DbResult<(String, u16)> {
    let invalid = |reason: String| DbError::invalid_parameter("addr", Backend::Redis, reason);

    let (host, port) = match addr.rsplit_once(':') {
        // Bare IPv6 without brackets has no port.
        Some((host, _)) if host.contains(':') && !host.starts_with('[') => {
            (addr, DEFAULT_CACHE_PORT)
        }
        Some((host, port)) => {
            let port = port
                .parse::<u16>()
                .map_err(|_| invalid(format!("'{}' has an invalid port", addr)))?;
            (host, port)
        }
        None => (addr, DEFAULT_CACHE_PORT),
    };

    // An empty host means the local machine, as in `:6379`.
    let host = host.trim_start_matches('[').trim_end_matches(']');
    let host = if host.is_empty() { DEFAULT_CACHE_HOST } else { host };
    Ok((host.to_string(), port))
}

/// A cache client. Cheap to clone.
#[derive(Debug, Clone)]
pub struct CacheHandle {
    options: CacheOptions,
}

impl CacheHandle {
    pub fn options(&self) -> &CacheOptions {
        &self.options
    }

    /// Driver client for these options. Does no network I/O.
    pub fn client(&self) -> DbResult<redis::Client> {
        let info = self.options.connection_info()?;
        redis::Client::open(info)
            .map_err(|e| DbError::invalid_parameter("addr", Backend::Redis, e.to_string()))
    }

    /// Open a multiplexed connection. This is where configuration and network
    /// errors appear.
    pub async fn connection(&self) -> DbResult<MultiplexedConnection> {
        self.client()?
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| {
                DbError::connection(
                    Backend::Redis,
                    e.to_string(),
                    format!(
                        "Check that the cache server at {} is running and the password is correct",
                        self.options.addr
                    ),
                )
            })
    }
}

/// Build a cache client from the `redis.` namespace.
pub fn open_cache(config: &dyn ConfigSource) -> CacheHandle {
    open_cache_with(CacheOptions::from_config(config))
}

/// Build a cache client from explicit options.
pub fn open_cache_with(options: CacheOptions) -> CacheHandle {
    info!(
        network = %options.network,
        addr = %options.addr,
        db = options.db,
        "Cache client created"
    );
    debug!(has_password = options.password.is_some(), "Cache auth");

    CacheHandle { options }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::ConfigTree;

    #[test]
    fn test_defaults_when_unset() {
        let options = CacheOptions::from_config(&ConfigTree::new());
        assert_eq!(options, CacheOptions::default());
        assert_eq!(options.network, "tcp");
        assert_eq!(options.addr, "localhost:6379");
    }

    #[test]
    fn test_from_config() {
        let tree = ConfigTree::new()
            .with("redis.addr", "cache:6380")
            .with("redis.db", 3)
            .with("redis.password", "hunter2");
        let options = CacheOptions::from_config(&tree);
        assert_eq!(options.network, "tcp");
        assert_eq!(options.addr, "cache:6380");
        assert_eq!(options.db, 3);
        assert_eq!(options.password.as_deref(), Some("hunter2"));
    }

    #[test]
    fn test_connection_info_tcp() {
        let options = CacheOptions {
            addr: "cache:6380".to_string(),
            db: 2,
            ..CacheOptions::default()
        };
        let info = options.connection_info().unwrap();
        assert!(matches!(info.addr, ConnectionAddr::Tcp(ref host, 6380) if host == "cache"));
        assert_eq!(info.redis.db, 2);
        assert_eq!(info.redis.password, None);
    }

    #[test]
    fn test_split_host_port() {
        assert_eq!(
            split_host_port("localhost").unwrap(),
            ("localhost".to_string(), 6379)
        );
        assert_eq!(
            split_host_port("[::1]:7000").unwrap(),
            ("::1".to_string(), 7000)
        );
        assert_eq!(
            split_host_port(":6380").unwrap(),
            ("localhost".to_string(), 6380)
        );
        assert!(split_host_port("cache:port").is_err());
    }

    #[test]
    fn test_unknown_network() {
        let options = CacheOptions {
            network: "udp".to_string(),
            ..CacheOptions::default()
        };
        let err = options.connection_info().unwrap_err();
        assert_eq!(err.field(), Some("network"));
    }

    #[test]
    fn test_open_cache_does_no_io() {
        let tree = ConfigTree::new().with("redis.addr", "203.0.113.1:6379");
        let handle = open_cache(&tree);
        assert_eq!(handle.options().addr, "203.0.113.1:6379");
        assert!(handle.client().is_ok());
    }

    #[test]
    fn test_empty_host_means_localhost() {
        let handle = open_cache(&ConfigTree::new().with("redis.addr", ":6379"));
        let info = handle.options().connection_info().unwrap();
        assert!(matches!(info.addr, ConnectionAddr::Tcp(ref host, 6379) if host == "localhost"));
    }

    #[tokio::test]
    async fn test_bad_settings_fail_on_first_use() {
        let tree = ConfigTree::new().with("redis.addr", "cache:port");
        let handle = open_cache(&tree);
        let err = handle.connection().await.unwrap_err();
        assert_eq!(err.field(), Some("addr"));

        let tree = ConfigTree::new().with("redis.network", "udp");
        let handle = open_cache(&tree);
        assert_eq!(handle.options().network, "udp");
        let err = handle.connection().await.unwrap_err();
        assert_eq!(err.field(), Some("network"));
    }
}
