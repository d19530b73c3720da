//! Configuration handling for the connection probe.
//!
//! This module provides CLI arguments and environment variables for the
//! `conn-factory` binary. The library itself takes configuration through
//! [`ConfigSource`](crate::source::ConfigSource).

use crate::error::DbResult;
use crate::source::ConfigTree;
use clap::Parser;
use std::path::PathBuf;

pub const DEFAULT_LOG_LEVEL: &str = "info";

// Pool configuration defaults
pub const DEFAULT_MAX_CONNECTIONS_SQLITE: u32 = 1;
pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;

#[derive(Parser, Debug, Clone)]
#[command(name = "conn-factory")]
#[command(author, version, about = "Open the configured database and report what was connected", long_about = None)]
pub struct Config {
    /// Configuration file (.json, .yaml or .yml)
    #[arg(long, short = 'c', env = "CONN_FACTORY_CONFIG")]
    pub config: PathBuf,

    /// Configuration scope; the database is read from `<scope>.database.`
    #[arg(long, default_value = "", env = "CONN_FACTORY_SCOPE")]
    pub scope: String,

    /// Also build the cache client from `redis.` and ping it
    #[arg(long, env = "CONN_FACTORY_CACHE")]
    pub cache: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = DEFAULT_LOG_LEVEL, env = "CONN_FACTORY_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "CONN_FACTORY_JSON_LOGS")]
    pub json_logs: bool,
}

impl Config {
    /// Parse configuration from command line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Load the configuration tree named by `--config`.
    pub fn load_tree(&self) -> DbResult<ConfigTree> {
        ConfigTree::from_file(&self.config)
    }
}
