//! Data models for the connection factory.
//!
//! This module re-exports all model types used throughout the crate.

pub mod backend;
pub mod descriptor;
pub mod log_level;

// Re-export commonly used types
pub use backend::Backend;
pub use descriptor::{
    CLICKHOUSE_MAX_EXECUTION_TIME_SECS, ClickHouseAuth, ClickHouseOptions, ClickHouseProtocol,
    ConnectionDescriptor, MySqlDescriptor, PostgresDescriptor, SqliteDescriptor, TlsPolicy,
};
pub use log_level::{LogLevel, SLOW_STATEMENT_THRESHOLD};
