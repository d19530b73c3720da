//! Database connection layer.
//!
//! This module turns a configuration namespace into an open connection:
//! - Driver selection
//! - Per-backend descriptor builders
//! - Connection factory and opened handles
//! - Table naming
//! - Post-connection administrative statements

pub mod admin;
pub mod builders;
pub mod clickhouse;
pub mod dialect;
pub mod factory;
pub mod naming;
pub mod pool;

pub use admin::{auto_increment_statement, reset_auto_increment};
pub use builders::{build_clickhouse, build_descriptor, build_mysql, build_postgres, build_sqlite};
pub use clickhouse::ClickHouseClient;
pub use dialect::{database_prefix, dialect_prefix, resolve};
pub use factory::{connect, open, open_scoped};
pub use naming::{DefaultNamingStrategy, NamingStrategy};
pub use pool::{DatabaseHandle, DbPool, OrmSettings};
