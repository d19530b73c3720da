//! Connection factory library.
//!
//! Turns a configuration tree into an open connection for MySQL, PostgreSQL,
//! SQLite or ClickHouse, plus a Redis cache client, following one path
//! convention:
//!
//! ```text
//! <scope>.database.driver
//! <scope>.database.<driver>.<parameter>
//! redis.<parameter>
//! ```

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod source;

pub use cache::{CacheHandle, CacheOptions, open_cache};
pub use db::{DatabaseHandle, open, open_scoped, reset_auto_increment};
pub use error::{DbError, DbResult};
pub use models::Backend;
pub use source::{ConfigSource, ConfigTree};
