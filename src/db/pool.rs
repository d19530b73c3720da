//! Opened database handles.
//!
//! A [`DatabaseHandle`] is owned by the caller once returned; the factory
//! keeps no reference to it. The handle remembers which backend it talks to,
//! so administrative operations can dispatch without re-reading configuration.

use crate::db::clickhouse::ClickHouseClient;
use crate::db::naming::{DefaultNamingStrategy, NamingStrategy};
use crate::error::{DbError, DbResult};
use crate::models::{Backend, ConnectionDescriptor, LogLevel};
use sqlx::{MySqlPool, PgPool, SqlitePool};
use std::sync::Arc;
use tracing::{debug, warn};

/// Backend-specific connection (avoids AnyPool limitations).
#[derive(Debug, Clone)]
pub enum DbPool {
    MySql(MySqlPool),
    Postgres(PgPool),
    SQLite(SqlitePool),
    ClickHouse(ClickHouseClient),
}

impl DbPool {
    /// Close the connection pool.
    pub async fn close(&self) {
        match self {
            DbPool::MySql(pool) => pool.close().await,
            DbPool::Postgres(pool) => pool.close().await,
            DbPool::SQLite(pool) => pool.close().await,
            DbPool::ClickHouse(_) => {}
        }
    }

    /// Get the backend for this pool.
    pub fn backend(&self) -> Backend {
        match self {
            DbPool::MySql(_) => Backend::MySql,
            DbPool::Postgres(_) => Backend::Postgres,
            DbPool::SQLite(_) => Backend::SQLite,
            DbPool::ClickHouse(_) => Backend::ClickHouse,
        }
    }

    /// Execute a statement that returns no rows. Errors are returned verbatim.
    pub async fn execute(&self, sql: &str) -> DbResult<u64> {
        let result = match self {
            DbPool::MySql(p) => sqlx::query(sql).execute(p).await.map(|r| r.rows_affected()),
            DbPool::Postgres(p) => sqlx::query(sql).execute(p).await.map(|r| r.rows_affected()),
            DbPool::SQLite(p) => sqlx::query(sql).execute(p).await.map(|r| r.rows_affected()),
            DbPool::ClickHouse(c) => return c.execute(sql).await.map(|_| 0),
        };
        result.map_err(|e| DbError::statement(sql, e.to_string()))
    }
}

/// ORM-level settings carried with a handle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrmSettings {
    /// Suppress foreign key checks while migrating.
    pub disable_foreign_key_constraint_when_migrating: bool,
    /// `None` leaves the driver's default statement logging untouched.
    pub log_level: Option<LogLevel>,
}

impl OrmSettings {
    /// Settings a descriptor asks for. Backends without a `loglevel` key get `None`.
    pub fn from_descriptor(descriptor: &ConnectionDescriptor) -> Self {
        match descriptor {
            ConnectionDescriptor::MySql(d) => Self {
                disable_foreign_key_constraint_when_migrating: d.disable_fk_when_migrating,
                log_level: d.log_level,
            },
            _ => Self {
                log_level: descriptor.log_level(),
                ..Self::default()
            },
        }
    }

    /// Session statement a migration should run first, if any.
    pub fn migration_preamble(&self, backend: Backend) -> Option<&'static str> {
        if !self.disable_foreign_key_constraint_when_migrating {
            return None;
        }
        match backend {
            Backend::MySql => Some("SET FOREIGN_KEY_CHECKS = 0"),
            Backend::SQLite => Some("PRAGMA foreign_keys = OFF"),
            Backend::Postgres | Backend::ClickHouse | Backend::Redis => None,
        }
    }
}

/// An opened connection returned by the factory.
#[derive(Debug, Clone)]
pub struct DatabaseHandle {
    pool: DbPool,
    naming: Arc<dyn NamingStrategy>,
    settings: OrmSettings,
}

impl DatabaseHandle {
    pub fn new(pool: DbPool, settings: OrmSettings) -> Self {
        Self {
            pool,
            naming: Arc::new(DefaultNamingStrategy::default()),
            settings,
        }
    }

    /// Replace the naming strategy.
    pub fn with_naming(mut self, naming: impl NamingStrategy + 'static) -> Self {
        self.naming = Arc::new(naming);
        self
    }

    pub fn backend(&self) -> Backend {
        self.pool.backend()
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn naming(&self) -> &dyn NamingStrategy {
        self.naming.as_ref()
    }

    pub fn settings(&self) -> &OrmSettings {
        &self.settings
    }

    /// Table name for an entity under the active naming strategy.
    pub fn table_name(&self, entity: &str) -> String {
        self.naming.table_name(entity)
    }

    /// Get the server version from the connected database.
    pub async fn server_version(&self) -> Option<String> {
        let result = match &self.pool {
            DbPool::MySql(pool) => {
                sqlx::query_scalar::<_, String>("SELECT version()")
                    .fetch_one(pool)
                    .await
            }
            DbPool::Postgres(pool) => {
                sqlx::query_scalar::<_, String>("SELECT version()")
                    .fetch_one(pool)
                    .await
            }
            DbPool::SQLite(pool) => {
                sqlx::query_scalar::<_, String>("SELECT sqlite_version()")
                    .fetch_one(pool)
                    .await
            }
            DbPool::ClickHouse(client) => return client.server_version().await,
        };

        match result {
            Ok(version) => {
                debug!(version = %version, "Got server version");
                Some(version)
            }
            Err(e) => {
                warn!(error = %e, "Failed to get server version");
                None
            }
        }
    }

    /// Close the underlying connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
