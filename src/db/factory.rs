//! Connection factory.
//!
//! `resolve -> build descriptor -> native options -> connect`. Each call is
//! independent: configuration is only borrowed, nothing is cached, and a
//! failed connect is returned as-is without retry.

use crate::config::{DEFAULT_ACQUIRE_TIMEOUT_SECS, DEFAULT_MAX_CONNECTIONS_SQLITE};
use crate::db::builders::build_descriptor;
use crate::db::clickhouse::ClickHouseClient;
use crate::db::dialect::resolve;
use crate::db::pool::{DatabaseHandle, DbPool, OrmSettings};
use crate::error::{DbError, DbResult};
use crate::models::{
    Backend, ConnectionDescriptor, LogLevel, MySqlDescriptor, PostgresDescriptor,
    SLOW_STATEMENT_THRESHOLD, SqliteDescriptor,
};
use crate::source::ConfigSource;
use sqlx::{ConnectOptions, Connection};
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

/// Open the database described by the top-level `database.` namespace.
pub async fn open(config: &dyn ConfigSource) -> DbResult<DatabaseHandle> {
    open_scoped(config, "").await
}

/// Open the database described by `<scope>.database.`.
pub async fn open_scoped(config: &dyn ConfigSource, scope: &str) -> DbResult<DatabaseHandle> {
    let (backend, prefix) = resolve(config, scope)?;
    let descriptor = build_descriptor(config, backend, &prefix)?;

    info!(
        scope = %scope,
        backend = %backend,
        dsn = %descriptor.masked_dsn(),
        "Opening database"
    );

    let handle = connect(&descriptor).await?;

    info!(scope = %scope, backend = %backend, "Connected successfully");
    Ok(handle)
}

/// Open a connection from an already built descriptor.
pub async fn connect(descriptor: &ConnectionDescriptor) -> DbResult<DatabaseHandle> {
    let log_level = descriptor.log_level();

    let pool = match descriptor {
        ConnectionDescriptor::MySql(d) => open_mysql(d).await?,
        ConnectionDescriptor::Postgres(d) => open_postgres(d, log_level).await?,
        ConnectionDescriptor::SQLite(d) => open_sqlite(d, log_level).await?,
        ConnectionDescriptor::ClickHouse(o) => {
            DbPool::ClickHouse(ClickHouseClient::connect(o).await?)
        }
    };

    Ok(DatabaseHandle::new(pool, OrmSettings::from_descriptor(descriptor)))
}

/// Attach statement logging at the mapped severity. `None` keeps driver defaults.
fn with_log_level<O: ConnectOptions>(options: O, level: Option<LogLevel>) -> O {
    match level {
        Some(level) => {
            debug!(log_level = %level, "Configuring statement logging");
            options
                .log_statements(level.statement_filter())
                .log_slow_statements(level.slow_statement_filter(), SLOW_STATEMENT_THRESHOLD)
        }
        None => options,
    }
}

/// Session `time_zone` for a `loc` token.
pub fn mysql_time_zone(loc: &str) -> String {
    match loc {
        "Local" => "SYSTEM".to_string(),
        "UTC" => "+00:00".to_string(),
        other => other.to_string(),
    }
}

/// Native options for a MySQL descriptor.
pub fn mysql_connect_options(d: &MySqlDescriptor) -> MySqlConnectOptions {
    let mut options = MySqlConnectOptions::new()
        .host(&d.host)
        .port(d.port)
        .username(&d.user)
        .password(&d.password)
        .database(&d.database);

    if let Some(charset) = &d.charset {
        options = options.charset(charset);
    }
    if let Some(loc) = &d.loc {
        options = options.timezone(Some(mysql_time_zone(loc)));
    }

    with_log_level(options, d.log_level)
}

/// Native options for a Postgres descriptor.
pub fn postgres_connect_options(
    d: &PostgresDescriptor,
    log_level: Option<LogLevel>,
) -> DbResult<PgConnectOptions> {
    let ssl_mode = PgSslMode::from_str(&d.sslmode).map_err(|e| {
        DbError::invalid_parameter("sslmode", Backend::Postgres, e.to_string())
    })?;

    let options = PgConnectOptions::new()
        .host(&d.host)
        .port(d.port)
        .username(&d.user)
        .password(&d.password)
        .database(&d.database)
        .ssl_mode(ssl_mode)
        .options([("TimeZone", d.timezone.as_str())]);

    Ok(with_log_level(options, log_level))
}

/// Native options for an embedded file database. The file is created if missing.
pub fn sqlite_connect_options(
    d: &SqliteDescriptor,
    log_level: Option<LogLevel>,
) -> DbResult<SqliteConnectOptions> {
    let options = if d.file == ":memory:" {
        SqliteConnectOptions::from_str("sqlite::memory:").map_err(|e| {
            DbError::invalid_parameter("file", Backend::SQLite, e.to_string())
        })?
    } else {
        SqliteConnectOptions::new()
            .filename(&d.file)
            .create_if_missing(true)
    };

    Ok(with_log_level(options, log_level))
}

/// One direct connection attempt, so a failure surfaces with its real cause
/// instead of as a pool acquire timeout. The connection is closed again.
async fn try_connect<O>(backend: Backend, options: &O) -> DbResult<()>
where
    O: ConnectOptions,
    O::Connection: Sized,
{
    let conn = options
        .connect()
        .await
        .map_err(|e| connect_error(backend, &e))?;
    conn.close().await.map_err(|e| connect_error(backend, &e))
}

fn acquire_timeout() -> Duration {
    Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS)
}

async fn open_mysql(d: &MySqlDescriptor) -> DbResult<DbPool> {
    let options = mysql_connect_options(d);
    try_connect(Backend::MySql, &options).await?;

    let pool = MySqlPoolOptions::new()
        .acquire_timeout(acquire_timeout())
        .connect_lazy_with(options);
    Ok(DbPool::MySql(pool))
}

async fn open_postgres(d: &PostgresDescriptor, log_level: Option<LogLevel>) -> DbResult<DbPool> {
    let options = postgres_connect_options(d, log_level)?;
    try_connect(Backend::Postgres, &options).await?;

    let pool = PgPoolOptions::new()
        .acquire_timeout(acquire_timeout())
        .connect_lazy_with(options);
    Ok(DbPool::Postgres(pool))
}

async fn open_sqlite(d: &SqliteDescriptor, log_level: Option<LogLevel>) -> DbResult<DbPool> {
    let options = sqlite_connect_options(d, log_level)?;
    try_connect(Backend::SQLite, &options).await?;

    // An in-memory database lives as long as its connection, so keep the
    // pool's single connection open for the lifetime of the handle.
    let pool = SqlitePoolOptions::new()
        .max_connections(DEFAULT_MAX_CONNECTIONS_SQLITE)
        .min_connections(DEFAULT_MAX_CONNECTIONS_SQLITE)
        .idle_timeout(None)
        .max_lifetime(None)
        .acquire_timeout(acquire_timeout())
        .connect_with(options)
        .await
        .map_err(|e| connect_error(Backend::SQLite, &e))?;
    Ok(DbPool::SQLite(pool))
}

fn connect_error(backend: Backend, error: &sqlx::Error) -> DbError {
    DbError::connection(
        backend,
        format!("Failed to connect: {}", error),
        connection_suggestion(backend, error),
    )
}

/// Generate a helpful suggestion for connection errors.
fn connection_suggestion(backend: Backend, error: &sqlx::Error) -> String {
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") {
        return format!("Check that the {} server is running and accessible", backend);
    }

    if error_str.contains("authentication") || error_str.contains("password") {
        return "Verify the user and pass parameters".to_string();
    }

    if error_str.contains("does not exist") || error_str.contains("unknown database") {
        return "Check that the database name exists".to_string();
    }

    if error_str.contains("tls") || error_str.contains("ssl") {
        return "Check the sslmode parameter and TLS support of this build".to_string();
    }

    match backend {
        Backend::Postgres => {
            "Verify host, port, user, dbname, sslmode and timezone parameters".to_string()
        }
        Backend::MySql => "Verify host, port, user and database parameters".to_string(),
        Backend::SQLite => "Verify the file path is writable".to_string(),
        Backend::ClickHouse | Backend::Redis => {
            "Verify host and port parameters".to_string()
        }
    }
}
