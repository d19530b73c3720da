//! Connection descriptor builders.
//!
//! One pure function per backend. Each reads its parameters from the
//! `<scope>.database.<driver>.` namespace and returns a descriptor, or the
//! first missing/invalid required field. No builder performs I/O.

use crate::error::{DbError, DbResult};
use crate::models::{
    Backend, CLICKHOUSE_MAX_EXECUTION_TIME_SECS, ClickHouseAuth, ClickHouseOptions,
    ClickHouseProtocol, ConnectionDescriptor, LogLevel, MySqlDescriptor, PostgresDescriptor,
    SqliteDescriptor, TlsPolicy,
};
use crate::source::ConfigSource;

/// Accepted values of the Postgres `sslmode` parameter.
pub const POSTGRES_SSL_MODES: &[&str] = &[
    "disable",
    "allow",
    "prefer",
    "require",
    "verify-ca",
    "verify-full",
];

/// Reader for one backend's parameter namespace.
struct Params<'a> {
    config: &'a dyn ConfigSource,
    prefix: &'a str,
    backend: Backend,
}

impl<'a> Params<'a> {
    fn new(config: &'a dyn ConfigSource, prefix: &'a str, backend: Backend) -> Self {
        Self {
            config,
            prefix,
            backend,
        }
    }

    fn key(&self, field: &str) -> String {
        format!("{}{}", self.prefix, field)
    }

    fn raw(&self, field: &str) -> String {
        self.config.get_str(&self.key(field))
    }

    fn required(&self, field: &str) -> DbResult<String> {
        let value = self.raw(field);
        if value.is_empty() {
            return Err(DbError::missing_parameter(field, self.backend));
        }
        Ok(value)
    }

    fn optional(&self, field: &str) -> Option<String> {
        Some(self.raw(field)).filter(|v| !v.is_empty())
    }

    fn flag(&self, field: &str) -> bool {
        self.config.get_bool(&self.key(field))
    }

    fn port(&self) -> DbResult<u16> {
        let raw = self.required("port")?;
        match raw.trim().parse::<u16>() {
            Ok(0) | Err(_) => Err(DbError::invalid_parameter(
                "port",
                self.backend,
                format!("'{}' is not a port number in 1-65535", raw),
            )),
            Ok(port) => Ok(port),
        }
    }
}

/// Build the descriptor for `backend` from `prefix`.
pub fn build_descriptor(
    config: &dyn ConfigSource,
    backend: Backend,
    prefix: &str,
) -> DbResult<ConnectionDescriptor> {
    match backend {
        Backend::MySql => build_mysql(config, prefix).map(ConnectionDescriptor::MySql),
        Backend::Postgres => build_postgres(config, prefix).map(ConnectionDescriptor::Postgres),
        Backend::SQLite => build_sqlite(config, prefix).map(ConnectionDescriptor::SQLite),
        Backend::ClickHouse => {
            build_clickhouse(config, prefix).map(ConnectionDescriptor::ClickHouse)
        }
        Backend::Redis => Err(DbError::unsupported_driver(backend.driver_token())),
    }
}

pub fn build_mysql(config: &dyn ConfigSource, prefix: &str) -> DbResult<MySqlDescriptor> {
    let p = Params::new(config, prefix, Backend::MySql);

    Ok(MySqlDescriptor {
        user: p.required("user")?,
        password: p.required("pass")?,
        host: p.required("host")?,
        port: p.port()?,
        database: p.required("database")?,
        charset: p.optional("charset"),
        loc: p.optional("local"),
        parse_time: p.flag("parseTime"),
        disable_fk_when_migrating: p.flag("disableMigrateWarn"),
        log_level: p.optional("loglevel").map(|t| LogLevel::from_token(&t)),
    })
}

pub fn build_postgres(config: &dyn ConfigSource, prefix: &str) -> DbResult<PostgresDescriptor> {
    let p = Params::new(config, prefix, Backend::Postgres);

    let descriptor = PostgresDescriptor {
        user: p.required("user")?,
        password: p.required("pass")?,
        host: p.required("host")?,
        port: p.port()?,
        database: p.required("database")?,
        timezone: p.required("timezone")?,
        sslmode: p.required("sslmode")?,
    };

    if !POSTGRES_SSL_MODES.contains(&descriptor.sslmode.as_str()) {
        return Err(DbError::invalid_parameter(
            "sslmode",
            Backend::Postgres,
            format!(
                "'{}' is not one of {}",
                descriptor.sslmode,
                POSTGRES_SSL_MODES.join(", ")
            ),
        ));
    }

    Ok(descriptor)
}

pub fn build_sqlite(config: &dyn ConfigSource, prefix: &str) -> DbResult<SqliteDescriptor> {
    let p = Params::new(config, prefix, Backend::SQLite);

    Ok(SqliteDescriptor {
        file: p.required("file")?,
    })
}

pub fn build_clickhouse(config: &dyn ConfigSource, prefix: &str) -> DbResult<ClickHouseOptions> {
    let p = Params::new(config, prefix, Backend::ClickHouse);

    let username = p.required("user")?;
    let password = p.required("pass")?;
    let host = p.required("host")?;
    let port = p.port()?;
    let database = p.required("database")?;

    let token = p.raw("protocol");
    let protocol = ClickHouseProtocol::from_token(&token).ok_or_else(|| {
        DbError::invalid_parameter(
            "protocol",
            Backend::ClickHouse,
            format!("'{}' is not one of native, http, https", token),
        )
    })?;

    let tls = (protocol == ClickHouseProtocol::Https).then(|| TlsPolicy {
        skip_verify: p.flag("skiptls"),
    });

    let timeout = config.get_duration(&p.key("timeout"));

    Ok(ClickHouseOptions {
        protocol,
        addr: vec![format!("{}:{}", host, port)],
        auth: ClickHouseAuth {
            database,
            username,
            password,
        },
        tls,
        settings: vec![(
            "max_execution_time".to_string(),
            CLICKHOUSE_MAX_EXECUTION_TIME_SECS.to_string(),
        )],
        dial_timeout: (!timeout.is_zero()).then_some(timeout),
        debug: p.flag("debug"),
    })
}
