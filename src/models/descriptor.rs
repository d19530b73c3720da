//! Connection descriptors.
//!
//! A descriptor holds every parameter needed to open one backend. String based
//! backends render a DSN; ClickHouse carries a structured options record.

use crate::models::{Backend, LogLevel};
use std::time::Duration;

const MASK: &str = "****";

/// Fixed ClickHouse execution limit, in seconds.
pub const CLICKHOUSE_MAX_EXECUTION_TIME_SECS: u64 = 60;

/// MySQL connection parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MySqlDescriptor {
    pub user: String,
    /// Contains sensitive data - never log
    pub password: String,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub charset: Option<String>,
    /// Timezone/locale token, emitted as `loc`
    pub loc: Option<String>,
    pub parse_time: bool,
    /// Skip foreign key constraints while migrating (`disableMigrateWarn`)
    pub disable_fk_when_migrating: bool,
    pub log_level: Option<LogLevel>,
}

impl MySqlDescriptor {
    /// Render the DSN: `user:pass@tcp(host:port)/dbname?[&charset=X][&loc=X][&parseTime=True]`.
    pub fn dsn(&self) -> String {
        self.render(&self.password)
    }

    /// The DSN with the password masked.
    pub fn masked_dsn(&self) -> String {
        self.render(MASK)
    }

    fn render(&self, password: &str) -> String {
        let mut dsn = format!(
            "{}:{}@tcp({}:{})/{}?",
            self.user, password, self.host, self.port, self.database
        );

        // Order is part of the format: charset, loc, parseTime.
        if let Some(charset) = &self.charset {
            dsn.push_str("&charset=");
            dsn.push_str(charset);
        }
        if let Some(loc) = &self.loc {
            dsn.push_str("&loc=");
            dsn.push_str(loc);
        }
        if self.parse_time {
            dsn.push_str("&parseTime=True");
        }
        dsn
    }
}

/// PostgreSQL connection parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostgresDescriptor {
    pub user: String,
    /// Contains sensitive data - never log
    pub password: String,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub timezone: String,
    pub sslmode: String,
}

impl PostgresDescriptor {
    /// Render the DSN. All seven fields are always emitted, in fixed order.
    pub fn dsn(&self) -> String {
        self.render(&self.password)
    }

    /// The DSN with the password masked.
    pub fn masked_dsn(&self) -> String {
        self.render(MASK)
    }

    fn render(&self, password: &str) -> String {
        format!(
            "host={} port={} user={} dbname={} password={} sslmode={} TimeZone={}",
            self.host, self.port, self.user, self.database, password, self.sslmode, self.timezone
        )
    }
}

/// Embedded file database parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteDescriptor {
    pub file: String,
}

impl SqliteDescriptor {
    pub fn dsn(&self) -> String {
        self.file.clone()
    }
}

/// ClickHouse transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClickHouseProtocol {
    #[default]
    Native,
    Http,
    Https,
}

impl ClickHouseProtocol {
    /// Parse the `protocol` token. Empty selects the native protocol.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "" | "native" => Some(Self::Native),
            "http" => Some(Self::Http),
            "https" => Some(Self::Https),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Native => "native",
            Self::Http => "http",
            Self::Https => "https",
        }
    }
}

impl std::fmt::Display for ClickHouseProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Credentials and default database for ClickHouse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickHouseAuth {
    pub database: String,
    pub username: String,
    /// Contains sensitive data - never log
    pub password: String,
}

/// TLS policy. Only present for the `https` protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TlsPolicy {
    pub skip_verify: bool,
}

/// ClickHouse connection options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickHouseOptions {
    pub protocol: ClickHouseProtocol,
    /// `host:port` endpoints; the first is used to connect.
    pub addr: Vec<String>,
    pub auth: ClickHouseAuth,
    pub tls: Option<TlsPolicy>,
    /// Session settings applied after connecting.
    pub settings: Vec<(String, String)>,
    /// `None` leaves the transport default in place.
    pub dial_timeout: Option<Duration>,
    pub debug: bool,
}

impl ClickHouseOptions {
    /// The endpoint used to connect.
    pub fn primary_addr(&self) -> &str {
        self.addr.first().map(String::as_str).unwrap_or_default()
    }

    /// Base URL of the HTTP interface, `None` for the native protocol.
    pub fn http_base_url(&self) -> Option<String> {
        match self.protocol {
            ClickHouseProtocol::Native => None,
            ClickHouseProtocol::Http => Some(format!("http://{}/", self.primary_addr())),
            ClickHouseProtocol::Https => Some(format!("https://{}/", self.primary_addr())),
        }
    }

    /// Display form with the password masked.
    pub fn masked_dsn(&self) -> String {
        format!(
            "clickhouse://{}:{}@{}/{}?protocol={}",
            self.auth.username,
            MASK,
            self.addr.join(","),
            self.auth.database,
            self.protocol
        )
    }
}

/// A fully built descriptor for one of the database backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionDescriptor {
    MySql(MySqlDescriptor),
    Postgres(PostgresDescriptor),
    SQLite(SqliteDescriptor),
    ClickHouse(ClickHouseOptions),
}

impl ConnectionDescriptor {
    pub fn backend(&self) -> Backend {
        match self {
            Self::MySql(_) => Backend::MySql,
            Self::Postgres(_) => Backend::Postgres,
            Self::SQLite(_) => Backend::SQLite,
            Self::ClickHouse(_) => Backend::ClickHouse,
        }
    }

    /// Display-safe connection string (credentials masked).
    pub fn masked_dsn(&self) -> String {
        match self {
            Self::MySql(d) => d.masked_dsn(),
            Self::Postgres(d) => d.masked_dsn(),
            Self::SQLite(d) => d.dsn(),
            Self::ClickHouse(o) => o.masked_dsn(),
        }
    }

    /// Configured ORM log level, if any.
    pub fn log_level(&self) -> Option<LogLevel> {
        match self {
            Self::MySql(d) => d.log_level,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mysql() -> MySqlDescriptor {
        MySqlDescriptor {
            user: "u".to_string(),
            password: "p".to_string(),
            host: "h".to_string(),
            port: 3306,
            database: "d".to_string(),
            charset: None,
            loc: None,
            parse_time: false,
            disable_fk_when_migrating: false,
            log_level: None,
        }
    }

    #[test]
    fn test_mysql_dsn_base_only() {
        assert_eq!(mysql().dsn(), "u:p@tcp(h:3306)/d?");
    }

    #[test]
    fn test_mysql_dsn_full_order() {
        let d = MySqlDescriptor {
            charset: Some("utf8".to_string()),
            loc: Some("Local".to_string()),
            parse_time: true,
            ..mysql()
        };
        assert_eq!(
            d.dsn(),
            "u:p@tcp(h:3306)/d?&charset=utf8&loc=Local&parseTime=True"
        );
    }

    #[test]
    fn test_mysql_dsn_skips_absent_options() {
        let d = MySqlDescriptor {
            loc: Some("UTC".to_string()),
            ..mysql()
        };
        assert_eq!(d.dsn(), "u:p@tcp(h:3306)/d?&loc=UTC");

        let d = MySqlDescriptor {
            parse_time: true,
            ..mysql()
        };
        assert_eq!(d.dsn(), "u:p@tcp(h:3306)/d?&parseTime=True");
    }

    #[test]
    fn test_mysql_masked_dsn() {
        let d = MySqlDescriptor {
            password: "secret".to_string(),
            ..mysql()
        };
        let masked = d.masked_dsn();
        assert!(!masked.contains("secret"));
        assert_eq!(masked, "u:****@tcp(h:3306)/d?");
    }

    #[test]
    fn test_postgres_dsn_emits_empty_fields() {
        let d = PostgresDescriptor {
            user: String::new(),
            password: String::new(),
            host: "db".to_string(),
            port: 5432,
            database: String::new(),
            timezone: String::new(),
            sslmode: "disable".to_string(),
        };
        assert_eq!(
            d.dsn(),
            "host=db port=5432 user= dbname= password= sslmode=disable TimeZone="
        );
    }

    #[test]
    fn test_clickhouse_protocol_tokens() {
        assert_eq!(
            ClickHouseProtocol::from_token(""),
            Some(ClickHouseProtocol::Native)
        );
        assert_eq!(
            ClickHouseProtocol::from_token("native"),
            Some(ClickHouseProtocol::Native)
        );
        assert_eq!(
            ClickHouseProtocol::from_token("http"),
            Some(ClickHouseProtocol::Http)
        );
        assert_eq!(
            ClickHouseProtocol::from_token("https"),
            Some(ClickHouseProtocol::Https)
        );
        assert_eq!(ClickHouseProtocol::from_token("grpc"), None);
    }

    #[test]
    fn test_clickhouse_http_base_url() {
        let options = ClickHouseOptions {
            protocol: ClickHouseProtocol::Https,
            addr: vec!["ch:8443".to_string()],
            auth: ClickHouseAuth {
                database: "events".to_string(),
                username: "default".to_string(),
                password: "pw".to_string(),
            },
            tls: Some(TlsPolicy { skip_verify: true }),
            settings: Vec::new(),
            dial_timeout: None,
            debug: false,
        };
        assert_eq!(options.http_base_url().as_deref(), Some("https://ch:8443/"));
        assert!(!options.masked_dsn().contains("pw"));

        let native = ClickHouseOptions {
            protocol: ClickHouseProtocol::Native,
            ..options
        };
        assert_eq!(native.http_base_url(), None);
    }
}
