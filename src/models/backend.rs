//! Backend identity.
//!
//! This module defines the closed set of backends the factory knows how to open.

/// Supported backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// Includes MariaDB
    MySql,
    Postgres,
    /// Embedded file database
    SQLite,
    /// Columnar analytics engine
    ClickHouse,
    /// Key-value cache. Never selected through `database.driver`.
    Redis,
}

impl Backend {
    /// Backends selectable through the `database.driver` key.
    pub const DATABASE_DRIVERS: [Backend; 4] = [
        Backend::MySql,
        Backend::Postgres,
        Backend::SQLite,
        Backend::ClickHouse,
    ];

    /// Parse the `database.driver` token. Matching is exact.
    pub fn from_driver_token(token: &str) -> Option<Self> {
        Self::DATABASE_DRIVERS
            .into_iter()
            .find(|backend| backend.driver_token() == token)
    }

    /// The configuration token naming this backend.
    pub fn driver_token(&self) -> &'static str {
        match self {
            Self::MySql => "mysql",
            Self::Postgres => "postgres",
            Self::SQLite => "sqlite",
            Self::ClickHouse => "clickhouse",
            Self::Redis => "redis",
        }
    }

    /// Get the display name for this backend.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::MySql => "MySQL",
            Self::Postgres => "PostgreSQL",
            Self::SQLite => "SQLite",
            Self::ClickHouse => "ClickHouse",
            Self::Redis => "Redis",
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
