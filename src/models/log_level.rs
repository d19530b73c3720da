//! ORM log verbosity.

use log::LevelFilter;
use std::time::Duration;

/// Statements slower than this are reported at the slow-statement level.
pub const SLOW_STATEMENT_THRESHOLD: Duration = Duration::from_millis(200);

/// Severity used for driver statement logging. Ordered from quietest to loudest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum LogLevel {
    Silent = 1,
    Error = 2,
    Warn = 3,
    Info = 4,
}

const LOG_LEVEL_TOKENS: [(&str, LogLevel); 4] = [
    ("silent", LogLevel::Silent),
    ("error", LogLevel::Error),
    ("warn", LogLevel::Warn),
    ("info", LogLevel::Info),
];

impl LogLevel {
    /// Map a `loglevel` token. Unrecognized tokens, including empty, map to `Warn`.
    pub fn from_token(token: &str) -> Self {
        LOG_LEVEL_TOKENS
            .iter()
            .find(|(name, _)| *name == token)
            .map(|(_, level)| *level)
            .unwrap_or(LogLevel::Warn)
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Level for every executed statement.
    pub fn statement_filter(self) -> LevelFilter {
        match self {
            LogLevel::Info => LevelFilter::Info,
            _ => LevelFilter::Off,
        }
    }

    /// Level for statements exceeding [`SLOW_STATEMENT_THRESHOLD`].
    pub fn slow_statement_filter(self) -> LevelFilter {
        match self {
            LogLevel::Silent => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn | LogLevel::Info => LevelFilter::Warn,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = LOG_LEVEL_TOKENS
            .iter()
            .find(|(_, level)| level == self)
            .map(|(name, _)| *name)
            .unwrap_or("warn");
        write!(f, "{}", name)
    }
}
