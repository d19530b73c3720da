//! Driver selection.
//!
//! Every database tree has the same shape:
//!
//! ```text
//! <scope>.database.driver = mysql | postgres | sqlite | clickhouse
//! <scope>.database.<driver>.<parameter> = ...
//! ```
//!
//! An empty scope addresses the top-level `database.` namespace.

use crate::error::{DbError, DbResult};
use crate::models::Backend;
use crate::source::ConfigSource;

/// `<scope>.database.` (or `database.` for an empty scope).
pub fn database_prefix(scope: &str) -> String {
    let scope = scope.trim_matches('.');
    if scope.is_empty() {
        "database.".to_string()
    } else {
        format!("{}.database.", scope)
    }
}

/// Parameter prefix for a driver token, `<scope>.database.<driver>.`.
///
/// Does not validate the token.
pub fn dialect_prefix(config: &dyn ConfigSource, scope: &str) -> String {
    let prefix = database_prefix(scope);
    let driver = config.get_str(&format!("{}driver", prefix));
    format!("{}{}.", prefix, driver)
}

/// Resolve the requested backend and the namespace holding its parameters.
///
/// Only the `driver` key is read. An unrecognized token fails before any
/// backend parameter is touched.
pub fn resolve(config: &dyn ConfigSource, scope: &str) -> DbResult<(Backend, String)> {
    let prefix = database_prefix(scope);
    let driver = config.get_str(&format!("{}driver", prefix));

    let backend =
        Backend::from_driver_token(&driver).ok_or_else(|| DbError::unsupported_driver(&driver))?;

    Ok((backend, format!("{}{}.", prefix, driver)))
}
