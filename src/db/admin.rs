//! Post-connection administrative statements.

use crate::db::pool::DatabaseHandle;
use crate::error::DbResult;
use crate::models::Backend;
use tracing::debug;

/// Statement restarting the id sequence of `table.column` at `start`.
///
/// Only the two server relational backends have one; every other backend
/// returns `None`.
pub fn auto_increment_statement(
    backend: Backend,
    table: &str,
    column: &str,
    start: u64,
) -> Option<String> {
    match backend {
        Backend::Postgres => Some(format!(
            "ALTER SEQUENCE {}_{}_seq RESTART WITH {}",
            table, column, start
        )),
        Backend::MySql => Some(format!("ALTER TABLE {} AUTO_INCREMENT = {}", table, start)),
        Backend::SQLite | Backend::ClickHouse | Backend::Redis => None,
    }
}

/// Reset the auto-increment counter of an entity's table.
///
/// The table name comes from the handle's naming strategy. Backends without
/// support are a successful no-op. Execution errors are returned unchanged.
pub async fn reset_auto_increment(
    handle: &DatabaseHandle,
    entity: &str,
    column: &str,
    start: u64,
) -> DbResult<()> {
    let table = handle.table_name(entity);
    let Some(sql) = auto_increment_statement(handle.backend(), &table, column, start) else {
        debug!(
            backend = %handle.backend(),
            table = %table,
            "Auto-increment reset not supported, skipping"
        );
        return Ok(());
    };

    debug!(backend = %handle.backend(), sql = %sql, "Resetting auto-increment");
    handle.pool().execute(&sql).await?;
    Ok(())
}
