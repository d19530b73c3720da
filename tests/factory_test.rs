//! Integration tests for the connection factory.

use conn_factory::db::{DefaultNamingStrategy, open, open_scoped, reset_auto_increment};
use conn_factory::models::LogLevel;
use conn_factory::{Backend, ConfigSource, ConfigTree, DbError};
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

/// Counts every lookup made against the wrapped tree.
struct CountingSource {
    inner: ConfigTree,
    reads: AtomicUsize,
}

impl ConfigSource for CountingSource {
    fn lookup(&self, path: &str) -> Option<&Value> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.lookup(path)
    }
}

fn sqlite_tree(dir: &TempDir, scope: &str, name: &str) -> ConfigTree {
    let file = dir.path().join(name);
    let prefix = if scope.is_empty() {
        String::new()
    } else {
        format!("{}.", scope)
    };
    ConfigTree::new()
        .with(&format!("{}database.driver", prefix), "sqlite")
        .with(
            &format!("{}database.sqlite.file", prefix),
            file.to_str().unwrap(),
        )
}

#[tokio::test]
async fn test_unsupported_driver_reads_only_driver_key() {
    let source = CountingSource {
        inner: ConfigTree::new()
            .with("database.driver", "mongo")
            .with("database.mongo.host", "db"),
        reads: AtomicUsize::new(0),
    };

    let err = open(&source).await.unwrap_err();
    assert!(matches!(err, DbError::UnsupportedDriver { ref driver } if driver == "mongo"));
    assert_eq!(source.reads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_missing_parameter_names_field_and_backend() {
    let tree = ConfigTree::new()
        .with("database.driver", "postgres")
        .with("database.postgres.user", "app")
        .with("database.postgres.pass", "secret")
        .with("database.postgres.host", "")
        .with("database.postgres.port", 5432);

    let err = open(&tree).await.unwrap_err();
    match err {
        DbError::MissingParameter { field, backend } => {
            assert_eq!(field, "host");
            assert_eq!(backend, Backend::Postgres);
        }
        other => panic!("Expected MissingParameter, got {:?}", other),
    }
}

#[tokio::test]
async fn test_open_sqlite_file_and_use_it() {
    let dir = TempDir::new().unwrap();
    let tree = sqlite_tree(&dir, "", "app.db");

    let handle = open(&tree).await.unwrap();
    assert_eq!(handle.backend(), Backend::SQLite);
    assert!(dir.path().join("app.db").exists());

    handle
        .pool()
        .execute("CREATE TABLE widgets (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT)")
        .await
        .unwrap();
    let affected = handle
        .pool()
        .execute("INSERT INTO widgets (name) VALUES ('a')")
        .await
        .unwrap();
    assert_eq!(affected, 1);

    handle.close().await;
}

#[tokio::test]
async fn test_reset_auto_increment_is_noop_on_sqlite() {
    let dir = TempDir::new().unwrap();
    let handle = open(&sqlite_tree(&dir, "", "noop.db")).await.unwrap();

    // No table exists; the call must still succeed without issuing a statement.
    reset_auto_increment(&handle, "Widget", "id", 100)
        .await
        .unwrap();

    let handle = handle.with_naming(DefaultNamingStrategy::new().with_prefix("app_"));
    assert_eq!(handle.table_name("Widget"), "app_widgets");
    reset_auto_increment(&handle, "Widget", "id", 1).await.unwrap();
    handle.close().await;
}

#[tokio::test]
async fn test_scoped_open_uses_scope_namespace() {
    let dir = TempDir::new().unwrap();
    let tree = sqlite_tree(&dir, "eu", "eu.db");

    let err = open(&tree).await.unwrap_err();
    assert!(matches!(err, DbError::UnsupportedDriver { ref driver } if driver.is_empty()));

    let handle = open_scoped(&tree, "eu").await.unwrap();
    assert_eq!(handle.backend(), Backend::SQLite);
    assert!(dir.path().join("eu.db").exists());
    handle.close().await;
}

#[tokio::test]
async fn test_concurrent_scoped_opens_do_not_interfere() {
    let dir = TempDir::new().unwrap();
    let scopes = ["us", "eu", "ap", "sa"];

    let mut tree = ConfigTree::new();
    for scope in scopes {
        let file = dir.path().join(format!("{}.db", scope));
        tree.set(&format!("{}.database.driver", scope), "sqlite");
        tree.set(
            &format!("{}.database.sqlite.file", scope),
            file.to_str().unwrap(),
        );
    }
    let tree = Arc::new(tree);

    let tasks: Vec<_> = scopes
        .into_iter()
        .map(|scope| {
            let tree = Arc::clone(&tree);
            tokio::spawn(async move {
                let handle = open_scoped(tree.as_ref(), scope).await?;
                handle
                    .pool()
                    .execute(&format!("CREATE TABLE only_{} (id INTEGER)", scope))
                    .await?;
                handle.close().await;
                Ok::<_, DbError>(())
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap().unwrap();
    }

    for scope in scopes {
        let tree = sqlite_tree(&dir, "", &format!("{}.db", scope));
        let handle = open(&tree).await.unwrap();
        // Each file holds exactly its own table.
        for other in scopes {
            let result = handle
                .pool()
                .execute(&format!("SELECT * FROM only_{}", other))
                .await;
            assert_eq!(result.is_ok(), other == scope, "{} in {}.db", other, scope);
        }
        handle.close().await;
    }
}

/// Nothing listens on port 1, so the connect is refused immediately.
fn refused_tree(driver: &str) -> ConfigTree {
    let prefix = format!("database.{}.", driver);
    ConfigTree::new()
        .with("database.driver", driver)
        .with(&format!("{}user", prefix), "app")
        .with(&format!("{}pass", prefix), "secret")
        .with(&format!("{}host", prefix), "127.0.0.1")
        .with(&format!("{}port", prefix), 1)
        .with(&format!("{}database", prefix), "main")
        .with(&format!("{}timezone", prefix), "UTC")
        .with(&format!("{}sslmode", prefix), "disable")
}

async fn assert_refused(driver: &str, expected: Backend) {
    let tree = refused_tree(driver);
    let result = tokio::time::timeout(Duration::from_secs(5), open(&tree))
        .await
        .unwrap_or_else(|_| panic!("{} open was retried instead of failing", driver));

    let err = result.unwrap_err();
    assert!(
        err.suggestion().is_some_and(|s| s.contains("running")),
        "unexpected suggestion: {:?}",
        err.suggestion()
    );
    match err {
        DbError::Connection {
            backend, message, ..
        } => {
            assert_eq!(backend, expected);
            assert!(
                message.to_lowercase().contains("refused"),
                "underlying cause lost: {}",
                message
            );
        }
        other => panic!("Expected Connection error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_mysql_refused_connect_fails_fast_with_cause() {
    assert_refused("mysql", Backend::MySql).await;
}

#[tokio::test]
async fn test_postgres_refused_connect_fails_fast_with_cause() {
    assert_refused("postgres", Backend::Postgres).await;
}

#[tokio::test]
async fn test_sqlite_unopenable_file_is_connection_error() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("missing").join("nested").join("app.db");
    let tree = ConfigTree::new()
        .with("database.driver", "sqlite")
        .with("database.sqlite.file", file.to_str().unwrap());

    let err = open(&tree).await.unwrap_err();
    assert!(
        matches!(err, DbError::Connection { backend: Backend::SQLite, .. }),
        "got {:?}",
        err
    );
    assert!(!file.exists());
}

#[tokio::test]
async fn test_absent_loglevel_leaves_driver_logging_untouched() {
    let dir = TempDir::new().unwrap();
    let handle = open(&sqlite_tree(&dir, "", "quiet.db")).await.unwrap();

    assert_eq!(handle.settings().log_level, None);
    assert!(!handle.settings().disable_foreign_key_constraint_when_migrating);
    handle.close().await;
}

/// Test that requires a running MySQL database.
/// Set TEST_MYSQL_HOST (and optionally TEST_MYSQL_PORT, TEST_MYSQL_USER,
/// TEST_MYSQL_PASS, TEST_MYSQL_DATABASE) to run this test.
#[tokio::test]
async fn test_mysql_reset_auto_increment() {
    let host = match std::env::var("TEST_MYSQL_HOST") {
        Ok(host) => host,
        Err(_) => {
            eprintln!("Skipping test: TEST_MYSQL_HOST not set");
            return;
        }
    };
    let env = |key: &str, default: &str| std::env::var(key).unwrap_or_else(|_| default.into());

    let tree = ConfigTree::new()
        .with("database.driver", "mysql")
        .with("database.mysql.host", host)
        .with("database.mysql.port", env("TEST_MYSQL_PORT", "3306"))
        .with("database.mysql.user", env("TEST_MYSQL_USER", "root"))
        .with("database.mysql.pass", env("TEST_MYSQL_PASS", "root"))
        .with("database.mysql.database", env("TEST_MYSQL_DATABASE", "test"))
        .with("database.mysql.charset", "utf8mb4")
        .with("database.mysql.parseTime", true)
        .with("database.mysql.loglevel", "info");

    let handle = open(&tree).await.unwrap();
    assert_eq!(handle.settings().log_level, Some(LogLevel::Info));
    handle
        .pool()
        .execute("CREATE TABLE IF NOT EXISTS widgets (id INT AUTO_INCREMENT PRIMARY KEY)")
        .await
        .unwrap();
    reset_auto_increment(&handle, "Widget", "id", 100)
        .await
        .unwrap();
    handle.close().await;
}

/// Test that requires a running PostgreSQL database.
/// Set TEST_POSTGRES_HOST (and optionally TEST_POSTGRES_PORT, TEST_POSTGRES_USER,
/// TEST_POSTGRES_PASS, TEST_POSTGRES_DATABASE) to run this test.
#[tokio::test]
async fn test_postgres_reset_auto_increment() {
    let host = match std::env::var("TEST_POSTGRES_HOST") {
        Ok(host) => host,
        Err(_) => {
            eprintln!("Skipping test: TEST_POSTGRES_HOST not set");
            return;
        }
    };
    let env = |key: &str, default: &str| std::env::var(key).unwrap_or_else(|_| default.into());

    let tree = ConfigTree::new()
        .with("database.driver", "postgres")
        .with("database.postgres.host", host)
        .with("database.postgres.port", env("TEST_POSTGRES_PORT", "5432"))
        .with("database.postgres.user", env("TEST_POSTGRES_USER", "postgres"))
        .with("database.postgres.pass", env("TEST_POSTGRES_PASS", "postgres"))
        .with("database.postgres.database", env("TEST_POSTGRES_DATABASE", "test"))
        .with("database.postgres.timezone", "UTC")
        .with("database.postgres.sslmode", "disable");

    let handle = open(&tree).await.unwrap();
    handle
        .pool()
        .execute("CREATE TABLE IF NOT EXISTS widgets (id SERIAL PRIMARY KEY)")
        .await
        .unwrap();
    reset_auto_increment(&handle, "Widget", "id", 100)
        .await
        .unwrap();
    handle.close().await;
}
