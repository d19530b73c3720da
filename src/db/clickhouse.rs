//! ClickHouse connections.
//!
//! The native protocol goes through `klickhouse` over TCP; `http` and `https`
//! talk to the HTTP interface with `reqwest`. Session settings from the
//! descriptor are applied once after connecting (native) or sent with every
//! request (HTTP).

use crate::error::{DbError, DbResult};
use crate::models::{Backend, ClickHouseAuth, ClickHouseOptions, ClickHouseProtocol};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// An open ClickHouse client.
#[derive(Clone)]
pub enum ClickHouseClient {
    Native(NativeClient),
    Http(HttpClient),
}

#[derive(klickhouse::Row, Debug, Default)]
struct VersionRow {
    version: String,
}

#[derive(Clone)]
pub struct NativeClient {
    client: klickhouse::Client,
    debug: bool,
}

#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    base_url: String,
    auth: ClickHouseAuth,
    settings: Vec<(String, String)>,
    debug: bool,
}

impl std::fmt::Debug for ClickHouseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Native(c) => f
                .debug_struct("Native")
                .field("debug", &c.debug)
                .finish_non_exhaustive(),
            Self::Http(c) => f
                .debug_struct("Http")
                .field("base_url", &c.base_url)
                .field("database", &c.auth.database)
                .field("debug", &c.debug)
                .finish_non_exhaustive(),
        }
    }
}

async fn with_dial_timeout<T, E, F>(timeout: Option<Duration>, fut: F) -> DbResult<T>
where
    F: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let result = match timeout {
        Some(limit) => tokio::time::timeout(limit, fut).await.map_err(|_| {
            DbError::connection(
                Backend::ClickHouse,
                format!("connect timed out after {:?}", limit),
                "Check that the ClickHouse server is reachable or raise the timeout",
            )
        })?,
        None => fut.await,
    };

    result.map_err(|e| {
        let message = e.to_string();
        let suggestion = connection_suggestion(&message);
        DbError::connection(Backend::ClickHouse, message, suggestion)
    })
}

fn connection_suggestion(message: &str) -> String {
    let lower = message.to_lowercase();
    if lower.contains("connection refused") {
        "Check that the ClickHouse server is running and the protocol matches the port".to_string()
    } else if lower.contains("authentication") || lower.contains("password") {
        "Verify the user and pass parameters".to_string()
    } else if lower.contains("certificate") || lower.contains("tls") {
        "Check TLS configuration or set skiptls for self-signed certificates".to_string()
    } else {
        "Verify host, port and protocol (native, http, https)".to_string()
    }
}

impl ClickHouseClient {
    /// Connect with the given options. No retry is attempted.
    pub async fn connect(options: &ClickHouseOptions) -> DbResult<Self> {
        match options.protocol {
            ClickHouseProtocol::Native => Self::connect_native(options).await,
            ClickHouseProtocol::Http | ClickHouseProtocol::Https => {
                Self::connect_http(options).await
            }
        }
    }

    async fn connect_native(options: &ClickHouseOptions) -> DbResult<Self> {
        let client_options = klickhouse::ClientOptions {
            username: options.auth.username.clone(),
            password: options.auth.password.clone(),
            default_database: options.auth.database.clone(),
            ..Default::default()
        };

        let client = with_dial_timeout(
            options.dial_timeout,
            klickhouse::Client::connect(options.primary_addr(), client_options),
        )
        .await?;

        let client = Self::Native(NativeClient {
            client,
            debug: options.debug,
        });

        for (name, value) in &options.settings {
            client
                .execute(&format!("SET {} = {}", name, value))
                .await
                .map_err(|e| {
                    DbError::connection(
                        Backend::ClickHouse,
                        format!("failed to apply setting {}: {}", name, e),
                        "Check that the user may change session settings",
                    )
                })?;
        }

        Ok(client)
    }

    async fn connect_http(options: &ClickHouseOptions) -> DbResult<Self> {
        let base_url = options.http_base_url().ok_or_else(|| {
            DbError::invalid_parameter(
                "protocol",
                Backend::ClickHouse,
                "HTTP client requires http or https",
            )
        })?;

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = options.dial_timeout {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(tls) = options.tls {
            builder = builder.danger_accept_invalid_certs(tls.skip_verify);
        }
        let client = builder.build().map_err(|e| {
            DbError::connection(
                Backend::ClickHouse,
                format!("failed to build HTTP client: {}", e),
                "Check TLS support of this build",
            )
        })?;

        let http = HttpClient {
            client,
            base_url,
            auth: options.auth.clone(),
            settings: options.settings.clone(),
            debug: options.debug,
        };

        with_dial_timeout(options.dial_timeout, http.send("SELECT 1")).await?;

        Ok(Self::Http(http))
    }

    /// Execute a statement that returns no rows.
    pub async fn execute(&self, sql: &str) -> DbResult<()> {
        match self {
            Self::Native(c) => {
                if c.debug {
                    debug!(sql = %sql, "ClickHouse native execute");
                }
                c.client
                    .execute(sql)
                    .await
                    .map_err(|e| DbError::statement(sql, e.to_string()))
            }
            Self::Http(c) => c
                .send(sql)
                .await
                .map(|_| ())
                .map_err(|e| DbError::statement(sql, e)),
        }
    }

    /// Server version string, `None` if the query fails.
    pub async fn server_version(&self) -> Option<String> {
        match self {
            Self::Native(c) => c
                .client
                .query_one::<VersionRow>("SELECT version() AS version")
                .await
                .map_err(|e| debug!(error = %e, "ClickHouse version query failed"))
                .ok()
                .map(|row| row.version),
            Self::Http(c) => c
                .send("SELECT version()")
                .await
                .ok()
                .map(|body| body.trim().to_string()),
        }
    }
}

impl HttpClient {
    async fn send(&self, sql: &str) -> Result<String, String> {
        if self.debug {
            debug!(sql = %sql, url = %self.base_url, "ClickHouse HTTP execute");
        }

        let response = self
            .client
            .post(&self.base_url)
            .query(&[("database", self.auth.database.as_str())])
            .query(&self.settings)
            .header("X-ClickHouse-User", &self.auth.username)
            .header("X-ClickHouse-Key", &self.auth.password)
            .body(sql.to_string())
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        let body = response.text().await.map_err(|e| e.to_string())?;
        if status.is_success() {
            Ok(body)
        } else {
            Err(format!("HTTP {}: {}", status, body.trim()))
        }
    }
}
