//! Connection probe - opens the configured database and reports the result.

use conn_factory::cache::open_cache;
use conn_factory::config::Config;
use conn_factory::db::open_scoped;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber.with(fmt::layer().json()).init();
    } else {
        subscriber
            .with(fmt::layer().with_target(true).with_thread_ids(false))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse configuration from command line and environment
    let config = Config::parse_args();

    // Initialize logging
    init_tracing(&config);

    info!(
        config = %config.config.display(),
        scope = %config.scope,
        "Starting conn-factory v{}",
        env!("CARGO_PKG_VERSION")
    );

    let tree = config.load_tree()?;

    let handle = match open_scoped(&tree, &config.scope).await {
        Ok(handle) => handle,
        Err(e) => {
            error!(error = %e, suggestion = ?e.suggestion(), "Failed to open database");
            return Err(e.into());
        }
    };

    let version = handle.server_version().await;
    println!(
        "{}: connected (server version: {})",
        handle.backend(),
        version.as_deref().unwrap_or("unknown")
    );
    handle.close().await;

    if config.cache {
        let cache = open_cache(&tree);
        let mut conn = cache.connection().await?;
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        println!("Redis at {}: {}", cache.options().addr, pong);
    }

    info!("Probe complete");
    Ok(())
}
