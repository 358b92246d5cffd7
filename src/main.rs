//! Hardware Lab Server
//!
//! REST API for lending hardware to hackers during an event.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use hwlab_server::{
    api,
    clock::SystemClock,
    config::{AppConfig, LoggingConfig},
    repository::{LendingStore, MemoryLendingStore, PgLendingStore},
    services::{inventory::SnapshotCache, redis::RedisService, Services},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    // Keep the guard alive so buffered file logs get flushed
    let _log_guard = init_tracing(&config.logging);

    tracing::info!("Starting Hardware Lab Server v{}", env!("CARGO_PKG_VERSION"));

    let store: Arc<dyn LendingStore> = match &config.database.url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(config.database.max_connections)
                .min_connections(config.database.min_connections)
                .connect(url)
                .await
                .context("Failed to connect to database")?;

            tracing::info!("Connected to database");

            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("Failed to run database migrations")?;

            tracing::info!("Database migrations completed");
            Arc::new(PgLendingStore::new(pool))
        }
        None => {
            tracing::warn!("No database configured, requests are kept in memory");
            Arc::new(MemoryLendingStore::new())
        }
    };

    let cache = match &config.redis.url {
        Some(url) => match RedisService::new(url).await {
            Ok(redis) => {
                tracing::info!("Connected to Redis");
                Some(SnapshotCache {
                    redis,
                    ttl_seconds: config.redis.api_cache_seconds,
                })
            }
            Err(e) => {
                tracing::warn!("Redis unavailable, hardware snapshot is not cached: {}", e);
                None
            }
        },
        None => None,
    };

    let policy = config.lending_policy();
    tracing::info!(
        "Requests expire after {} minutes, hackers can request: {}",
        policy.expiry_window().num_minutes(),
        policy.hackers_can_request()
    );

    let services = Services::new(store, Arc::new(SystemClock), policy, cache);

    let addr = SocketAddr::new(
        config.server.host.parse().context("Invalid host address")?,
        config.server.port,
    );

    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    let app = api::router(state);

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("hwlab_server={},tower_http=debug", logging.level).into());

    let stdout = match logging.format.as_str() {
        "json" => tracing_subscriber::fmt::layer().json().boxed(),
        _ => tracing_subscriber::fmt::layer().boxed(),
    };

    let (file, guard) = match &logging.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "hwlab-server.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout)
        .with(file)
        .init();

    guard
}
