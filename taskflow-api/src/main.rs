//! # Taskflow API Server
//!
//! Collaborative Kanban boards over REST, with live board updates pushed to
//! WebSocket clients.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgresql://localhost/taskflow \
//! JWT_SECRET=... JWT_REFRESH_SECRET=... \
//! cargo run -p taskflow-api
//! ```
//!
//! Set `REDIS_URL` to fan board events out across several instances.

use std::sync::Arc;

use anyhow::Context;
use taskflow_api::{
    app::{build_router, AppState},
    config::{Config, LogFormat},
};
use taskflow_shared::{
    db::{
        migrations::run_migrations,
        pool::{close_pool, create_pool, PoolConfig},
    },
    realtime::{ConnectionRegistry, EventPublisher, LocalPublisher},
    redis::{run_relay, RedisClient, RedisConfig, RedisPublisher},
    store::PgStore,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "taskflow_api=debug,taskflow_shared=debug,tower_http=debug".into());
    match config.log_format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
    }

    tracing::info!(
        "Taskflow API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let pool = create_pool(
        PoolConfig::new(config.database.url.clone())
            .with_max_connections(config.database.max_connections),
    )
    .await
    .context("Failed to connect to database")?;
    run_migrations(&pool)
        .await
        .context("Failed to run migrations")?;

    let store = Arc::new(PgStore::new(pool.clone()));
    let registry = ConnectionRegistry::new();
    let cancel = CancellationToken::new();
    let mut background = Vec::new();

    let events: Arc<dyn EventPublisher> = match &config.redis_url {
        Some(url) => {
            let client = RedisClient::new(RedisConfig::new(url.clone()))
                .await
                .context("Failed to connect to Redis")?;
            tracing::info!(url = %client.display_url(), "Fanning board events out through Redis");

            let (publisher, publish_task) = RedisPublisher::spawn(client.clone(), cancel.clone());
            background.push(publish_task);
            background.push(tokio::spawn(run_relay(
                client,
                registry.clone(),
                cancel.clone(),
            )));
            Arc::new(publisher)
        }
        None => {
            tracing::info!("REDIS_URL not set, delivering board events in-process");
            Arc::new(LocalPublisher::new(registry.clone()))
        }
    };

    let bind_address = config.bind_address();
    let state = AppState::new(store, events, registry, config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown signal received, draining background tasks...");
    cancel.cancel();
    for task in background {
        if let Err(e) = task.await {
            tracing::warn!(error = %e, "Background task ended abnormally");
        }
    }
    close_pool(pool).await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
