use anyhow::Result;
use domain::services::{InMemoryStore, SystemClock};
use gamenight_api::app::{create_app, AppState, Stores};
use gamenight_api::config::{Config, StorageBackend};
use gamenight_api::middleware::{init_logging, init_metrics};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::load()?;
    init_logging(&config.logging)?;
    init_metrics()?;

    info!("Starting game night API v{}", env!("CARGO_PKG_VERSION"));

    let (stores, pool) = match config.storage.backend {
        StorageBackend::Postgres => {
            let pool = persistence::db::create_pool(&config.database.pool_settings()).await?;

            info!("Running database migrations...");
            sqlx::migrate!("../persistence/src/migrations")
                .run(&pool)
                .await?;
            info!("Migrations completed");

            (Stores::postgres(&pool), Some(pool))
        }
        StorageBackend::Memory => {
            warn!("Using in-memory storage; all data is lost on restart");
            (Stores::in_memory(Arc::new(InMemoryStore::new())), None)
        }
    };

    let addr = config.socket_addr()?;
    let state = AppState::new(config, stores, Arc::new(SystemClock), pool)?;
    let refresher = state.club.spawn_refresher();
    let app = create_app(state);

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    refresher.abort();
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
