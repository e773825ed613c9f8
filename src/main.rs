use std::{sync::Arc, time::Duration};

use anyhow::Context;
use media_match::{
    config::Config,
    db::{
        create_pool, create_redis_client, Cache, MemoryProfileStore, PgProfileStore, ProfileStore,
    },
    routes::{create_router, AppState},
    services::{ContentCatalog, TmdbCatalog},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("media_match=info,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let store: Arc<dyn ProfileStore> = match &config.database_url {
        Some(url) => {
            let pool = create_pool(url).await?;
            Arc::new(PgProfileStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, profiles will be kept in memory");
            Arc::new(MemoryProfileStore::new())
        }
    };

    let (cache, cache_handle) = match &config.redis_url {
        Some(url) => match Cache::connect(create_redis_client(url)?).await {
            Ok(cache) => cache,
            Err(e) => {
                tracing::warn!(error = %e, "Redis unreachable, catalog responses will not be cached");
                Cache::disabled()
            }
        },
        None => {
            tracing::warn!("REDIS_URL not set, catalog responses will not be cached");
            Cache::disabled()
        }
    };

    let catalog: Arc<dyn ContentCatalog> = Arc::new(
        TmdbCatalog::new(
            cache,
            config.tmdb_api_key.clone(),
            config.tmdb_api_url.clone(),
            config.tmdb_language.clone(),
            config.certification_region.clone(),
            Duration::from_secs(config.catalog_timeout_secs),
        )
        .context("Failed to build TMDB client")?,
    );

    let state = Arc::new(AppState::from_config(&config, store.clone(), catalog));
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr())
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr()))?;

    tracing::info!(
        addr = %config.bind_addr(),
        store = store.name(),
        concurrency = config.match_concurrency,
        "Server running"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cache_handle.shutdown().await;
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
