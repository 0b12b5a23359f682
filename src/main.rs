use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use car_showcase_api::{
    config::Config,
    db::{
        create_pool, create_redis_client, run_migrations, Cache, PgCatalogStore, PgInteractionLog,
        PgLikeStore,
    },
    routes::{create_router, AppState},
    services::{InteractionLog, Recommender, RetentionSweeper},
};

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("car_showcase_api=info,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    run_migrations(&pool).await?;

    let interaction_log: Arc<dyn InteractionLog> = Arc::new(PgInteractionLog::new(pool.clone()));
    let mut recommender = Recommender::new(
        Arc::new(PgCatalogStore::new(pool.clone())),
        Arc::new(PgLikeStore::new(pool.clone())),
        interaction_log.clone(),
        config.recommender_settings(),
    );

    let cache_writer = match &config.redis_url {
        Some(redis_url) => {
            let client = create_redis_client(redis_url)?;
            let (cache, writer) = Cache::new(client).await;
            recommender = recommender.with_cache(cache);
            tracing::info!("Redis cache enabled");
            Some(writer)
        }
        None => {
            tracing::info!("REDIS_URL not set, running without cache");
            None
        }
    };

    let sweeper = RetentionSweeper::new(
        interaction_log,
        config.recommender_settings().exposure_window,
        config.sweep_interval(),
    )
    .spawn();

    let app = create_router(AppState::new(recommender));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.shutdown().await;
    if let Some(writer) = cache_writer {
        writer.shutdown().await;
    }
    pool.close().await;
    tracing::info!("Shutdown complete");

    Ok(())
}
