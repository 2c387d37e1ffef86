//! Cinema reservation HTTP server.
//!
//! Wires up the `PostgreSQL` durable store, the Redis fast index, and
//! the [`cinema_core::ReservationCoordinator`] into an Axum application
//! exposing the `/api/v1` route table.

mod config;

use cinema_core::environment::SystemClock;
use cinema_core::ReservationCoordinator;
use cinema_postgres::PgStore;
use cinema_redis::RedisFastIndex;
use cinema_runtime::metrics::MetricsServer;
use cinema_web::AppState;
use config::Config;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cinema=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting cinema reservation server");

    let config = Config::from_env();
    config.validate()?;
    info!(
        database_url = %config.postgres.url,
        redis_url = %config.redis.url,
        "Configuration loaded"
    );

    info!("Connecting to Postgres...");
    let store = PgStore::connect(
        &config.postgres.url,
        config.postgres.max_connections,
        config.postgres.min_connections,
        config.postgres.connect_timeout,
    )
    .await?;
    store.run_migrations().await?;
    info!("Postgres connected and migrated");

    info!("Connecting to Redis...");
    let fast_index = RedisFastIndex::new(&config.redis.url).await?;
    info!("Redis connected");

    let metrics_addr = SocketAddr::from(([0, 0, 0, 0], config.server.metrics_port));
    let mut metrics_server = MetricsServer::new(metrics_addr);
    metrics_server.start()?;

    let coordinator = Arc::new(ReservationCoordinator::new(
        Arc::new(store),
        Arc::new(fast_index),
        Arc::new(SystemClock),
    ));

    info!("Seeding fast index from durable store...");
    if let Err(err) = coordinator.seed_fast_index().await {
        error!(error = %err, "failed to seed fast index from durable store");
        return Err(Box::new(err));
    }
    info!("Fast index seeded");

    let state = AppState::new(coordinator);
    let app = cinema_web::router(state)
        .layer(cinema_web::correlation_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "Server listening");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    info!("Server stopped");
    Ok(())
}

/// Waits for Ctrl+C or, on unix, `SIGTERM`.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("received Ctrl+C, shutting down gracefully");
        },
        () = terminate => {
            info!("received SIGTERM, shutting down gracefully");
        },
    }
}
