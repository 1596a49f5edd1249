//! Real-time orders service binary.

use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use realtime_orders::{
    config::{Args, ServerConfig},
    create_router,
    listener::ChangeListener,
    state::AppState,
    store::OrderStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "realtime_orders=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse command line args
    let args = Args::parse();
    let config = ServerConfig::from(&args);

    info!(listen = %config.listen_addr, "starting realtime-orders");

    // Query pool, separate from the listener connection
    let pool = PgPoolOptions::new()
        .min_connections(config.pool_min_connections)
        .max_connections(config.pool_max_connections)
        .acquire_timeout(config.pool_acquire_timeout)
        .connect(&config.database_url)
        .await?;
    info!(
        min_connections = config.pool_min_connections,
        max_connections = config.pool_max_connections,
        "database connection pool created"
    );

    let store = OrderStore::new(pool.clone());
    store.ensure_schema().await?;

    let state = AppState::new(store, config.clone());

    // Subscribe to the change channel; failure here is fatal
    let change_listener =
        ChangeListener::connect(&config.database_url, state.broadcaster.clone()).await?;
    let listener_handle = change_listener.spawn();

    let app = create_router(state);

    let tcp_listener = TcpListener::bind(&config.listen_addr).await?;
    info!("listening on {}", config.listen_addr);

    axum::serve(tcp_listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    listener_handle.stop().await;
    pool.close().await;
    info!("shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}
