use std::net::SocketAddr;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use animathic_api::{create_router, ApiConfig, AppState};
use animathic_db::DbConfig;
use animathic_storage::StorageClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let _ = rustls::crypto::ring::default_provider().install_default();

    let config = ApiConfig::from_env();
    let db_config = DbConfig::from_env()?;

    let pool = animathic_db::pool::connect(&db_config).await?;
    animathic_db::pool::run_migrations(&pool).await?;

    let storage = StorageClient::from_env().await?;
    let state = AppState::new(config.clone(), pool, storage).await;

    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    tracing::info!(%addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("received shutdown signal");
}
