use keyed_dal::config::Config;
use keyed_dal::context::DataLayer;
use keyed_dal::sessions::handlers::router;

use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    let dal = Arc::new(DataLayer::from_config(&config)?);

    let bind_addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!("Session service listening on {}", bind_addr);

    axum::serve(listener, router(dal.clone()))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await?;

    tracing::info!("Draining pending operations...");
    dal.shutdown().await;
    tracing::info!("Shutdown complete");

    Ok(())
}
