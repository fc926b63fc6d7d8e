use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use cat_fighter::config::ServerConfig;
use cat_fighter::metrics::{self, Metrics};
use cat_fighter::net::relay::RelayHub;
use cat_fighter::net::transport::RelayServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize logging (RUST_LOG overrides the default level)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    info!("Cat Fighter relay v{}", env!("CARGO_PKG_VERSION"));

    let config = ServerConfig::load_or_default();
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;
    info!(
        "Configuration loaded: {}:{}, max_rooms={}",
        config.bind_address, config.port, config.max_rooms
    );

    let metrics = Arc::new(Metrics::new());

    let metrics_clone = metrics.clone();
    let metrics_port = config.metrics_port;
    tokio::spawn(async move {
        if let Err(e) = metrics::start_metrics_server(metrics_clone, metrics_port).await {
            error!("Metrics server error: {}", e);
        }
    });

    let hub = Arc::new(RwLock::new(RelayHub::new(config.max_rooms, metrics.clone())));
    let server = RelayServer::new(config.clone(), hub.clone(), metrics.clone()).await?;

    info!("Relay ready on https://{}", server.bind_addr());
    info!("Certificate hash: {}", server.cert_hash());

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("Server error: {}", e);
            }
        }
        signal = tokio::signal::ctrl_c() => {
            match signal {
                Ok(()) => info!("Shutdown signal received"),
                Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
            }
        }
    }

    hub.write().await.shutdown();
    info!("Relay stopped");

    Ok(())
}
