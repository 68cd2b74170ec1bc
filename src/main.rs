//! parleyd entry point.

use parleyd::auth::GuestProvider;
use parleyd::config::Config;
use parleyd::handlers::Registry;
use parleyd::network::Gateway;
use parleyd::services::spawn_typing_sweeper;
use parleyd::state::Coordinator;
use parleyd::store::NoOpStore;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            error!(path = %config_path, error = %e, "Failed to load configuration");
            std::process::exit(1);
        }
    };
    info!(server = %config.server.name, "Starting parleyd");

    parleyd::metrics::init();
    let metrics_port = config.server.metrics_port.unwrap_or(9090);
    if metrics_port != 0 {
        tokio::spawn(parleyd::http::run_http_server(metrics_port));
    } else {
        info!("Metrics endpoint disabled (metrics_port = 0)");
    }

    let coordinator = Arc::new(Coordinator::new(
        &config,
        Arc::new(NoOpStore),
        Arc::new(GuestProvider),
    ));
    spawn_typing_sweeper(Arc::clone(&coordinator));

    let registry = Arc::new(Registry::new());
    let gateway = Gateway::bind(config.listen.clone(), coordinator, registry).await?;
    gateway.run().await
}
