//! Flowgate — entry point.
//!
//! Reads configuration from environment variables and starts the axum-based
//! HTTP gateway service.
//!
//! # Environment variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `GATEWAY_PORT` | `3000` | TCP port to listen on. |
//! | `CATALOG_DIR` | `./catalog` | Directory of catalog JSON documents. |

use flowgate_gateway::server::{GatewayServer, GatewayServerConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Initialise structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("flowgate_gateway=info".parse().expect("valid directive")),
        )
        .init();

    let port: u16 = std::env::var("GATEWAY_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);

    let catalog_dir =
        std::env::var("CATALOG_DIR").unwrap_or_else(|_| "./catalog".to_string());

    info!(port = port, catalog_dir = %catalog_dir, "Flowgate configuration loaded");

    let server = GatewayServer::new(GatewayServerConfig { port, catalog_dir });
    if let Err(e) = server.start().await {
        eprintln!("Gateway error: {e}");
        std::process::exit(1);
    }
}
