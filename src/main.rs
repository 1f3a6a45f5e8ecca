//! Planning poker room server (default binary).
//!
//! Configuration comes from `POKER_*` environment variables; logging from
//! `RUST_LOG` (default `info`).

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use planning_poker::adapter::{run_server, ServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::from_env()?;
    info!(?config, "starting planning poker server");
    run_server(config, None).await
}
