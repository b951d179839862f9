//! `hf-proxy` binary entrypoint.
//!
//! This starts the Actix server using configuration from the environment.

use hf_proxy::{serve, ProxyConfig};
use tracing::warn;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ProxyConfig::load()?;

    // Respect `RUST_LOG` if set; otherwise info, or debug with `DEBUG=true`.
    let default_level = if config.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    if config.hf_token.is_none() {
        warn!("HF_TOKEN is not set; clients must send their own bearer token");
    }

    serve(config).await
}
