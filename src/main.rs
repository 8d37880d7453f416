//! route-gate demo server.
//!
//! Serves the sample catalog behind the authorization gateway, with the
//! policy read from a TOML file and reloaded when the file changes.
//!
//! ```text
//! route-gate --config route-gate.toml
//! RUST_LOG=route_gate=debug route-gate --config route-gate.toml --bind 127.0.0.1:8080
//! ```

use std::path::PathBuf;

use clap::Parser;

use route_gate::config::load_config;
use route_gate::lifecycle::startup;
use route_gate::observability::logging::init_tracing;

#[derive(Parser, Debug)]
#[command(name = "route-gate", version, about = "Route-level authorization gateway")]
struct Cli {
    /// Policy and server configuration (TOML).
    #[arg(short, long, env = "ROUTE_GATE_CONFIG")]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // The log level lives in the config file, so peek at it before tracing is up.
    let log_level = cli
        .config
        .as_deref()
        .and_then(|path| load_config(path).ok())
        .map(|config| config.observability.log_level)
        .unwrap_or_else(|| "info".to_string());
    init_tracing(&log_level);

    tracing::info!("route-gate v{} starting", env!("CARGO_PKG_VERSION"));

    startup::run(cli.config, cli.bind).await?;
    Ok(())
}
