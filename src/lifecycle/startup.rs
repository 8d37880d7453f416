//! Startup orchestration.
//!
//! # Responsibilities
//! - Compile the configured policy and build the guarded application
//! - Start metrics, the config watcher and signal listeners
//! - Bind the listener last and serve until shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Reloads replace only the policy blueprint; a reload that fails to
//!   compile is logged and the running policy is kept

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use crate::catalog;
use crate::config::{load_config, BlueprintGenerator, ConfigError, ConfigWatcher, GatewayConfig};
use crate::error::ConfigurationError;
use crate::gateway::AuthorizationGateway;
use crate::http::GatewayServer;
use crate::lifecycle::{signals, Shutdown};
use crate::observability::metrics;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("policy: {0}")]
    Policy(#[from] ConfigurationError),

    #[error("metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("config watcher: {0}")]
    Watch(#[from] notify::Error),

    #[error("invalid {field} '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A fully assembled gateway, ready to bind.
pub struct Gateway {
    config: GatewayConfig,
    generator: BlueprintGenerator,
    app: Router,
}

impl Gateway {
    /// Compile the policy in `config` and build the catalog behind it.
    pub fn from_config(config: GatewayConfig) -> Result<Self, StartupError> {
        let blueprint = config.policy.compile()?;
        let generator = BlueprintGenerator::new(blueprint);
        let app = catalog::app(AuthorizationGateway::new(generator.clone()))?;

        tracing::info!(
            allow_rules = config.policy.allow.len(),
            deny_rules = config.policy.deny.len(),
            default_deny = config.policy.default_deny,
            "Policy compiled"
        );

        Ok(Self {
            config,
            generator,
            app,
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Handle for swapping the policy at runtime.
    pub fn generator(&self) -> &BlueprintGenerator {
        &self.generator
    }

    /// The guarded application without server layers.
    pub fn app(&self) -> Router {
        self.app.clone()
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn serve(self, listener: TcpListener, shutdown: &Shutdown) -> Result<(), StartupError> {
        let server = GatewayServer::new(self.config, self.app);
        server.run(listener, shutdown.subscribe()).await?;
        Ok(())
    }
}

/// Load `config_path` (or defaults), then serve until SIGINT/SIGTERM.
pub async fn run(config_path: Option<PathBuf>, bind_override: Option<String>) -> Result<(), StartupError> {
    let mut config = match &config_path {
        Some(path) => load_config(path)?,
        None => {
            tracing::warn!("No config file given, using defaults (deny everything)");
            GatewayConfig::default()
        }
    };
    if let Some(bind) = bind_override {
        config.listener.bind_address = bind;
    }

    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr = parse_addr("metrics_address", &config.observability.metrics_address)?;
        metrics::init_metrics(addr)?;
    }

    let gateway = Gateway::from_config(config)?;

    let shutdown = Shutdown::new();
    signals::spawn_shutdown_listener(shutdown.clone());

    // Dropping the watcher stops it, so it lives until serve returns.
    let _watcher = match &config_path {
        Some(path) => Some(spawn_policy_reloader(path, gateway.generator().clone())?),
        None => None,
    };

    let addr = parse_addr("bind_address", &gateway.config().listener.bind_address)?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    gateway.serve(listener, &shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Swap the policy whenever the file changes or SIGHUP arrives.
pub fn spawn_policy_reloader(
    path: &Path,
    generator: BlueprintGenerator,
) -> Result<notify::RecommendedWatcher, StartupError> {
    let (watcher, mut updates) = ConfigWatcher::new(path);
    let handle = watcher.run()?;

    let (hangup_tx, mut hangups) = mpsc::unbounded_channel();
    signals::spawn_reload_listener(hangup_tx);

    let path = path.to_path_buf();
    tokio::spawn(async move {
        loop {
            let config = tokio::select! {
                Some(config) = updates.recv() => config,
                Some(()) = hangups.recv() => match load_config(&path) {
                    Ok(config) => config,
                    Err(e) => {
                        metrics::record_error("config_reload");
                        tracing::error!("Failed to reload config: {}. Keeping current policy.", e);
                        continue;
                    }
                },
                else => break,
            };
            apply_policy(&generator, &config);
        }
    });

    Ok(handle)
}

/// Compile `config`'s policy into `generator`. Returns whether it was applied.
pub fn apply_policy(generator: &BlueprintGenerator, config: &GatewayConfig) -> bool {
    match config.policy.compile() {
        Ok(blueprint) => {
            generator.replace(blueprint);
            true
        }
        Err(e) => {
            metrics::record_error("config_reload");
            tracing::error!("Reloaded policy does not compile: {}. Keeping current policy.", e);
            false
        }
    }
}

fn parse_addr(field: &'static str, value: &str) -> Result<SocketAddr, StartupError> {
    value.parse().map_err(|_| StartupError::InvalidAddress {
        field,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PolicyConfig;

    #[test]
    fn test_from_config_compiles_policy() {
        let gateway = Gateway::from_config(GatewayConfig::default()).unwrap();
        assert!(gateway.generator().current().instantiate(&Default::default()).default_deny);
    }

    #[test]
    fn test_apply_policy_keeps_old_on_error() {
        let gateway = Gateway::from_config(GatewayConfig::default()).unwrap();

        let mut broken = GatewayConfig::default();
        broken.policy.default_deny = false;
        broken.policy.allow.push(crate::config::PermissionConfig {
            paths: vec!["no-slash".to_string()],
            ..Default::default()
        });
        assert!(!apply_policy(gateway.generator(), &broken));
        assert!(gateway.generator().current().instantiate(&Default::default()).default_deny);

        let lenient = GatewayConfig {
            policy: PolicyConfig {
                default_deny: false,
                ..PolicyConfig::default()
            },
            ..GatewayConfig::default()
        };
        assert!(apply_policy(gateway.generator(), &lenient));
        assert!(!gateway.generator().current().instantiate(&Default::default()).default_deny);
    }

    #[test]
    fn test_parse_addr() {
        assert!(parse_addr("bind_address", "127.0.0.1:0").is_ok());
        assert!(matches!(
            parse_addr("bind_address", "localhost"),
            Err(StartupError::InvalidAddress { field: "bind_address", .. })
        ));
    }
}
