//! Startup orchestration.
//!
//! Order: config → logging → metrics → config watcher. Any config error is
//! fatal; the listener is bound by the caller afterwards.

use notify::RecommendedWatcher;
use tokio::sync::mpsc;

use crate::config::loader::config_path_from_env;
use crate::config::{load_config, ConfigError, ConfigWatcher, RelayConfig};
use crate::observability::{init_logging, metrics};

/// Everything `main` needs once startup succeeded.
pub struct Startup {
    pub config: RelayConfig,
    pub config_updates: mpsc::UnboundedReceiver<RelayConfig>,
    /// Kept alive for as long as hot reload should run.
    pub watcher: Option<RecommendedWatcher>,
}

/// Load config from `RELAY_CONFIG` (or defaults) and bring up the
/// ambient subsystems.
pub fn prepare() -> Result<Startup, ConfigError> {
    let path = config_path_from_env();
    let config = match &path {
        Some(path) => load_config(path)?,
        None => RelayConfig::default(),
    };

    init_logging(&config.observability);
    tracing::info!(
        config_path = ?path,
        bind_address = %config.listener.bind_address,
        tls = config.listener.tls.is_some(),
        default_timeout_ms = config.relay.default_timeout_ms,
        insight = config.insight.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let (watcher, config_updates) = match path.filter(|_| config.watch) {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(&path);
            match watcher.run() {
                Ok(handle) => (Some(handle), updates),
                Err(e) => {
                    tracing::error!(error = %e, "Config watcher failed to start, hot reload disabled");
                    (None, updates)
                }
            }
        }
        None => {
            let (_, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    Ok(Startup {
        config,
        config_updates,
        watcher,
    })
}
