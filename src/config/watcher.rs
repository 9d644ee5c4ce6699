//! Hot reload of the relay config file.
//!
//! The parent directory is watched rather than the file itself, so editors
//! that save by rename-over still trigger a reload. Only events touching the
//! config file are acted on.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::RelayConfig;

/// Emits every valid new version of the relay config.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<RelayConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and the receiver the server applies updates from.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<RelayConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching. Reloading stops when the returned handle is dropped.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let Self { path, update_tx } = self;
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name = path.file_name().map(|n| n.to_os_string());
        let config_path = path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let event = match res {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::warn!(error = %e, "Relay config watch error");
                        return;
                    }
                };
                if !touches_config(&event, file_name.as_deref()) {
                    return;
                }

                match load_config(&config_path) {
                    Ok(config) => {
                        tracing::info!(
                            path = %config_path.display(),
                            default_timeout_ms = config.relay.default_timeout_ms,
                            "Relay config changed on disk"
                        );
                        if update_tx.send(config).is_err() {
                            tracing::debug!("Relay server is gone, dropping reloaded config");
                        }
                    }
                    Err(e) => tracing::warn!(
                        path = %config_path.display(),
                        error = %e,
                        "Ignoring invalid relay config, previous settings stay live"
                    ),
                }
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        tracing::info!(path = %path.display(), "Watching relay config for changes");
        Ok(watcher)
    }
}

/// Content changes, creations or renames of the config file itself.
fn touches_config(event: &Event, file_name: Option<&std::ffi::OsStr>) -> bool {
    let relevant = matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_));
    relevant
        && event
            .paths
            .iter()
            .any(|p| p.file_name().is_some_and(|n| Some(n) == file_name))
}
