//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with all relay endpoints
//! - Wire up middleware (request id, tracing, timeout, body limit)
//! - Hold the live config and swap it on reload
//! - Serve plain HTTP or TLS until the shutdown signal fires

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::{
    extract::DefaultBodyLimit,
    routing::{any, get, post},
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer};

use crate::config::RelayConfig;
use crate::http::handlers::{analyze, check, generic_relay, healthz, path_relay};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::insight::{HeuristicAnalyzer, ResultAnalyzer};
use crate::lifecycle::shutdown::wait_for;
use crate::net::{load_tls_config, TlsError};
use crate::observability::tracing::trace_layer;
use crate::relay::{ProxyEnv, RelayEngine};

/// How long in-flight TLS connections may drain after shutdown.
const TLS_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Tls(#[from] TlsError),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    config: Arc<ArcSwap<RelayConfig>>,
    /// Fixed proxy environment; `None` reads the process env per request.
    proxy_env: Option<ProxyEnv>,
    analyzer: Option<Arc<dyn ResultAnalyzer>>,
}

impl AppState {
    pub fn new(config: RelayConfig) -> Self {
        let analyzer: Option<Arc<dyn ResultAnalyzer>> = config.insight.enabled.then(|| {
            Arc::new(HeuristicAnalyzer::new(Duration::from_millis(
                config.insight.slow_threshold_ms,
            ))) as Arc<dyn ResultAnalyzer>
        });

        Self {
            config: Arc::new(ArcSwap::from_pointee(config)),
            proxy_env: None,
            analyzer,
        }
    }

    /// Snapshot of the live config. Held for the duration of one request.
    pub fn config(&self) -> Arc<RelayConfig> {
        self.config.load_full()
    }

    pub fn proxy_env(&self) -> ProxyEnv {
        self.proxy_env.clone().unwrap_or_else(ProxyEnv::from_env)
    }

    pub fn analyzer(&self) -> Option<&dyn ResultAnalyzer> {
        self.analyzer.as_deref()
    }

    pub fn engine(&self, config: &RelayConfig) -> RelayEngine {
        let engine = RelayEngine::new(config.relay.clone());
        match &self.proxy_env {
            Some(env) => engine.with_proxy_env(env.clone()),
            None => engine,
        }
    }

    fn replace_config(&self, config: RelayConfig) {
        self.config.store(Arc::new(config));
    }
}

/// HTTP server for the relay.
pub struct HttpServer {
    state: AppState,
    config: RelayConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: RelayConfig) -> Self {
        Self {
            state: AppState::new(config.clone()),
            config,
        }
    }

    /// Use a fixed proxy environment instead of the process environment.
    pub fn with_proxy_env(mut self, proxy_env: ProxyEnv) -> Self {
        self.state.proxy_env = Some(proxy_env);
        self
    }

    /// Install (or replace) the result analyzer.
    pub fn with_analyzer(mut self, analyzer: Arc<dyn ResultAnalyzer>) -> Self {
        self.state.analyzer = Some(analyzer);
        self
    }

    /// The fully layered router.
    pub fn router(&self) -> Router {
        Self::build_router(&self.config, self.state.clone())
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &RelayConfig, state: AppState) -> Router {
        Router::new()
            .route("/relay/check", any(check))
            .route("/relay/proxy", any(generic_relay))
            .route("/relay/path", any(path_relay))
            .route("/relay/path/", any(path_relay))
            .route("/relay/path/{*rest}", any(path_relay))
            .route("/relay/analyze", post(analyze))
            .route("/healthz", get(healthz))
            .with_state(state)
            .layer(DefaultBodyLimit::disable())
            .layer(
                ServiceBuilder::new()
                    .layer(set_request_id_layer())
                    .layer(trace_layer())
                    .layer(propagate_request_id_layer())
                    .layer(RequestBodyLimitLayer::new(config.limits.max_body_bytes))
                    .layer(TimeoutLayer::new(config.limits.request_timeout())),
            )
    }

    /// Run the server until `shutdown` fires, applying config updates as
    /// they arrive.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<RelayConfig>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        let router = self.router();

        let state = self.state.clone();
        tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                tracing::info!(
                    default_timeout_ms = config.relay.default_timeout_ms,
                    "Applying reloaded relay config"
                );
                state.replace_config(config);
            }
        });

        match &self.config.listener.tls {
            None => {
                tracing::info!(address = %addr, "HTTP server starting");
                axum::serve(listener, router)
                    .with_graceful_shutdown(wait_for(shutdown))
                    .await?;
            }
            Some(tls) => {
                let rustls = load_tls_config(tls).await?;
                tracing::info!(address = %addr, "HTTPS server starting");

                let handle = axum_server::Handle::new();
                let drain = handle.clone();
                tokio::spawn(async move {
                    wait_for(shutdown).await;
                    drain.graceful_shutdown(Some(TLS_DRAIN_TIMEOUT));
                });

                axum_server::from_tcp_rustls(listener.into_std()?, rustls)
                    .handle(handle)
                    .serve(router.into_make_service())
                    .await?;
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the startup config.
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }
}
