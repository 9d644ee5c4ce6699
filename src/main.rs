//! Service relay server.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌────────────────────────────────────────────────┐
//!                      │                 SERVICE RELAY                  │
//!                      │                                                │
//!   Dashboard / CLI    │  ┌─────────┐    ┌──────────┐    ┌──────────┐   │
//!   ───────────────────┼─▶│  http   │───▶│  relay   │───▶│  client  │───┼──▶ Internal
//!                      │  │ server  │    │  engine  │    │ per call │   │    target
//!                      │  └─────────┘    └────┬─────┘    └──────────┘   │
//!                      │                      ▼                         │
//!   ◀──────────────────┼──────────────── normalize                      │
//!                      │                                                │
//!                      │  config · observability · lifecycle · insight  │
//!                      └────────────────────────────────────────────────┘
//! ```

use service_relay::http::HttpServer;
use service_relay::lifecycle::{signals, startup, Shutdown};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let startup::Startup {
        config,
        config_updates,
        watcher: _watcher,
    } = startup::prepare()?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "service-relay starting");

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    signals::spawn_signal_listener(shutdown);

    HttpServer::new(config)
        .run(listener, config_updates, server_shutdown)
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
