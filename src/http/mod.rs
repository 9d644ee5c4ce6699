//! HTTP boundary subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (assign / propagate x-request-id)
//!     → handlers.rs (parse boundary JSON, call the relay)
//!     → response.rs (status mapping, envelopes)
//!     → Send to client
//! ```
//!
//! # Routes
//! - `POST /relay/check` descriptor-based relay with classification
//! - `ANY /relay/proxy` generic passthrough
//! - `ANY /relay/path/<encoded-base>/<rest...>` path-encoded passthrough
//! - `POST /relay/analyze` optional result analysis
//! - `GET /healthz` liveness

pub mod handlers;
pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer, ServerError};
