//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! RELAY_CONFIG (TOML file, optional)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → RelayConfig (validated, immutable)
//!     → stored in an ArcSwap shared by all handlers
//!
//! With `watch = true`:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → atomic swap of the live RelayConfig
//!     → requests started afterwards see the new values
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{
    InsightConfig, LimitsConfig, ListenerConfig, LogFormat, ObservabilityConfig,
    PassthroughSettings, RelayConfig, RelaySettings, TlsConfig,
};
pub use watcher::ConfigWatcher;
