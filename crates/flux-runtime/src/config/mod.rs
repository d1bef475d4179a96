//! Configuration system: schema, loader, and errors.
//!
//! Settings live in `flux.toml` and `FLUX_*` environment variables; see
//! [`loader`] for the layering rules and [`schema`] for the available keys.

pub mod error;
pub mod loader;
pub mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{CONFIG_FILE_NAME, ConfigLoader, load_config};
pub use schema::{
    DedupeSettings, FluxConfig, LogFormat, LogLevel, LoggingConfig, PollingSettings,
    SessionSettings,
};
