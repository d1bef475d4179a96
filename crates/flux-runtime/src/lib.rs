//! # Flux Runtime
//!
//! Runtime orchestration layer for the flux bot framework.
//!
//! This crate ties the stack together for service binaries:
//! - **Configuration** ([`config`]) – figment-based layering of defaults,
//!   `flux.toml`, `FLUX_*` environment variables, and programmatic overrides
//! - **Logging** ([`logging`]) – `tracing-subscriber` setup driven by the
//!   configuration, honoring `RUST_LOG`
//! - **Runtime** ([`FluxRuntime`]) – starts the polling transport with
//!   config-derived options and runs until a shutdown signal

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

pub use config::{ConfigError, ConfigLoader, ConfigResult, FluxConfig, load_config};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::LoggingBuilder;
pub use runtime::FluxRuntime;
