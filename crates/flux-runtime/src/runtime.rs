//! Main runtime orchestration.
//!
//! The runtime wires a finished [`Bot`] to a polling update source with
//! options derived from configuration, runs until a shutdown signal, and
//! stops the transport cooperatively.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use flux_runtime::{FluxRuntime, config::load_config};
//!
//! let config = load_config()?;
//! let runtime = FluxRuntime::new(&config, bot, source);
//! runtime.run().await?;
//! ```

use std::sync::Arc;

use tokio::signal;
use tracing::info;

use flux_core::Bot;
use flux_transport::{GetUpdatesFn, start_polling};

use crate::config::FluxConfig;
use crate::error::RuntimeResult;
use crate::logging;

/// Orchestrates a bot and its polling transport.
pub struct FluxRuntime {
    config: FluxConfig,
    bot: Arc<Bot>,
    source: GetUpdatesFn,
}

impl FluxRuntime {
    /// Creates a runtime from configuration.
    ///
    /// Initializes logging from the configuration (a no-op when a subscriber
    /// is already installed).
    pub fn new(config: &FluxConfig, bot: Arc<Bot>, source: GetUpdatesFn) -> Self {
        logging::init_from_config(&config.logging);

        info!(
            interval_ms = config.polling.interval_ms,
            dedupe_ttl_ms = config.polling.dedupe.ttl_ms,
            "runtime initialized from configuration"
        );

        Self {
            config: config.clone(),
            bot,
            source,
        }
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &FluxConfig {
        &self.config
    }

    /// Returns the bot.
    pub fn bot(&self) -> &Arc<Bot> {
        &self.bot
    }

    /// Runs until a shutdown signal is received (Ctrl+C or SIGTERM).
    pub async fn run(&self) -> RuntimeResult<()> {
        self.run_until(wait_for_shutdown()).await
    }

    /// Runs until the given shutdown future resolves.
    pub async fn run_until<F>(&self, shutdown: F) -> RuntimeResult<()>
    where
        F: std::future::Future<Output = ()>,
    {
        let transport = start_polling(
            &self.bot,
            Arc::clone(&self.source),
            self.config.polling.to_options(),
        )?;
        info!("flux runtime is now running");

        shutdown.await;

        info!("stopping flux runtime");
        transport.stop().await?;
        info!("runtime stopped");
        Ok(())
    }
}

impl std::fmt::Debug for FluxRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FluxRuntime")
            .field("config", &self.config)
            .finish()
    }
}

/// Waits for shutdown signals (Ctrl+C or SIGTERM).
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to register SIGTERM handler");

        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
        info!("Received Ctrl+C, shutting down");
    }
}
