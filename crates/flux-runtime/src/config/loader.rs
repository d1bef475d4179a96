//! Configuration loader using figment.
//!
//! Sources are layered, lowest to highest priority:
//!
//! 1. Built-in defaults
//! 2. `flux.toml` (an explicit file, or the first hit among search paths)
//! 3. Environment variables (`FLUX_*`, with `__` as the nesting separator:
//!    `FLUX_LOGGING__LEVEL=debug` → `logging.level = "debug"`)
//! 4. Programmatic overrides
//!
//! # Example
//!
//! ```rust,ignore
//! use flux_runtime::config::ConfigLoader;
//!
//! let config = ConfigLoader::new().with_current_dir().load()?;
//!
//! let config = ConfigLoader::new()
//!     .file("config/flux.toml")
//!     .load()?;
//! ```

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use tracing::debug;

use super::error::{ConfigError, ConfigResult};
use super::schema::FluxConfig;

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "flux.toml";

/// Layered configuration loader.
pub struct ConfigLoader {
    config_file: Option<PathBuf>,
    search_paths: Vec<PathBuf>,
    load_env: bool,
    overrides: Option<FluxConfig>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a loader with defaults and env loading enabled.
    pub fn new() -> Self {
        Self {
            config_file: None,
            search_paths: Vec::new(),
            load_env: true,
            overrides: None,
        }
    }

    /// Adds the current directory to the search paths.
    pub fn with_current_dir(mut self) -> Self {
        self.search_paths.push(PathBuf::from("."));
        self
    }

    /// Sets a specific configuration file to load (overrides the search).
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Adds a search path for `flux.toml`.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Enables loading environment variables (enabled by default).
    pub fn with_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Merges additional configuration programmatically, on top of files
    /// and environment.
    pub fn merge(mut self, config: FluxConfig) -> Self {
        self.overrides = Some(config);
        self
    }

    /// Loads and extracts the configuration.
    pub fn load(self) -> ConfigResult<FluxConfig> {
        let mut figment = Figment::from(Serialized::defaults(FluxConfig::default()));

        if let Some(file) = &self.config_file {
            if !file.exists() {
                return Err(ConfigError::FileNotFound(file.clone()));
            }
            debug!(file = %file.display(), "loading configuration file");
            figment = figment.merge(Toml::file(file));
        } else if let Some(found) = self.find_config_file() {
            debug!(file = %found.display(), "loading configuration file");
            figment = figment.merge(Toml::file(found));
        }

        if self.load_env {
            figment = figment.merge(Env::prefixed("FLUX_").split("__"));
        }

        if let Some(overrides) = self.overrides {
            figment = figment.merge(Serialized::defaults(overrides));
        }

        Ok(figment.extract()?)
    }

    fn find_config_file(&self) -> Option<PathBuf> {
        self.search_paths
            .iter()
            .map(|dir| dir.join(CONFIG_FILE_NAME))
            .find(|candidate| candidate.exists())
    }
}

/// Loads configuration from the current directory and environment.
pub fn load_config() -> ConfigResult<FluxConfig> {
    ConfigLoader::new().with_current_dir().load()
}
