//! Configuration schema definitions.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use flux_transport::{DedupeOptions, PollingOptions};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FluxConfig {
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Polling transport settings.
    #[serde(default)]
    pub polling: PollingSettings,

    /// Session settings.
    #[serde(default)]
    pub session: SessionSettings,
}

/// Log verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace-level output.
    Trace,
    /// Debug-level output.
    Debug,
    /// Informational output (default).
    #[default]
    Info,
    /// Warnings only.
    Warn,
    /// Errors only.
    Error,
}

impl LogLevel {
    /// Converts to a tracing level.
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }

    /// Returns the lowercase directive form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Single-line compact output (default).
    #[default]
    Compact,
    /// Default multi-field output.
    Full,
    /// Multi-line human-oriented output.
    Pretty,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    /// Base log level.
    #[serde(default)]
    pub level: LogLevel,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Include thread ids in log output.
    #[serde(default)]
    pub thread_ids: bool,

    /// Per-module level overrides, e.g. `flux_transport = "trace"`.
    #[serde(default)]
    pub filters: HashMap<String, LogLevel>,
}

/// Polling transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingSettings {
    /// Pause between fetch batches in milliseconds.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Dedupe window settings.
    #[serde(default)]
    pub dedupe: DedupeSettings,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            dedupe: DedupeSettings::default(),
        }
    }
}

impl PollingSettings {
    /// Converts to transport options.
    ///
    /// Id and key extractors are not configurable from files; they come from
    /// the adapter when the runtime starts polling.
    pub fn to_options(&self) -> PollingOptions {
        PollingOptions {
            interval: Duration::from_millis(self.interval_ms),
            dedupe: DedupeOptions {
                ttl: Duration::from_millis(self.dedupe.ttl_ms),
                max_size: self.dedupe.max_size,
                update_id: None,
                key: None,
            },
        }
    }
}

fn default_interval_ms() -> u64 {
    250
}

/// Dedupe window settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupeSettings {
    /// Suppression window in milliseconds; `0` disables dedupe.
    #[serde(default = "default_dedupe_ttl_ms")]
    pub ttl_ms: u64,

    /// Cache size budget; `0` disables dedupe.
    #[serde(default = "default_dedupe_max_size")]
    pub max_size: usize,
}

impl Default for DedupeSettings {
    fn default() -> Self {
        Self {
            ttl_ms: default_dedupe_ttl_ms(),
            max_size: default_dedupe_max_size(),
        }
    }
}

fn default_dedupe_ttl_ms() -> u64 {
    60_000
}

fn default_dedupe_max_size() -> usize {
    1000
}

/// Session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Key used when an update carries no chat or user identifiers.
    #[serde(default = "default_fallback_key")]
    pub fallback_key: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            fallback_key: default_fallback_key(),
        }
    }
}

fn default_fallback_key() -> String {
    "global".to_owned()
}
