//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for a
//! supervised service. All types derive Serde traits for deserialization
//! from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for a supervised service.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Supervising loop settings.
    pub service: ServiceSettings,

    /// Logging setup.
    pub logging: LoggingConfig,

    /// Diagnostic HTTP server.
    pub diagnostics: DiagnosticsConfig,

    /// Periodic runtime metrics capture.
    pub runtime_metrics: RuntimeMetricsConfig,

    /// Application HTTP listener.
    pub http: HttpConfig,
}

/// Supervising loop settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ServiceSettings {
    /// Time to wait for ordered shutdown before killing the handler.
    pub kill_timeout_secs: u64,
}

impl ServiceSettings {
    pub fn kill_timeout(&self) -> Duration {
        Duration::from_secs(self.kill_timeout_secs)
    }
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            kill_timeout_secs: 30,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum level when `RUST_LOG` is unset.
    pub level: String,

    /// Output format: "pretty" or "json".
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable format (development).
    #[default]
    Pretty,
    /// JSON format for machine parsing (production).
    Json,
}

/// Diagnostic server configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Serve `/metrics`, `/debug/status` and `/health`.
    pub enabled: bool,

    /// Bind address (e.g., "0.0.0.0:8081").
    pub address: String,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            address: "0.0.0.0:8081".to_string(),
        }
    }
}

/// Runtime metrics capture configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RuntimeMetricsConfig {
    pub enabled: bool,

    /// Capture interval in seconds.
    pub interval_secs: u64,
}

impl Default for RuntimeMetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 5,
        }
    }
}

/// Application HTTP listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct HttpConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub address: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0:8080".to_string(),
        }
    }
}
