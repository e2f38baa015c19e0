// SPDX-FileCopyrightText: 2026 Quad Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Quad real-time core.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level Quad configuration.
///
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QuadConfig {
    /// Process identity and logging.
    #[serde(default)]
    pub server: ServerConfig,

    /// WebSocket/HTTP gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Call signaling settings.
    #[serde(default)]
    pub calls: CallsConfig,

    /// Issue escalation scheduler settings.
    #[serde(default)]
    pub escalation: EscalationConfig,

    /// Prometheus metrics settings.
    #[serde(default)]
    pub prometheus: PrometheusConfig,
}

/// Process identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Display name of this instance.
    #[serde(default = "default_server_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_server_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_server_name() -> String {
    "quad".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Shared bearer token. `None` leaves `/ws` and `/v1/*` open.
    #[serde(default)]
    pub bearer_token: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            bearer_token: None,
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("quad").join("quad.db"))
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "quad.db".to_string())
}

fn default_wal_mode() -> bool {
    true
}

/// Call signaling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CallsConfig {
    /// Seconds a call may ring before the caller side times out.
    #[serde(default = "default_ring_timeout_secs")]
    pub ring_timeout_secs: u64,
}

impl CallsConfig {
    /// Ring window as a `Duration`.
    pub fn ring_timeout(&self) -> Duration {
        Duration::from_secs(self.ring_timeout_secs)
    }
}

impl Default for CallsConfig {
    fn default() -> Self {
        Self {
            ring_timeout_secs: default_ring_timeout_secs(),
        }
    }
}

fn default_ring_timeout_secs() -> u64 {
    30
}

/// Issue escalation scheduler configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EscalationConfig {
    /// Run the periodic sweep.
    #[serde(default = "default_escalation_enabled")]
    pub enabled: bool,

    /// Seconds between sweeps.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Seconds an `assigned` issue may sit before moving to the Director.
    #[serde(default = "default_director_after_secs")]
    pub director_after_secs: u64,

    /// Seconds a `Director` issue may sit before moving to the Owner.
    #[serde(default = "default_owner_after_secs")]
    pub owner_after_secs: u64,

    /// Department used to scope Director/Owner lookups.
    #[serde(default)]
    pub department: Option<String>,
}

impl EscalationConfig {
    /// Sweep interval as a `Duration`.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Director threshold as a `Duration`.
    pub fn director_after(&self) -> Duration {
        Duration::from_secs(self.director_after_secs)
    }

    /// Owner threshold as a `Duration`.
    pub fn owner_after(&self) -> Duration {
        Duration::from_secs(self.owner_after_secs)
    }
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            enabled: default_escalation_enabled(),
            sweep_interval_secs: default_sweep_interval_secs(),
            director_after_secs: default_director_after_secs(),
            owner_after_secs: default_owner_after_secs(),
            department: None,
        }
    }
}

fn default_escalation_enabled() -> bool {
    true
}

fn default_sweep_interval_secs() -> u64 {
    3600
}

fn default_director_after_secs() -> u64 {
    86_400
}

fn default_owner_after_secs() -> u64 {
    86_400
}

/// Prometheus metrics configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PrometheusConfig {
    /// Install the Prometheus recorder and serve `/metrics`.
    #[serde(default = "default_prometheus_enabled")]
    pub enabled: bool,
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            enabled: default_prometheus_enabled(),
        }
    }
}

fn default_prometheus_enabled() -> bool {
    true
}
