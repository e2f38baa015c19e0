// SPDX-FileCopyrightText: 2026 Quad Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prometheus metrics for the Quad real-time core.
//!
//! Uses the metrics-rs facade with the Prometheus exporter. Components record
//! through the helpers in [`recording`]; the gateway renders the text format
//! on `/metrics`.

pub mod recording;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use quad_core::QuadError;

pub use recording::{
    record_call, record_escalation, record_message_status, record_sweep_duration,
    set_connections_online,
};

/// Installed Prometheus recorder.
#[derive(Clone)]
pub struct PrometheusExporter {
    handle: PrometheusHandle,
}

impl PrometheusExporter {
    /// Installs the Prometheus recorder globally.
    ///
    /// Only one recorder can be installed per process; a second call fails.
    pub fn install() -> Result<Self, QuadError> {
        let handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
            QuadError::Internal(format!("failed to install Prometheus recorder: {e}"))
        })?;

        recording::register_metrics();

        tracing::info!("prometheus metrics recorder installed");

        Ok(Self { handle })
    }

    /// Render all collected metrics in Prometheus text format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}
