// SPDX-FileCopyrightText: 2026 Quad Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `quad serve` command implementation.
//!
//! Opens SQLite storage, wires presence, delivery, calls, and escalation
//! around the gateway hub, then serves WebSocket and HTTP until a shutdown
//! signal arrives.

use std::sync::Arc;

use quad_calls::CallCoordinator;
use quad_config::QuadConfig;
use quad_core::{Clock, QuadError, SystemClock};
use quad_escalation::{EscalationPolicy, EscalationRunner, EscalationScheduler};
use quad_gateway::auth::AuthConfig;
use quad_gateway::{GatewayState, HealthState, Hub, ServerConfig, start_server};
use quad_messaging::DeliveryPipeline;
use quad_presence::{ConnectionRegistry, PresenceBroadcaster};
use quad_prometheus::PrometheusExporter;
use quad_storage::SqliteStore;
use tracing::{info, warn};

use crate::shutdown;

/// Runs the `quad serve` command.
pub async fn run_serve(config: QuadConfig) -> Result<(), QuadError> {
    crate::init_tracing(&config.server.log_level);
    info!(name = %config.server.name, "starting quad serve");

    let store = Arc::new(SqliteStore::open(&config.storage).await?);

    let exporter = if config.prometheus.enabled {
        match PrometheusExporter::install() {
            Ok(exporter) => Some(exporter),
            Err(e) => {
                warn!(error = %e, "metrics disabled");
                None
            }
        }
    } else {
        None
    };
    let prometheus_render = exporter.map(|exporter| {
        Arc::new(move || exporter.render()) as Arc<dyn Fn() -> String + Send + Sync>
    });

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let registry = Arc::new(ConnectionRegistry::new(clock.clone()));
    let pipeline = Arc::new(DeliveryPipeline::new(
        store.clone(),
        registry.clone(),
        clock.clone(),
    ));
    let calls = CallCoordinator::new(
        registry.clone(),
        clock.clone(),
        config.calls.ring_timeout(),
    );

    let cancel = shutdown::install_signal_handler();

    let runner = if config.escalation.enabled {
        let scheduler = EscalationScheduler::start(
            store.clone(),
            store.clone(),
            store.clone(),
            pipeline.clone(),
            clock,
            EscalationPolicy::from_config(&config.escalation),
        )
        .await;
        info!(
            interval_secs = config.escalation.sweep_interval_secs,
            "escalation runner started"
        );
        Some(
            EscalationRunner::new(Arc::new(scheduler), config.escalation.sweep_interval())
                .spawn(cancel.clone()),
        )
    } else {
        info!("escalation disabled");
        None
    };

    let state = GatewayState {
        hub: Arc::new(Hub::new(
            PresenceBroadcaster::new(registry),
            pipeline,
            calls,
        )),
        auth: AuthConfig {
            bearer_token: config.gateway.bearer_token.clone(),
        },
        health: HealthState::new(prometheus_render),
    };
    let server_config = ServerConfig {
        host: config.gateway.host.clone(),
        port: config.gateway.port,
        bearer_token: config.gateway.bearer_token.clone(),
    };

    let served = start_server(&server_config, state, cancel.clone()).await;

    // A bind failure must also stop the runner.
    cancel.cancel();
    if let Some(handle) = runner {
        if let Err(e) = handle.await {
            warn!(error = %e, "escalation runner ended abnormally");
        }
    }
    if let Err(e) = store.close().await {
        warn!(error = %e, "database checkpoint on shutdown failed");
    }

    served?;
    info!("quad serve shutdown complete");
    Ok(())
}
