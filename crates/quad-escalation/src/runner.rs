// SPDX-FileCopyrightText: 2026 Quad Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Interval driver for the escalation sweep.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::scheduler::EscalationScheduler;

/// Runs [`EscalationScheduler::sweep`] every `interval` until cancelled.
///
/// Sweeps never overlap: a slow sweep delays the next tick instead of
/// running alongside it.
pub struct EscalationRunner {
    scheduler: Arc<EscalationScheduler>,
    interval: Duration,
}

impl EscalationRunner {
    pub fn new(scheduler: Arc<EscalationScheduler>, interval: Duration) -> Self {
        Self {
            scheduler,
            interval,
        }
    }

    /// Spawns the loop on the current runtime.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }

    pub async fn run(self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately; start one full interval in.
        interval.tick().await;
        info!(interval_secs = self.interval.as_secs(), "escalation runner started");

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let started = Instant::now();
                    let report = self.scheduler.sweep().await;
                    let elapsed = started.elapsed().as_secs_f64();
                    quad_prometheus::record_sweep_duration(elapsed);
                    debug!(%report, elapsed_secs = elapsed, "scheduled sweep finished");
                }
                _ = cancel.cancelled() => {
                    info!("escalation runner shutting down");
                    break;
                }
            }
        }
    }
}
