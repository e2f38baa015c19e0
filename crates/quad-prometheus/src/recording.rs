// SPDX-FileCopyrightText: 2026 Quad Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Without an installed recorder every helper is a no-op, so components call
//! them unconditionally.

use metrics::{describe_counter, describe_gauge, describe_histogram};
use quad_core::{EscalationLevel, MessageStatus};

/// Register all Quad metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_gauge!(
        "quad_connections_online",
        "Users with a live connection"
    );
    describe_counter!(
        "quad_messages_total",
        "Message status transitions by resulting status"
    );
    describe_counter!("quad_calls_total", "Call sessions by outcome");
    describe_counter!(
        "quad_escalations_total",
        "Issues escalated by target level"
    );
    describe_histogram!(
        "quad_sweep_duration_seconds",
        "Wall time of one escalation sweep"
    );
}

/// Set the number of online users.
pub fn set_connections_online(count: usize) {
    metrics::gauge!("quad_connections_online").set(count as f64);
}

/// Record a message reaching `status`.
pub fn record_message_status(status: MessageStatus) {
    metrics::counter!("quad_messages_total", "status" => status.to_string()).increment(1);
}

/// Record a call outcome (`rejected`, `busy`, `offline`, `timeout`, `ended`, ...).
pub fn record_call(outcome: &'static str) {
    metrics::counter!("quad_calls_total", "outcome" => outcome).increment(1);
}

/// Record an issue escalated to `level`.
pub fn record_escalation(level: EscalationLevel) {
    metrics::counter!("quad_escalations_total", "level" => level.to_string()).increment(1);
}

/// Record how long a sweep took.
pub fn record_sweep_duration(seconds: f64) {
    metrics::histogram!("quad_sweep_duration_seconds").record(seconds);
}
