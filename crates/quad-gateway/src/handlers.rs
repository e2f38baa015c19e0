// SPDX-FileCopyrightText: 2026 Quad Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP handlers for health, metrics, and presence.

use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use quad_core::{ConnectionId, UserId};
use serde::Serialize;

use crate::server::GatewayState;

/// Body of `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
    pub online: usize,
    pub active_calls: usize,
}

/// One entry of `GET /v1/presence`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceEntry {
    pub user_id: UserId,
    pub connection_id: ConnectionId,
    pub connected_at: DateTime<Utc>,
}

/// Body of `GET /v1/presence`.
#[derive(Debug, Serialize)]
pub struct PresenceResponse {
    pub count: usize,
    pub online: Vec<PresenceEntry>,
}

/// GET /health (unauthenticated).
pub async fn get_public_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.health.start_time.elapsed().as_secs(),
        online: state.hub.registry().count(),
        active_calls: state.hub.calls().active_count(),
    })
}

/// GET /metrics (unauthenticated). 404 when no exporter is installed.
pub async fn get_public_metrics(State(state): State<GatewayState>) -> Response {
    match &state.health.prometheus_render {
        Some(render) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics disabled").into_response(),
    }
}

/// GET /v1/presence
pub async fn get_presence(State(state): State<GatewayState>) -> Json<PresenceResponse> {
    let online: Vec<PresenceEntry> = state
        .hub
        .registry()
        .entries()
        .into_iter()
        .map(|e| PresenceEntry {
            user_id: e.user_id,
            connection_id: e.connection.id().clone(),
            connected_at: e.connected_at,
        })
        .collect();
    Json(PresenceResponse {
        count: online.len(),
        online,
    })
}
