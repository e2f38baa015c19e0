// SPDX-FileCopyrightText: 2026 Quad Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;

use axum::{Router, middleware as axum_middleware, routing::get};
use quad_core::QuadError;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::{AuthConfig, auth_middleware};
use crate::handlers;
use crate::hub::Hub;
use crate::ws;

/// Health state for unauthenticated health/metrics endpoints.
#[derive(Clone)]
pub struct HealthState {
    /// Process start time for uptime calculation.
    pub start_time: std::time::Instant,
    /// Optional Prometheus metrics render function.
    pub prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>>,
}

impl HealthState {
    pub fn new(prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>>) -> Self {
        Self {
            start_time: std::time::Instant::now(),
            prometheus_render,
        }
    }
}

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    /// Event dispatcher shared by every connection.
    pub hub: Arc<Hub>,
    /// Authentication configuration.
    pub auth: AuthConfig,
    /// Health state for unauthenticated endpoints.
    pub health: HealthState,
}

/// Gateway listener configuration.
#[derive(Clone)]
pub struct ServerConfig {
    /// Host address to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Bearer token for auth (None = auth disabled).
    pub bearer_token: Option<String>,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field(
                "bearer_token",
                &self.bearer_token.as_ref().map(|_| "[redacted]"),
            )
            .finish()
    }
}

/// Builds the gateway router.
///
/// - GET /health, GET /metrics (public)
/// - GET /v1/presence (bearer auth)
/// - GET /ws (bearer auth, header or `?token=`)
pub fn build_router(state: GatewayState) -> Router {
    let auth_state = state.auth.clone();

    let public_routes = Router::new()
        .route("/health", get(handlers::get_public_health))
        .route("/metrics", get(handlers::get_public_metrics))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route("/v1/presence", get(handlers::get_presence))
        .route("/ws", get(ws::ws_handler))
        .route_layer(axum_middleware::from_fn_with_state(
            auth_state,
            auth_middleware,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Binds the configured address and serves until `cancel` fires.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    cancel: CancellationToken,
) -> Result<(), QuadError> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| QuadError::Transport(format!("failed to bind gateway to {addr}: {e}")))?;
    serve(listener, state, cancel).await
}

/// Serves the gateway on an already bound listener until `cancel` fires.
pub async fn serve(
    listener: TcpListener,
    state: GatewayState,
    cancel: CancellationToken,
) -> Result<(), QuadError> {
    let local = listener
        .local_addr()
        .map_err(|e| QuadError::Transport(format!("listener has no local address: {e}")))?;
    tracing::info!(addr = %local, "gateway listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .map_err(|e| QuadError::Transport(format!("gateway server error: {e}")))?;

    tracing::info!("gateway stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use quad_calls::CallCoordinator;
    use quad_core::ConnectionHandle;
    use quad_messaging::DeliveryPipeline;
    use quad_presence::{ConnectionRegistry, PresenceBroadcaster};
    use quad_test_utils::{ManualClock, MemoryStore};
    use tower::ServiceExt;

    fn state(token: Option<&str>, render: bool) -> GatewayState {
        let clock = Arc::new(ManualClock::default());
        let registry = Arc::new(ConnectionRegistry::new(clock.clone()));
        let pipeline = Arc::new(DeliveryPipeline::new(
            Arc::new(MemoryStore::new()),
            registry.clone(),
            clock.clone(),
        ));
        let calls = CallCoordinator::new(registry.clone(), clock, Duration::from_secs(30));
        let prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>> = if render {
            Some(Arc::new(|| "quad_connections_online 0\n".to_string()))
        } else {
            None
        };
        GatewayState {
            hub: Arc::new(Hub::new(
                PresenceBroadcaster::new(registry),
                pipeline,
                calls,
            )),
            auth: AuthConfig {
                bearer_token: token.map(str::to_string),
            },
            health: HealthState::new(prometheus_render),
        }
    }

    async fn get(app: Router, uri: &str, token: Option<&str>) -> (StatusCode, String) {
        let mut builder = Request::builder().uri(uri);
        if let Some(t) = token {
            builder = builder.header("authorization", format!("Bearer {t}"));
        }
        let resp = app
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), 10_000).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn health_reports_counts_without_auth() {
        let state = state(Some("s3cret"), false);
        let (handle, _rx) = ConnectionHandle::channel();
        state
            .hub
            .registry()
            .register("alice".into(), handle);

        let (status, body) = get(build_router(state), "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["online"], 1);
        assert_eq!(json["active_calls"], 0);
    }

    #[tokio::test]
    async fn metrics_served_when_exporter_present() {
        let (status, body) = get(build_router(state(None, true)), "/metrics", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("quad_connections_online"));

        let (status, _) = get(build_router(state(None, false)), "/metrics", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn presence_requires_token() {
        let state = state(Some("s3cret"), false);
        let (handle, _rx) = ConnectionHandle::channel();
        state.hub.registry().register("bob".into(), handle);
        let app = build_router(state);

        let (status, _) = get(app.clone(), "/v1/presence", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = get(app, "/v1/presence", Some("s3cret")).await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["count"], 1);
        assert_eq!(json["online"][0]["userId"], "bob");
    }

    #[test]
    fn server_config_debug_redacts_token() {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
            bearer_token: Some("s3cret".into()),
        };
        let debug = format!("{config:?}");
        assert!(debug.contains("127.0.0.1"));
        assert!(!debug.contains("s3cret"));
    }
}
