// SPDX-FileCopyrightText: 2026 Quad Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bearer-token guard for the gateway.
//!
//! The token is accepted from `Authorization: Bearer <token>` or, for
//! browser WebSocket clients that cannot set headers, from a `?token=`
//! query parameter. With no token configured every request passes.

use axum::{
    extract::{Query, Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use serde::Deserialize;

/// Authentication configuration for the gateway.
#[derive(Clone, Default)]
pub struct AuthConfig {
    /// Expected bearer token. `None` leaves the gateway open.
    pub bearer_token: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field(
                "bearer_token",
                &self.bearer_token.as_ref().map(|_| "[redacted]"),
            )
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

fn presented_token(request: &Request) -> Option<String> {
    let header = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    if let Some(token) = header {
        return Some(token.to_string());
    }
    Query::<TokenQuery>::try_from_uri(request.uri())
        .ok()
        .and_then(|Query(q)| q.token)
}

/// Middleware that rejects requests without the configured bearer token.
pub async fn auth_middleware(
    State(auth): State<AuthConfig>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(expected) = auth.bearer_token.as_deref() else {
        return Ok(next.run(request).await);
    };

    match presented_token(&request) {
        Some(token) if token == expected => Ok(next.run(request).await),
        Some(_) => {
            tracing::debug!(path = %request.uri().path(), "bearer token mismatch");
            Err(StatusCode::UNAUTHORIZED)
        }
        None => Err(StatusCode::UNAUTHORIZED),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, body::Body, middleware, routing::get};
    use tower::ServiceExt;

    fn app(token: Option<&str>) -> Router {
        let auth = AuthConfig {
            bearer_token: token.map(str::to_string),
        };
        Router::new()
            .route("/guarded", get(|| async { "ok" }))
            .route_layer(middleware::from_fn_with_state(auth, auth_middleware))
    }

    async fn status(app: Router, uri: &str, header: Option<&str>) -> StatusCode {
        let mut builder = axum::http::Request::builder().uri(uri);
        if let Some(h) = header {
            builder = builder.header("authorization", h);
        }
        app.oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn open_when_no_token_configured() {
        assert_eq!(status(app(None), "/guarded", None).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn header_token_accepted() {
        let code = status(app(Some("s3cret")), "/guarded", Some("Bearer s3cret")).await;
        assert_eq!(code, StatusCode::OK);
    }

    #[tokio::test]
    async fn query_token_accepted() {
        let code = status(app(Some("s3cret")), "/guarded?token=s3cret", None).await;
        assert_eq!(code, StatusCode::OK);
    }

    #[tokio::test]
    async fn wrong_or_missing_token_rejected() {
        let app_ = app(Some("s3cret"));
        assert_eq!(
            status(app_.clone(), "/guarded", Some("Bearer nope")).await,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status(app_, "/guarded", None).await,
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn debug_redacts_token() {
        let auth = AuthConfig {
            bearer_token: Some("s3cret".into()),
        };
        let printed = format!("{auth:?}");
        assert!(!printed.contains("s3cret"));
        assert!(printed.contains("redacted"));
    }
}
