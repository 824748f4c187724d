//! Authorization gate.
//!
//! Admits a request when the configured token is empty, or when the
//! `Authorization` header is exactly `Bearer <token>`. Anything else is
//! answered with 403 and never reaches the dispatcher.
//!
//! The comparison is a plain equality check, not constant-time. The token
//! is an internal service-to-service secret.

use crate::responses;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct AuthState {
    token: Arc<str>,
}

impl AuthState {
    pub fn new(token: impl Into<Arc<str>>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.token.is_empty()
    }

    /// Whether the request headers carry the configured bearer token.
    pub fn admits(&self, headers: &HeaderMap) -> bool {
        if self.is_disabled() {
            return true;
        }

        headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .is_some_and(|bearer| bearer == &*self.token)
    }
}

pub async fn require_auth(State(auth): State<AuthState>, request: Request, next: Next) -> Response {
    if !auth.admits(request.headers()) {
        debug!(
            target: "registry_gateway::auth",
            "Not authorised: {} {}",
            request.method(),
            request.uri().path()
        );
        return responses::not_authorised();
    }

    next.run(request).await
}
