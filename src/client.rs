//! The backend contract every registry implementation provides.

use async_trait::async_trait;
use axum::{extract::Request, response::Response};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Credentials that can be used to log in to a registry until `expires`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryToken {
    pub username: String,
    pub password: String,
    pub registry: String,
    pub expires: DateTime<Utc>,
}

/// Operations the gateway dispatches to.
///
/// Each operation receives the whole request and is responsible for parsing
/// the path (see [`crate::paths`]) and body, performing the registry-side
/// action and building the JSON response including its status code. The
/// gateway never inspects the result.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// `GET /repos/`
    async fn list_repositories(&self, request: Request) -> Response;

    /// `GET /repo/<name>`
    async fn get_repository(&self, request: Request) -> Response;

    /// `GET /image/<name[:tag]>`
    async fn get_image(&self, request: Request) -> Response;

    /// `POST /repo/<name>`
    async fn create_repository(&self, request: Request) -> Response;

    /// `DELETE /repo/<name>`
    async fn delete_repository(&self, request: Request) -> Response;

    /// `POST /token[/<name>]`
    async fn get_token(&self, request: Request) -> Response;
}
