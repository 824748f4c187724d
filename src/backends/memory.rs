use crate::client::{RegistryClient, RegistryToken};
use crate::config::GatewayConfig;
use crate::paths::{image_reference, repo_name, request_path, token_scope};
use crate::responses::{internal_server_error, json_response, not_found};
use async_trait::async_trait;
use axum::{extract::Request, http::StatusCode, response::Response};
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

pub const TOKEN_USERNAME: &str = "gateway";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Repository {
    pub name: String,
    pub created: DateTime<Utc>,
    pub image_count: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Image {
    pub repository: String,
    pub tag: String,
    pub digest: String,
}

struct RepositoryEntry {
    created: DateTime<Utc>,
    /// tag -> digest
    tags: BTreeMap<String, String>,
}

impl RepositoryEntry {
    fn describe(&self, name: &str) -> Repository {
        Repository {
            name: name.to_string(),
            created: self.created,
            image_count: self.tags.len(),
        }
    }
}

/// A registry backend that keeps everything in process memory.
///
/// Useful for local development and for exercising the gateway without a
/// real registry.
pub struct MemoryRegistry {
    repositories: Arc<RwLock<HashMap<String, RepositoryEntry>>>,
    registry_host: String,
    token_ttl: TimeDelta,
    return_error_details: bool,
}

impl Default for MemoryRegistry {
    fn default() -> Self {
        Self::from_config(&GatewayConfig::new(""))
    }
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            repositories: Arc::default(),
            registry_host: config.registry_host.clone(),
            token_ttl: config.token_ttl,
            return_error_details: config.return_error_details,
        }
    }

    /// Stores `manifest` under `repository:tag`, creating the repository if
    /// needed. Returns the manifest digest.
    pub async fn push_image(&self, repository: &str, tag: &str, manifest: &[u8]) -> String {
        let digest = format!("sha256:{}", hex::encode(Sha256::digest(manifest)));

        self.repositories
            .write()
            .await
            .entry(repository.to_string())
            .or_insert_with(|| RepositoryEntry {
                created: Utc::now(),
                tags: BTreeMap::new(),
            })
            .tags
            .insert(tag.to_string(), digest.clone());

        info!("Stored image {}:{} ({})", repository, tag, digest);
        digest
    }

    /// Expiry for a token issued now; `None` unless strictly in the future.
    fn token_expiry(&self) -> Option<DateTime<Utc>> {
        if self.token_ttl <= TimeDelta::zero() {
            return None;
        }
        Utc::now().checked_add_signed(self.token_ttl)
    }

    fn bad_request_path(&self, err: &crate::error::GatewayError) -> Response {
        warn!("{}", err);
        internal_server_error(err, self.return_error_details)
    }
}

#[async_trait]
impl RegistryClient for MemoryRegistry {
    async fn list_repositories(&self, _request: Request) -> Response {
        let repositories = self.repositories.read().await;
        let mut listing: Vec<Repository> = repositories
            .iter()
            .map(|(name, entry)| entry.describe(name))
            .collect();
        listing.sort_by(|a, b| a.name.cmp(&b.name));

        json_response(StatusCode::OK, &listing)
    }

    async fn get_repository(&self, request: Request) -> Response {
        let path = request_path(&request);
        let name = match repo_name(&path) {
            Ok(name) => name,
            Err(e) => return self.bad_request_path(&e),
        };

        match self.repositories.read().await.get(name) {
            Some(entry) => json_response(StatusCode::OK, &entry.describe(name)),
            None => not_found(),
        }
    }

    async fn get_image(&self, request: Request) -> Response {
        let path = request_path(&request);
        let image = match image_reference(&path) {
            Ok(image) => image,
            Err(e) => return self.bad_request_path(&e),
        };

        let repositories = self.repositories.read().await;
        let digest = repositories
            .get(&image.name)
            .and_then(|entry| entry.tags.get(&image.tag));

        match digest {
            Some(digest) => json_response(
                StatusCode::OK,
                &Image {
                    repository: image.name.clone(),
                    tag: image.tag.clone(),
                    digest: digest.clone(),
                },
            ),
            None => not_found(),
        }
    }

    async fn create_repository(&self, request: Request) -> Response {
        let path = request_path(&request);
        let name = match repo_name(&path) {
            Ok(name) => name,
            Err(e) => return self.bad_request_path(&e),
        };

        let mut repositories = self.repositories.write().await;
        if let Some(existing) = repositories.get(name) {
            return json_response(StatusCode::OK, &existing.describe(name));
        }

        let entry = RepositoryEntry {
            created: Utc::now(),
            tags: BTreeMap::new(),
        };
        let created = entry.describe(name);
        repositories.insert(name.to_string(), entry);

        info!("Created repository {}", name);
        json_response(StatusCode::CREATED, &created)
    }

    async fn delete_repository(&self, request: Request) -> Response {
        let path = request_path(&request);
        let name = match repo_name(&path) {
            Ok(name) => name,
            Err(e) => return self.bad_request_path(&e),
        };

        match self.repositories.write().await.remove(name) {
            Some(entry) => {
                info!("Deleted repository {}", name);
                json_response(StatusCode::OK, &entry.describe(name))
            }
            None => not_found(),
        }
    }

    async fn get_token(&self, request: Request) -> Response {
        let path = request_path(&request);
        let scope = match token_scope(&path) {
            Ok(scope) => scope,
            Err(e) => return self.bad_request_path(&e),
        };

        if let Some(repository) = scope {
            if !self.repositories.read().await.contains_key(repository) {
                return not_found();
            }
        }

        let expires = match self.token_expiry() {
            Some(expires) => expires,
            None => {
                error!("Token lifetime {} does not give a future expiry", self.token_ttl);
                return internal_server_error(
                    &format!("invalid token lifetime {}", self.token_ttl),
                    self.return_error_details,
                );
            }
        };

        let token = RegistryToken {
            username: TOKEN_USERNAME.to_string(),
            password: uuid::Uuid::new_v4().to_string(),
            registry: self.registry_host.clone(),
            expires,
        };
        json_response(StatusCode::OK, &token)
    }
}
