//! Route dispatcher.
//!
//! Matches `(method, path)` against an ordered table of patterns and hands
//! the request to the corresponding [`RegistryClient`] operation. The first
//! matching pattern wins; anything unmatched is a 404 with a `null` body.

use crate::client::RegistryClient;
use crate::paths::request_path;
use crate::responses::{self, APPLICATION_JSON};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    response::Response,
};
use regex::Regex;
use std::sync::{Arc, LazyLock};
use tracing::{debug, error, warn};

pub type SharedClient = Arc<dyn RegistryClient>;

/// The six backend operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ListRepositories,
    GetRepository,
    GetImage,
    CreateRepository,
    DeleteRepository,
    GetToken,
}

/// A method plus a path rule, bound to one operation.
pub struct RoutePattern {
    method: Method,
    path: Regex,
    operation: Operation,
}

impl RoutePattern {
    fn new(method: Method, path: &str, operation: Operation) -> Result<Self, regex::Error> {
        Ok(Self {
            method,
            path: Regex::new(path)?,
            operation,
        })
    }

    pub fn matches(&self, method: &Method, path: &str) -> bool {
        self.method == *method && self.path.is_match(path)
    }
}

// `[^\t\n\x0B\f\r ]` is ASCII non-whitespace; `\S` would also exclude
// Unicode spaces such as U+00A0.
static ROUTES: LazyLock<Vec<RoutePattern>> = LazyLock::new(|| {
    [
        (Method::GET, r"^/repos/$", Operation::ListRepositories),
        (Method::GET, r"^/repo/([^\t\n\x0B\f\r ]+)$", Operation::GetRepository),
        (Method::GET, r"^/image/([^\t\n\x0B\f\r ]+)$", Operation::GetImage),
        (Method::POST, r"^/repo/([^\t\n\x0B\f\r ]+)$", Operation::CreateRepository),
        (Method::DELETE, r"^/repo/([^\t\n\x0B\f\r ]+)$", Operation::DeleteRepository),
        (Method::POST, r"^/token(/[^\t\n\x0B\f\r ]*)?$", Operation::GetToken),
    ]
    .into_iter()
    .filter_map(|(method, pattern, operation)| {
        match RoutePattern::new(method, pattern, operation) {
            Ok(route) => Some(route),
            Err(e) => {
                error!("Route pattern {} for {:?} does not compile: {}", pattern, operation, e);
                None
            }
        }
    })
    .collect()
});

/// Selects the operation for a request, if any.
pub fn resolve(method: &Method, path: &str) -> Option<Operation> {
    ROUTES
        .iter()
        .find(|route| route.matches(method, path))
        .map(|route| route.operation)
}

/// Axum handler for every path in the gateway subtrees.
pub async fn dispatch(State(client): State<SharedClient>, request: Request) -> Response {
    let operation = resolve(request.method(), &request_path(&request));

    let mut response = match operation {
        Some(operation) => {
            debug!("Dispatching {} {} to {:?}", request.method(), request.uri().path(), operation);
            match operation {
                Operation::ListRepositories => client.list_repositories(request).await,
                Operation::GetRepository => client.get_repository(request).await,
                Operation::GetImage => client.get_image(request).await,
                Operation::CreateRepository => client.create_repository(request).await,
                Operation::DeleteRepository => client.delete_repository(request).await,
                Operation::GetToken => client.get_token(request).await,
            }
        }
        None => {
            warn!("Invalid request: {} {}", request.method(), request.uri().path());
            responses::not_found()
        }
    };

    response
        .headers_mut()
        .entry(header::CONTENT_TYPE)
        .or_insert(HeaderValue::from_static(APPLICATION_JSON));
    response
}
