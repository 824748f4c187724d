//! HTTP server hosting the gateway.

use crate::config::GatewayConfig;
use crate::error::Result;
use crate::health::{self, HealthInfo};
use crate::middleware::{require_auth, track_metrics, AuthState};
use crate::observability::HttpMetrics;
use crate::responses;
use crate::router::{dispatch, SharedClient};
use axum::{
    middleware,
    routing::{any, get},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Request bodies are small JSON documents.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Path prefixes handed to the dispatcher. Each is mounted both bare and
/// with a trailing wildcard so the whole subtree is gated.
const GATEWAY_SUBTREES: &[&str] = &["/repos/", "/repo/", "/image/", "/token/"];

/// Builds the complete application.
///
/// `/health` and `/metrics` are served directly. Every gateway subtree runs
/// through metrics, then the authorization gate, then the dispatcher. Other
/// paths get an unauthenticated 404, still metered.
pub fn build_router(client: SharedClient, config: &GatewayConfig, metrics: &HttpMetrics) -> Router {
    let mut gated: Router<SharedClient> = Router::new().route("/token", any(dispatch));
    for prefix in GATEWAY_SUBTREES {
        gated = gated
            .route(prefix, any(dispatch))
            .route(&format!("{prefix}{{*rest}}"), any(dispatch));
    }

    let gateway: Router = gated
        .route_layer(middleware::from_fn_with_state(
            AuthState::new(config.auth_token.as_str()),
            require_auth,
        ))
        .fallback(|| async { responses::not_found() })
        .with_state(client)
        .layer(middleware::from_fn_with_state(metrics.clone(), track_metrics));

    let health_info: HealthInfo = Arc::new(config.health_info.clone());
    let probes: Router = Router::new()
        .route("/health", any(health::health_check))
        .with_state(health_info);

    let exporter: Router = Router::new()
        .route("/metrics", get(health::metrics_handler))
        .with_state(metrics.handle());

    probes.merge(exporter).merge(gateway).layer(
        tower::ServiceBuilder::new()
            .layer(axum::extract::DefaultBodyLimit::max(MAX_BODY_BYTES))
            .layer(TraceLayer::new_for_http()),
    )
}

/// A running gateway.
///
/// Binds the configured address (port 0 picks a free port) and serves in a
/// background task until dropped with the runtime.
pub struct GatewayServer {
    addr: SocketAddr,
    metrics: HttpMetrics,
    _handle: tokio::task::JoinHandle<()>,
}

impl GatewayServer {
    /// Creates and starts a gateway in front of `client`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use registry_gateway::{GatewayConfig, GatewayServer, MemoryRegistry};
    /// use std::sync::Arc;
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let config = GatewayConfig::new("secret");
    /// let backend = Arc::new(MemoryRegistry::from_config(&config));
    /// let server = GatewayServer::new(config, backend).await?;
    /// println!("Gateway URL: {}", server.url());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn new(config: GatewayConfig, client: SharedClient) -> Result<Self> {
        let metrics = HttpMetrics::new()?;
        let app = build_router(client, &config, &metrics);

        let listener = TcpListener::bind(config.listen).await?;
        let addr = listener.local_addr()?;

        info!("Gateway listening on {}", addr);

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!("Gateway server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            metrics,
            _handle: handle,
        })
    }

    /// Returns the socket address the server is bound to.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Returns the base URL of the gateway.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn metrics(&self) -> &HttpMetrics {
        &self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::RegistryClient;
    use crate::observability::API_RESPONSE_TIME;
    use crate::router::Operation;
    use async_trait::async_trait;
    use axum::{
        body::Body,
        extract::Request,
        http::{header, Method, StatusCode},
        response::Response,
    };
    use http_body_util::BodyExt;
    use std::sync::Mutex;
    use tower::ServiceExt;

    /// Answers every operation with 200 and the operation name, and records
    /// what was called.
    #[derive(Default)]
    struct RecordingClient {
        calls: Mutex<Vec<(Operation, String)>>,
    }

    impl RecordingClient {
        fn record(&self, operation: Operation, request: &Request) -> Response {
            self.calls
                .lock()
                .unwrap()
                .push((operation, request.uri().path().to_string()));
            responses::json_response(StatusCode::OK, &format!("{operation:?}"))
        }

        fn calls(&self) -> Vec<(Operation, String)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RegistryClient for RecordingClient {
        async fn list_repositories(&self, request: Request) -> Response {
            self.record(Operation::ListRepositories, &request)
        }
        async fn get_repository(&self, request: Request) -> Response {
            self.record(Operation::GetRepository, &request)
        }
        async fn get_image(&self, request: Request) -> Response {
            self.record(Operation::GetImage, &request)
        }
        async fn create_repository(&self, request: Request) -> Response {
            self.record(Operation::CreateRepository, &request)
        }
        async fn delete_repository(&self, request: Request) -> Response {
            self.record(Operation::DeleteRepository, &request)
        }
        async fn get_token(&self, request: Request) -> Response {
            self.record(Operation::GetToken, &request)
        }
    }

    struct Harness {
        app: Router,
        client: Arc<RecordingClient>,
        metrics: HttpMetrics,
    }

    fn harness(token: &str) -> Harness {
        let client = Arc::new(RecordingClient::default());
        let metrics = HttpMetrics::new().unwrap();
        let config = GatewayConfig::new(token).with_health_info("version", "1.0");
        let app = build_router(client.clone(), &config, &metrics);
        Harness {
            app,
            client,
            metrics,
        }
    }

    async fn send(app: &Router, method: Method, uri: &str, auth: Option<&str>) -> (StatusCode, String) {
        let mut builder = axum::http::Request::builder().method(method).uri(uri);
        if let Some(value) = auth {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        let response = app
            .clone()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn recorded(metrics: &HttpMetrics, method: &str, path: &str, status: u16) -> bool {
        metrics.handle().render().lines().any(|line| {
            line.starts_with(&format!("{API_RESPONSE_TIME}_count"))
                && line.contains(&format!("method=\"{method}\""))
                && line.contains(&format!("path=\"{path}\""))
                && line.contains(&format!("status=\"{status}\""))
        })
    }

    #[tokio::test]
    async fn test_every_operation_is_dispatched() {
        let h = harness("");
        let cases = [
            (Method::GET, "/repos/", Operation::ListRepositories),
            (Method::GET, "/repo/foo", Operation::GetRepository),
            (Method::GET, "/image/foo:1.0", Operation::GetImage),
            (Method::POST, "/repo/foo", Operation::CreateRepository),
            (Method::DELETE, "/repo/foo", Operation::DeleteRepository),
            (Method::POST, "/token", Operation::GetToken),
            (Method::POST, "/token/foo", Operation::GetToken),
        ];

        for (method, uri, operation) in cases.iter().cloned() {
            let (status, body) = send(&h.app, method, uri, None).await;
            assert_eq!(status, StatusCode::OK, "{uri}");
            assert_eq!(body, format!("\"{operation:?}\"\n"));
        }

        let calls = h.client.calls();
        assert_eq!(calls.len(), cases.len());
        for ((operation, path), (_, uri, expected)) in calls.iter().zip(cases.iter()) {
            assert_eq!(operation, expected);
            assert_eq!(path, uri);
        }
    }

    #[tokio::test]
    async fn test_list_without_header_when_auth_disabled() {
        let h = harness("");
        let (status, _) = send(&h.app, Method::GET, "/repos/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(h.client.calls()[0].0, Operation::ListRepositories);
    }

    #[tokio::test]
    async fn test_auth_disabled_ignores_header() {
        let h = harness("");
        for auth in [None, Some("Bearer whatever"), Some("garbage")] {
            let (status, _) = send(&h.app, Method::POST, "/token", auth).await;
            assert_eq!(status, StatusCode::OK, "{auth:?}");
        }
    }

    #[tokio::test]
    async fn test_token_with_correct_bearer() {
        let h = harness("secret");
        let (status, _) = send(&h.app, Method::POST, "/token", Some("Bearer secret")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(h.client.calls()[0].0, Operation::GetToken);
    }

    #[tokio::test]
    async fn test_wrong_bearer_is_forbidden() {
        let h = harness("secret");
        for auth in [None, Some("Bearer wrong"), Some("Basic secret")] {
            let (status, body) = send(&h.app, Method::POST, "/token", auth).await;
            assert_eq!(status, StatusCode::FORBIDDEN);
            assert_eq!(body, "{\"error\":\"not authorised\"}\n");
        }
        assert!(h.client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unmatched_paths_are_not_found() {
        for token in ["", "secret"] {
            let h = harness(token);
            for (method, uri) in [
                (Method::GET, "/"),
                (Method::GET, "/nothing/here"),
                (Method::GET, "/repos"),
                (Method::GET, "/repo"),
                (Method::PATCH, "/v2/"),
            ] {
                let (status, body) = send(&h.app, method, uri, None).await;
                assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
                assert_eq!(body, "null\n");
            }
            assert!(h.client.calls().is_empty());
        }
    }

    #[tokio::test]
    async fn test_unmatched_method_in_subtree_is_not_found() {
        let h = harness("secret");
        for (method, uri) in [
            (Method::PUT, "/repo/foo"),
            (Method::GET, "/token"),
            (Method::POST, "/image/foo"),
            (Method::GET, "/repos/extra"),
        ] {
            let (status, body) = send(&h.app, method.clone(), uri, Some("Bearer secret")).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{method} {uri}");
            assert_eq!(body, "null\n");
        }
        assert!(h.client.calls().is_empty());

        // Same requests without credentials are stopped at the gate first.
        let (status, _) = send(&h.app, Method::PUT, "/repo/foo", None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_image_with_empty_tag_reaches_backend() {
        let h = harness("");
        let (status, _) = send(&h.app, Method::GET, "/image/foo:", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(h.client.calls()[0].0, Operation::GetImage);
    }

    #[tokio::test]
    async fn test_dispatch_sets_json_content_type() {
        let h = harness("");
        let response = h
            .app
            .clone()
            .oneshot(
                axum::http::Request::builder()
                    .method(Method::DELETE)
                    .uri("/repos/")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
    }

    #[tokio::test]
    async fn test_health() {
        let h = harness("secret");
        let (status, body) = send(&h.app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "{\"version\":\"1.0\"}\n");

        let (status, body) = send(&h.app, Method::POST, "/health", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, "null\n");

        assert!(!recorded(&h.metrics, "GET", "/health", 200));
    }

    #[tokio::test]
    async fn test_metrics_cover_rejections_and_misses() {
        let h = harness("secret");
        send(&h.app, Method::GET, "/repo/foo", None).await;
        send(&h.app, Method::GET, "/repo/foo", Some("Bearer secret")).await;
        send(&h.app, Method::GET, "/", None).await;
        send(&h.app, Method::PUT, "/repo/foo", Some("Bearer secret")).await;

        assert!(recorded(&h.metrics, "GET", "/repo", 403));
        assert!(recorded(&h.metrics, "GET", "/repo", 200));
        assert!(recorded(&h.metrics, "GET", "/", 404));
        assert!(recorded(&h.metrics, "PUT", "/repo", 404));
    }

    #[tokio::test]
    async fn test_metrics_endpoint_renders_exposition() {
        let h = harness("");
        send(&h.app, Method::GET, "/repos/", None).await;

        let (status, body) = send(&h.app, Method::GET, "/metrics", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains(API_RESPONSE_TIME));
        assert!(body.contains("path=\"/repos\""));
    }

    #[tokio::test]
    async fn test_repeated_get_is_stable() {
        let h = harness("");
        let first = send(&h.app, Method::GET, "/repo/foo", None).await;
        let second = send(&h.app, Method::GET, "/repo/foo", None).await;
        assert_eq!(first, second);
    }
}
