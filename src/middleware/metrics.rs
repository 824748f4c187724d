//! Metrics instrument.
//!
//! Times every request entering the gateway and records the final status
//! code written by any inner layer: 403 from the gate, 404 from the
//! dispatcher, or whatever the backend chose. The response passes through
//! untouched.

use crate::observability::{top_level_segment, HttpMetrics};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::time::Instant;

pub async fn track_metrics(State(metrics): State<HttpMetrics>, request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = top_level_segment(request.uri().path());

    let response = next.run(request).await;

    metrics.observe(&method, &path, response.status(), start.elapsed());
    response
}
