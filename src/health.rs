//! Health and metrics endpoints, served outside the gateway pipeline.

use crate::responses;
use axum::{
    extract::State,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::BTreeMap;
use std::sync::Arc;

pub type HealthInfo = Arc<BTreeMap<String, String>>;

/// `GET /health` returns the static key/value pairs given at startup.
/// Any other method is a 404.
pub async fn health_check(State(info): State<HealthInfo>, method: Method) -> Response {
    if method != Method::GET {
        return responses::not_found();
    }
    responses::json_response(StatusCode::OK, info.as_ref())
}

/// `GET /metrics` in Prometheus text format.
pub async fn metrics_handler(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    handle.render()
}
