//! Process-wide API response time histogram.
//!
//! One [`HttpMetrics`] is created at startup, shared by the metrics
//! middleware and rendered by `/metrics`. Samples go to the owned recorder
//! via [`metrics::with_local_recorder`]; no global recorder is installed.

use crate::error::Result;
use axum::http::StatusCode;
use metrics::{describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle, PrometheusRecorder};
use std::sync::Arc;
use std::time::Duration;

pub const API_RESPONSE_TIME: &str = "registry_gateway_api_response_time_seconds";

const BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

#[derive(Clone)]
pub struct HttpMetrics {
    recorder: Arc<PrometheusRecorder>,
}

impl HttpMetrics {
    pub fn new() -> Result<Self> {
        let recorder = PrometheusBuilder::new()
            .set_buckets_for_metric(Matcher::Full(API_RESPONSE_TIME.to_string()), BUCKETS)?
            .build_recorder();

        metrics::with_local_recorder(&recorder, || {
            describe_histogram!(API_RESPONSE_TIME, Unit::Seconds, "Duration of API requests.");
        });

        Ok(Self {
            recorder: Arc::new(recorder),
        })
    }

    /// Handle for rendering the text exposition format.
    pub fn handle(&self) -> PrometheusHandle {
        self.recorder.handle()
    }

    pub fn observe(&self, method: &str, path: &str, status: StatusCode, elapsed: Duration) {
        metrics::with_local_recorder(self.recorder.as_ref(), || {
            histogram!(API_RESPONSE_TIME,
                "method" => method.to_string(),
                "path" => path.to_string(),
                "status" => status.as_u16().to_string()
            )
            .record(elapsed.as_secs_f64());
        });
    }
}

/// First `/`-delimited component of `path`, e.g. `/repo/foo` → `/repo`.
pub fn top_level_segment(path: &str) -> String {
    match path.split('/').nth(1) {
        Some(segment) => format!("/{segment}"),
        None => "/".to_string(),
    }
}
