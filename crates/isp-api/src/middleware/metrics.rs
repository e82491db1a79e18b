//! # Request Metrics
//!
//! Records one counter sample and one latency sample per request through
//! the `metrics` facade. The binary installs a Prometheus recorder when
//! `metrics.enabled` is set; without a recorder the macros are no-ops.
//!
//! | Metric                              | Kind      | Labels                   |
//! |-------------------------------------|-----------|--------------------------|
//! | `isp_http_requests_total`           | counter   | `method`, `path`, `status` |
//! | `isp_http_request_duration_seconds` | histogram | `method`, `path`         |
//!
//! `path` is the matched route template, so label cardinality is bounded by
//! the router.

use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

pub const REQUESTS_TOTAL: &str = "isp_http_requests_total";
pub const REQUEST_DURATION_SECONDS: &str = "isp_http_request_duration_seconds";

/// Install the process-wide Prometheus recorder.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Middleware recording request count and latency.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let start = Instant::now();

    let response = next.run(request).await;

    let status = response.status().as_u16().to_string();
    metrics::counter!(
        REQUESTS_TOTAL,
        "method" => method.clone(),
        "path" => path.clone(),
        "status" => status
    )
    .increment(1);
    metrics::histogram!(
        REQUEST_DURATION_SECONDS,
        "method" => method,
        "path" => path
    )
    .record(start.elapsed().as_secs_f64());

    response
}
