//! # isp-api: System Service over Axum
//!
//! HTTP surface of the system service: the registry of domains, application
//! groups (`services` on the wire) and applications, their bearer tokens and
//! access lists, and the authenticate/authorize pair the gateway calls on
//! every request.
//!
//! ## API Surface
//!
//! | Prefix                          | Module                      | Concern               |
//! |---------------------------------|-----------------------------|-----------------------|
//! | `/system/secure/*`              | [`routes::secure`]          | token check, ACL check |
//! | `/system/access_list/*`         | [`routes::access_list`]     | access-list rows      |
//! | `/system/domain/*`              | [`routes::domain`]          | domains               |
//! | `/system/application_group/*`   | [`routes::app_group`]       | application groups    |
//! | `/system/application/*`         | [`routes::application`]     | applications, tree    |
//! | `/system/token/*`               | [`routes::token`]           | bearer tokens         |
//! | `/health/*`, `/metrics`         | this module                 | probes, Prometheus    |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → Handler
//! ```
//!
//! The binary adds a request timeout around the whole router.
//!
//! ## Storage
//!
//! Services talk to repository traits ([`repository`]). Postgres
//! ([`db`]) is the production backend; [`memory`] backs tests and
//! database-less runs.

pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod memory;
pub mod middleware;
pub mod openapi;
pub mod repository;
pub mod routes;
pub mod service;
pub mod state;

use std::time::Duration;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::middleware::from_fn;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub use crate::error::AppError;
pub use crate::state::AppState;

/// Assemble the full application router.
///
/// Probes and `/metrics` sit outside the request metrics so scrapes do not
/// count themselves.
pub fn app(state: AppState) -> Router {
    let mut api = Router::new()
        .merge(routes::router())
        .merge(openapi::router());
    if state.metrics.is_some() {
        api = api.layer(from_fn(middleware::metrics::metrics_middleware));
    }
    let api = api.layer(TraceLayer::new_for_http()).with_state(state.clone());

    let ops = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .route("/metrics", get(render_metrics))
        .with_state(state);

    Router::new().merge(ops).merge(api)
}

/// Bound every request by `timeout`; late requests get 408.
pub fn with_request_timeout(app: Router, timeout: Duration) -> Router {
    app.layer(TimeoutLayer::with_status_code(
        StatusCode::REQUEST_TIMEOUT,
        timeout,
    ))
}

/// Liveness probe: 200 while the process runs.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe: 200 once storage answers.
async fn readiness(State(state): State<AppState>) -> Response {
    if let Some(pool) = &state.db_pool {
        if let Err(e) = sqlx::query("SELECT 1").execute(pool).await {
            tracing::warn!(error = %e, "readiness check failed");
            return (StatusCode::SERVICE_UNAVAILABLE, "database unreachable").into_response();
        }
    }
    "ready".into_response()
}

async fn render_metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => (
            [(
                header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics disabled").into_response(),
    }
}
