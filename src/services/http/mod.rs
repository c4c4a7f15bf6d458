//! HTTP front end
//!
//! - `handlers`: REST API plus the load-balancer discovery routes
//! - `envoy`: v1 registration / v2 discovery payload types
//! - `error`: mapping of registry errors to HTTP responses

pub mod envoy;
pub mod error;
pub mod handlers;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use tracing::Instrument;
use uuid::Uuid;

use crate::services::registry::Registry;

pub use error::ApiError;

/// 路由共享状态
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<dyn Registry>,
    pub request_timeout: Duration,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(registry: Arc<dyn Registry>, request_timeout: Duration) -> Self {
        Self {
            registry,
            request_timeout,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

// 每个请求一个 span，带上随机生成的 request_id
async fn request_span(request: Request, next: Next) -> Response {
    let span = tracing::info_span!(
        "http_request",
        request_id = %Uuid::new_v4(),
        method = %request.method(),
        path = %request.uri().path()
    );
    next.run(request).instrument(span).await
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/service/{service_name}", get(handlers::get_service))
        .route("/api/service", post(handlers::post_service))
        .route("/api/health", get(handlers::health))
        .route(
            "/v1/registration/{service_name}",
            get(handlers::registration_v1),
        )
        .route("/v2/discovery:endpoints", post(handlers::discovery_v2))
        .route("/metrics", get(handlers::render_metrics))
        .layer(middleware::from_fn(request_span))
        .with_state(state)
}
