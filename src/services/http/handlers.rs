use std::future::Future;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};

use super::AppState;
use super::envoy::{DiscoveryV2Request, DiscoveryV2Response, RegistrationV1Response, ResourceV2};
use super::error::ApiError;
use crate::services::registry::{Endpoint, Operation, RegistryError};

const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";

/// POST /api/service 请求体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostBody {
    #[serde(rename = "serviceName")]
    pub service_name: String,
    pub operation: String,
    pub host: String,
}

fn record<T>(route: &'static str, result: &Result<T, ApiError>) {
    let outcome = if result.is_ok() { "success" } else { "failure" };
    metrics::counter!(HTTP_REQUESTS_TOTAL, "route" => route, "outcome" => outcome).increment(1);
}

// 用配置的请求超时包裹一次注册表调用
async fn bounded<T>(
    state: &AppState,
    call: impl Future<Output = Result<T, RegistryError>>,
) -> Result<T, ApiError> {
    tokio::time::timeout(state.request_timeout, call)
        .await
        .map_err(|_| ApiError::Timeout)?
        .map_err(ApiError::from)
}

pub async fn get_service(
    State(state): State<AppState>,
    Path(service_name): Path<String>,
) -> Result<Json<Vec<Endpoint>>, ApiError> {
    let result = bounded(&state, state.registry.resolve(&service_name))
        .await
        .map(Json);
    record("get_service", &result);
    result
}

pub async fn post_service(
    State(state): State<AppState>,
    payload: Result<Json<PostBody>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let result = async {
        let Json(body) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
        let operation: Operation = body.operation.parse()?;
        bounded(
            &state,
            state
                .registry
                .register(&body.service_name, operation, &body.host),
        )
        .await?;
        Ok::<_, ApiError>(Json(serde_json::json!({})))
    }
    .await;
    record("post_service", &result);
    result
}

pub async fn health() -> StatusCode {
    metrics::counter!(HTTP_REQUESTS_TOTAL, "route" => "health", "outcome" => "success")
        .increment(1);
    StatusCode::OK
}

pub async fn registration_v1(
    State(state): State<AppState>,
    Path(service_name): Path<String>,
) -> Result<Json<RegistrationV1Response>, ApiError> {
    let result = async {
        let hosts = bounded(&state, state.registry.resolve(&service_name)).await?;
        Ok::<_, ApiError>(Json(RegistrationV1Response::from_endpoints(&hosts)?))
    }
    .await;
    record("v1_registration", &result);
    result
}

pub async fn discovery_v2(
    State(state): State<AppState>,
    payload: Result<Json<DiscoveryV2Request>, JsonRejection>,
) -> Result<Json<DiscoveryV2Response>, ApiError> {
    let result = async {
        let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

        let mut response = DiscoveryV2Response::default();
        for service_name in &request.resource_names {
            let hosts = bounded(&state, state.registry.resolve(service_name)).await?;
            response
                .resources
                .push(ResourceV2::from_endpoints(service_name, &hosts)?);
        }
        Ok::<_, ApiError>(Json(response))
    }
    .await;
    record("v2_discovery", &result);
    result
}

pub async fn render_metrics(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let handle = state.metrics.as_ref().ok_or(ApiError::MetricsDisabled)?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        handle.render(),
    ))
}
