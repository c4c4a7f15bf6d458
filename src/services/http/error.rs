use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use super::envoy::EndpointParseError;
use crate::services::registry::RegistryError;

/// HTTP 层错误类型
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("Failed to decode the request body: {0}")]
    BadRequest(String),
    #[error(transparent)]
    InvalidEndpoint(#[from] EndpointParseError),
    #[error("Request timed out")]
    Timeout,
    #[error("Metrics exporter not installed")]
    MetricsDisabled,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Registry(e) => match e {
                RegistryError::ServiceNotFound(_) | RegistryError::EndpointNotFound { .. } => {
                    StatusCode::NOT_FOUND
                }
                RegistryError::DuplicateEndpoint { .. } => StatusCode::CONFLICT,
                RegistryError::InvalidOperation(_) | RegistryError::InvalidArgument(_) => {
                    StatusCode::BAD_REQUEST
                }
                RegistryError::Decode { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                RegistryError::BackendUnavailable { .. }
                | RegistryError::RetryExhausted { .. }
                | RegistryError::Cancelled { .. } => StatusCode::SERVICE_UNAVAILABLE,
            },
            ApiError::BadRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::InvalidEndpoint(_) => StatusCode::BAD_GATEWAY,
            ApiError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ApiError::MetricsDisabled => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(status = %status, error = %self, "Request failed");
        } else {
            tracing::debug!(status = %status, error = %self, "Request rejected");
        }
        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::registry::RegistryOp;

    #[test]
    fn registry_errors_map_to_status_codes() {
        let cases = [
            (RegistryError::ServiceNotFound("svc".into()), StatusCode::NOT_FOUND),
            (
                RegistryError::EndpointNotFound {
                    service_name: "svc".into(),
                    endpoint: "a:1".into(),
                },
                StatusCode::NOT_FOUND,
            ),
            (
                RegistryError::DuplicateEndpoint {
                    service_name: "svc".into(),
                    endpoint: "a:1".into(),
                },
                StatusCode::CONFLICT,
            ),
            (RegistryError::InvalidOperation("x".into()), StatusCode::BAD_REQUEST),
            (
                RegistryError::RetryExhausted {
                    operation: RegistryOp::Register,
                    attempts: 3,
                    source: Box::new(RegistryError::ServiceNotFound("svc".into())),
                },
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];
        for (error, status) in cases {
            assert_eq!(ApiError::from(error).status_code(), status);
        }
    }

    #[test]
    fn endpoint_errors_are_bad_gateway() {
        let err = ApiError::from(EndpointParseError::MissingPort("10.0.0.1".into()));
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(ApiError::Timeout.status_code(), StatusCode::GATEWAY_TIMEOUT);
    }
}
