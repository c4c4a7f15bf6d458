use std::sync::Arc;
use std::time::Duration;

use tonic::{Request, Response, Status};
use tracing::Instrument;
use uuid::Uuid;

use crate::discovery::dns_server::Dns;
use crate::discovery::{GetRequest, GetResponse, PostRequest, PostResponse};
use crate::services::registry::{Operation, Registry, RegistryError};

const GRPC_REQUESTS_TOTAL: &str = "grpc_requests_total";

/// gRPC 协议适配层，调用带重试的注册表
#[derive(Debug, Clone)]
pub struct DnsService {
    registry: Arc<dyn Registry>,
    request_timeout: Duration,
}

impl DnsService {
    pub fn new(registry: Arc<dyn Registry>, request_timeout: Duration) -> Self {
        Self {
            registry,
            request_timeout,
        }
    }
}

// 将注册表错误映射为 gRPC 状态码
pub fn status_from_error(error: &RegistryError) -> Status {
    let message = error.to_string();
    match error {
        RegistryError::ServiceNotFound(_) | RegistryError::EndpointNotFound { .. } => {
            Status::not_found(message)
        }
        RegistryError::DuplicateEndpoint { .. } => Status::already_exists(message),
        RegistryError::InvalidOperation(_) | RegistryError::InvalidArgument(_) => {
            Status::invalid_argument(message)
        }
        RegistryError::Decode { .. } => Status::failed_precondition(message),
        RegistryError::BackendUnavailable { .. }
        | RegistryError::RetryExhausted { .. }
        | RegistryError::Cancelled { .. } => Status::unavailable(message),
    }
}

fn record(method: &'static str, result: &Result<impl Sized, Status>) {
    let outcome = if result.is_ok() { "success" } else { "failure" };
    metrics::counter!(GRPC_REQUESTS_TOTAL, "method" => method, "outcome" => outcome).increment(1);
}

#[tonic::async_trait]
impl Dns for DnsService {
    async fn get_service(
        &self,
        request: Request<GetRequest>,
    ) -> Result<Response<GetResponse>, Status> {
        let req = request.into_inner();
        let span = tracing::info_span!(
            "grpc_get_service",
            request_id = %Uuid::new_v4(),
            service_name = %req.service_name
        );

        let result = async {
            let hosts = tokio::time::timeout(
                self.request_timeout,
                self.registry.resolve(&req.service_name),
            )
            .await
            .map_err(|_| Status::deadline_exceeded("GetService timed out"))?
            .map_err(|e| {
                tracing::warn!(error = %e, "GetService failed");
                status_from_error(&e)
            })?;

            Ok::<_, Status>(Response::new(GetResponse { hosts }))
        }
        .instrument(span)
        .await;

        record("get_service", &result);
        result
    }

    async fn post_service(
        &self,
        request: Request<PostRequest>,
    ) -> Result<Response<PostResponse>, Status> {
        let req = request.into_inner();
        let span = tracing::info_span!(
            "grpc_post_service",
            request_id = %Uuid::new_v4(),
            service_name = %req.service_name,
            operation = %req.operation,
            host = %req.host
        );

        let result = async {
            let operation: Operation = req
                .operation
                .parse()
                .map_err(|e: RegistryError| status_from_error(&e))?;

            tokio::time::timeout(
                self.request_timeout,
                self.registry
                    .register(&req.service_name, operation, &req.host),
            )
            .await
            .map_err(|_| Status::deadline_exceeded("PostService timed out"))?
            .map_err(|e| {
                tracing::warn!(error = %e, "PostService failed");
                status_from_error(&e)
            })?;

            Ok::<_, Status>(Response::new(PostResponse {}))
        }
        .instrument(span)
        .await;

        record("post_service", &result);
        result
    }
}
