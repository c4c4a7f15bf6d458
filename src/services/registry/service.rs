use std::sync::Arc;

use async_trait::async_trait;

use super::error::{RegistryError, Stage};
use super::metrics::{NoopObserver, RegistryObserver};
use super::types::{Endpoint, Operation, Outcome, Registry, RegistryOp};
use crate::storage::KeyValueClient;
use crate::storage::codec::decode_values;

/// 建立在 `KeyValueClient` 之上的服务注册表
///
/// 持久化采用增量方式：每次添加调用一次 `create(service, endpoint)`，
/// 每次删除调用一次 `delete(service, endpoint)`，不会整表覆盖。
/// 因此并发添加不同端点不会互相覆盖；但"先查后改"之间没有原子性，
/// 并发添加同一端点可能都通过重复检查（由后端去重），并发删除也可能都通过成员检查。
#[derive(Debug, Clone)]
pub struct ServiceRegistry {
    client: Arc<dyn KeyValueClient>,
    observer: Arc<dyn RegistryObserver>,
}

impl ServiceRegistry {
    pub fn new(client: Arc<dyn KeyValueClient>) -> Self {
        Self::with_observer(client, Arc::new(NoopObserver))
    }

    pub fn with_observer(
        client: Arc<dyn KeyValueClient>,
        observer: Arc<dyn RegistryObserver>,
    ) -> Self {
        Self { client, observer }
    }

    // 读取当前端点列表；服务不存在或列表为空时返回 None
    async fn fetch(&self, service_name: &str) -> Result<Option<Vec<Endpoint>>, RegistryError> {
        let payload = match self.client.get(service_name).await {
            Ok(payload) => payload,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(RegistryError::backend(service_name, Stage::Lookup, e)),
        };

        let endpoints = decode_values(&payload).map_err(|source| RegistryError::Decode {
            service_name: service_name.to_string(),
            source,
        })?;

        if endpoints.is_empty() {
            Ok(None)
        } else {
            Ok(Some(endpoints))
        }
    }

    async fn add_endpoint(&self, service_name: &str, endpoint: &str) -> Result<(), RegistryError> {
        match self.fetch(service_name).await? {
            Some(endpoints) if endpoints.iter().any(|e| e == endpoint) => {
                return Err(RegistryError::DuplicateEndpoint {
                    service_name: service_name.to_string(),
                    endpoint: endpoint.to_string(),
                });
            }
            Some(_) => {}
            None => {
                tracing::info!(service_name = %service_name, "Creating new service entry");
            }
        }

        self.client
            .create(service_name, endpoint)
            .await
            .map_err(|e| RegistryError::backend(service_name, Stage::Persist, e))
    }

    async fn delete_endpoint(&self, service_name: &str, endpoint: &str) -> Result<(), RegistryError> {
        let endpoints = self
            .fetch(service_name)
            .await?
            .ok_or_else(|| RegistryError::ServiceNotFound(service_name.to_string()))?;

        if !endpoints.iter().any(|e| e == endpoint) {
            return Err(RegistryError::EndpointNotFound {
                service_name: service_name.to_string(),
                endpoint: endpoint.to_string(),
            });
        }

        self.client
            .delete(service_name, endpoint)
            .await
            .map_err(|e| RegistryError::backend(service_name, Stage::Persist, e))
    }

    fn record<T>(&self, operation: RegistryOp, result: &Result<T, RegistryError>) {
        let outcome = if result.is_ok() {
            Outcome::Success
        } else {
            Outcome::Failure
        };
        self.observer.operation_completed(operation, outcome);
    }
}

fn validate(service_name: &str, endpoint: Option<&str>) -> Result<(), RegistryError> {
    if service_name.trim().is_empty() {
        return Err(RegistryError::InvalidArgument(
            "service name must not be empty".to_string(),
        ));
    }
    if endpoint.is_some_and(|e| e.trim().is_empty()) {
        return Err(RegistryError::InvalidArgument(
            "endpoint must not be empty".to_string(),
        ));
    }
    Ok(())
}

#[async_trait]
impl Registry for ServiceRegistry {
    async fn resolve(&self, service_name: &str) -> Result<Vec<Endpoint>, RegistryError> {
        let result = match validate(service_name, None) {
            Ok(()) => self
                .fetch(service_name)
                .await
                .and_then(|found| {
                    found.ok_or_else(|| RegistryError::ServiceNotFound(service_name.to_string()))
                }),
            Err(e) => Err(e),
        };

        if let Err(e) = &result {
            tracing::debug!(service_name = %service_name, error = %e, "Resolve failed");
        }
        self.record(RegistryOp::Resolve, &result);
        result
    }

    async fn register(
        &self,
        service_name: &str,
        operation: Operation,
        endpoint: &str,
    ) -> Result<(), RegistryError> {
        let result = match validate(service_name, Some(endpoint)) {
            Ok(()) => match operation {
                Operation::Add => self.add_endpoint(service_name, endpoint).await,
                Operation::Delete => self.delete_endpoint(service_name, endpoint).await,
            },
            Err(e) => Err(e),
        };

        match &result {
            Ok(()) => tracing::info!(
                service_name = %service_name,
                operation = %operation,
                endpoint = %endpoint,
                "Service registry updated"
            ),
            Err(e) => tracing::warn!(
                service_name = %service_name,
                operation = %operation,
                endpoint = %endpoint,
                error = %e,
                "Service registry update rejected"
            ),
        }
        self.record(RegistryOp::Register, &result);
        result
    }
}
