use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use grpc_discovery::services::registry::{
    CounterObserver, Operation, Registry, RegistryError, RegistryOp, RetryConfig, RetryPolicy,
    RetryingRegistry, ServiceRegistry,
};
use grpc_discovery::storage::{KeyValueClient, MemoryClient, StorageError};

// 前 fail_first 次 get 返回后端不可用，其余委托给内存实现
#[derive(Debug)]
struct UnreliableClient {
    inner: MemoryClient,
    fail_first: usize,
    gets: AtomicUsize,
}

impl UnreliableClient {
    fn new(fail_first: usize) -> Self {
        Self {
            inner: MemoryClient::new(),
            fail_first,
            gets: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl KeyValueClient for UnreliableClient {
    async fn create(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.inner.create(key, value).await
    }

    async fn get(&self, key: &str) -> Result<String, StorageError> {
        if self.gets.fetch_add(1, Ordering::SeqCst) < self.fail_first {
            return Err(StorageError::unavailable("connection refused"));
        }
        self.inner.get(key).await
    }

    async fn delete(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.inner.delete(key, value).await
    }
}

fn retrying(
    client: Arc<dyn KeyValueClient>,
    max_attempts: usize,
    observer: Arc<CounterObserver>,
) -> RetryingRegistry<ServiceRegistry> {
    let registry = ServiceRegistry::with_observer(client, observer.clone());
    RetryingRegistry::new(
        registry,
        RetryConfig {
            max_attempts,
            policy: RetryPolicy::TransientOnly,
            ..RetryConfig::default()
        },
    )
    .with_observer(observer)
}

#[tokio::test]
async fn test_add_add_resolve_scenario() {
    let observer = Arc::new(CounterObserver::new());
    let registry = retrying(Arc::new(MemoryClient::new()), 3, observer.clone());

    registry.register("svc", Operation::Add, "192.0.0.1").await.unwrap();
    registry.register("svc", Operation::Add, "192.0.0.2").await.unwrap();

    assert_eq!(
        registry.resolve("svc").await.unwrap(),
        vec!["192.0.0.1", "192.0.0.2"]
    );
    assert_eq!(observer.snapshot().register_retry_attempts, 0);
}

#[tokio::test]
async fn test_duplicate_add_scenario() {
    let observer = Arc::new(CounterObserver::new());
    let registry = retrying(Arc::new(MemoryClient::new()), 3, observer.clone());

    registry.register("svc", Operation::Add, "192.0.0.1").await.unwrap();
    let err = registry
        .register("svc", Operation::Add, "192.0.0.1")
        .await
        .unwrap_err();

    assert!(matches!(err, RegistryError::DuplicateEndpoint { .. }));
    assert_eq!(registry.resolve("svc").await.unwrap(), vec!["192.0.0.1"]);
    // 逻辑错误不会被重试
    assert_eq!(observer.retry_attempts(RegistryOp::Register), 0);
}

#[tokio::test]
async fn test_delete_missing_service_scenario() {
    let observer = Arc::new(CounterObserver::new());
    let registry = retrying(Arc::new(MemoryClient::new()), 3, observer);

    let err = registry
        .register("missing-svc", Operation::Delete, "x")
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::ServiceNotFound(_)));
}

#[tokio::test]
async fn test_transient_backend_failures_are_absorbed() {
    let observer = Arc::new(CounterObserver::new());
    let client = Arc::new(UnreliableClient::new(2));
    let registry = retrying(client, 5, observer.clone());

    registry.register("svc", Operation::Add, "10.0.0.1:80").await.unwrap();

    assert_eq!(observer.retry_attempts(RegistryOp::Register), 2);
    assert_eq!(observer.retry_exhausted_count(RegistryOp::Register), 0);
    assert_eq!(registry.resolve("svc").await.unwrap(), vec!["10.0.0.1:80"]);
}

#[tokio::test]
async fn test_persistent_backend_failure_exhausts_retries() {
    let observer = Arc::new(CounterObserver::new());
    let client = Arc::new(UnreliableClient::new(usize::MAX));
    let registry = retrying(client, 4, observer.clone());

    let err = registry.resolve("svc").await.unwrap_err();

    assert!(matches!(
        err,
        RegistryError::RetryExhausted { operation: RegistryOp::Resolve, attempts: 4, .. }
    ));
    assert!(matches!(err.root(), RegistryError::BackendUnavailable { .. }));
    assert_eq!(observer.retry_attempts(RegistryOp::Resolve), 4);
    assert_eq!(observer.retry_exhausted_count(RegistryOp::Resolve), 1);
}

#[tokio::test]
async fn test_concurrent_adds_of_distinct_endpoints_are_all_kept() {
    let observer = Arc::new(CounterObserver::new());
    let registry = Arc::new(retrying(Arc::new(MemoryClient::new()), 3, observer));

    let mut handles = Vec::new();
    for i in 0..16 {
        let registry = registry.clone();
        handles.push(tokio::spawn(async move {
            registry
                .register("svc", Operation::Add, &format!("10.0.0.{i}:80"))
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let mut endpoints = registry.resolve("svc").await.unwrap();
    assert_eq!(endpoints.len(), 16);
    endpoints.sort();
    endpoints.dedup();
    assert_eq!(endpoints.len(), 16);
}
