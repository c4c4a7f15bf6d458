use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tonic::transport::Server;

use crate::config::{Config, ConfigError};
use crate::discovery::dns_server::DnsServer;
use crate::services::http::{self, AppState};
use crate::services::registry::{
    PrometheusObserver, Registry, RegistryObserver, RetryingRegistry, ServiceRegistry,
};
use crate::services::DnsService;
use crate::storage::{StorageError, StorageFactory};

/// 服务启动/运行错误
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Failed to start storage client: {0}")]
    Storage(#[from] StorageError),
    #[error("gRPC transport error: {0}")]
    Transport(#[from] tonic::transport::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Server task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// 构建完整的注册表链：存储客户端 -> ServiceRegistry -> RetryingRegistry
pub async fn build_registry(
    config: &Config,
    factory: &StorageFactory,
    observer: Arc<dyn RegistryObserver>,
    shutdown: CancellationToken,
) -> Result<Arc<dyn Registry>, ServerError> {
    let client = factory.build(&config.storage).await?;
    let registry = ServiceRegistry::with_observer(client, observer.clone());
    let retrying = RetryingRegistry::new(registry, config.retry_config())
        .with_observer(observer)
        .with_cancellation(shutdown);
    Ok(Arc::new(retrying))
}

pub async fn serve_grpc(
    listener: TcpListener,
    registry: Arc<dyn Registry>,
    request_timeout: Duration,
    shutdown: CancellationToken,
) -> Result<(), ServerError> {
    let service = DnsService::new(registry, request_timeout);
    tracing::info!(addr = ?listener.local_addr().ok(), "gRPC server listening");

    Server::builder()
        .add_service(DnsServer::new(service))
        .serve_with_incoming_shutdown(
            TcpListenerStream::new(listener),
            shutdown.cancelled_owned(),
        )
        .await?;

    tracing::info!("gRPC server stopped");
    Ok(())
}

pub async fn serve_http(
    listener: TcpListener,
    state: AppState,
    shutdown: CancellationToken,
) -> Result<(), ServerError> {
    tracing::info!(addr = ?listener.local_addr().ok(), "HTTP server listening");

    axum::serve(listener, http::router(state))
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

pub async fn start(config: Config) -> Result<(), ServerError> {
    config.validate()?;
    let shutdown = CancellationToken::new();

    // 指标导出器安装失败不影响服务本身
    let metrics_handle = match crate::telemetry::init_metrics() {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to install metrics recorder, /metrics disabled");
            None
        }
    };

    let factory = StorageFactory::with_defaults();
    let registry = build_registry(
        &config,
        &factory,
        Arc::new(PrometheusObserver),
        shutdown.clone(),
    )
    .await?;

    let grpc_listener = TcpListener::bind(config.grpc_addr()?).await?;
    let http_listener = TcpListener::bind(config.http_addr()?).await?;

    let mut state = AppState::new(registry.clone(), config.request_timeout());
    if let Some(handle) = metrics_handle {
        state = state.with_metrics(handle);
    }

    let tracker = TaskTracker::new();
    let grpc_task = tracker.spawn({
        let shutdown = shutdown.clone();
        let request_timeout = config.request_timeout();
        async move {
            let result = serve_grpc(grpc_listener, registry, request_timeout, shutdown.clone()).await;
            // 任一服务退出都触发整体关闭
            shutdown.cancel();
            result
        }
    });
    let http_task = tracker.spawn({
        let shutdown = shutdown.clone();
        async move {
            let result = serve_http(http_listener, state, shutdown.clone()).await;
            shutdown.cancel();
            result
        }
    });
    tracker.close();

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
        _ = shutdown.cancelled() => {}
    }
    shutdown.cancel();
    tracker.wait().await;

    grpc_task.await??;
    http_task.await??;
    Ok(())
}
