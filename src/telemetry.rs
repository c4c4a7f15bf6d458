use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing_subscriber::EnvFilter;

use crate::services::registry::PrometheusObserver;

/// 初始化日志；RUST_LOG 优先于配置中的过滤规则
pub fn init_tracing(default_filter: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_filter))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
}

/// 安装全局 Prometheus 记录器，返回用于渲染 /metrics 的句柄
pub fn init_metrics() -> Result<PrometheusHandle, Box<dyn std::error::Error + Send + Sync>> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    PrometheusObserver::describe();
    metrics::describe_counter!("http_requests_total", "Total number of HTTP requests by route and outcome");
    metrics::describe_counter!("grpc_requests_total", "Total number of gRPC requests by method and outcome");
    Ok(handle)
}
