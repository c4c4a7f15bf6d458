use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::error::RegistryError;
use super::metrics::{NoopObserver, RegistryObserver};
use super::types::{Endpoint, Operation, Registry, RegistryOp};

/// 哪些错误需要重试
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryPolicy {
    /// 只重试后端瞬时故障，逻辑错误立即返回
    #[default]
    TransientOnly,
    /// 任何错误都重试，直到次数耗尽
    AllErrors,
}

impl RetryPolicy {
    pub fn should_retry(&self, error: &RegistryError) -> bool {
        match self {
            RetryPolicy::TransientOnly => error.is_retryable(),
            RetryPolicy::AllErrors => !matches!(error, RegistryError::Cancelled { .. }),
        }
    }
}

/// 重试配置
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// 最大尝试次数（包含第一次），至少为 1
    pub max_attempts: usize,
    /// 两次尝试之间的等待时间
    pub backoff: Duration,
    pub policy: RetryPolicy,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            backoff: Duration::ZERO,
            policy: RetryPolicy::default(),
        }
    }
}

/// 有界重试装饰器，包装任意 `Registry`
///
/// 每次可重试的失败都会上报一次 `retry_attempt`，次数耗尽时上报 `retry_exhausted`
/// 并返回 `RegistryError::RetryExhausted`。取消令牌在每次尝试前以及等待期间检查。
#[derive(Debug)]
pub struct RetryingRegistry<R> {
    inner: R,
    config: RetryConfig,
    observer: Arc<dyn RegistryObserver>,
    shutdown: CancellationToken,
}

impl<R: Registry> RetryingRegistry<R> {
    pub fn new(inner: R, config: RetryConfig) -> Self {
        Self {
            inner,
            config,
            observer: Arc::new(NoopObserver),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn RegistryObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// 绑定外部取消信号（例如服务关闭），取消后不再发起新的尝试
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    async fn run<T, F, Fut>(&self, operation: RegistryOp, mut call: F) -> Result<T, RegistryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RegistryError>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            if self.shutdown.is_cancelled() {
                return Err(RegistryError::Cancelled { operation });
            }

            attempt += 1;
            let error = match call().await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            if !self.config.policy.should_retry(&error) {
                tracing::debug!(
                    operation = %operation,
                    attempt,
                    error = %error,
                    "Registry error is not retryable"
                );
                return Err(error);
            }

            self.observer.retry_attempt(operation);

            if attempt >= max_attempts {
                self.observer.retry_exhausted(operation);
                tracing::warn!(
                    operation = %operation,
                    attempts = attempt,
                    error = %error,
                    "Registry retries exhausted"
                );
                return Err(RegistryError::RetryExhausted {
                    operation,
                    attempts: attempt,
                    source: Box::new(error),
                });
            }

            tracing::debug!(
                operation = %operation,
                attempt,
                max_attempts,
                error = %error,
                "Registry attempt failed, retrying"
            );

            if !self.config.backoff.is_zero() {
                tokio::select! {
                    _ = self.shutdown.cancelled() => {
                        return Err(RegistryError::Cancelled { operation });
                    }
                    _ = tokio::time::sleep(self.config.backoff) => {}
                }
            }
        }
    }
}

#[async_trait]
impl<R: Registry> Registry for RetryingRegistry<R> {
    async fn resolve(&self, service_name: &str) -> Result<Vec<Endpoint>, RegistryError> {
        self.run(RegistryOp::Resolve, || self.inner.resolve(service_name))
            .await
    }

    async fn register(
        &self,
        service_name: &str,
        operation: Operation,
        endpoint: &str,
    ) -> Result<(), RegistryError> {
        self.run(RegistryOp::Register, || {
            self.inner.register(service_name, operation, endpoint)
        })
        .await
    }
}
