use std::sync::atomic::{AtomicU64, Ordering};

use super::types::{Outcome, RegistryOp};

pub const RETRY_ATTEMPTS_TOTAL: &str = "registry_retry_attempts_total";
pub const RETRY_EXHAUSTED_TOTAL: &str = "registry_retry_exhausted_total";
pub const OPERATIONS_TOTAL: &str = "registry_operations_total";

/// 注册表事件观察者，在构造时注入，避免进程级全局计数器
pub trait RegistryObserver: Send + Sync + std::fmt::Debug {
    /// 某次尝试失败（之后可能重试，也可能耗尽）
    fn retry_attempt(&self, _operation: RegistryOp) {}

    /// 重试次数耗尽
    fn retry_exhausted(&self, _operation: RegistryOp) {}

    /// 一次注册表操作完成
    fn operation_completed(&self, _operation: RegistryOp, _outcome: Outcome) {}
}

/// 不记录任何事件
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl RegistryObserver for NoopObserver {}

/// 通过 `metrics` 门面上报的观察者，由 Prometheus 导出器渲染
#[derive(Debug, Default, Clone, Copy)]
pub struct PrometheusObserver;

impl PrometheusObserver {
    pub fn describe() {
        metrics::describe_counter!(
            RETRY_ATTEMPTS_TOTAL,
            "Total number of failed registry attempts seen by the retry handler"
        );
        metrics::describe_counter!(
            RETRY_EXHAUSTED_TOTAL,
            "Total number of registry operations that exhausted their retries"
        );
        metrics::describe_counter!(
            OPERATIONS_TOTAL,
            "Total number of registry operations by outcome"
        );
    }
}

impl RegistryObserver for PrometheusObserver {
    fn retry_attempt(&self, operation: RegistryOp) {
        metrics::counter!(RETRY_ATTEMPTS_TOTAL, "operation" => operation.as_str()).increment(1);
    }

    fn retry_exhausted(&self, operation: RegistryOp) {
        metrics::counter!(RETRY_EXHAUSTED_TOTAL, "operation" => operation.as_str()).increment(1);
    }

    fn operation_completed(&self, operation: RegistryOp, outcome: Outcome) {
        metrics::counter!(
            OPERATIONS_TOTAL,
            "operation" => operation.as_str(),
            "outcome" => outcome.as_str()
        )
        .increment(1);
    }
}

/// 基于原子计数的观察者，每个实例独立计数
#[derive(Debug, Default)]
pub struct CounterObserver {
    resolve_retry_attempts: AtomicU64,
    resolve_retry_exhausted: AtomicU64,
    register_retry_attempts: AtomicU64,
    register_retry_exhausted: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
}

/// 计数快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub resolve_retry_attempts: u64,
    pub resolve_retry_exhausted: u64,
    pub register_retry_attempts: u64,
    pub register_retry_exhausted: u64,
    pub successes: u64,
    pub failures: u64,
}

impl CounterObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            resolve_retry_attempts: self.resolve_retry_attempts.load(Ordering::Relaxed),
            resolve_retry_exhausted: self.resolve_retry_exhausted.load(Ordering::Relaxed),
            register_retry_attempts: self.register_retry_attempts.load(Ordering::Relaxed),
            register_retry_exhausted: self.register_retry_exhausted.load(Ordering::Relaxed),
            successes: self.successes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }

    pub fn retry_attempts(&self, operation: RegistryOp) -> u64 {
        match operation {
            RegistryOp::Resolve => self.resolve_retry_attempts.load(Ordering::Relaxed),
            RegistryOp::Register => self.register_retry_attempts.load(Ordering::Relaxed),
        }
    }

    pub fn retry_exhausted_count(&self, operation: RegistryOp) -> u64 {
        match operation {
            RegistryOp::Resolve => self.resolve_retry_exhausted.load(Ordering::Relaxed),
            RegistryOp::Register => self.register_retry_exhausted.load(Ordering::Relaxed),
        }
    }
}

impl RegistryObserver for CounterObserver {
    fn retry_attempt(&self, operation: RegistryOp) {
        let counter = match operation {
            RegistryOp::Resolve => &self.resolve_retry_attempts,
            RegistryOp::Register => &self.register_retry_attempts,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn retry_exhausted(&self, operation: RegistryOp) {
        let counter = match operation {
            RegistryOp::Resolve => &self.resolve_retry_exhausted,
            RegistryOp::Register => &self.register_retry_exhausted,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn operation_completed(&self, _operation: RegistryOp, outcome: Outcome) {
        match outcome {
            Outcome::Success => self.successes.fetch_add(1, Ordering::Relaxed),
            Outcome::Failure => self.failures.fetch_add(1, Ordering::Relaxed),
        };
    }
}
