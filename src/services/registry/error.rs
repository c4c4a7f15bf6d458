use std::fmt;

use super::types::RegistryOp;
use crate::storage::StorageError;

/// 出错时所处的阶段，写入错误信息方便排查
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Lookup,
    Persist,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Lookup => f.write_str("store lookup"),
            Stage::Persist => f.write_str("store persist"),
        }
    }
}

/// 注册表错误类型
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Backend unavailable during {stage} for service '{service_name}': {source}")]
    BackendUnavailable {
        service_name: String,
        stage: Stage,
        #[source]
        source: StorageError,
    },
    #[error("Service not found: {0}")]
    ServiceNotFound(String),
    #[error("Membership check failed: endpoint '{endpoint}' not found in service '{service_name}'")]
    EndpointNotFound {
        service_name: String,
        endpoint: String,
    },
    #[error("Membership check failed: endpoint '{endpoint}' already exists in service '{service_name}'")]
    DuplicateEndpoint {
        service_name: String,
        endpoint: String,
    },
    #[error("Failed to decode endpoint list for service '{service_name}': {source}")]
    Decode {
        service_name: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid operation: '{0}', expected 'add' or 'delete'")]
    InvalidOperation(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Failed to {operation} after {attempts} attempts: {source}")]
    RetryExhausted {
        operation: RegistryOp,
        attempts: usize,
        #[source]
        source: Box<RegistryError>,
    },
    #[error("Registry {operation} cancelled")]
    Cancelled { operation: RegistryOp },
}

impl RegistryError {
    pub(crate) fn backend(service_name: &str, stage: Stage, source: StorageError) -> Self {
        Self::BackendUnavailable {
            service_name: service_name.to_string(),
            stage,
            source,
        }
    }

    /// 只有后端的瞬时故障值得重试，其余错误重试也不会改变结果
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::BackendUnavailable { .. })
    }

    /// 去掉重试包装后的底层错误
    pub fn root(&self) -> &RegistryError {
        match self {
            Self::RetryExhausted { source, .. } => source.root(),
            other => other,
        }
    }
}
