/// 存储后端错误类型
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Key not found: {key}")]
    NotFound { key: String },
    #[error("Storage backend unavailable: {message}")]
    Unavailable { message: String },
    #[error("Storage lock poisoned")]
    Lock,
    #[error("Failed to encode stored values: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("Unknown storage type: {0}")]
    UnknownBackend(String),
}

impl StorageError {
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    pub fn unavailable(message: impl std::fmt::Display) -> Self {
        Self::Unavailable {
            message: message.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
