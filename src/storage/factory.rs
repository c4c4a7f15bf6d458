use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;

use super::{EtcdClient, KeyValueClient, MemoryClient, RedisClient, StorageError};
use crate::config::StorageConfig;

pub const MEMORY_STORAGE_TYPE: &str = "memory";
pub const ETCD_STORAGE_TYPE: &str = "etcd";
pub const REDIS_STORAGE_TYPE: &str = "redis";

/// 存储构造函数：根据配置异步创建一个存储客户端
pub type StorageConstructor = Arc<
    dyn Fn(StorageConfig) -> BoxFuture<'static, Result<Arc<dyn KeyValueClient>, StorageError>>
        + Send
        + Sync,
>;

/// 存储类型名 -> 构造函数 的注册表
///
/// 核心逻辑只依赖 `KeyValueClient`，具体后端通过名字在运行时选择。
#[derive(Clone)]
pub struct StorageFactory {
    constructors: Arc<DashMap<String, StorageConstructor>>,
}

impl std::fmt::Debug for StorageFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageFactory")
            .field("storage_types", &self.storage_types())
            .finish()
    }
}

impl StorageFactory {
    /// 创建空注册表
    pub fn new() -> Self {
        Self {
            constructors: Arc::new(DashMap::new()),
        }
    }

    /// 创建并注册内置的 memory、etcd 与 redis 后端
    pub fn with_defaults() -> Self {
        let factory = Self::new();

        factory.register(MEMORY_STORAGE_TYPE, |_config| {
            Box::pin(async move {
                tracing::info!("Building memory storage");
                Ok::<Arc<dyn KeyValueClient>, StorageError>(Arc::new(MemoryClient::new()))
            })
        });

        factory.register(ETCD_STORAGE_TYPE, |config| {
            Box::pin(async move {
                tracing::info!(endpoints = ?config.etcd_endpoints, "Building etcd storage");
                let client = EtcdClient::connect(config.etcd_endpoints).await?;
                Ok::<Arc<dyn KeyValueClient>, StorageError>(Arc::new(client))
            })
        });

        factory.register(REDIS_STORAGE_TYPE, |config| {
            Box::pin(async move {
                tracing::info!(url = %config.redis_url, "Building redis storage");
                let client = RedisClient::connect(&config.redis_url).await?;
                Ok::<Arc<dyn KeyValueClient>, StorageError>(Arc::new(client))
            })
        });

        factory
    }

    /// 注册（或替换）一种存储类型
    pub fn register<F>(&self, storage_type: &str, constructor: F)
    where
        F: Fn(StorageConfig) -> BoxFuture<'static, Result<Arc<dyn KeyValueClient>, StorageError>>
            + Send
            + Sync
            + 'static,
    {
        if self
            .constructors
            .insert(storage_type.to_string(), Arc::new(constructor))
            .is_some()
        {
            tracing::warn!(storage_type = %storage_type, "Replaced existing storage constructor");
        }
    }

    /// 已注册的存储类型（排序后返回）
    pub fn storage_types(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .constructors
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    /// 按配置中的存储类型构建客户端
    pub async fn build(&self, config: &StorageConfig) -> Result<Arc<dyn KeyValueClient>, StorageError> {
        // 先克隆出构造函数，避免跨 await 持有 DashMap 的引用
        let constructor = self
            .constructors
            .get(&config.storage_type)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StorageError::UnknownBackend(config.storage_type.clone()))?;

        constructor(config.clone()).await
    }
}

impl Default for StorageFactory {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage_config(storage_type: &str) -> StorageConfig {
        StorageConfig {
            storage_type: storage_type.to_string(),
            ..StorageConfig::default()
        }
    }

    #[test]
    fn defaults_register_builtin_backends() {
        let factory = StorageFactory::with_defaults();
        assert_eq!(factory.storage_types(), vec!["etcd", "memory", "redis"]);
    }

    #[tokio::test]
    async fn builds_memory_client() {
        let factory = StorageFactory::with_defaults();
        let client = factory.build(&storage_config("memory")).await.unwrap();
        client.create("svc", "10.0.0.1:80").await.unwrap();
        assert_eq!(client.get("svc").await.unwrap(), r#"["10.0.0.1:80"]"#);
    }

    #[tokio::test]
    async fn unknown_storage_type_is_rejected() {
        let factory = StorageFactory::with_defaults();
        let err = factory.build(&storage_config("dynamodb")).await.unwrap_err();
        assert!(matches!(err, StorageError::UnknownBackend(name) if name == "dynamodb"));
    }

    #[tokio::test]
    async fn redis_with_bad_url_is_unavailable() {
        let factory = StorageFactory::with_defaults();
        let config = StorageConfig {
            redis_url: "not a redis url".to_string(),
            ..storage_config("redis")
        };
        let err = factory.build(&config).await.unwrap_err();
        assert!(matches!(err, StorageError::Unavailable { .. }));
    }

    #[tokio::test]
    async fn custom_constructor_can_be_registered() {
        let factory = StorageFactory::new();
        factory.register("custom", |_config| {
            Box::pin(async move {
                Ok::<Arc<dyn KeyValueClient>, StorageError>(Arc::new(MemoryClient::new()))
            })
        });

        assert_eq!(factory.storage_types(), vec!["custom"]);
        assert!(factory.build(&storage_config("custom")).await.is_ok());
        assert!(factory.build(&storage_config("memory")).await.is_err());
    }
}
