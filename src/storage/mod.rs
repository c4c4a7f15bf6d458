//! Storage backend module
//!
//! The registry persists `(service name, endpoint)` associations through a pluggable
//! key-value client:
//! - `codec`: shared JSON encoding of stored values
//! - `error`: storage error types
//! - `memory`: in-process reference client
//! - `etcd`: etcd-backed client
//! - `redis_store`: redis-backed client (sorted set per service)
//! - `factory`: storage type name -> constructor table

pub mod codec;
pub mod error;
pub mod etcd;
pub mod factory;
pub mod memory;
pub mod redis_store;

use async_trait::async_trait;

pub use error::StorageError;
pub use etcd::EtcdClient;
pub use factory::{StorageConstructor, StorageFactory};
pub use memory::MemoryClient;
pub use redis_store::RedisClient;

/// 存储后端契约：每个实现对应一种存储技术，语义必须完全一致
///
/// `get` 返回的序列化格式统一为 JSON 字符串数组，按插入顺序排列。
#[async_trait]
pub trait KeyValueClient: Send + Sync + std::fmt::Debug {
    /// 为 key 新增一条关联；已存在的相同关联保持不变，不会覆盖其它关联
    async fn create(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// 获取 key 下全部关联的序列化表示；没有任何关联时返回 `StorageError::NotFound`
    async fn get(&self, key: &str) -> Result<String, StorageError>;

    /// 精确删除一条 (key, value) 关联；关联不存在时为空操作
    async fn delete(&self, key: &str, value: &str) -> Result<(), StorageError>;
}
