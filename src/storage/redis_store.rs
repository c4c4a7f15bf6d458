use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use super::codec::encode_values;
use super::{KeyValueClient, StorageError};

// 所有服务共用的插入序号计数器
const SEQUENCE_KEY: &str = "discovery:seq";
const SERVICE_KEY_PREFIX: &str = "discovery:svc:";

/// 基于 Redis 的存储实现
///
/// 每个服务对应一个有序集合 `discovery:svc:<service>`，成员是端点，分数取自全局递增计数器，
/// 因此 `ZRANGE` 按插入顺序返回。最后一个成员被删除时 Redis 会自动移除该集合。
#[derive(Clone)]
pub struct RedisClient {
    connection: ConnectionManager,
    url: String,
}

impl std::fmt::Debug for RedisClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisClient").field("url", &self.url).finish()
    }
}

impl RedisClient {
    pub async fn connect(url: &str) -> Result<Self, StorageError> {
        let client = redis::Client::open(url)
            .map_err(|e| StorageError::unavailable(format!("invalid redis url '{url}': {e}")))?;
        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| StorageError::unavailable(format!("failed to connect to redis: {e}")))?;

        tracing::info!(url = %url, "Connected to redis");

        Ok(Self {
            connection,
            url: url.to_string(),
        })
    }

    fn service_key(key: &str) -> String {
        format!("{SERVICE_KEY_PREFIX}{key}")
    }
}

fn unavailable(command: &str) -> impl FnOnce(redis::RedisError) -> StorageError + '_ {
    move |e| StorageError::unavailable(format!("redis {command} failed: {e}"))
}

#[async_trait]
impl KeyValueClient for RedisClient {
    async fn create(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let service_key = Self::service_key(key);
        let mut connection = self.connection.clone();

        let sequence: i64 = connection
            .incr(SEQUENCE_KEY, 1)
            .await
            .map_err(unavailable("INCR"))?;

        // NX：已存在的成员保留原来的分数，也就保留了原来的位置
        let added: i64 = redis::cmd("ZADD")
            .arg(&service_key)
            .arg("NX")
            .arg(sequence)
            .arg(value)
            .query_async(&mut connection)
            .await
            .map_err(unavailable("ZADD"))?;

        tracing::trace!(key = %key, value = %value, added, "Redis association created");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<String, StorageError> {
        let mut connection = self.connection.clone();
        let values: Vec<String> = connection
            .zrange(Self::service_key(key), 0, -1)
            .await
            .map_err(unavailable("ZRANGE"))?;

        if values.is_empty() {
            return Err(StorageError::not_found(key));
        }
        Ok(encode_values(&values)?)
    }

    async fn delete(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut connection = self.connection.clone();
        let _removed: i64 = connection
            .zrem(Self::service_key(key), value)
            .await
            .map_err(unavailable("ZREM"))?;
        Ok(())
    }
}
