use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::codec::encode_values;
use super::{KeyValueClient, StorageError};

/// 基于进程内存的存储实现，主要用于开发和测试
///
/// 每个 key 下的值按插入顺序保存；删除最后一个值时整个 key 被移除。
#[derive(Debug, Default)]
pub struct MemoryClient {
    // 服务名 -> 端点列表（保持插入顺序）
    data: Mutex<HashMap<String, Vec<String>>>,
}

impl MemoryClient {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueClient for MemoryClient {
    async fn create(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut data = self.data.lock().map_err(|_| StorageError::Lock)?;
        let values = data.entry(key.to_string()).or_default();
        if !values.iter().any(|v| v == value) {
            values.push(value.to_string());
        }
        tracing::trace!(key = %key, value = %value, "Memory association created");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<String, StorageError> {
        let data = self.data.lock().map_err(|_| StorageError::Lock)?;
        let values = data.get(key).ok_or_else(|| StorageError::not_found(key))?;
        Ok(encode_values(values)?)
    }

    async fn delete(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut data = self.data.lock().map_err(|_| StorageError::Lock)?;
        let Some(values) = data.get_mut(key) else {
            return Ok(());
        };
        values.retain(|v| v != value);
        if values.is_empty() {
            data.remove(key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_new_key_keeps_insertion_order() {
        let client = MemoryClient::new();
        client.create("dummy-service", "192.0.0.1").await.unwrap();
        assert_eq!(client.get("dummy-service").await.unwrap(), r#"["192.0.0.1"]"#);

        client.create("dummy-service", "192.0.0.2").await.unwrap();
        assert_eq!(
            client.get("dummy-service").await.unwrap(),
            r#"["192.0.0.1","192.0.0.2"]"#
        );
    }

    #[tokio::test]
    async fn insert_existing_value_is_noop() {
        let client = MemoryClient::new();
        client.create("dummy-service", "192.0.0.1").await.unwrap();
        client.create("dummy-service", "192.0.0.1").await.unwrap();
        assert_eq!(client.get("dummy-service").await.unwrap(), r#"["192.0.0.1"]"#);
    }

    #[tokio::test]
    async fn delete_only_value_drops_key() {
        let client = MemoryClient::new();
        client.create("dummy-service", "192.0.0.1").await.unwrap();
        client.delete("dummy-service", "192.0.0.1").await.unwrap();

        let err = client.get("dummy-service").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn delete_keeps_remaining_values() {
        let client = MemoryClient::new();
        client.create("dummy-service", "192.0.0.1").await.unwrap();
        client.create("dummy-service", "192.0.0.2").await.unwrap();
        client.create("dummy-service", "192.0.0.3").await.unwrap();
        client.delete("dummy-service", "192.0.0.2").await.unwrap();

        assert_eq!(
            client.get("dummy-service").await.unwrap(),
            r#"["192.0.0.1","192.0.0.3"]"#
        );
    }

    #[tokio::test]
    async fn delete_missing_key_is_noop() {
        let client = MemoryClient::new();
        client.delete("dummy-service", "192.0.0.1").await.unwrap();
        assert!(client.get("dummy-service").await.unwrap_err().is_not_found());
    }
}
