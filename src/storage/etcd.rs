use async_trait::async_trait;
use etcd_client::{Client, GetOptions, SortOrder, SortTarget};
use tokio::sync::Mutex;

use super::codec::encode_values;
use super::{KeyValueClient, StorageError};

/// 基于 etcd 的存储实现
///
/// 每条关联保存为一个独立的 key `/<service>/<endpoint>`，值为空。
/// 服务名中的 `%` 和 `/` 会被百分号转义，保证 `a` 的前缀范围不会包含 `a/b` 的关联。
/// 查询时按前缀读取并按创建版本排序，以保持插入顺序。
pub struct EtcdClient {
    // etcd 客户端句柄，每个实例一把锁串行化访问
    client: Mutex<Client>,
    endpoints: Vec<String>,
}

impl std::fmt::Debug for EtcdClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EtcdClient")
            .field("endpoints", &self.endpoints)
            .finish()
    }
}

impl EtcdClient {
    pub async fn connect(endpoints: Vec<String>) -> Result<Self, StorageError> {
        if endpoints.is_empty() {
            return Err(StorageError::unavailable("no etcd endpoints configured"));
        }

        let client = Client::connect(&endpoints, None)
            .await
            .map_err(|e| StorageError::unavailable(format!("failed to connect to etcd: {e}")))?;

        tracing::info!(endpoints = ?endpoints, "Connected to etcd");

        Ok(Self {
            client: Mutex::new(client),
            endpoints,
        })
    }

    // 转义后的 key 不含 `/`，前缀 `/<key>/` 之后的部分就是完整的值
    fn escape_key(key: &str) -> String {
        let mut escaped = String::with_capacity(key.len());
        for c in key.chars() {
            match c {
                '%' => escaped.push_str("%25"),
                '/' => escaped.push_str("%2F"),
                c => escaped.push(c),
            }
        }
        escaped
    }

    fn prefix(key: &str) -> String {
        format!("/{}/", Self::escape_key(key))
    }

    fn association_key(key: &str, value: &str) -> String {
        format!("{}{value}", Self::prefix(key))
    }

    // 从完整 key 中截取端点部分
    fn value_from_key<'a>(prefix: &str, full_key: &'a str) -> Option<&'a str> {
        full_key.strip_prefix(prefix).filter(|v| !v.is_empty())
    }
}

#[async_trait]
impl KeyValueClient for EtcdClient {
    async fn create(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let association = Self::association_key(key, value);
        let mut client = self.client.lock().await;
        client
            .put(association, "", None)
            .await
            .map_err(|e| StorageError::unavailable(format!("etcd put failed: {e}")))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<String, StorageError> {
        let prefix = Self::prefix(key);
        let options = GetOptions::new()
            .with_prefix()
            .with_sort(SortTarget::Create, SortOrder::Ascend);

        let response = {
            let mut client = self.client.lock().await;
            client
                .get(prefix.as_str(), Some(options))
                .await
                .map_err(|e| StorageError::unavailable(format!("etcd get failed: {e}")))?
        };

        let mut values = Vec::with_capacity(response.kvs().len());
        for kv in response.kvs() {
            let full_key = kv
                .key_str()
                .map_err(|e| StorageError::unavailable(format!("invalid etcd key: {e}")))?;
            if let Some(value) = Self::value_from_key(&prefix, full_key) {
                values.push(value.to_string());
            }
        }

        if values.is_empty() {
            return Err(StorageError::not_found(key));
        }
        Ok(encode_values(&values)?)
    }

    async fn delete(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let association = Self::association_key(key, value);
        let mut client = self.client.lock().await;
        client
            .delete(association, None)
            .await
            .map_err(|e| StorageError::unavailable(format!("etcd delete failed: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn association_key_layout() {
        assert_eq!(EtcdClient::prefix("svc"), "/svc/");
        assert_eq!(
            EtcdClient::association_key("svc", "10.0.0.1:80"),
            "/svc/10.0.0.1:80"
        );
    }

    #[test]
    fn value_is_extracted_from_key() {
        assert_eq!(
            EtcdClient::value_from_key("/svc/", "/svc/10.0.0.1:80"),
            Some("10.0.0.1:80")
        );
        assert_eq!(EtcdClient::value_from_key("/svc/", "/svc/"), None);
        assert_eq!(EtcdClient::value_from_key("/svc/", "/other/x"), None);
    }

    #[test]
    fn nested_service_names_do_not_share_a_prefix() {
        let nested = EtcdClient::association_key("a/b", "10.0.0.1:80");
        assert_eq!(nested, "/a%2Fb/10.0.0.1:80");
        assert!(!nested.starts_with(&EtcdClient::prefix("a")));
        assert_eq!(EtcdClient::value_from_key(&EtcdClient::prefix("a"), &nested), None);
        assert_eq!(
            EtcdClient::value_from_key(&EtcdClient::prefix("a/b"), &nested),
            Some("10.0.0.1:80")
        );
    }

    #[test]
    fn escaping_is_unambiguous() {
        // "a%2Fb" 与 "a/b" 是两个不同的服务
        assert_ne!(EtcdClient::prefix("a%2Fb"), EtcdClient::prefix("a/b"));
        assert_eq!(EtcdClient::prefix("a%2Fb"), "/a%252Fb/");
        assert_eq!(EtcdClient::prefix("svc-1.prod"), "/svc-1.prod/");
    }

    #[tokio::test]
    async fn connect_without_endpoints_fails() {
        let err = EtcdClient::connect(Vec::new()).await.unwrap_err();
        assert!(matches!(err, StorageError::Unavailable { .. }));
    }
}
