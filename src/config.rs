use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use crate::services::registry::{RetryConfig, RetryPolicy};

const DEFAULT_CONFIG_PATH: &str = "config.toml";
const ENV_PREFIX: &str = "DISCOVERY_";

/// 配置加载错误
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to read environment overrides: {0}")]
    Env(#[from] envy::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub retry: RetrySettings,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub grpc_addr: String,
    pub http_addr: String,
    /// 单个请求的超时时间（毫秒）
    pub request_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            grpc_addr: "0.0.0.0:50051".to_string(),
            http_addr: "0.0.0.0:8080".to_string(),
            request_timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// 存储类型名，对应 `StorageFactory` 中注册的构造函数
    pub storage_type: String,
    pub etcd_endpoints: Vec<String>,
    pub redis_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            storage_type: "memory".to_string(),
            etcd_endpoints: vec!["http://127.0.0.1:2379".to_string()],
            redis_url: "redis://127.0.0.1:6379".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: usize,
    pub backoff_ms: u64,
    /// 为 true 时所有错误都会重试，包括重复端点等逻辑错误
    pub retry_all_errors: bool,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            backoff_ms: 0,
            retry_all_errors: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

/// 配置的实际来源；加载发生在日志初始化之前，由调用方在之后打印
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(String),
    /// 配置文件不存在，使用默认值
    Defaults(String),
}

impl ConfigSource {
    pub fn log(&self) {
        match self {
            ConfigSource::File(path) => tracing::info!(path = %path, "Loaded config file"),
            ConfigSource::Defaults(path) => {
                tracing::warn!(path = %path, "Config file not found, using defaults")
            }
        }
    }
}

// 环境变量覆盖项，例如 DISCOVERY_STORAGE_TYPE=etcd
#[derive(Debug, Default, Deserialize)]
struct EnvOverrides {
    config: Option<String>,
    grpc_addr: Option<String>,
    http_addr: Option<String>,
    request_timeout_ms: Option<u64>,
    storage_type: Option<String>,
    etcd_endpoints: Option<Vec<String>>,
    redis_url: Option<String>,
    max_attempts: Option<usize>,
    backoff_ms: Option<u64>,
    retry_all_errors: Option<bool>,
    log_filter: Option<String>,
}

impl Config {
    /// 加载配置：.env -> 配置文件 -> DISCOVERY_ 前缀的环境变量
    pub fn load() -> Result<(Self, ConfigSource), ConfigError> {
        // .env 文件是可选的
        let _ = dotenvy::dotenv();

        let overrides: EnvOverrides = envy::prefixed(ENV_PREFIX).from_env()?;
        let path = overrides
            .config
            .clone()
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

        let (mut config, source) = Self::from_file(&path)?;
        config.apply_overrides(overrides);
        config.validate()?;
        Ok((config, source))
    }

    /// 从文件读取配置；文件不存在时使用默认值
    pub fn from_file(path: impl AsRef<Path>) -> Result<(Self, ConfigSource), ConfigError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        if !path.exists() {
            return Ok((Self::default(), ConfigSource::Defaults(display)));
        }

        let config_str = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;
        Ok((Self::from_toml_str(&config_str)?, ConfigSource::File(display)))
    }

    pub fn from_toml_str(config_str: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(config_str)?;
        Ok(config)
    }

    fn apply_overrides(&mut self, overrides: EnvOverrides) {
        if let Some(addr) = overrides.grpc_addr {
            self.server.grpc_addr = addr;
        }
        if let Some(addr) = overrides.http_addr {
            self.server.http_addr = addr;
        }
        if let Some(timeout) = overrides.request_timeout_ms {
            self.server.request_timeout_ms = timeout;
        }
        if let Some(storage_type) = overrides.storage_type {
            self.storage.storage_type = storage_type;
        }
        if let Some(endpoints) = overrides.etcd_endpoints {
            self.storage.etcd_endpoints = endpoints;
        }
        if let Some(url) = overrides.redis_url {
            self.storage.redis_url = url;
        }
        if let Some(max_attempts) = overrides.max_attempts {
            self.retry.max_attempts = max_attempts;
        }
        if let Some(backoff) = overrides.backoff_ms {
            self.retry.backoff_ms = backoff;
        }
        if let Some(retry_all) = overrides.retry_all_errors {
            self.retry.retry_all_errors = retry_all;
        }
        if let Some(filter) = overrides.log_filter {
            self.logging.filter = filter;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.server.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "server.request_timeout_ms must be at least 1".to_string(),
            ));
        }
        if self.storage.storage_type.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "storage.storage_type must not be empty".to_string(),
            ));
        }
        self.grpc_addr()?;
        self.http_addr()?;
        Ok(())
    }

    pub fn grpc_addr(&self) -> Result<SocketAddr, ConfigError> {
        parse_addr("server.grpc_addr", &self.server.grpc_addr)
    }

    pub fn http_addr(&self) -> Result<SocketAddr, ConfigError> {
        parse_addr("server.http_addr", &self.server.http_addr)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.server.request_timeout_ms)
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.retry.max_attempts,
            backoff: Duration::from_millis(self.retry.backoff_ms),
            policy: if self.retry.retry_all_errors {
                RetryPolicy::AllErrors
            } else {
                RetryPolicy::TransientOnly
            },
        }
    }
}

fn parse_addr(field: &str, value: &str) -> Result<SocketAddr, ConfigError> {
    value
        .parse()
        .map_err(|e| ConfigError::Invalid(format!("{field} '{value}' is not a socket address: {e}")))
}
