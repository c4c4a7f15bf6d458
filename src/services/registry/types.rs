use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;

use super::error::RegistryError;

/// `host:port` 形式的端点字符串，注册表不做规范化
pub type Endpoint = String;

/// 注册操作类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Add,
    Delete,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Add => "add",
            Operation::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "add" => Ok(Operation::Add),
            "delete" => Ok(Operation::Delete),
            _ => Err(RegistryError::InvalidOperation(s.to_string())),
        }
    }
}

/// 注册表对外暴露的操作，用于指标标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistryOp {
    Resolve,
    Register,
}

impl RegistryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistryOp::Resolve => "resolve",
            RegistryOp::Register => "register",
        }
    }
}

impl fmt::Display for RegistryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 单次操作的结果分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Success,
    Failure,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Failure => "failure",
        }
    }
}

/// 服务注册表契约，协议适配层只依赖这个 trait
#[async_trait]
pub trait Registry: Send + Sync + fmt::Debug {
    /// 查询服务当前的端点列表（按插入顺序）
    async fn resolve(&self, service_name: &str) -> Result<Vec<Endpoint>, RegistryError>;

    /// 为服务添加或删除一个端点
    async fn register(
        &self,
        service_name: &str,
        operation: Operation,
        endpoint: &str,
    ) -> Result<(), RegistryError>;
}

#[async_trait]
impl<T> Registry for std::sync::Arc<T>
where
    T: Registry + ?Sized,
{
    async fn resolve(&self, service_name: &str) -> Result<Vec<Endpoint>, RegistryError> {
        (**self).resolve(service_name).await
    }

    async fn register(
        &self,
        service_name: &str,
        operation: Operation,
        endpoint: &str,
    ) -> Result<(), RegistryError> {
        (**self).register(service_name, operation, endpoint).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_parses_case_insensitively() {
        assert_eq!("add".parse::<Operation>().unwrap(), Operation::Add);
        assert_eq!("DELETE".parse::<Operation>().unwrap(), Operation::Delete);
        assert_eq!(" Add ".parse::<Operation>().unwrap(), Operation::Add);
    }

    #[test]
    fn unknown_operation_is_rejected() {
        let err = "invalid-operation".parse::<Operation>().unwrap_err();
        assert!(matches!(err, RegistryError::InvalidOperation(op) if op == "invalid-operation"));
    }

    #[test]
    fn operation_display_round_trips() {
        for op in [Operation::Add, Operation::Delete] {
            assert_eq!(op.to_string().parse::<Operation>().unwrap(), op);
        }
    }
}
