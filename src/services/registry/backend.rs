use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Notify;

use super::types::RegistryInstance;

/// 注册表后端错误类型
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Registry backend unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Instance lookup failed for service {service}: {reason}")]
    LookupFailed { service: String, reason: String },

    #[error("Instance lookup timed out for service: {service}")]
    LookupTimeout { service: String },

    #[error("Failed to read registry file '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse registry file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// 后端服务注册表需要提供的能力
///
/// 任何能列出服务名和服务实例的系统都可以实现它。
#[async_trait]
pub trait RegistryBackend: Send + Sync {
    /// 列出当前注册的所有服务名
    async fn list_services(&self) -> Result<Vec<String>, BackendError>;

    /// 列出某个服务的全部实例
    async fn list_instances(
        &self,
        service_name: &str,
    ) -> Result<Vec<RegistryInstance>, BackendError>;

    /// 后端状态变化时会被唤醒的通知器，不支持推送的后端返回 `None`
    fn change_notifier(&self) -> Option<Arc<Notify>> {
        None
    }
}
