use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::RwLock;

use super::backend::{BackendError, RegistryBackend};
use super::types::{InstanceEntry, RegistryInstance};

// 注册表文件格式:
//
// [services]
// orders = [{ host = "10.0.0.1", port = 8080 }]
// billing = []
#[derive(Debug, Clone, Default, Deserialize)]
struct RegistryDocument {
    #[serde(default)]
    services: BTreeMap<String, Vec<InstanceEntry>>,
}

/// 基于 TOML 文件的注册表后端
///
/// `list_services` 每次都会重新读取文件，`list_instances` 使用同一轮读到的内容，
/// 保证一个轮询周期内看到的是同一份文件。
#[derive(Debug)]
pub struct FileRegistry {
    path: PathBuf,
    document: RwLock<RegistryDocument>,
}

impl FileRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            document: RwLock::new(RegistryDocument::default()),
        }
    }

    async fn load(&self) -> Result<RegistryDocument, BackendError> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| BackendError::Io {
                path: self.path.display().to_string(),
                source,
            })?;
        Ok(toml::from_str(&content)?)
    }
}

#[async_trait]
impl RegistryBackend for FileRegistry {
    async fn list_services(&self) -> Result<Vec<String>, BackendError> {
        let document = self.load().await.map_err(|e| BackendError::Unavailable {
            reason: e.to_string(),
        })?;
        let names = document.services.keys().cloned().collect();

        *self.document.write().await = document;
        Ok(names)
    }

    async fn list_instances(
        &self,
        service_name: &str,
    ) -> Result<Vec<RegistryInstance>, BackendError> {
        let document = self.document.read().await;
        Ok(document
            .services
            .get(service_name)
            .map(|entries| {
                entries
                    .iter()
                    .cloned()
                    .map(|entry| entry.into_instance(service_name))
                    .collect()
            })
            .unwrap_or_default())
    }
}
