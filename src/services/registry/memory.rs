use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Notify;

use super::backend::{BackendError, RegistryBackend};
use super::types::{InstanceEntry, RegistryInstance};

// 实例ID (host:port) -> 实例
pub type ServiceInstances = Arc<DashMap<String, RegistryInstance>>;

/// 进程内的注册表后端（服务名 -> 服务实例集合）
///
/// 每次变更都会唤醒 [`change_notifier`](RegistryBackend::change_notifier)，
/// 让轮询器不必等到下一个周期。
#[derive(Debug, Clone, Default)]
pub struct InMemoryRegistry {
    services: Arc<DashMap<String, ServiceInstances>>,
    notify: Arc<Notify>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 用配置中的静态服务列表初始化
    pub fn from_entries(entries: &BTreeMap<String, Vec<InstanceEntry>>) -> Self {
        let registry = Self::new();
        for (service_name, instances) in entries {
            registry.add_service(service_name);
            for entry in instances {
                registry.register(entry.clone().into_instance(service_name));
            }
        }
        registry
    }

    /// 声明一个服务（可以没有实例）
    pub fn add_service(&self, service_name: &str) {
        self.services
            .entry(service_name.to_string())
            .or_insert_with(|| Arc::new(DashMap::new()));
        self.notify.notify_one();
    }

    /// 注册实例，同一 host:port 的旧实例会被替换
    pub fn register(&self, instance: RegistryInstance) {
        let instances = self
            .services
            .entry(instance.service_name.clone())
            .or_insert_with(|| Arc::new(DashMap::new()))
            .clone();

        tracing::info!(
            service_name = %instance.service_name,
            instance_id = %instance.instance_id(),
            "Registering instance"
        );
        instances.insert(instance.instance_id(), instance);
        self.notify.notify_one();
    }

    /// 注销实例，返回是否确实移除了
    pub fn deregister(&self, service_name: &str, instance_id: &str) -> bool {
        let removed = self
            .services
            .get(service_name)
            .map(|entry| entry.value().clone())
            .and_then(|instances| instances.remove(instance_id))
            .is_some();

        if removed {
            tracing::info!(
                service_name = %service_name,
                instance_id = %instance_id,
                "Deregistered instance"
            );
            self.notify.notify_one();
        }
        removed
    }

    /// 移除整个服务
    pub fn remove_service(&self, service_name: &str) -> bool {
        if self.services.remove(service_name).is_some() {
            tracing::info!(service_name = %service_name, "Removed service");
            self.notify.notify_one();
            true
        } else {
            false
        }
    }
}

#[async_trait]
impl RegistryBackend for InMemoryRegistry {
    async fn list_services(&self) -> Result<Vec<String>, BackendError> {
        Ok(self.services.iter().map(|entry| entry.key().clone()).collect())
    }

    async fn list_instances(
        &self,
        service_name: &str,
    ) -> Result<Vec<RegistryInstance>, BackendError> {
        // 先克隆出内层 map，避免在遍历时持有外层分片锁
        let instances = match self.services.get(service_name) {
            Some(entry) => entry.value().clone(),
            None => return Ok(Vec::new()),
        };

        Ok(instances.iter().map(|entry| entry.value().clone()).collect())
    }

    fn change_notifier(&self) -> Option<Arc<Notify>> {
        Some(self.notify.clone())
    }
}
