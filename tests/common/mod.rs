#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use discovery_bridge::services::registry::{
    BackendError, RegistryBackend, RegistryInstance, RegistrySnapshot, ServiceCatalog,
    collect_instances,
};

pub fn instance(service_name: &str, host: &str, port: u16) -> RegistryInstance {
    RegistryInstance::new(service_name, host, port)
}

pub fn snapshot(services: &[(&str, Vec<RegistryInstance>)]) -> RegistrySnapshot {
    let catalog: ServiceCatalog = services
        .iter()
        .map(|(name, instances)| {
            let set = collect_instances(instances.iter().cloned());
            (name.to_string(), set)
        })
        .collect();
    RegistrySnapshot::capture(catalog)
}

// 可编排失败的测试后端
#[derive(Default)]
pub struct ScriptedBackend {
    services: Mutex<Option<Vec<String>>>,
    instances: Mutex<HashMap<String, Result<Vec<RegistryInstance>, String>>>,
    slow: Mutex<HashMap<String, Duration>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self {
            services: Mutex::new(Some(Vec::new())),
            ..Default::default()
        }
    }

    pub fn set_service(&self, name: &str, instances: Vec<RegistryInstance>) {
        let mut services = self.services.lock().unwrap();
        let names = services.get_or_insert_with(Vec::new);
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
        self.instances
            .lock()
            .unwrap()
            .insert(name.to_string(), Ok(instances));
    }

    pub fn fail_lookup(&self, name: &str, reason: &str) {
        self.instances
            .lock()
            .unwrap()
            .insert(name.to_string(), Err(reason.to_string()));
    }

    pub fn slow_lookup(&self, name: &str, delay: Duration) {
        self.slow.lock().unwrap().insert(name.to_string(), delay);
    }

    pub fn set_unavailable(&self) {
        *self.services.lock().unwrap() = None;
    }

    pub fn set_raw_service_names(&self, names: Vec<String>) {
        *self.services.lock().unwrap() = Some(names);
    }
}

#[async_trait]
impl RegistryBackend for ScriptedBackend {
    async fn list_services(&self) -> Result<Vec<String>, BackendError> {
        self.services
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| BackendError::Unavailable {
                reason: "connection refused".to_string(),
            })
    }

    async fn list_instances(
        &self,
        service_name: &str,
    ) -> Result<Vec<RegistryInstance>, BackendError> {
        let delay = self.slow.lock().unwrap().get(service_name).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match self.instances.lock().unwrap().get(service_name) {
            Some(Ok(instances)) => Ok(instances.clone()),
            Some(Err(reason)) => Err(BackendError::LookupFailed {
                service: service_name.to_string(),
                reason: reason.clone(),
            }),
            None => Ok(Vec::new()),
        }
    }
}
