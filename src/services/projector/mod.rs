//! View projector
//!
//! Pure mappings from a [`RegistrySnapshot`] to the three response shapes of the
//! Consul read API. No I/O, no locking.
//!
//! Two policies are deliberate: tags are always empty because backends carry no
//! tag model we expose, and every instance reports a single `passing` check because
//! membership in the registry is the only health signal this adapter observes.

pub mod views;

pub use views::{
    CheckStatus, HealthCheck, HealthNode, HealthService, HealthView, InstanceView, ServiceView,
};

use std::collections::{BTreeMap, BTreeSet};

use super::registry::{RegistryInstance, RegistrySnapshot};

// 与 Spring Boot Admin 等 Consul 客户端约定的管理端口元数据键
const MANAGEMENT_PORT_META: &str = "management.port";

/// 服务目录：每个服务名对应空标签集合
pub fn project_catalog(snapshot: &RegistrySnapshot) -> ServiceView {
    snapshot
        .service_names()
        .map(|name| (name.to_string(), BTreeSet::new()))
        .collect()
}

/// 某服务的实例列表，按 (host, port) 排序；未知服务返回空列表
pub fn project_instances(snapshot: &RegistrySnapshot, service_name: &str) -> Vec<InstanceView> {
    instances_of(snapshot, service_name)
        .map(instance_view)
        .collect()
}

/// 某服务的健康列表，每个实例合成一条状态为 passing 的检查
pub fn project_health(snapshot: &RegistrySnapshot, service_name: &str) -> Vec<HealthView> {
    instances_of(snapshot, service_name)
        .map(health_view)
        .collect()
}

fn instances_of<'a>(
    snapshot: &'a RegistrySnapshot,
    service_name: &str,
) -> impl Iterator<Item = &'a RegistryInstance> {
    snapshot
        .instances(service_name)
        .into_iter()
        .flat_map(|set| set.iter())
}

fn instance_view(instance: &RegistryInstance) -> InstanceView {
    let mut service_meta = instance.metadata.clone();
    service_meta
        .entry(MANAGEMENT_PORT_META.to_string())
        .or_insert_with(|| instance.port.to_string());

    InstanceView {
        node: instance.service_name.clone(),
        address: instance.host.clone(),
        service_address: instance.host.clone(),
        service_name: instance.service_name.clone(),
        service_id: instance.instance_id(),
        service_port: instance.port,
        node_meta: BTreeMap::new(),
        service_meta,
        service_tags: Vec::new(),
    }
}

fn health_view(instance: &RegistryInstance) -> HealthView {
    let node = HealthNode {
        node: instance.service_name.clone(),
        address: instance.host.clone(),
        meta: BTreeMap::new(),
    };
    let service = HealthService {
        id: instance.instance_id(),
        service: instance.service_name.clone(),
        tags: Vec::new(),
        address: instance.host.clone(),
        meta: BTreeMap::new(),
        port: instance.port,
    };
    let check = HealthCheck {
        node: node.node.clone(),
        check_id: format!("service:{}", service.id),
        name: format!("Service '{}' check", service.service),
        status: CheckStatus::Passing,
        service_id: service.id.clone(),
        service_name: service.service.clone(),
    };

    HealthView {
        node,
        service,
        checks: vec![check],
    }
}
