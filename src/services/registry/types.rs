use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};
use std::time::SystemTime;

use serde::Deserialize;

// 后端注册表中的单个服务实例
//
// 相等、排序、哈希只看 (service_name, host, port)，同一轮拉取中重复的实例会被集合折叠
#[derive(Debug, Clone)]
pub struct RegistryInstance {
    pub service_name: String,
    pub host: String,
    pub port: u16,
    pub tags: BTreeSet<String>,
    pub metadata: BTreeMap<String, String>,
}

impl RegistryInstance {
    pub fn new(service_name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            service_name: service_name.into(),
            host: host.into(),
            port,
            tags: BTreeSet::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// `host:port`，对外作为实例的稳定标识
    pub fn instance_id(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn key(&self) -> (&str, &str, u16) {
        (&self.service_name, &self.host, self.port)
    }

    // 全字段比较，用于判断快照内容是否发生变化
    fn same_content(&self, other: &Self) -> bool {
        self.key() == other.key() && self.tags == other.tags && self.metadata == other.metadata
    }
}

impl PartialEq for RegistryInstance {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for RegistryInstance {}

impl Hash for RegistryInstance {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl PartialOrd for RegistryInstance {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RegistryInstance {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

// 配置文件 / 注册表文件中描述实例的条目，服务名由外层的键给出
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct InstanceEntry {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl InstanceEntry {
    pub fn into_instance(self, service_name: &str) -> RegistryInstance {
        RegistryInstance {
            service_name: service_name.to_string(),
            host: self.host,
            port: self.port,
            tags: self.tags,
            metadata: self.metadata,
        }
    }
}

pub type InstanceSet = BTreeSet<RegistryInstance>;

/// 折叠重复实例，同一 (service_name, host, port) 保留最先出现的那个
///
/// `BTreeSet::insert` 遇到相等元素时不会替换，`FromIterator` 则会留下最后一个。
pub fn collect_instances<I>(instances: I) -> InstanceSet
where
    I: IntoIterator<Item = RegistryInstance>,
{
    let mut set = InstanceSet::new();
    for instance in instances {
        set.insert(instance);
    }
    set
}

// 服务名 -> 实例集合
pub type ServiceCatalog = BTreeMap<String, InstanceSet>;

/// 某一时刻注册表的不可变视图
///
/// 版本号由 [`SnapshotStore`](crate::services::snapshot::SnapshotStore) 在发布时分配，
/// 0 只属于从未发布过的空快照。
#[derive(Debug, Clone)]
pub struct RegistrySnapshot {
    pub version: u64,
    pub captured_at: SystemTime,
    pub services: ServiceCatalog,
}

impl RegistrySnapshot {
    /// 尚未完成任何一次拉取时的空快照
    pub fn empty() -> Self {
        Self {
            version: 0,
            captured_at: SystemTime::UNIX_EPOCH,
            services: ServiceCatalog::new(),
        }
    }

    /// 以当前时间捕获一份待发布的快照
    pub fn capture(services: ServiceCatalog) -> Self {
        Self {
            version: 0,
            captured_at: SystemTime::now(),
            services,
        }
    }

    pub fn is_uninitialized(&self) -> bool {
        self.version == 0
    }

    pub fn instances(&self, service_name: &str) -> Option<&InstanceSet> {
        self.services.get(service_name)
    }

    pub fn service_names(&self) -> impl Iterator<Item = &str> {
        self.services.keys().map(String::as_str)
    }

    pub fn instance_count(&self) -> usize {
        self.services.values().map(BTreeSet::len).sum()
    }

    /// 逐服务、逐实例、逐字段比较两份快照的内容
    pub fn same_content(&self, other: &RegistrySnapshot) -> bool {
        self.services.len() == other.services.len()
            && self
                .services
                .iter()
                .zip(other.services.iter())
                .all(|((name_a, set_a), (name_b, set_b))| {
                    name_a == name_b
                        && set_a.len() == set_b.len()
                        && set_a.iter().zip(set_b.iter()).all(|(a, b)| a.same_content(b))
                })
    }
}

impl Default for RegistrySnapshot {
    fn default() -> Self {
        Self::empty()
    }
}
