use std::sync::Arc;
use std::time::Duration;

use super::projector::{self, HealthView, InstanceView, ServiceView};
use super::registry::RegistrySnapshot;
use super::snapshot::SnapshotStore;
use crate::config::QueryConfig;

/// 阻塞查询的响应信封
///
/// `index` 永远是生成 `payload` 所用快照的版本号。
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeResult<T> {
    pub payload: T,
    pub index: u64,
}

/// 请求侧唯一的入口：按 Consul 阻塞查询语义读取注册表
#[derive(Debug, Clone)]
pub struct BlockingQueryEngine {
    store: Arc<SnapshotStore>,
    config: QueryConfig,
}

impl BlockingQueryEngine {
    pub fn new(store: Arc<SnapshotStore>, config: QueryConfig) -> Self {
        Self { store, config }
    }

    /// 等待 `since` 之后的变化（或超时），然后用 `project` 投影拿到的快照
    ///
    /// `since` 为 `None` 或 0 时立即返回；`wait` 为 `None` 时使用默认等待时长，
    /// 并始终被限制在配置的上限之内。
    pub async fn query<T, F>(
        &self,
        since: Option<u64>,
        wait: Option<Duration>,
        project: F,
    ) -> ChangeResult<T>
    where
        F: FnOnce(&RegistrySnapshot) -> T,
    {
        let snapshot = if self.config.blocking {
            let since = since.unwrap_or(0);
            let max_wait = self.effective_wait(wait);
            self.store.await_change(since, max_wait).await
        } else {
            self.store.current()
        };

        ChangeResult {
            payload: project(&snapshot),
            index: snapshot.version,
        }
    }

    pub async fn list_catalog(
        &self,
        since: Option<u64>,
        wait: Option<Duration>,
    ) -> ChangeResult<ServiceView> {
        self.query(since, wait, projector::project_catalog).await
    }

    pub async fn list_instances(
        &self,
        service_name: &str,
        since: Option<u64>,
        wait: Option<Duration>,
    ) -> ChangeResult<Vec<InstanceView>> {
        self.query(since, wait, |snapshot| {
            projector::project_instances(snapshot, service_name)
        })
        .await
    }

    pub async fn list_health(
        &self,
        service_name: &str,
        since: Option<u64>,
        wait: Option<Duration>,
    ) -> ChangeResult<Vec<HealthView>> {
        self.query(since, wait, |snapshot| {
            projector::project_health(snapshot, service_name)
        })
        .await
    }

    fn effective_wait(&self, wait: Option<Duration>) -> Duration {
        wait.unwrap_or_else(|| self.config.default_wait())
            .min(self.config.max_wait())
    }
}
