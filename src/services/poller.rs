use std::collections::BTreeSet;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use super::registry::{
    BackendError, InstanceSet, RegistryBackend, RegistryInstance, RegistrySnapshot, ServiceCatalog,
    collect_instances,
};
use super::snapshot::SnapshotStore;
use crate::config::PollerConfig;

/// 一轮轮询的结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollReport {
    /// 本轮发布的新版本；注册表无变化时为 `None`
    pub version: Option<u64>,
    /// 本轮看到的服务数
    pub services: usize,
    /// 实例查询失败、本轮按空集合处理的服务
    pub failed_lookups: Vec<String>,
}

/// 定期从后端拉取注册表并发布到 [`SnapshotStore`]
#[derive(Clone)]
pub struct BackendPoller {
    backend: Arc<dyn RegistryBackend>,
    store: Arc<SnapshotStore>,
    config: PollerConfig,
}

impl BackendPoller {
    pub fn new(
        backend: Arc<dyn RegistryBackend>,
        store: Arc<SnapshotStore>,
        config: PollerConfig,
    ) -> Self {
        Self {
            backend,
            store,
            config,
        }
    }

    /// 执行一轮拉取
    ///
    /// 列服务失败时返回错误且不触碰存储，保留上一份快照；
    /// 单个服务的实例查询失败只记录日志，该服务本轮视为没有实例。
    pub async fn poll_once(&self) -> Result<PollReport, BackendError> {
        let names: BTreeSet<String> = match self.backend.list_services().await {
            Ok(names) => names.into_iter().collect(),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    current_version = self.store.version(),
                    "Registry backend unavailable, keeping last known snapshot"
                );
                return Err(e);
            }
        };

        let lookup_timeout = self.config.lookup_timeout();
        let lookups: Vec<(String, Result<Vec<RegistryInstance>, BackendError>)> =
            stream::iter(names)
                .map(|name| {
                    let backend = self.backend.clone();
                    async move {
                        let lookup = backend.list_instances(&name);
                        let result = match tokio::time::timeout(lookup_timeout, lookup).await {
                            Ok(result) => result,
                            Err(_) => Err(BackendError::LookupTimeout {
                                service: name.clone(),
                            }),
                        };
                        (name, result)
                    }
                })
                .buffer_unordered(self.config.lookup_concurrency)
                .collect()
                .await;

        let mut services = ServiceCatalog::new();
        let mut failed_lookups = Vec::new();
        for (name, result) in lookups {
            let instances: InstanceSet = match result {
                Ok(instances) => collect_instances(instances),
                Err(e) => {
                    tracing::warn!(
                        service_name = %name,
                        error = %e,
                        "Instance lookup failed, treating service as empty for this cycle"
                    );
                    failed_lookups.push(name.clone());
                    InstanceSet::new()
                }
            };
            services.insert(name, instances);
        }
        failed_lookups.sort();

        let service_count = services.len();
        let version = self.store.publish(RegistrySnapshot::capture(services));

        tracing::debug!(
            services = service_count,
            failed_lookups = failed_lookups.len(),
            published = ?version,
            "Poll cycle completed"
        );

        Ok(PollReport {
            version,
            services: service_count,
            failed_lookups,
        })
    }

    /// 在 `tracker` 上启动后台轮询，`token` 取消时退出
    pub fn spawn(self, tracker: &TaskTracker, token: CancellationToken) {
        tracker.spawn(async move { self.run(token).await });
    }

    async fn run(self, token: CancellationToken) {
        let notifier = self
            .backend
            .change_notifier()
            .unwrap_or_else(|| Arc::new(Notify::new()));
        let mut interval = tokio::time::interval(self.config.interval());
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        tracing::info!(
            interval_secs = self.config.interval_secs,
            "Backend poller started"
        );

        loop {
            // 第一次 tick 立即完成，启动后马上拉取一次
            tokio::select! {
                _ = token.cancelled() => break,
                _ = interval.tick() => {}
                _ = notifier.notified() => {
                    tracing::debug!("Backend change notification received");
                    interval.reset();
                }
            }

            // 失败已在 poll_once 中记录，下一轮重试
            let _ = self.poll_once().await;
        }

        tracing::info!("Backend poller stopped");
    }
}
