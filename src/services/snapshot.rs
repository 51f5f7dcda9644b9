use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use super::registry::RegistrySnapshot;

/// 持有当前注册表快照及其版本号的存储
///
/// 基于 `tokio::sync::watch`：发布时整体替换 `Arc`，读者永远不会看到半发布的快照；
/// 等待者先订阅再检查版本，所以检查与挂起之间发生的发布不会丢失。
/// 等待者的 future 被丢弃时接收端随之释放，不会残留注册。
#[derive(Debug)]
pub struct SnapshotStore {
    sender: watch::Sender<Arc<RegistrySnapshot>>,
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotStore {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(Arc::new(RegistrySnapshot::empty()));
        Self { sender }
    }

    /// 发布新快照
    ///
    /// 内容与当前快照一致时什么都不做（不升版本、不唤醒）并返回 `None`；
    /// 否则分配 `当前版本 + 1`，唤醒全部等待者，返回新版本号。
    pub fn publish(&self, mut snapshot: RegistrySnapshot) -> Option<u64> {
        let mut published = None;

        self.sender.send_if_modified(|current| {
            // 第一次发布总会生效，哪怕后端为空
            if !current.is_uninitialized() && current.same_content(&snapshot) {
                return false;
            }

            snapshot.version = current.version + 1;
            published = Some(snapshot.version);
            *current = Arc::new(snapshot);
            true
        });

        match published {
            Some(version) => tracing::info!(
                version = version,
                waiters = self.subscriber_count(),
                "Published new registry snapshot"
            ),
            None => tracing::debug!("Registry unchanged, snapshot not republished"),
        }

        published
    }

    /// 当前快照，不阻塞；从未发布过时返回版本为 0 的空快照
    pub fn current(&self) -> Arc<RegistrySnapshot> {
        self.sender.borrow().clone()
    }

    pub fn version(&self) -> u64 {
        self.sender.borrow().version
    }

    /// 阻塞查询的核心
    ///
    /// `since` 与当前版本不同（或为 0）时立即返回；否则挂起直到版本前进或
    /// `max_wait` 到期，返回那一刻的当前快照。
    pub async fn await_change(&self, since: u64, max_wait: Duration) -> Arc<RegistrySnapshot> {
        // 先订阅：订阅时的值被标记为已读，此后的任何发布都会唤醒 changed()
        let mut receiver = self.sender.subscribe();

        let current = receiver.borrow_and_update().clone();
        if since == 0 || current.version != since {
            return current;
        }

        let wait_for_change = async {
            loop {
                if receiver.changed().await.is_err() {
                    break;
                }
                if receiver.borrow_and_update().version != since {
                    break;
                }
            }
        };

        if tokio::time::timeout(max_wait, wait_for_change).await.is_err() {
            tracing::trace!(since = since, "Blocking wait elapsed without change");
        }

        receiver.borrow().clone()
    }

    /// 当前挂起中的等待者数量
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
