mod common;

use std::sync::Arc;
use std::time::Duration;

use discovery_bridge::config::PollerConfig;
use discovery_bridge::services::registry::{BackendError, FileRegistry, InMemoryRegistry};
use discovery_bridge::services::{BackendPoller, SnapshotStore};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use common::{ScriptedBackend, instance};

fn poller_config() -> PollerConfig {
    PollerConfig {
        interval_secs: 3600,
        lookup_concurrency: 4,
        lookup_timeout_secs: 1,
    }
}

#[tokio::test]
async fn test_poll_publishes_services_and_instances() {
    let backend = Arc::new(ScriptedBackend::new());
    backend.set_service("orders", vec![instance("orders", "10.0.0.1", 8080)]);
    backend.set_service("billing", vec![]);

    let store = Arc::new(SnapshotStore::new());
    let poller = BackendPoller::new(backend, store.clone(), poller_config());

    let report = poller.poll_once().await.expect("poll should succeed");
    assert_eq!(report.version, Some(1));
    assert_eq!(report.services, 2);
    assert!(report.failed_lookups.is_empty());

    let current = store.current();
    assert_eq!(current.instances("orders").unwrap().len(), 1);
    assert!(current.instances("billing").unwrap().is_empty());
}

#[tokio::test]
async fn test_unchanged_backend_does_not_bump_version() {
    let backend = Arc::new(ScriptedBackend::new());
    backend.set_service("orders", vec![instance("orders", "10.0.0.1", 8080)]);

    let store = Arc::new(SnapshotStore::new());
    let poller = BackendPoller::new(backend, store.clone(), poller_config());

    assert_eq!(poller.poll_once().await.unwrap().version, Some(1));
    assert_eq!(poller.poll_once().await.unwrap().version, None);
    assert_eq!(store.version(), 1);
}

#[tokio::test]
async fn test_duplicate_names_and_instances_are_collapsed() {
    let backend = Arc::new(ScriptedBackend::new());
    backend.set_service(
        "orders",
        vec![
            instance("orders", "10.0.0.1", 8080),
            instance("orders", "10.0.0.1", 8080),
        ],
    );
    backend.set_raw_service_names(vec!["orders".to_string(), "orders".to_string()]);

    let store = Arc::new(SnapshotStore::new());
    let poller = BackendPoller::new(backend, store.clone(), poller_config());

    let report = poller.poll_once().await.unwrap();
    assert_eq!(report.services, 1);
    assert_eq!(store.current().instance_count(), 1);
}

#[tokio::test]
async fn test_first_duplicate_instance_is_kept() {
    let backend = Arc::new(ScriptedBackend::new());
    backend.set_service(
        "orders",
        vec![
            instance("orders", "10.0.0.1", 8080).with_metadata("zone", "first"),
            instance("orders", "10.0.0.1", 8080).with_metadata("zone", "second"),
            instance("orders", "10.0.0.1", 8080).with_tag("canary"),
        ],
    );

    let store = Arc::new(SnapshotStore::new());
    let poller = BackendPoller::new(backend, store.clone(), poller_config());
    poller.poll_once().await.unwrap();

    let current = store.current();
    let instances = current.instances("orders").unwrap();
    assert_eq!(instances.len(), 1);

    let kept = instances.iter().next().unwrap();
    assert_eq!(kept.metadata.get("zone").map(String::as_str), Some("first"));
    assert!(kept.tags.is_empty());
}

#[tokio::test]
async fn test_partial_lookup_failure_yields_empty_service() {
    let backend = Arc::new(ScriptedBackend::new());
    backend.set_service("orders", vec![instance("orders", "10.0.0.1", 8080)]);
    backend.set_service("billing", vec![instance("billing", "10.0.1.1", 9090)]);
    backend.fail_lookup("billing", "backend returned 503");

    let store = Arc::new(SnapshotStore::new());
    let poller = BackendPoller::new(backend, store.clone(), poller_config());

    let report = poller
        .poll_once()
        .await
        .expect("partial failure must not abort the cycle");
    assert_eq!(report.version, Some(1));
    assert_eq!(report.failed_lookups, vec!["billing".to_string()]);

    let current = store.current();
    assert_eq!(current.instances("orders").unwrap().len(), 1);
    assert!(current.instances("billing").unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_slow_lookup_times_out_as_partial_failure() {
    let backend = Arc::new(ScriptedBackend::new());
    backend.set_service("orders", vec![instance("orders", "10.0.0.1", 8080)]);
    backend.set_service("billing", vec![instance("billing", "10.0.1.1", 9090)]);
    backend.slow_lookup("billing", Duration::from_secs(60));

    let store = Arc::new(SnapshotStore::new());
    let poller = BackendPoller::new(backend, store.clone(), poller_config());

    let report = poller.poll_once().await.unwrap();
    assert_eq!(report.failed_lookups, vec!["billing".to_string()]);
    assert!(store.current().instances("billing").unwrap().is_empty());
}

#[tokio::test]
async fn test_backend_unavailable_keeps_last_known_snapshot() {
    let backend = Arc::new(ScriptedBackend::new());
    backend.set_service("orders", vec![instance("orders", "10.0.0.1", 8080)]);

    let store = Arc::new(SnapshotStore::new());
    let poller = BackendPoller::new(backend.clone(), store.clone(), poller_config());
    poller.poll_once().await.unwrap();
    let before = store.current();

    backend.set_unavailable();
    let result = poller.poll_once().await;
    assert!(matches!(result, Err(BackendError::Unavailable { .. })));

    let after = store.current();
    assert_eq!(after.version, 1);
    assert!(Arc::ptr_eq(&before, &after));
}

#[tokio::test]
async fn test_in_memory_registry_changes_are_picked_up() {
    let registry = Arc::new(InMemoryRegistry::new());
    registry.register(instance("orders", "10.0.0.1", 8080));
    registry.add_service("billing");

    let store = Arc::new(SnapshotStore::new());
    let poller = BackendPoller::new(registry.clone(), store.clone(), poller_config());
    poller.poll_once().await.unwrap();
    assert_eq!(store.current().service_names().count(), 2);

    assert!(registry.deregister("orders", "10.0.0.1:8080"));
    assert!(!registry.deregister("orders", "10.0.0.1:8080"));
    assert!(registry.remove_service("billing"));

    let report = poller.poll_once().await.unwrap();
    assert_eq!(report.version, Some(2));
    let current = store.current();
    assert!(current.instances("orders").unwrap().is_empty());
    assert!(current.instances("billing").is_none());
}

#[tokio::test]
async fn test_push_notification_triggers_poll_before_interval() {
    let registry = Arc::new(InMemoryRegistry::new());
    registry.register(instance("orders", "10.0.0.1", 8080));

    let store = Arc::new(SnapshotStore::new());
    let tracker = TaskTracker::new();
    let token = CancellationToken::new();
    BackendPoller::new(registry.clone(), store.clone(), poller_config())
        .spawn(&tracker, token.clone());

    // 启动后立即拉取一次
    timeout(Duration::from_secs(5), async {
        while store.version() == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("Timeout waiting for initial poll");
    let version = store.version();

    registry.register(instance("orders", "10.0.0.2", 8080));

    // 轮询间隔是一小时，只有推送通知能让它在这里返回新版本
    let snapshot = store.await_change(version, Duration::from_secs(5)).await;
    assert!(snapshot.version > version);
    assert_eq!(snapshot.instances("orders").unwrap().len(), 2);

    token.cancel();
    tracker.close();
    timeout(Duration::from_secs(5), tracker.wait())
        .await
        .expect("Poller did not stop after cancellation");
}

#[tokio::test]
async fn test_file_registry_reloads_each_cycle() {
    let path = std::env::temp_dir().join(format!(
        "discovery_bridge_registry_{}.toml",
        std::process::id()
    ));
    std::fs::write(
        &path,
        r#"
[services]
orders = [{ host = "10.0.0.1", port = 8080 }]
billing = []
"#,
    )
    .unwrap();

    let backend = Arc::new(FileRegistry::new(&path));
    let store = Arc::new(SnapshotStore::new());
    let poller = BackendPoller::new(backend, store.clone(), poller_config());

    assert_eq!(poller.poll_once().await.unwrap().version, Some(1));
    let names: Vec<_> = store.current().service_names().map(str::to_string).collect();
    assert_eq!(names, vec!["billing", "orders"]);

    std::fs::write(
        &path,
        r#"
[services]
orders = [
    { host = "10.0.0.1", port = 8080 },
    { host = "10.0.0.2", port = 8080, metadata = { zone = "b" } },
]
billing = []
"#,
    )
    .unwrap();
    assert_eq!(poller.poll_once().await.unwrap().version, Some(2));
    assert_eq!(store.current().instances("orders").unwrap().len(), 2);

    // 文件不可读时保留上一份快照
    std::fs::remove_file(&path).unwrap();
    assert!(poller.poll_once().await.is_err());
    assert_eq!(store.version(), 2);
}
