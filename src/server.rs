use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::config::{BackendConfig, Config};
use crate::services::registry::{FileRegistry, InMemoryRegistry, RegistryBackend};
use crate::services::router::{RouterState, build_router};
use crate::services::{BackendPoller, BlockingQueryEngine, SnapshotStore};

// 按配置构造注册表后端
pub fn build_backend(config: &BackendConfig) -> Arc<dyn RegistryBackend> {
    match config {
        BackendConfig::Memory { services } => {
            tracing::info!(services = services.len(), "Using in-memory registry backend");
            Arc::new(InMemoryRegistry::from_entries(services))
        }
        BackendConfig::File { path } => {
            tracing::info!(path = %path.display(), "Using file registry backend");
            Arc::new(FileRegistry::new(path.clone()))
        }
    }
}

pub async fn start(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = config.server.listen_addr;

    // 初始化快照存储和后端
    let store = Arc::new(SnapshotStore::new());
    let backend = build_backend(&config.backend);

    let tracker = TaskTracker::new();
    let token = CancellationToken::new();

    BackendPoller::new(backend, store.clone(), config.poller.clone())
        .spawn(&tracker, token.clone());

    let state = RouterState {
        engine: BlockingQueryEngine::new(store, config.query.clone()),
        advertise_addr: addr,
    };
    let app = build_router(state);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "Discovery bridge listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(token.clone()))
        .await?;

    // 停止后台轮询并等待退出
    token.cancel();
    tracker.close();
    tracker.wait().await;

    tracing::info!("Discovery bridge stopped");
    Ok(())
}

async fn shutdown_signal(token: CancellationToken) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
            tracing::info!("Shutdown signal received");
        }
        _ = token.cancelled() => {}
    }
}
