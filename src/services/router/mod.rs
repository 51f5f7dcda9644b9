pub mod error;
pub mod extractor;
pub mod response;

pub use error::RouterError;

use std::net::SocketAddr;

use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};

use super::query::BlockingQueryEngine;
use extractor::BlockingParams;

// 路由共享状态
#[derive(Debug, Clone)]
pub struct RouterState {
    pub engine: BlockingQueryEngine,
    pub advertise_addr: SocketAddr,
}

/// Consul 只读发现接口
pub fn build_router(state: RouterState) -> Router {
    Router::new()
        .route("/v1/catalog/services", get(catalog_services))
        .route("/v1/catalog/service/{name}", get(catalog_service))
        .route("/v1/health/service/{name}", get(health_service))
        .route("/v1/status/leader", get(status_leader))
        .with_state(state)
}

async fn catalog_services(
    State(state): State<RouterState>,
    Query(params): Query<BlockingParams>,
) -> Result<Response, RouterError> {
    let (index, wait) = (params.index()?, params.wait()?);
    tracing::debug!(index = ?index, wait = ?wait, "Catalog services query");

    let result = state.engine.list_catalog(index, wait).await;
    Ok(response::consul_response(result))
}

async fn catalog_service(
    State(state): State<RouterState>,
    Path(name): Path<String>,
    Query(params): Query<BlockingParams>,
) -> Result<Response, RouterError> {
    let (index, wait) = (params.index()?, params.wait()?);
    tracing::debug!(service_name = %name, index = ?index, wait = ?wait, "Catalog service query");

    let result = state.engine.list_instances(&name, index, wait).await;
    Ok(response::consul_response(result))
}

// `passing` 参数被忽略：所有实例都是 passing
async fn health_service(
    State(state): State<RouterState>,
    Path(name): Path<String>,
    Query(params): Query<BlockingParams>,
) -> Result<Response, RouterError> {
    let (index, wait) = (params.index()?, params.wait()?);
    tracing::debug!(service_name = %name, index = ?index, wait = ?wait, "Health service query");

    let result = state.engine.list_health(&name, index, wait).await;
    Ok(response::consul_response(result))
}

async fn status_leader(State(state): State<RouterState>) -> Json<String> {
    Json(state.advertise_addr.to_string())
}
