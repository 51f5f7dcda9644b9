use axum::Json;
use axum::response::{IntoResponse, Response};
use http::{HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;

use crate::services::query::ChangeResult;

pub const CONSUL_INDEX: HeaderName = HeaderName::from_static("x-consul-index");
pub const CONSUL_KNOWN_LEADER: HeaderName = HeaderName::from_static("x-consul-knownleader");
pub const CONSUL_LAST_CONTACT: HeaderName = HeaderName::from_static("x-consul-lastcontact");

// 把阻塞查询结果转换为带 Consul 头的 JSON 响应
pub fn consul_response<T: Serialize>(result: ChangeResult<T>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(CONSUL_INDEX, HeaderValue::from(result.index));
    headers.insert(CONSUL_KNOWN_LEADER, HeaderValue::from_static("true"));
    headers.insert(CONSUL_LAST_CONTACT, HeaderValue::from_static("0"));

    (headers, Json(result.payload)).into_response()
}
