use axum::response::{IntoResponse, Response};
use http::StatusCode;
use thiserror::Error;

// 请求参数错误，统一映射为 400
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("Invalid index: {0}")]
    InvalidIndex(String),

    #[error("Invalid wait duration: {0}")]
    InvalidWait(String),
}

impl IntoResponse for RouterError {
    fn into_response(self) -> Response {
        tracing::warn!(error = %self, "Rejecting blocking query");
        (StatusCode::BAD_REQUEST, self.to_string()).into_response()
    }
}
