//! 中继错误类型
//! 只有两类面向调用方的失败：输入校验失败与上游调用失败

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    /// 提交内容非法（缺字段、类型、大小、蜜罐）
    #[error("{0}")]
    Validation(String),

    /// 无法获取 Dropbox 访问令牌
    #[error("{0}")]
    UpstreamAuth(String),

    /// Dropbox / 通知等上游调用失败
    #[error("{0}")]
    Upstream(String),

    /// 服务自身配置错误
    #[error("{0}")]
    Config(String),
}

impl RelayError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn upstream_auth(message: impl Into<String>) -> Self {
        Self::UpstreamAuth(message.into())
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::Validation(_) => StatusCode::BAD_REQUEST,
            RelayError::UpstreamAuth(_) | RelayError::Upstream(_) => StatusCode::BAD_GATEWAY,
            RelayError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(serde_json::json!({
            "success": false,
            "error": self.to_string(),
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            RelayError::validation("bad").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            RelayError::upstream_auth("no token").status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            RelayError::upstream("dropbox down").status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            RelayError::Config("missing".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_message_passthrough() {
        let err = RelayError::validation("CV has an invalid file type");
        assert_eq!(err.to_string(), "CV has an invalid file type");
    }
}
