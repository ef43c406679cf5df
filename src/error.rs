//! 错误类型
//!
//! - `ChainSigError`: 引擎内部错误分类（网络 / 协议 / 不可用 / 非法输入）
//! - `AppError`: HTTP 边界错误，实现 `IntoResponse`

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// 引擎错误分类
#[derive(Debug, thiserror::Error)]
pub enum ChainSigError {
    /// 访问远端 RPC 时的传输层失败
    #[error("network error: {0}")]
    Network(String),

    /// 响应存在但缺少预期字段，或 JSON 载荷格式错误
    #[error("protocol error: {0}")]
    Protocol(String),

    /// 远端明确返回的错误（RPC `error` 字段或合约执行错误）
    #[error("remote error: {0}")]
    Remote(String),

    /// 当前网络未启用链签名 / MPC 合约不可达
    #[error("chain signatures unavailable: {0}")]
    Unavailable(String),

    /// 空账户、未知链、非法索引等
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl ChainSigError {
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    pub fn remote(msg: impl Into<String>) -> Self {
        Self::Remote(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

impl From<reqwest::Error> for ChainSigError {
    fn from(err: reqwest::Error) -> Self {
        // 响应体解码失败属于协议问题，其余均视为传输失败
        if err.is_decode() {
            Self::Protocol(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ChainSigError {
    fn from(err: serde_json::Error) -> Self {
        Self::Protocol(format!("malformed JSON payload: {}", err))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// HTTP 边界
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppErrorCode {
    BadRequest,
    NotFound,
    Internal,
    ChainNotSupported,
    RpcError,
    ServiceUnavailable,
}

impl AppErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppErrorCode::BadRequest => "bad_request",
            AppErrorCode::NotFound => "not_found",
            AppErrorCode::Internal => "internal",
            AppErrorCode::ChainNotSupported => "chain_not_supported",
            AppErrorCode::RpcError => "rpc_error",
            AppErrorCode::ServiceUnavailable => "service_unavailable",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppError {
    pub code: AppErrorCode,
    pub message: String,
    pub status: StatusCode,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    code: &'a str,
    message: &'a str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            code: self.code.as_str(),
            message: &self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            code: AppErrorCode::BadRequest,
            message: msg.into(),
            status: StatusCode::BAD_REQUEST,
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self {
            code: AppErrorCode::NotFound,
            message: msg.into(),
            status: StatusCode::NOT_FOUND,
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self {
            code: AppErrorCode::Internal,
            message: msg.into(),
            status: StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn chain_not_supported(msg: impl Into<String>) -> Self {
        Self {
            code: AppErrorCode::ChainNotSupported,
            message: msg.into(),
            status: StatusCode::BAD_REQUEST,
        }
    }

    pub fn rpc_error(msg: impl Into<String>) -> Self {
        Self {
            code: AppErrorCode::RpcError,
            message: msg.into(),
            status: StatusCode::BAD_GATEWAY,
        }
    }

    pub fn service_unavailable(msg: impl Into<String>) -> Self {
        Self {
            code: AppErrorCode::ServiceUnavailable,
            message: msg.into(),
            status: StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<ChainSigError> for AppError {
    fn from(err: ChainSigError) -> Self {
        let message = err.to_string();
        match err {
            ChainSigError::InvalidInput(_) => AppError::bad_request(message),
            ChainSigError::Network(_) | ChainSigError::Protocol(_) | ChainSigError::Remote(_) => {
                tracing::error!(error = %message, "MPC RPC failure");
                AppError::rpc_error(message)
            }
            ChainSigError::Unavailable(_) => AppError::service_unavailable(message),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        tracing::error!(error = ?err, "Unhandled error");
        AppError::internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_sig_error_maps_to_http_status() {
        let err: AppError = ChainSigError::invalid_input("empty account").into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.code, AppErrorCode::BadRequest);

        let err: AppError = ChainSigError::network("connection refused").into();
        assert_eq!(err.status, StatusCode::BAD_GATEWAY);

        let err: AppError = ChainSigError::unavailable("no root key").into();
        assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_serde_error_is_protocol_error() {
        let err = serde_json::from_str::<String>("{not json").unwrap_err();
        assert!(matches!(ChainSigError::from(err), ChainSigError::Protocol(_)));
    }
}
