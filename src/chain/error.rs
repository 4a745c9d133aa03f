use solana_client::client_error::ClientError;
use thiserror::Error;

/// RPC 网关过载时返回的固定报文。
pub const SERVICE_UNAVAILABLE_SIGNATURE: &str =
    r#"{"jsonrpc":"2.0","error":{"code":503,"message":"Service unavailable"}"#;

/// solana-client 的 HTTP 错误不保留响应体，只能按状态行识别 503。
const HTTP_STATUS_UNAVAILABLE: &str = "503 Service Unavailable";

const NOT_FOUND_MARKERS: &[&str] = &["could not find account", "AccountNotFound"];
const UNSUPPORTED_MARKERS: &[&str] = &["Method not found", "-32601"];
const REJECTED_MARKERS: &[&str] = &[
    "Transaction simulation failed",
    "Blockhash not found",
    "insufficient funds",
    "custom program error",
    "Invalid param",
    "invalid transaction",
];

pub type ChainResult<T> = Result<T, ChainError>;

/// 单个 RPC 节点返回的错误，按类型区分是否允许切换节点。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("RPC 节点不可用: {0}")]
    Unavailable(String),
    #[error("链上账户不存在: {0}")]
    NotFound(String),
    #[error("RPC 方法不受支持: {0}")]
    Unsupported(String),
    #[error("请求被链上拒绝: {0}")]
    Rejected(String),
    #[error("本地处理失败: {0}")]
    Local(String),
    #[error("{0}")]
    Other(String),
}

impl ChainError {
    /// 根据节点返回的原始报文归类错误。
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.contains(SERVICE_UNAVAILABLE_SIGNATURE) || message.contains(HTTP_STATUS_UNAVAILABLE)
        {
            return Self::Unavailable(message);
        }
        if NOT_FOUND_MARKERS.iter().any(|marker| message.contains(marker)) {
            return Self::NotFound(message);
        }
        if UNSUPPORTED_MARKERS.iter().any(|marker| message.contains(marker)) {
            return Self::Unsupported(message);
        }
        if REJECTED_MARKERS.iter().any(|marker| message.contains(marker)) {
            return Self::Rejected(message);
        }
        Self::Other(message)
    }

    pub fn local(reason: impl std::fmt::Display) -> Self {
        Self::Local(reason.to_string())
    }

    pub fn message(&self) -> &str {
        match self {
            ChainError::Unavailable(message)
            | ChainError::NotFound(message)
            | ChainError::Unsupported(message)
            | ChainError::Rejected(message)
            | ChainError::Local(message)
            | ChainError::Other(message) => message,
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, ChainError::Unavailable(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ChainError::NotFound(_))
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, ChainError::Unsupported(_))
    }
}

impl From<ClientError> for ChainError {
    fn from(err: ClientError) -> Self {
        Self::classify(err.to_string())
    }
}
