use thiserror::Error;

/// 任务队列客户端错误类型定义
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("网络错误: {0}")]
    Network(String),

    #[error("HTTP状态错误: {status} - {body}")]
    HttpStatus { status: u16, body: String },

    #[error("序列化错误: {0}")]
    Serialization(String),

    #[error("配置错误: {0}")]
    Configuration(String),

    #[error("无效的MJD值: {0}")]
    InvalidMjd(String),

    #[error("本地存储错误: {0}")]
    Storage(String),

    #[error("无效的URL: {0}")]
    InvalidUrl(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

impl QueueError {
    /// 传输层失败（连接、DNS、超时），由下一次轮询自动重试
    pub fn is_transport(&self) -> bool {
        matches!(self, QueueError::Network(_))
    }
}

impl From<serde_json::Error> for QueueError {
    fn from(err: serde_json::Error) -> Self {
        QueueError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for QueueError {
    fn from(err: std::io::Error) -> Self {
        QueueError::Storage(err.to_string())
    }
}

/// 统一的Result类型
pub type QueueResult<T> = std::result::Result<T, QueueError>;
