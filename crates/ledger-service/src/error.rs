//! 账本服务错误类型
//!
//! 定义服务层的业务错误和系统错误

use thiserror::Error;

/// 账本服务错误类型
#[derive(Debug, Error)]
pub enum LedgerError {
    // === 校验错误 ===
    #[error("参数校验失败: {0}")]
    Validation(String),

    // === 用户相关错误 ===
    #[error("用户不存在: {0}")]
    UserNotFound(String),

    // === 流水相关错误 ===
    #[error("流水不存在: {0}")]
    TradeNotFound(i64),

    /// 流水与积分单元的对应关系被破坏（如出现无主单元），
    /// 所在事务整体回滚，不允许部分落库
    #[error("账本完整性被破坏: {0}")]
    IntegrityViolation(String),

    // === 系统错误 ===
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JSON 序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 账本服务 Result 类型别名
pub type Result<T> = std::result::Result<T, LedgerError>;

impl LedgerError {
    /// 检查是否为可重试的错误
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Database(_))
    }

    /// 检查是否为业务错误（非系统错误）
    pub fn is_business_error(&self) -> bool {
        !matches!(
            self,
            Self::Database(_) | Self::Serialization(_) | Self::Internal(_)
        )
    }

    /// 获取错误码（用于日志与上游响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::UserNotFound(_) => "USER_NOT_FOUND",
            Self::TradeNotFound(_) => "TRADE_NOT_FOUND",
            Self::IntegrityViolation(_) => "INTEGRITY_VIOLATION",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}
