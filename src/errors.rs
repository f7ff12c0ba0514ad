//! 标准化错误处理
//!
//! 存储层与服务层的错误类型。所有错误都作为值返回给调用方，
//! HTTP 层根据 [`ReferralError::status_code`] 决定响应码。

use axum::http::StatusCode;
use thiserror::Error;

/// 插入时发现已有同码的 active 记录
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Duplicate active referral code: {code}")]
pub struct DuplicateCodeError {
    pub code: String,
}

/// 兑换失败原因
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedeemError {
    /// 邀请码不存在
    #[error("Referral code not found")]
    NotFound,

    /// 邀请码已被兑换
    #[error("Referral code already redeemed")]
    AlreadyRedeemed,

    /// 邀请码已过期
    #[error("Referral code expired")]
    Expired,
}

/// 存储层错误
#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Duplicate(#[from] DuplicateCodeError),

    #[error(transparent)]
    Redeem(#[from] RedeemError),

    /// 后端故障（锁中毒、SQLite I/O、任务失败等）
    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// 服务层错误
#[derive(Error, Debug)]
pub enum ReferralError {
    /// 输入验证错误
    #[error("Validation error: {0}")]
    Validation(String),

    /// 重试次数用尽仍未生成唯一邀请码
    #[error("Could not generate a unique referral code after {attempts} attempts")]
    CodeGenerationExhausted { attempts: u32 },

    #[error(transparent)]
    Redeem(#[from] RedeemError),

    /// 存储错误
    #[error("Storage error: {0}")]
    Storage(String),
}

impl ReferralError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ReferralError::Validation(msg.into())
    }

    /// HTTP 状态码映射
    pub fn status_code(&self) -> StatusCode {
        match self {
            ReferralError::Validation(_) | ReferralError::Redeem(_) => StatusCode::BAD_REQUEST,
            ReferralError::CodeGenerationExhausted { .. } | ReferralError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// 对外展示的错误信息
    ///
    /// 兑换失败统一返回同一句话，不区分"不存在"、"已使用"和"已过期"。
    pub fn public_message(&self) -> String {
        match self {
            ReferralError::Validation(msg) => msg.clone(),
            ReferralError::Redeem(_) => "Invalid or already used referral code".to_string(),
            ReferralError::CodeGenerationExhausted { .. } => {
                "Failed to generate referral code".to_string()
            }
            ReferralError::Storage(_) => "Internal storage error".to_string(),
        }
    }
}

impl From<StoreError> for ReferralError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Redeem(e) => ReferralError::Redeem(e),
            StoreError::Duplicate(e) => ReferralError::Storage(e.to_string()),
            StoreError::Backend(msg) => ReferralError::Storage(msg),
        }
    }
}

/// 项目结果类型别名
pub type Result<T> = std::result::Result<T, ReferralError>;
