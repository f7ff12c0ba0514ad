//! 邀请码服务
//!
//! 为教练/学员平台提供邀请码的完整生命周期：
//! - 签发唯一的 8 位邀请码
//! - 校验邀请码并返回签发人信息
//! - 一次性兑换（并发下也只会成功一次）
//! - 按签发人查询签发记录和邀请成果
//!
//! # 架构分层
//!
//! - `domain`: 领域模型
//! - `core`: 存储抽象与业务规则
//! - `infrastructure`: SQLite 存储、HTTP 接口、日志
//! - `application`: 后台任务

pub mod application;
pub mod bootstrap;
pub mod config;
pub mod core;
pub mod domain;
pub mod errors;
pub mod infrastructure;

pub use crate::config::{AppConfig, StoreType};
pub use crate::core::directory::{InviteeProfile, SyntheticDirectory, UserDirectory};
pub use crate::core::referral::{ReferralService, ServiceConfig};
pub use crate::core::store::{CodeStore, MemoryCodeStore};
pub use crate::domain::{InviteeSummary, ReferralCode, ReferralKind, ReferralStatus, ReferralValidation};
pub use crate::errors::{DuplicateCodeError, RedeemError, ReferralError, StoreError};
pub use crate::infrastructure::logger;
pub use crate::infrastructure::store::SqliteCodeStore;
pub use crate::infrastructure::web::{create_router, start_web_server, AppState};

/// 版本号
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
