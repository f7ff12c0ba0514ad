//! 配置管理
//!
//! 所有参数既可以通过命令行传入，也可以通过环境变量设置

use clap::Parser;

use crate::core::referral::{ServiceConfig, DEFAULT_MAX_GENERATE_ATTEMPTS};
use crate::infrastructure::logger::LogFormat;

/// 存储类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreType {
    /// 内存存储，重启后丢失
    Memory,
    /// SQLite 持久化存储
    Sqlite,
}

impl std::str::FromStr for StoreType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(StoreType::Memory),
            "sqlite" => Ok(StoreType::Sqlite),
            _ => Err(format!("Unknown store type: {}", s)),
        }
    }
}

impl std::fmt::Display for StoreType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreType::Memory => write!(f, "memory"),
            StoreType::Sqlite => write!(f, "sqlite"),
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Referral code lifecycle service")]
pub struct AppConfig {
    /// HTTP 监听地址
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8080")]
    pub bind_addr: String,

    /// 存储类型: memory, sqlite
    #[arg(long, env = "STORE_TYPE", default_value = "memory")]
    pub store_type: StoreType,

    /// SQLite 数据库路径（仅在 sqlite 存储类型下使用）
    #[arg(long, env = "DB_PATH", default_value = "./referrals.db")]
    pub db_path: String,

    /// 遇到重复邀请码时的最大生成次数
    #[arg(long, env = "MAX_GENERATE_ATTEMPTS", default_value_t = DEFAULT_MAX_GENERATE_ATTEMPTS)]
    pub max_generate_attempts: u32,

    /// 邀请码有效期（小时），不设置则永不过期
    #[arg(long, env = "CODE_TTL_HOURS")]
    pub code_ttl_hours: Option<u32>,

    /// 过期清理间隔（秒）
    #[arg(long, env = "SWEEP_INTERVAL_SECS", default_value_t = 300)]
    pub sweep_interval_secs: u64,

    /// 日志格式: pretty, compact, json
    #[arg(long, env = "LOG_FORMAT", default_value = "pretty")]
    pub log_format: LogFormat,
}

impl AppConfig {
    /// 从环境变量加载配置（忽略命令行参数）
    pub fn from_env() -> Self {
        Self::parse_from(["coachref"])
    }

    /// 服务层配置
    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            max_generate_attempts: self.max_generate_attempts,
            code_ttl: self
                .code_ttl_hours
                .map(|hours| chrono::Duration::hours(i64::from(hours))),
        }
    }
}
