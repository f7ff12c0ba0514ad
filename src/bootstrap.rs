//! # 启动模块
//!
//! 根据配置组装存储、服务和后台任务，并启动 HTTP 服务

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::info;

use crate::application::spawn_expiry_sweeper;
use crate::config::{AppConfig, StoreType};
use crate::core::referral::ReferralService;
use crate::core::store::{CodeStore, MemoryCodeStore};
use crate::infrastructure::store::SqliteCodeStore;
use crate::infrastructure::web::start_web_server;

/// 服务启动器
pub struct Launcher {
    config: AppConfig,
}

impl Launcher {
    /// 从环境变量创建启动器
    pub fn new() -> Self {
        Self {
            config: AppConfig::from_env(),
        }
    }

    pub fn with_config(config: AppConfig) -> Self {
        Self { config }
    }

    /// 根据配置创建存储
    pub fn build_store(&self) -> Result<Arc<dyn CodeStore>> {
        match self.config.store_type {
            StoreType::Memory => {
                info!("Using in-memory referral store");
                Ok(Arc::new(MemoryCodeStore::new()))
            }
            StoreType::Sqlite => {
                info!(path = %self.config.db_path, "Using SQLite referral store");
                Ok(Arc::new(SqliteCodeStore::new(&self.config.db_path)?))
            }
        }
    }

    pub fn build_service(&self) -> Result<ReferralService> {
        let store = self.build_store()?;
        Ok(ReferralService::with_config(store, self.config.service_config()))
    }

    /// 启动完整服务，直到收到中断信号
    pub async fn launch(&self) -> Result<()> {
        info!("Launching referral service...");

        let service = self.build_service()?;

        let sweeper = spawn_expiry_sweeper(
            service.clone(),
            Duration::from_secs(self.config.sweep_interval_secs.max(1)),
        );

        let result = start_web_server(&self.config.bind_addr, service).await;

        if let Some(handle) = sweeper {
            handle.abort();
        }

        result
    }
}

impl Default for Launcher {
    fn default() -> Self {
        Self::new()
    }
}
