//! 过期清理任务
//!
//! 周期性地将超过有效期的 active 邀请码标记为 expired

use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::core::referral::ReferralService;

/// 启动后台清理任务
///
/// 服务未配置有效期时返回 `None`。
pub fn spawn_expiry_sweeper(service: ReferralService, every: Duration) -> Option<JoinHandle<()>> {
    service.config().code_ttl?;

    info!(interval_secs = every.as_secs(), "Starting referral expiry sweeper");

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            if let Err(e) = service.expire_stale(Utc::now().timestamp()).await {
                error!("Referral expiry sweep failed: {}", e);
            }
        }
    }))
}
