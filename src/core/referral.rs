//! 邀请码生命周期服务
//!
//! 在 [`CodeStore`] 之上实现签发、校验、兑换与查询。
//! 服务本身不直接修改记录，只调用存储层的原子原语。

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::core::directory::{SyntheticDirectory, UserDirectory};
use crate::core::store::CodeStore;
use crate::domain::{InviteeSummary, ReferralCode, ReferralKind, ReferralValidation};
use crate::errors::{ReferralError, Result, StoreError};
use crate::infrastructure::logger::Timer;

/// 默认的生成重试次数
pub const DEFAULT_MAX_GENERATE_ATTEMPTS: u32 = 5;

/// 邀请码生成器
pub type CodeGenerator = Arc<dyn Fn() -> String + Send + Sync>;

/// 服务配置
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// 遇到重复码时最多尝试的次数
    pub max_generate_attempts: u32,
    /// 邀请码有效期，`None` 表示永不过期
    pub code_ttl: Option<chrono::Duration>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_generate_attempts: DEFAULT_MAX_GENERATE_ATTEMPTS,
            code_ttl: None,
        }
    }
}

/// 邀请码服务
#[derive(Clone)]
pub struct ReferralService {
    store: Arc<dyn CodeStore>,
    directory: Arc<dyn UserDirectory>,
    generator: CodeGenerator,
    config: ServiceConfig,
}

impl ReferralService {
    /// 使用默认配置创建服务
    pub fn new(store: Arc<dyn CodeStore>) -> Self {
        Self::with_config(store, ServiceConfig::default())
    }

    pub fn with_config(store: Arc<dyn CodeStore>, config: ServiceConfig) -> Self {
        Self {
            store,
            directory: Arc::new(SyntheticDirectory),
            generator: Arc::new(ReferralCode::generate_code),
            config,
        }
    }

    /// 替换用户目录
    pub fn with_directory(mut self, directory: Arc<dyn UserDirectory>) -> Self {
        self.directory = directory;
        self
    }

    /// 替换邀请码生成器
    pub fn with_generator(mut self, generator: CodeGenerator) -> Self {
        self.generator = generator;
        self
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// 签发新邀请码
    ///
    /// 随机抽取 8 位码并尝试插入；遇到重复码则重新抽取，
    /// 超过 `max_generate_attempts` 次返回 `CodeGenerationExhausted`。
    pub async fn generate(
        &self,
        owner_id: &str,
        owner_name: &str,
        kind: ReferralKind,
    ) -> Result<ReferralCode> {
        require_non_empty("ownerId", owner_id)?;
        require_non_empty("ownerName", owner_name)?;

        let _timer = Timer::new("referral.generate");
        let attempts = self.config.max_generate_attempts.max(1);

        for attempt in 1..=attempts {
            let record = ReferralCode::new(
                (self.generator)(),
                owner_id,
                owner_name,
                kind,
                Utc::now().timestamp(),
            );

            match self.store.insert(&record).await {
                Ok(()) => {
                    info!(
                        owner_id = %owner_id,
                        code = %record.code,
                        kind = %kind,
                        "Referral code issued"
                    );
                    return Ok(record);
                }
                Err(StoreError::Duplicate(dup)) => {
                    warn!(code = %dup.code, attempt, "Referral code collision, retrying");
                }
                Err(e) => {
                    error!("Failed to store referral code: {}", e);
                    return Err(e.into());
                }
            }
        }

        error!(owner_id = %owner_id, attempts, "Referral code generation exhausted");
        Err(ReferralError::CodeGenerationExhausted { attempts })
    }

    /// 校验邀请码
    ///
    /// 仅当记录存在且为 active 时返回签发人信息，无副作用。
    pub async fn validate(&self, code: &str) -> Result<Option<ReferralValidation>> {
        if !ReferralCode::is_well_formed(code) {
            debug!(code = %code, "Malformed referral code");
            return Ok(None);
        }

        let found = self.store.find_active_by_code(code).await?;
        debug!(code = %code, valid = found.is_some(), "Referral code validated");

        Ok(found.map(|record| ReferralValidation {
            owner_name: record.owner_name,
            kind: record.kind,
        }))
    }

    /// 兑换邀请码
    ///
    /// 查找与状态迁移在存储层一次完成，同一邀请码只能成功兑换一次。
    pub async fn redeem(&self, code: &str, invited_user_id: &str) -> Result<ReferralCode> {
        require_non_empty("code", code)?;
        require_non_empty("userId", invited_user_id)?;

        let _timer = Timer::new("referral.redeem");

        match self
            .store
            .compare_and_set_redeemed(code, invited_user_id, Utc::now().timestamp())
            .await
        {
            Ok(record) => {
                info!(
                    code = %code,
                    owner_id = %record.owner_id,
                    invited_user_id = %invited_user_id,
                    "Referral code redeemed"
                );
                Ok(record)
            }
            Err(StoreError::Redeem(reason)) => {
                warn!(code = %code, invited_user_id = %invited_user_id, %reason, "Referral redemption rejected");
                Err(reason.into())
            }
            Err(e) => {
                error!("Failed to redeem referral code: {}", e);
                Err(e.into())
            }
        }
    }

    /// 某用户签发过的全部邀请码
    pub async fn get_referrals_by_owner(&self, owner_id: &str) -> Result<Vec<ReferralCode>> {
        require_non_empty("ownerId", owner_id)?;
        Ok(self.store.list_by_owner(owner_id).await?)
    }

    /// 某用户邀请成功的用户列表
    pub async fn get_referrals_by_inviter(&self, owner_id: &str) -> Result<Vec<InviteeSummary>> {
        require_non_empty("ownerId", owner_id)?;

        let redeemed = self.store.list_redeemed_by_owner(owner_id).await?;
        let mut followers = Vec::with_capacity(redeemed.len());

        for record in redeemed {
            // used 状态下两者必然同时存在
            let (Some(invited_user_id), Some(redeemed_at)) =
                (record.invited_user_id.as_deref(), record.redeemed_at)
            else {
                continue;
            };

            let profile = self.directory.resolve(invited_user_id).await;
            followers.push(InviteeSummary {
                code: record.code,
                invited_display_name: profile.display_name,
                registered_at: redeemed_at,
                status: profile.status,
            });
        }

        Ok(followers)
    }

    /// 将超过有效期的 active 邀请码标记为过期
    ///
    /// 未配置有效期时不做任何事。
    pub async fn expire_stale(&self, now: i64) -> Result<usize> {
        let Some(ttl) = self.config.code_ttl else {
            return Ok(0);
        };

        let cutoff = now - ttl.num_seconds();
        let expired = self.store.expire_created_before(cutoff).await?;
        if expired > 0 {
            info!(expired, cutoff, "Expired stale referral codes");
        }
        Ok(expired)
    }

    /// 拼接分享链接，形如 `<base>/register?ref=<code>`
    pub fn share_link(base_url: &str, code: &str) -> String {
        format!("{}/register?ref={}", base_url.trim_end_matches('/'), code)
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ReferralError::validation(format!("Missing required field: {}", field)));
    }
    Ok(())
}
