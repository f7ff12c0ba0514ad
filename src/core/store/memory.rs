//! 内存存储实现
//!
//! 默认的存储实现，数据仅在内存中，重启后丢失

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{ReferralCode, ReferralStatus};
use crate::errors::{DuplicateCodeError, RedeemError, StoreError};

use super::{CodeStore, StoreResult};

/// 内存存储
///
/// 全部记录放在一把读写锁之后，写操作在持锁期间完成检查与修改。
pub struct MemoryCodeStore {
    inner: RwLock<StoreInner>,
}

#[derive(Default)]
struct StoreInner {
    /// 按插入顺序保存，从不删除
    records: Vec<ReferralCode>,
    /// 邀请码 -> 最新一条记录的下标
    by_code: HashMap<String, usize>,
    /// 签发人 -> 记录下标（插入顺序）
    by_owner: HashMap<String, Vec<usize>>,
}

impl MemoryCodeStore {
    /// 创建新的内存存储
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StoreInner::default()),
        }
    }

    /// 记录总数（含已使用、已过期）
    pub async fn len(&self) -> usize {
        self.inner.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for MemoryCodeStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CodeStore for MemoryCodeStore {
    async fn insert(&self, record: &ReferralCode) -> StoreResult<()> {
        let mut inner = self.inner.write().await;

        if let Some(&idx) = inner.by_code.get(&record.code) {
            if inner.records[idx].is_active() {
                return Err(DuplicateCodeError {
                    code: record.code.clone(),
                }
                .into());
            }
        }

        let idx = inner.records.len();
        inner.records.push(record.clone());
        inner.by_code.insert(record.code.clone(), idx);
        inner
            .by_owner
            .entry(record.owner_id.clone())
            .or_default()
            .push(idx);

        Ok(())
    }

    async fn find_by_code(&self, code: &str) -> StoreResult<Option<ReferralCode>> {
        let inner = self.inner.read().await;
        Ok(inner
            .by_code
            .get(code)
            .map(|&idx| inner.records[idx].clone()))
    }

    async fn compare_and_set_redeemed(
        &self,
        code: &str,
        invited_user_id: &str,
        now: i64,
    ) -> StoreResult<ReferralCode> {
        let mut inner = self.inner.write().await;

        let idx = *inner.by_code.get(code).ok_or(RedeemError::NotFound)?;
        let record = &mut inner.records[idx];

        match record.status {
            status if status.can_transition_to(ReferralStatus::Used) => {
                record.status = ReferralStatus::Used;
                record.invited_user_id = Some(invited_user_id.to_string());
                record.redeemed_at = Some(now);
                Ok(record.clone())
            }
            ReferralStatus::Expired => Err(StoreError::Redeem(RedeemError::Expired)),
            _ => Err(StoreError::Redeem(RedeemError::AlreadyRedeemed)),
        }
    }

    async fn list_by_owner(&self, owner_id: &str) -> StoreResult<Vec<ReferralCode>> {
        let inner = self.inner.read().await;
        Ok(inner
            .by_owner
            .get(owner_id)
            .map(|indices| {
                indices
                    .iter()
                    .map(|&idx| inner.records[idx].clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn expire_created_before(&self, cutoff: i64) -> StoreResult<usize> {
        let mut inner = self.inner.write().await;

        let mut expired = 0;
        for record in inner
            .records
            .iter_mut()
            .filter(|r| {
                r.status.can_transition_to(ReferralStatus::Expired) && r.created_at < cutoff
            })
        {
            record.status = ReferralStatus::Expired;
            expired += 1;
        }

        Ok(expired)
    }
}
