//! 存储接口定义
//!
//! 邀请码记录的唯一持有者。所有修改都通过本接口的原子原语完成：
//! - `insert` 在同一临界区内完成唯一性检查与写入
//! - `compare_and_set_redeemed` 仅在记录当前为 active 时迁移到 used
//!
//! 任何实现（内存、SQLite 或其它持久化后端）都必须保持这两条原子性。

pub mod memory;

use async_trait::async_trait;

use crate::domain::{ReferralCode, ReferralStatus};
use crate::errors::StoreError;

pub use memory::MemoryCodeStore;

/// 存储层结果类型
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// 邀请码存储接口
#[async_trait]
pub trait CodeStore: Send + Sync {
    /// 插入新记录
    ///
    /// 若已存在同码且状态为 active 的记录，返回 `StoreError::Duplicate`。
    async fn insert(&self, record: &ReferralCode) -> StoreResult<()>;

    /// 根据邀请码查找记录（任意状态）
    ///
    /// 同一邀请码字符串在过期后被复用时，返回最新的一条。
    async fn find_by_code(&self, code: &str) -> StoreResult<Option<ReferralCode>>;

    /// 根据邀请码查找 active 记录
    async fn find_active_by_code(&self, code: &str) -> StoreResult<Option<ReferralCode>> {
        Ok(self
            .find_by_code(code)
            .await?
            .filter(|record| record.status == ReferralStatus::Active))
    }

    /// 原子地将 active 记录标记为已兑换，返回更新后的记录
    ///
    /// 记录不存在返回 `NotFound`，已兑换返回 `AlreadyRedeemed`，已过期返回 `Expired`。
    async fn compare_and_set_redeemed(
        &self,
        code: &str,
        invited_user_id: &str,
        now: i64,
    ) -> StoreResult<ReferralCode>;

    /// 按插入顺序列出某个用户签发的全部邀请码
    async fn list_by_owner(&self, owner_id: &str) -> StoreResult<Vec<ReferralCode>>;

    /// 列出某个用户签发且已被兑换的邀请码
    async fn list_redeemed_by_owner(&self, owner_id: &str) -> StoreResult<Vec<ReferralCode>> {
        Ok(self
            .list_by_owner(owner_id)
            .await?
            .into_iter()
            .filter(|record| record.status == ReferralStatus::Used)
            .collect())
    }

    /// 将 `cutoff` 之前创建、仍为 active 的记录标记为 expired，返回受影响条数
    async fn expire_created_before(&self, cutoff: i64) -> StoreResult<usize>;
}
