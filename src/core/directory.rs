//! 被邀请用户信息解析
//!
//! "我邀请了谁" 视图需要被邀请人的显示名和账户状态。
//! 用户体系不归本服务管理，这里只定义接口。

use async_trait::async_trait;

/// 被邀请用户的展示信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InviteeProfile {
    pub display_name: String,
    pub status: String,
}

/// 用户目录接口
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// 解析用户展示信息
    async fn resolve(&self, user_id: &str) -> InviteeProfile;
}

/// 不接入真实用户体系时的默认实现
///
/// 显示名为 `User <id>`，状态固定为 `active`。
#[derive(Debug, Clone, Copy, Default)]
pub struct SyntheticDirectory;

#[async_trait]
impl UserDirectory for SyntheticDirectory {
    async fn resolve(&self, user_id: &str) -> InviteeProfile {
        InviteeProfile {
            display_name: format!("User {}", user_id),
            status: "active".to_string(),
        }
    }
}
