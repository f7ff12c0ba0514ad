//! 邀请码相关模型

use rand::Rng;
use serde::{Deserialize, Serialize};

/// 邀请码长度
pub const CODE_LENGTH: usize = 8;

/// 邀请码字符集（大写字母 + 数字）
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// 邀请码类型，决定注册后走教练还是学员的折扣流程
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferralKind {
    Coach,
    Client,
}

impl ReferralKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferralKind::Coach => "coach",
            ReferralKind::Client => "client",
        }
    }
}

impl std::str::FromStr for ReferralKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "coach" => Ok(ReferralKind::Coach),
            "client" => Ok(ReferralKind::Client),
            _ => Err(format!("Unknown referral type: {}", s)),
        }
    }
}

impl std::fmt::Display for ReferralKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 邀请码状态
///
/// 只允许 `Active -> Used` 或 `Active -> Expired`，终态不可离开。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferralStatus {
    Active,
    Used,
    Expired,
}

impl ReferralStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferralStatus::Active => "active",
            ReferralStatus::Used => "used",
            ReferralStatus::Expired => "expired",
        }
    }

    /// 是否允许迁移到 `next`
    pub fn can_transition_to(&self, next: ReferralStatus) -> bool {
        matches!(
            (self, next),
            (ReferralStatus::Active, ReferralStatus::Used)
                | (ReferralStatus::Active, ReferralStatus::Expired)
        )
    }
}

impl std::str::FromStr for ReferralStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ReferralStatus::Active),
            "used" => Ok(ReferralStatus::Used),
            "expired" => Ok(ReferralStatus::Expired),
            _ => Err(format!("Unknown referral status: {}", s)),
        }
    }
}

/// 邀请码记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralCode {
    pub id: String,
    pub code: String,
    #[serde(rename = "type")]
    pub kind: ReferralKind,
    pub owner_id: String,
    pub owner_name: String,
    pub invited_user_id: Option<String>,
    pub created_at: i64,          // 创建时间戳（秒）
    pub redeemed_at: Option<i64>, // 兑换时间戳（秒）
    pub status: ReferralStatus,
}

impl ReferralCode {
    /// 以给定邀请码字符串创建一条 active 记录
    pub fn new(
        code: impl Into<String>,
        owner_id: impl Into<String>,
        owner_name: impl Into<String>,
        kind: ReferralKind,
        created_at: i64,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            code: code.into(),
            kind,
            owner_id: owner_id.into(),
            owner_name: owner_name.into(),
            invited_user_id: None,
            created_at,
            redeemed_at: None,
            status: ReferralStatus::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == ReferralStatus::Active
    }

    /// 生成随机邀请码（8位大写字母数字组合）
    pub fn generate_code() -> String {
        Self::generate_code_with(&mut rand::thread_rng())
    }

    pub fn generate_code_with<R: Rng + ?Sized>(rng: &mut R) -> String {
        (0..CODE_LENGTH)
            .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
            .collect()
    }

    /// 检查字符串是否符合邀请码格式
    pub fn is_well_formed(code: &str) -> bool {
        code.len() == CODE_LENGTH && code.bytes().all(|b| CODE_ALPHABET.contains(&b))
    }
}

/// 校验成功时返回给调用方的信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferralValidation {
    pub owner_name: String,
    pub kind: ReferralKind,
}

/// "我邀请了谁" 视图中的一项
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteeSummary {
    pub code: String,
    pub invited_display_name: String,
    pub registered_at: i64,
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_generate_code_format() {
        for _ in 0..100 {
            let code = ReferralCode::generate_code();
            assert_eq!(code.len(), CODE_LENGTH);
            assert!(ReferralCode::is_well_formed(&code), "bad code {}", code);
        }
    }

    #[test]
    fn test_generate_code_seeded_is_deterministic() {
        let a = ReferralCode::generate_code_with(&mut StdRng::seed_from_u64(7));
        let b = ReferralCode::generate_code_with(&mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
    }

    #[test]
    fn test_is_well_formed() {
        assert!(ReferralCode::is_well_formed("ABCD1234"));
        assert!(!ReferralCode::is_well_formed("abcd1234"));
        assert!(!ReferralCode::is_well_formed("ABC"));
        assert!(!ReferralCode::is_well_formed("ABCD-234"));
        assert!(!ReferralCode::is_well_formed(""));
    }

    #[test]
    fn test_new_record_is_active() {
        let record = ReferralCode::new("ABCD1234", "coach_1", "Alex", ReferralKind::Coach, 100);
        assert!(record.is_active());
        assert!(record.invited_user_id.is_none());
        assert!(record.redeemed_at.is_none());
        assert_eq!(record.created_at, 100);
    }

    #[test]
    fn test_status_transitions() {
        use ReferralStatus::*;
        assert!(Active.can_transition_to(Used));
        assert!(Active.can_transition_to(Expired));
        assert!(!Used.can_transition_to(Active));
        assert!(!Used.can_transition_to(Expired));
        assert!(!Expired.can_transition_to(Used));
        assert!(!Active.can_transition_to(Active));
    }

    #[test]
    fn test_kind_parse_and_serde() {
        assert_eq!("Coach".parse::<ReferralKind>().unwrap(), ReferralKind::Coach);
        assert_eq!("client".parse::<ReferralKind>().unwrap(), ReferralKind::Client);
        assert!("trainer".parse::<ReferralKind>().is_err());

        let json = serde_json::to_string(&ReferralKind::Client).unwrap();
        assert_eq!(json, "\"client\"");
    }

    #[test]
    fn test_record_serializes_camel_case() {
        let record = ReferralCode::new("ABCD1234", "coach_1", "Alex", ReferralKind::Coach, 100);
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["ownerName"], "Alex");
        assert_eq!(value["type"], "coach");
        assert_eq!(value["status"], "active");
    }
}
