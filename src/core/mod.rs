//! 核心层：存储抽象与邀请码业务规则

pub mod directory;
pub mod referral;
pub mod store;
