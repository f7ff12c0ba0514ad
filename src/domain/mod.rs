//! Domain Layer
//!
//! Core business entity definitions

pub mod referral_code;

pub use referral_code::{
    InviteeSummary, ReferralCode, ReferralKind, ReferralStatus, ReferralValidation, CODE_ALPHABET,
    CODE_LENGTH,
};
