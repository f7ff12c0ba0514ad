//! 测试通用工具
//!
//! 提供测试辅助函数和两种存储实现共用的契约检查

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Once};

use coachref::core::store::CodeStore;
use coachref::{RedeemError, ReferralCode, ReferralKind, ReferralStatus, StoreError};

static INIT: Once = Once::new();

/// 初始化测试环境
pub fn setup() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("debug")
            .with_test_writer()
            .try_init();
    });
}

/// 生成唯一的测试 ID
pub fn generate_test_id() -> String {
    format!("test-{}", uuid::Uuid::new_v4())
}

pub fn create_test_record(code: &str, owner_id: &str, created_at: i64) -> ReferralCode {
    ReferralCode::new(code, owner_id, "Alex", ReferralKind::Coach, created_at)
}

/// 插入、查找、重复检查
pub async fn check_insert_and_lookup(store: Arc<dyn CodeStore>) {
    let owner = generate_test_id();
    let record = create_test_record("INSERT01", &owner, 1_000);
    store.insert(&record).await.unwrap();

    let found = store.find_by_code("INSERT01").await.unwrap().unwrap();
    assert_eq!(found, record);
    assert_eq!(
        store.find_active_by_code("INSERT01").await.unwrap().as_ref(),
        Some(&record)
    );
    assert!(store.find_by_code("MISSING0").await.unwrap().is_none());

    let err = store
        .insert(&create_test_record("INSERT01", "someone_else", 1_001))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Duplicate(ref d) if d.code == "INSERT01"));
    assert_eq!(store.list_by_owner("someone_else").await.unwrap().len(), 0);
}

/// 兑换的条件更新
pub async fn check_compare_and_set(store: Arc<dyn CodeStore>) {
    let owner = generate_test_id();
    store
        .insert(&create_test_record("REDEEM01", &owner, 1_000))
        .await
        .unwrap();

    let redeemed = store
        .compare_and_set_redeemed("REDEEM01", "client_7", 2_000)
        .await
        .unwrap();
    assert_eq!(redeemed.status, ReferralStatus::Used);
    assert_eq!(redeemed.invited_user_id.as_deref(), Some("client_7"));
    assert_eq!(redeemed.redeemed_at, Some(2_000));
    assert_eq!(redeemed.owner_id, owner);
    assert_eq!(redeemed.created_at, 1_000);

    let err = store
        .compare_and_set_redeemed("REDEEM01", "client_8", 3_000)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Redeem(RedeemError::AlreadyRedeemed)));

    let err = store
        .compare_and_set_redeemed("NOSUCH00", "client_8", 3_000)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Redeem(RedeemError::NotFound)));

    assert!(store.find_active_by_code("REDEEM01").await.unwrap().is_none());
    let stored = store.find_by_code("REDEEM01").await.unwrap().unwrap();
    assert_eq!(stored.invited_user_id.as_deref(), Some("client_7"));
    assert_eq!(stored.redeemed_at, Some(2_000));
}

/// 按签发人列表
pub async fn check_listing(store: Arc<dyn CodeStore>) {
    let owner = generate_test_id();
    for code in ["LIST0003", "LIST0001", "LIST0002"] {
        store
            .insert(&create_test_record(code, &owner, 1_000))
            .await
            .unwrap();
    }
    store
        .compare_and_set_redeemed("LIST0001", "client_1", 1_500)
        .await
        .unwrap();

    let all: Vec<_> = store
        .list_by_owner(&owner)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.code)
        .collect();
    assert_eq!(all, vec!["LIST0003", "LIST0001", "LIST0002"]);

    let redeemed = store.list_redeemed_by_owner(&owner).await.unwrap();
    assert_eq!(redeemed.len(), 1);
    assert_eq!(redeemed[0].code, "LIST0001");
}

/// 过期清理与过期后复用
pub async fn check_expiry(store: Arc<dyn CodeStore>) {
    let owner = generate_test_id();
    store
        .insert(&create_test_record("EXPIRE01", &owner, 100))
        .await
        .unwrap();
    store
        .insert(&create_test_record("EXPIRE02", &owner, 100))
        .await
        .unwrap();
    store
        .insert(&create_test_record("EXPIRE03", &owner, 900))
        .await
        .unwrap();
    store
        .compare_and_set_redeemed("EXPIRE02", "client_1", 150)
        .await
        .unwrap();

    assert_eq!(store.expire_created_before(500).await.unwrap(), 1);
    assert_eq!(store.expire_created_before(500).await.unwrap(), 0);

    let err = store
        .compare_and_set_redeemed("EXPIRE01", "client_2", 600)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Redeem(RedeemError::Expired)));

    let statuses: Vec<_> = store
        .list_by_owner(&owner)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.status)
        .collect();
    assert_eq!(
        statuses,
        vec![
            ReferralStatus::Expired,
            ReferralStatus::Used,
            ReferralStatus::Active
        ]
    );

    // 过期后邀请码字符串可以重新签发
    store
        .insert(&create_test_record("EXPIRE01", "new_owner", 1_000))
        .await
        .unwrap();
    let latest = store.find_active_by_code("EXPIRE01").await.unwrap().unwrap();
    assert_eq!(latest.owner_id, "new_owner");
    store
        .compare_and_set_redeemed("EXPIRE01", "client_3", 1_100)
        .await
        .unwrap();
}

/// 并发插入同一邀请码，只有一个成功
pub async fn check_concurrent_insert(store: Arc<dyn CodeStore>) {
    let mut handles = Vec::new();
    for i in 0..16 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store
                .insert(&create_test_record("RACE0001", &format!("owner_{}", i), 1_000))
                .await
        }));
    }

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) => successes += 1,
            Err(StoreError::Duplicate(_)) => {}
            Err(e) => panic!("unexpected error: {}", e),
        }
    }
    assert_eq!(successes, 1);
}

/// 并发兑换同一邀请码，只有一个成功
pub async fn check_concurrent_redeem(store: Arc<dyn CodeStore>) {
    store
        .insert(&create_test_record("RACE0002", "owner_1", 1_000))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for i in 0..16 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store
                .compare_and_set_redeemed("RACE0002", &format!("client_{}", i), 2_000)
                .await
        }));
    }

    let mut winners = HashSet::new();
    let mut already = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(record) => {
                winners.insert(record.invited_user_id.unwrap());
            }
            Err(StoreError::Redeem(RedeemError::AlreadyRedeemed)) => already += 1,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }
    assert_eq!(winners.len(), 1);
    assert_eq!(already, 15);

    let stored = store.find_by_code("RACE0002").await.unwrap().unwrap();
    assert!(winners.contains(stored.invited_user_id.as_deref().unwrap()));
}
