//! SQLite 存储实现测试

mod common;

use std::sync::Arc;

use coachref::core::store::CodeStore;
use coachref::{ReferralKind, ReferralStatus, SqliteCodeStore};

fn create_store() -> Arc<dyn CodeStore> {
    common::setup();
    Arc::new(SqliteCodeStore::new_in_memory().unwrap())
}

#[tokio::test]
async fn test_sqlite_store_insert_and_lookup() {
    common::check_insert_and_lookup(create_store()).await;
}

#[tokio::test]
async fn test_sqlite_store_compare_and_set() {
    common::check_compare_and_set(create_store()).await;
}

#[tokio::test]
async fn test_sqlite_store_listing() {
    common::check_listing(create_store()).await;
}

#[tokio::test]
async fn test_sqlite_store_expiry() {
    common::check_expiry(create_store()).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_sqlite_store_concurrent_insert() {
    common::check_concurrent_insert(create_store()).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_sqlite_store_concurrent_redeem() {
    common::check_concurrent_redeem(create_store()).await;
}

#[tokio::test]
async fn test_sqlite_store_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("referrals.db");

    {
        let store = SqliteCodeStore::new(&db_path).unwrap();
        store
            .insert(&common::create_test_record("PERSIST1", "coach_1", 1_000))
            .await
            .unwrap();
        store
            .insert(&coachref::ReferralCode::new(
                "PERSIST2",
                "coach_1",
                "Alex",
                ReferralKind::Client,
                1_000,
            ))
            .await
            .unwrap();
        store
            .compare_and_set_redeemed("PERSIST1", "client_7", 2_000)
            .await
            .unwrap();
    }

    let store = SqliteCodeStore::new(&db_path).unwrap();
    let records = store.list_by_owner("coach_1").await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].status, ReferralStatus::Used);
    assert_eq!(records[0].invited_user_id.as_deref(), Some("client_7"));
    assert_eq!(records[1].kind, ReferralKind::Client);
    assert_eq!(records[1].status, ReferralStatus::Active);

    // 重新打开后唯一约束仍然生效
    assert!(store
        .insert(&common::create_test_record("PERSIST2", "coach_2", 3_000))
        .await
        .is_err());
}
