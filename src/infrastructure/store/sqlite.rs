//! SQLite 存储实现
//!
//! 使用 SQLite 作为后端，适合需要持久化的场景。
//! - active 记录的邀请码唯一性由部分唯一索引保证
//! - 兑换是一条带 `status = 'active'` 条件的 UPDATE

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, TransactionBehavior};

use crate::core::store::{CodeStore, StoreResult};
use crate::domain::{ReferralCode, ReferralStatus};
use crate::errors::{DuplicateCodeError, RedeemError, StoreError};

const SELECT_COLUMNS: &str = "SELECT id, code, kind, owner_id, owner_name, invited_user_id, created_at, redeemed_at, status
     FROM referral_codes";

/// SQLite 存储
pub struct SqliteCodeStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCodeStore {
    /// 创建新的 SQLite 存储
    ///
    /// 如果数据库文件不存在，会自动创建
    pub fn new<P: AsRef<Path>>(db_path: P) -> StoreResult<Self> {
        let conn = Connection::open(db_path)?;
        Self::from_connection(conn)
    }

    /// 创建内存数据库（用于测试）
    pub fn new_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// 初始化数据库表结构
    fn init_schema(&self) -> StoreResult<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Backend(format!("Failed to acquire database lock: {}", e)))?;

        conn.execute_batch(
            "
            -- 邀请码表，seq 保留插入顺序
            CREATE TABLE IF NOT EXISTS referral_codes (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT UNIQUE NOT NULL,
                code TEXT NOT NULL,
                kind TEXT NOT NULL CHECK (kind IN ('coach', 'client')),
                owner_id TEXT NOT NULL,
                owner_name TEXT NOT NULL,
                invited_user_id TEXT,
                created_at INTEGER NOT NULL,
                redeemed_at INTEGER,
                status TEXT NOT NULL CHECK (status IN ('active', 'used', 'expired'))
            );

            -- 同一时刻只允许一条 active 记录持有某个邀请码
            CREATE UNIQUE INDEX IF NOT EXISTS idx_referral_codes_active_code
                ON referral_codes(code) WHERE status = 'active';

            CREATE INDEX IF NOT EXISTS idx_referral_codes_code ON referral_codes(code, seq);
            CREATE INDEX IF NOT EXISTS idx_referral_codes_owner ON referral_codes(owner_id, seq);
            ",
        )?;

        Ok(())
    }

    /// 在阻塞线程池中执行数据库操作
    async fn execute<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Connection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::Backend(format!("Failed to acquire database lock: {}", e)))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Backend(format!("Task failed: {}", e)))?
    }
}

fn conversion_error(idx: usize, msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, msg.into())
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<ReferralCode> {
    let kind: String = row.get(2)?;
    let status: String = row.get(8)?;

    Ok(ReferralCode {
        id: row.get(0)?,
        code: row.get(1)?,
        kind: kind.parse().map_err(|e| conversion_error(2, e))?,
        owner_id: row.get(3)?,
        owner_name: row.get(4)?,
        invited_user_id: row.get(5)?,
        created_at: row.get(6)?,
        redeemed_at: row.get(7)?,
        status: status.parse().map_err(|e| conversion_error(8, e))?,
    })
}

/// 仅 active 邀请码唯一索引冲突视为重复，其余约束错误（id 冲突、CHECK 失败）按后端错误处理
fn is_active_code_conflict(err: &rusqlite::ffi::Error, msg: Option<&str>) -> bool {
    err.code == ErrorCode::ConstraintViolation
        && err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        && msg.is_some_and(|m| m.contains("referral_codes.code"))
}

fn latest_by_code(conn: &Connection, code: &str) -> rusqlite::Result<Option<ReferralCode>> {
    conn.query_row(
        &format!("{} WHERE code = ?1 ORDER BY seq DESC LIMIT 1", SELECT_COLUMNS),
        [code],
        row_to_record,
    )
    .optional()
}

fn query_records(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> rusqlite::Result<Vec<ReferralCode>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, row_to_record)?;

    let mut records = Vec::new();
    for record in rows {
        records.push(record?);
    }
    Ok(records)
}

#[async_trait]
impl CodeStore for SqliteCodeStore {
    async fn insert(&self, record: &ReferralCode) -> StoreResult<()> {
        let record = record.clone();
        self.execute(move |conn| {
            let result = conn.execute(
                "INSERT INTO referral_codes (
                    id, code, kind, owner_id, owner_name,
                    invited_user_id, created_at, redeemed_at, status
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                rusqlite::params![
                    &record.id,
                    &record.code,
                    record.kind.as_str(),
                    &record.owner_id,
                    &record.owner_name,
                    record.invited_user_id.as_deref(),
                    record.created_at,
                    record.redeemed_at,
                    record.status.as_str(),
                ],
            );

            match result {
                Ok(_) => Ok(()),
                Err(rusqlite::Error::SqliteFailure(e, msg))
                    if is_active_code_conflict(&e, msg.as_deref()) =>
                {
                    Err(DuplicateCodeError { code: record.code }.into())
                }
                Err(e) => Err(e.into()),
            }
        })
        .await
    }

    async fn find_by_code(&self, code: &str) -> StoreResult<Option<ReferralCode>> {
        let code = code.to_string();
        self.execute(move |conn| Ok(latest_by_code(conn, &code)?))
            .await
    }

    async fn find_active_by_code(&self, code: &str) -> StoreResult<Option<ReferralCode>> {
        let code = code.to_string();
        self.execute(move |conn| {
            let record = conn
                .query_row(
                    &format!("{} WHERE code = ?1 AND status = 'active'", SELECT_COLUMNS),
                    [&code],
                    row_to_record,
                )
                .optional()?;
            Ok(record)
        })
        .await
    }

    async fn compare_and_set_redeemed(
        &self,
        code: &str,
        invited_user_id: &str,
        now: i64,
    ) -> StoreResult<ReferralCode> {
        let code = code.to_string();
        let invited_user_id = invited_user_id.to_string();
        self.execute(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let changed = tx.execute(
                "UPDATE referral_codes
                 SET status = 'used', invited_user_id = ?2, redeemed_at = ?3
                 WHERE code = ?1 AND status = 'active'",
                rusqlite::params![&code, &invited_user_id, now],
            )?;

            let latest = latest_by_code(&tx, &code)?;
            tx.commit()?;

            match (changed, latest) {
                (1, Some(record)) => Ok(record),
                (_, None) => Err(RedeemError::NotFound.into()),
                (_, Some(record)) => match record.status {
                    ReferralStatus::Expired => Err(RedeemError::Expired.into()),
                    ReferralStatus::Used | ReferralStatus::Active => {
                        Err(RedeemError::AlreadyRedeemed.into())
                    }
                },
            }
        })
        .await
    }

    async fn list_by_owner(&self, owner_id: &str) -> StoreResult<Vec<ReferralCode>> {
        let owner_id = owner_id.to_string();
        self.execute(move |conn| {
            Ok(query_records(
                conn,
                &format!("{} WHERE owner_id = ?1 ORDER BY seq", SELECT_COLUMNS),
                [&owner_id],
            )?)
        })
        .await
    }

    async fn list_redeemed_by_owner(&self, owner_id: &str) -> StoreResult<Vec<ReferralCode>> {
        let owner_id = owner_id.to_string();
        self.execute(move |conn| {
            Ok(query_records(
                conn,
                &format!(
                    "{} WHERE owner_id = ?1 AND status = 'used' ORDER BY seq",
                    SELECT_COLUMNS
                ),
                [&owner_id],
            )?)
        })
        .await
    }

    async fn expire_created_before(&self, cutoff: i64) -> StoreResult<usize> {
        self.execute(move |conn| {
            let changed = conn.execute(
                "UPDATE referral_codes SET status = 'expired'
                 WHERE status = 'active' AND created_at < ?1",
                [cutoff],
            )?;
            Ok(changed)
        })
        .await
    }
}
