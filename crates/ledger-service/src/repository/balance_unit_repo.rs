//! 积分单元仓储
//!
//! 管理按批次独立过期的积分单元：与流水同事务创建、
//! 按严格未来过期时间聚合可用积分、按批次回收已过宽限期的单元

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool, Row};

use super::traits::BalanceUnitRepositoryTrait;
use crate::error::{LedgerError, Result};
use crate::models::BalanceUnit;

/// 回收批次中被删除的单元
///
/// 删除语句 RETURNING 的最小投影，删除提交后用于逐条发布过期事件
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReclaimedUnit {
    pub id: i64,
    pub user_id: String,
    pub amount: i64,
}

/// 积分单元仓储
pub struct BalanceUnitRepository {
    pool: PgPool,
}

impl BalanceUnitRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 在事务中创建积分单元（发放）
    ///
    /// 调用方契约：仅积分的正数入账派生单元。
    /// 非正数在此兜底拒绝，除此之外不做进一步校验。
    pub async fn create_in_tx(tx: &mut PgConnection, unit: &BalanceUnit) -> Result<i64> {
        if unit.amount <= 0 {
            return Err(LedgerError::Validation(format!(
                "积分单元金额必须大于 0，实际: {}",
                unit.amount
            )));
        }

        let row = sqlx::query(
            r#"
            INSERT INTO balance_units (user_id, amount, description, expired_at,
                                       created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(&unit.user_id)
        .bind(unit.amount)
        .bind(&unit.description)
        .bind(unit.expired_at)
        .bind(unit.created_at)
        .bind(unit.updated_at)
        .fetch_one(tx)
        .await?;

        Ok(row.get("id"))
    }

    /// 用户当前可用积分
    ///
    /// 过期时间严格晚于 now 的单元金额之和；
    /// 恰好此刻过期的单元不再计入（与回收侧的 <= cutoff 边界配合）
    pub async fn available_points(&self, user_id: &str, now: DateTime<Utc>) -> Result<i64> {
        let row = sqlx::query(
            r#"
            SELECT COALESCE(SUM(amount), 0)::BIGINT AS total
            FROM balance_units
            WHERE user_id = $1 AND expired_at > $2
            "#,
        )
        .bind(user_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get("total"))
    }

    /// 列出用户的全部单元（含已过期未回收的）
    pub async fn list_by_user(&self, user_id: &str) -> Result<Vec<BalanceUnit>> {
        let units = sqlx::query_as::<_, BalanceUnit>(
            r#"
            SELECT id, user_id, amount, description, expired_at, created_at, updated_at
            FROM balance_units
            WHERE user_id = $1
            ORDER BY expired_at ASC, id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(units)
    }

    /// 回收一批已过宽限期的单元
    ///
    /// 单条语句完成选取与删除，整批原子提交；
    /// `FOR UPDATE SKIP LOCKED` 保证多实例部署时批次互不重叠。
    /// 返回被删除的单元，由调用方在提交后发布过期事件（先删后发）。
    pub async fn reclaim_expired_chunk(
        &self,
        cutoff: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<ReclaimedUnit>> {
        let mut tx = self.pool.begin().await?;

        let reclaimed = sqlx::query_as::<_, ReclaimedUnit>(
            r#"
            DELETE FROM balance_units
            WHERE id IN (
                SELECT id
                FROM balance_units
                WHERE expired_at <= $1
                ORDER BY expired_at ASC
                FOR UPDATE SKIP LOCKED
                LIMIT $2
            )
            RETURNING id, user_id, amount
            "#,
        )
        .bind(cutoff)
        .bind(limit)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(reclaimed)
    }

    /// 过期时间不晚于 cutoff 的单元数量
    pub async fn count_expired(&self, cutoff: DateTime<Utc>) -> Result<i64> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS total
            FROM balance_units
            WHERE expired_at <= $1
            "#,
        )
        .bind(cutoff)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get("total"))
    }
}

#[async_trait]
impl BalanceUnitRepositoryTrait for BalanceUnitRepository {
    async fn available_points(&self, user_id: &str, now: DateTime<Utc>) -> Result<i64> {
        self.available_points(user_id, now).await
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<BalanceUnit>> {
        self.list_by_user(user_id).await
    }

    async fn count_expired(&self, cutoff: DateTime<Utc>) -> Result<i64> {
        self.count_expired(cutoff).await
    }
}
