//! 流水仓储
//!
//! 提供流水的追加写入与查询。流水表只增不改：
//! 任何更正通过新的补偿流水表达，仓储不暴露更新与删除

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool, Row};

use super::traits::TradeRepositoryTrait;
use crate::error::Result;
use crate::models::{Currency, Trade};

/// 流水仓储
pub struct TradeRepository {
    pool: PgPool,
}

impl TradeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 在事务中追加一条流水
    ///
    /// 返回新记录的 ID。积分入账与对应单元的创建必须共用同一事务，
    /// 因此写入口只提供事务版本。
    pub async fn create_in_tx(tx: &mut PgConnection, trade: &Trade) -> Result<i64> {
        let row = sqlx::query(
            r#"
            INSERT INTO trades (user_id, currency, trade_type, amount, description,
                                source_ref_id, source_ref_type, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(&trade.user_id)
        .bind(trade.currency)
        .bind(trade.trade_type)
        .bind(trade.amount)
        .bind(&trade.description)
        .bind(&trade.source_ref_id)
        .bind(trade.source_ref_type)
        .bind(trade.created_at)
        .fetch_one(tx)
        .await?;

        Ok(row.get("id"))
    }

    /// 按 ID 查询流水
    pub async fn get(&self, id: i64) -> Result<Option<Trade>> {
        let trade = sqlx::query_as::<_, Trade>(
            r#"
            SELECT id, user_id, currency, trade_type, amount, description,
                   source_ref_id, source_ref_type, created_at
            FROM trades
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(trade)
    }

    /// 列出用户的流水记录
    ///
    /// 按时间倒序排列，返回最近的 limit 条记录
    pub async fn list_by_user(&self, user_id: &str, limit: i64) -> Result<Vec<Trade>> {
        let trades = sqlx::query_as::<_, Trade>(
            r#"
            SELECT id, user_id, currency, trade_type, amount, description,
                   source_ref_id, source_ref_type, created_at
            FROM trades
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(trades)
    }

    /// 某币种全部流水的带符号金额之和
    ///
    /// 金币的权威余额即此聚合；积分侧仅用于审计（可用积分由单元派生）
    pub async fn sum_by_currency(&self, user_id: &str, currency: Currency) -> Result<i64> {
        let row = sqlx::query(
            r#"
            SELECT COALESCE(SUM(amount), 0)::BIGINT AS total
            FROM trades
            WHERE user_id = $1 AND currency = $2
            "#,
        )
        .bind(user_id)
        .bind(currency)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get("total"))
    }

    /// 列出某时间之后的用户流水（审计用）
    pub async fn list_by_user_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Trade>> {
        let trades = sqlx::query_as::<_, Trade>(
            r#"
            SELECT id, user_id, currency, trade_type, amount, description,
                   source_ref_id, source_ref_type, created_at
            FROM trades
            WHERE user_id = $1 AND created_at >= $2
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(trades)
    }
}

#[async_trait]
impl TradeRepositoryTrait for TradeRepository {
    async fn get(&self, id: i64) -> Result<Option<Trade>> {
        self.get(id).await
    }

    async fn list_by_user(&self, user_id: &str, limit: i64) -> Result<Vec<Trade>> {
        self.list_by_user(user_id, limit).await
    }

    async fn sum_by_currency(&self, user_id: &str, currency: Currency) -> Result<i64> {
        self.sum_by_currency(user_id, currency).await
    }
}
