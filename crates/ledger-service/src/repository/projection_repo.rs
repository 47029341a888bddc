//! 余额投影仓储
//!
//! 维护按用户缓存的可用余额行。投影不具权威性，
//! 永远可以由对账服务从流水与单元重建

use async_trait::async_trait;
use sqlx::PgPool;

use super::traits::ProjectionRepositoryTrait;
use crate::error::Result;
use crate::models::UserBalance;

/// 余额投影仓储
pub struct ProjectionRepository {
    pool: PgPool,
}

impl ProjectionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 查询用户的余额投影行
    pub async fn get(&self, user_id: &str) -> Result<Option<UserBalance>> {
        let balance = sqlx::query_as::<_, UserBalance>(
            r#"
            SELECT user_id, available_points, available_coins, updated_at
            FROM user_balances
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(balance)
    }

    /// 覆盖写入缓存的可用积分
    pub async fn upsert_points(&self, user_id: &str, available_points: i64) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_balances (user_id, available_points, available_coins, updated_at)
            VALUES ($1, $2, 0, NOW())
            ON CONFLICT (user_id) DO UPDATE
            SET available_points = EXCLUDED.available_points, updated_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(available_points)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// 覆盖写入缓存的可用金币
    pub async fn upsert_coins(&self, user_id: &str, available_coins: i64) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_balances (user_id, available_points, available_coins, updated_at)
            VALUES ($1, 0, $2, NOW())
            ON CONFLICT (user_id) DO UPDATE
            SET available_coins = EXCLUDED.available_coins, updated_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(available_coins)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl ProjectionRepositoryTrait for ProjectionRepository {
    async fn get(&self, user_id: &str) -> Result<Option<UserBalance>> {
        self.get(user_id).await
    }

    async fn upsert_points(&self, user_id: &str, available_points: i64) -> Result<()> {
        self.upsert_points(user_id, available_points).await
    }

    async fn upsert_coins(&self, user_id: &str, available_coins: i64) -> Result<()> {
        self.upsert_coins(user_id, available_coins).await
    }
}
