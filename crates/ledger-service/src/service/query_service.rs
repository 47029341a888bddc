//! 余额查询服务
//!
//! 对外暴露两种币种的可用余额与流水查询。
//! 可用积分直接从活跃单元聚合（权威口径）；
//! 可用金币读取投影缓存，两次对账之间允许陈旧——这是刻意保留的不对称。

use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use crate::error::{LedgerError, Result};
use crate::models::{Trade, UserBalance};
use crate::repository::{
    BalanceUnitRepositoryTrait, ProjectionRepositoryTrait, TradeRepositoryTrait,
};

/// 余额查询服务
pub struct BalanceQueryService<T, B, P>
where
    T: TradeRepositoryTrait,
    B: BalanceUnitRepositoryTrait,
    P: ProjectionRepositoryTrait,
{
    trade_repo: Arc<T>,
    unit_repo: Arc<B>,
    projection_repo: Arc<P>,
}

impl<T, B, P> BalanceQueryService<T, B, P>
where
    T: TradeRepositoryTrait,
    B: BalanceUnitRepositoryTrait,
    P: ProjectionRepositoryTrait,
{
    pub fn new(trade_repo: Arc<T>, unit_repo: Arc<B>, projection_repo: Arc<P>) -> Self {
        Self {
            trade_repo,
            unit_repo,
            projection_repo,
        }
    }

    /// 用户当前可用积分
    ///
    /// 过期时间严格晚于此刻的单元金额之和，实时聚合
    #[instrument(skip(self))]
    pub async fn available_points(&self, user_id: &str) -> Result<i64> {
        self.unit_repo.available_points(user_id, Utc::now()).await
    }

    /// 用户当前可用金币
    ///
    /// 读取投影缓存；尚无投影行的用户视为 0
    #[instrument(skip(self))]
    pub async fn available_coins(&self, user_id: &str) -> Result<i64> {
        let balance = self.projection_repo.get(user_id).await?;
        Ok(balance.map(|b| b.available_coins).unwrap_or(0))
    }

    /// 用户余额投影行
    pub async fn balance(&self, user_id: &str) -> Result<UserBalance> {
        let balance = self.projection_repo.get(user_id).await?;
        Ok(balance.unwrap_or_else(|| UserBalance::zeroed(user_id.to_string())))
    }

    /// 用户最近的流水记录
    pub async fn list_trades(&self, user_id: &str, limit: i64) -> Result<Vec<Trade>> {
        self.trade_repo.list_by_user(user_id, limit).await
    }

    /// 按 ID 查询流水
    pub async fn get_trade(&self, trade_id: i64) -> Result<Trade> {
        self.trade_repo
            .get(trade_id)
            .await?
            .ok_or(LedgerError::TradeNotFound(trade_id))
    }
}
