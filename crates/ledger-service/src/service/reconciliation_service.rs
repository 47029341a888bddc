//! 对账服务
//!
//! 从原始数据（流水与积分单元）重算权威余额并覆盖投影缓存。
//! 积分侧在每次单元删除事件后触发；金币侧仅在显式对账/运维修复时触发，
//! 两次对账之间允许陈旧——这是刻意保留的不对称。
//!
//! 重算始终采用绝对值覆盖而非增量修正，因此事件的重复投递无害。

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{error, info, instrument, warn};

use ledger_shared::observability::metrics;

use crate::error::Result;
use crate::events::{LedgerEvent, LedgerEventKind};
use crate::models::Currency;
use crate::repository::{
    BalanceUnitRepositoryTrait, ProjectionRepositoryTrait, TradeRepositoryTrait,
};

/// 对账服务
pub struct ReconciliationService<T, B, P>
where
    T: TradeRepositoryTrait,
    B: BalanceUnitRepositoryTrait,
    P: ProjectionRepositoryTrait,
{
    trade_repo: Arc<T>,
    unit_repo: Arc<B>,
    projection_repo: Arc<P>,
}

impl<T, B, P> ReconciliationService<T, B, P>
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

    /// 重算用户可用积分并覆盖投影
    ///
    /// 权威值为过期时间严格在未来的单元金额之和。
    /// 缓存与权威值不一致时记录偏差告警后覆盖，绝不静默忽略。
    #[instrument(skip(self))]
    pub async fn recompute_points(&self, user_id: &str) -> Result<i64> {
        let actual = self.unit_repo.available_points(user_id, Utc::now()).await?;
        self.detect_drift(user_id, Currency::Points, actual).await?;
        self.projection_repo.upsert_points(user_id, actual).await?;

        info!(user_id, available_points = actual, "积分投影已重算");
        Ok(actual)
    }

    /// 重算用户可用金币并覆盖投影
    ///
    /// 权威值为全部金币流水的带符号金额之和，与投影此前陈旧程度无关
    #[instrument(skip(self))]
    pub async fn recompute_coins(&self, user_id: &str) -> Result<i64> {
        let actual = self
            .trade_repo
            .sum_by_currency(user_id, Currency::Coins)
            .await?;
        self.detect_drift(user_id, Currency::Coins, actual).await?;
        self.projection_repo.upsert_coins(user_id, actual).await?;

        info!(user_id, available_coins = actual, "金币投影已重算");
        Ok(actual)
    }

    /// 按币种重算（运维修复入口）
    pub async fn recompute(&self, user_id: &str, currency: Currency) -> Result<i64> {
        match currency {
            Currency::Points => self.recompute_points(user_id).await,
            Currency::Coins => self.recompute_coins(user_id).await,
        }
    }

    /// 偏差检测
    ///
    /// 投影与新鲜权威值不一致即为偏差：记录告警与指标，随后由调用方覆盖修正
    async fn detect_drift(&self, user_id: &str, currency: Currency, actual: i64) -> Result<()> {
        if let Some(cached) = self.projection_repo.get(user_id).await? {
            let cached_value = match currency {
                Currency::Points => cached.available_points,
                Currency::Coins => cached.available_coins,
            };
            if cached_value != actual {
                warn!(
                    user_id,
                    currency = currency.as_str(),
                    cached = cached_value,
                    actual,
                    "检测到投影偏差，将以权威值覆盖"
                );
                metrics::record_reconciliation_drift(currency.as_str());
            }
        }
        Ok(())
    }

    /// 事件监听循环
    ///
    /// 消费事件总线：每个单元过期事件触发一次积分重算。
    /// 投递语义为至少一次且可能乱序，绝对值重算保证幂等；
    /// 发生积压丢弃（Lagged）时仅告警，后续事件会再次触发重算兜底。
    pub async fn run_listener(&self, mut receiver: broadcast::Receiver<LedgerEvent>) {
        info!("对账事件监听已启动");

        loop {
            match receiver.recv().await {
                Ok(event) => {
                    if let LedgerEventKind::UnitExpired { user_id, .. } = event.kind {
                        if let Err(e) = self.recompute_points(&user_id).await {
                            error!(
                                user_id = %user_id,
                                event_id = %event.event_id,
                                error = %e,
                                "过期事件触发的积分重算失败"
                            );
                        }
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "对账监听积压，部分事件被丢弃");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    info!("事件总线已关闭，对账监听退出");
                    break;
                }
            }
        }
    }
}
