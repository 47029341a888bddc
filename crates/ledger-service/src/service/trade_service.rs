//! 入账服务
//!
//! 处理双币种账本写入的核心业务逻辑，包括：
//! - 请求校验（金额、类型与币种、积分过期时间）
//! - 用户存在性校验
//! - 事务性写入（流水 + 积分单元，同事务成败）
//! - 入账后发布领域事件
//!
//! ## 入账流程
//!
//! 1. 参数校验 -> 2. 用户校验 -> 3. 事务写入 -> 4. 指标与事件发布
//!
//! 去重与资格判定（"每日一次"等）是上游策略引擎的职责，
//! 本服务不感知业务节奏规则，提交什么就写什么。

use std::sync::Arc;

use chrono::Utc;
use sqlx::PgPool;
use tracing::{info, instrument};

use ledger_shared::observability::metrics;

use crate::error::{LedgerError, Result};
use crate::events::{EventBus, LedgerEventKind};
use crate::models::{BalanceUnit, Currency, Trade};
use crate::repository::{BalanceUnitRepository, TradeRepository, UserDirectoryTrait};
use crate::service::dto::RecordTradeRequest;

/// 入账服务
///
/// 流水一经写入即不可变：没有任何更新或删除路径，
/// 更正必须以补偿流水（RECOVERY / COIN_RECOVERY）表达。
pub struct TradeService<U>
where
    U: UserDirectoryTrait,
{
    user_directory: Arc<U>,
    pool: PgPool,
    events: EventBus,
}

impl<U> TradeService<U>
where
    U: UserDirectoryTrait,
{
    pub fn new(user_directory: Arc<U>, pool: PgPool, events: EventBus) -> Self {
        Self {
            user_directory,
            pool,
            events,
        }
    }

    /// 记录一笔流水
    ///
    /// 积分的正数入账在同一事务内派生对应的积分单元（金额、过期时间一致），
    /// 两者同时成功或同时失败；任何读取方都不会观察到只有其一的状态。
    /// 返回创建完成的流水。
    #[instrument(skip(self, request), fields(user_id = %request.user_id, trade_type = ?request.trade_type, amount = request.amount))]
    pub async fn record_trade(&self, request: RecordTradeRequest) -> Result<Trade> {
        // 1. 参数校验（任何写入之前）
        self.validate(&request)?;

        // 2. 用户存在性校验：账本绝不创建用户
        if !self.user_directory.exists(&request.user_id).await? {
            return Err(LedgerError::UserNotFound(request.user_id));
        }

        // 3. 事务内写入
        let trade = self.execute_record(request).await?;

        // 4. 指标与事件
        metrics::record_trade(trade.currency.as_str(), trade.trade_type.as_str());
        if trade.requires_balance_unit() {
            metrics::record_unit_granted();
        }
        self.events.publish(LedgerEventKind::TradeRecorded {
            trade_id: trade.id,
            user_id: trade.user_id.clone(),
            currency: trade.currency,
            amount: trade.amount,
        });

        info!(
            trade_id = trade.id,
            user_id = %trade.user_id,
            currency = trade.currency.as_str(),
            amount = trade.amount,
            "流水入账成功"
        );

        Ok(trade)
    }

    /// 请求校验
    ///
    /// - 积分正数入账必须携带未来的过期时间
    /// - 金币不会过期，携带过期时间视为调用方错误
    fn validate(&self, request: &RecordTradeRequest) -> Result<()> {
        let currency = request.trade_type.currency();

        match currency {
            Currency::Points => {
                if request.amount > 0 {
                    let expires_at = request.expires_at.ok_or_else(|| {
                        LedgerError::Validation("积分发放必须指定过期时间".to_string())
                    })?;
                    if expires_at <= Utc::now() {
                        return Err(LedgerError::Validation(
                            "积分过期时间必须晚于当前时间".to_string(),
                        ));
                    }
                }
            }
            Currency::Coins => {
                if request.expires_at.is_some() {
                    return Err(LedgerError::Validation(
                        "金币流水不应携带过期时间".to_string(),
                    ));
                }
            }
        }

        Ok(())
    }

    /// 执行入账事务
    ///
    /// 在单个事务内完成：
    /// - 追加流水
    /// - （积分正数入账）创建积分单元
    async fn execute_record(&self, request: RecordTradeRequest) -> Result<Trade> {
        let now = Utc::now();
        let mut trade = Trade {
            id: 0,
            user_id: request.user_id,
            currency: request.trade_type.currency(),
            trade_type: request.trade_type,
            amount: request.amount,
            description: request.description,
            source_ref_id: request.source_ref_id,
            source_ref_type: request.source_ref_type,
            created_at: now,
        };

        let mut tx = self.pool.begin().await?;

        let trade_id = TradeRepository::create_in_tx(&mut tx, &trade).await?;
        trade.id = trade_id;

        if trade.requires_balance_unit() {
            // 校验阶段已保证过期时间存在；走到这里缺失说明对应关系无法建立
            let expired_at = request.expires_at.ok_or_else(|| {
                LedgerError::IntegrityViolation(format!(
                    "正数积分流水缺少过期时间，无法派生单元: trade_id={}",
                    trade_id
                ))
            })?;

            let unit = BalanceUnit {
                id: 0,
                user_id: trade.user_id.clone(),
                amount: trade.amount,
                description: trade.description.clone(),
                expired_at,
                created_at: now,
                updated_at: now,
            };
            let unit_id = BalanceUnitRepository::create_in_tx(&mut tx, &unit).await?;

            info!(
                trade_id,
                unit_id,
                expired_at = %expired_at,
                "积分单元已随流水同事务创建"
            );
        }

        tx.commit().await?;

        Ok(trade)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TradeType;
    use crate::repository::traits::MockUserDirectoryTrait;
    use chrono::Duration;

    fn service_with_mock_directory(
        directory: MockUserDirectoryTrait,
    ) -> TradeService<MockUserDirectoryTrait> {
        // 校验路径不触达数据库，lazy 连接即可
        let pool = PgPool::connect_lazy("postgres://localhost/test").unwrap();
        TradeService::new(Arc::new(directory), pool, EventBus::new(16))
    }

    #[tokio::test]
    async fn test_positive_points_without_expiry_rejected() {
        let svc = service_with_mock_directory(MockUserDirectoryTrait::new());

        let request = RecordTradeRequest::new("user-1", TradeType::SignIn, 10, "每日签到");
        let result = svc.record_trade(request).await;

        assert!(matches!(result, Err(LedgerError::Validation(_))));
    }

    #[tokio::test]
    async fn test_points_expiry_in_past_rejected() {
        let svc = service_with_mock_directory(MockUserDirectoryTrait::new());

        let request = RecordTradeRequest::new("user-1", TradeType::SignIn, 10, "每日签到")
            .with_expiry(Utc::now() - Duration::days(1));
        let result = svc.record_trade(request).await;

        assert!(matches!(result, Err(LedgerError::Validation(_))));
    }

    #[tokio::test]
    async fn test_coins_with_expiry_rejected() {
        let svc = service_with_mock_directory(MockUserDirectoryTrait::new());

        let request = RecordTradeRequest::new("user-1", TradeType::CoinInvite, 20, "邀请奖励")
            .with_expiry(Utc::now() + Duration::days(30));
        let result = svc.record_trade(request).await;

        assert!(matches!(result, Err(LedgerError::Validation(_))));
    }

    #[tokio::test]
    async fn test_unknown_user_rejected_before_write() {
        let mut directory = MockUserDirectoryTrait::new();
        directory
            .expect_exists()
            .withf(|user_id| user_id == "user-404")
            .returning(|_| Ok(false));
        let svc = service_with_mock_directory(directory);

        // 负数积分流水不要求过期时间，可直达用户校验
        let request = RecordTradeRequest::new("user-404", TradeType::Recovery, -5, "扣回");
        let result = svc.record_trade(request).await;

        assert!(
            matches!(result, Err(LedgerError::UserNotFound(ref id)) if id == "user-404"),
            "未知用户应返回 UserNotFound"
        );
    }
}
