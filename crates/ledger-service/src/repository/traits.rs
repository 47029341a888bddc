//! 仓储 Trait 定义
//!
//! 定义仓储接口，便于服务层依赖抽象而非具体实现，支持 mock 测试

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{BalanceUnit, Currency, Trade, UserBalance};

/// 流水仓储接口
///
/// 流水只增不改：接口上不存在更新或删除方法
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TradeRepositoryTrait: Send + Sync {
    async fn get(&self, id: i64) -> Result<Option<Trade>>;
    async fn list_by_user(&self, user_id: &str, limit: i64) -> Result<Vec<Trade>>;
    /// 某币种全部流水的带符号金额之和
    async fn sum_by_currency(&self, user_id: &str, currency: Currency) -> Result<i64>;
}

/// 积分单元仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BalanceUnitRepositoryTrait: Send + Sync {
    /// 严格晚于 now 过期的单元金额之和
    async fn available_points(&self, user_id: &str, now: DateTime<Utc>) -> Result<i64>;
    async fn list_by_user(&self, user_id: &str) -> Result<Vec<BalanceUnit>>;
    /// 过期时间不晚于 cutoff 的单元数量（回收前的观测）
    async fn count_expired(&self, cutoff: DateTime<Utc>) -> Result<i64>;
}

/// 余额投影仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProjectionRepositoryTrait: Send + Sync {
    async fn get(&self, user_id: &str) -> Result<Option<UserBalance>>;
    async fn upsert_points(&self, user_id: &str, available_points: i64) -> Result<()>;
    async fn upsert_coins(&self, user_id: &str, available_coins: i64) -> Result<()>;
}

/// 用户目录接口
///
/// 用户由外部系统管理，账本只校验存在性，绝不创建用户
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserDirectoryTrait: Send + Sync {
    async fn exists(&self, user_id: &str) -> Result<bool>;
}
