//! 积分单元实体定义
//!
//! 每次正数积分入账被拆解为一个独立过期的单元，可用积分即活跃单元之和。
//! 单元没有状态字段：活跃/过期完全由过期时间与当前时间比较得出，
//! 避免状态标志与时间戳发生分叉。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 积分单元
///
/// 与对应的正数积分流水同事务创建、金额与过期时间一致；
/// 只会被回收任务在宽限期之后物理删除
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BalanceUnit {
    pub id: i64,
    /// 用户 ID
    pub user_id: String,
    /// 发放金额（恒为正数）
    pub amount: i64,
    /// 发放说明（与流水一致）
    pub description: String,
    /// 过期时间
    pub expired_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BalanceUnit {
    /// 是否计入可用积分
    ///
    /// 可用性采用严格大于：恰好到期的单元不再计入
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expired_at > now
    }

    /// 是否可被回收
    ///
    /// 回收采用小于等于：过期时间不晚于 cutoff（now - 宽限期）的单元被删除。
    /// 两侧边界配合宽限期保证同一单元不会同时可计数又可回收。
    pub fn is_reclaimable(&self, cutoff: DateTime<Utc>) -> bool {
        self.expired_at <= cutoff
    }
}
