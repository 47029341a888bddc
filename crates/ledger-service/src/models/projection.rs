//! 用户余额投影
//!
//! 按用户缓存的可用余额，永远可以从原始数据重建，不具权威性

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 用户余额投影
///
/// available_points 在每次单元删除后重算；
/// available_coins 仅在显式对账时重算，两次对账之间允许陈旧
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserBalance {
    /// 用户 ID
    pub user_id: String,
    /// 缓存的可用积分
    pub available_points: i64,
    /// 缓存的可用金币
    pub available_coins: i64,
    pub updated_at: DateTime<Utc>,
}

impl UserBalance {
    /// 尚无任何余额记录的用户视为两种币种均为零
    pub fn zeroed(user_id: String) -> Self {
        Self {
            user_id,
            available_points: 0,
            available_coins: 0,
            updated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeroed() {
        let balance = UserBalance::zeroed("user-1".to_string());
        assert_eq!(balance.available_points, 0);
        assert_eq!(balance.available_coins, 0);
    }
}
