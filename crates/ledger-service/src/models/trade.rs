//! 流水实体定义
//!
//! 流水是账本的唯一事实来源：一经写入永不修改、永不删除，
//! 任何更正都以新的补偿流水（RECOVERY / COIN_RECOVERY）表达

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::{Currency, SourceRefType, TradeType};

/// 账本流水
///
/// 记录一次带符号的余额变动：正数为入账，负数为扣减，零允许（产生无影响的流水）。
/// 积分的正数入账会在同一事务内派生一条积分单元记录。
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    pub id: i64,
    /// 用户 ID
    pub user_id: String,
    /// 币种（由 trade_type 决定，冗余存储便于按币种聚合）
    pub currency: Currency,
    /// 流水类型
    pub trade_type: TradeType,
    /// 带符号变动金额
    pub amount: i64,
    /// 变动说明
    pub description: String,
    /// 多态来源引用 ID
    #[sqlx(default)]
    pub source_ref_id: Option<String>,
    /// 多态来源引用类型
    #[sqlx(default)]
    pub source_ref_type: Option<SourceRefType>,
    pub created_at: DateTime<Utc>,
}

impl Trade {
    /// 是否为正向入账
    pub fn is_credit(&self) -> bool {
        self.amount > 0
    }

    /// 该流水是否需要派生积分单元
    ///
    /// 仅积分的正数入账派生单元；非正数流水只留在账本中
    pub fn requires_balance_unit(&self) -> bool {
        self.currency == Currency::Points && self.amount > 0
    }

    /// 创建签到积分入账
    pub fn sign_in(user_id: String, amount: i64, description: String) -> Self {
        Self::new(user_id, TradeType::SignIn, amount, description)
    }

    /// 创建积分修正流水
    ///
    /// 扣回传负数，补发传正数
    pub fn recovery(user_id: String, amount: i64, description: String) -> Self {
        Self::new(user_id, TradeType::Recovery, amount, description)
    }

    fn new(user_id: String, trade_type: TradeType, amount: i64, description: String) -> Self {
        Self {
            id: 0,
            user_id,
            currency: trade_type.currency(),
            trade_type,
            amount,
            description,
            source_ref_id: None,
            source_ref_type: None,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_balance_unit() {
        let mut trade = Trade::sign_in("user-1".to_string(), 10, "每日签到".to_string());
        assert!(trade.requires_balance_unit());

        // 非正数积分流水不派生单元
        trade.amount = 0;
        assert!(!trade.requires_balance_unit());
        trade.amount = -5;
        assert!(!trade.requires_balance_unit());

        // 金币流水无论正负都不派生单元
        let coin = Trade::new(
            "user-1".to_string(),
            TradeType::CoinInvite,
            20,
            "邀请奖励".to_string(),
        );
        assert!(!coin.requires_balance_unit());
    }

    #[test]
    fn test_builders_derive_currency() {
        let trade = Trade::sign_in("user-1".to_string(), 10, "每日签到".to_string());
        assert_eq!(trade.currency, Currency::Points);
        assert_eq!(trade.trade_type, TradeType::SignIn);
        assert!(trade.is_credit());

        let recovery = Trade::recovery("user-2".to_string(), -5, "重复发放扣回".to_string());
        assert_eq!(recovery.currency, Currency::Points);
        assert!(!recovery.is_credit());
    }
}
