//! 账本服务枚举类型定义
//!
//! 所有枚举都支持数据库（sqlx）和 JSON（serde）序列化

use serde::{Deserialize, Serialize};

/// 币种
///
/// 积分会过期，金币不会过期，两者不可互相兑换
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Currency {
    /// 积分 - 按发放批次独立过期
    Points,
    /// 金币 - 永久有效
    Coins,
}

impl Currency {
    /// 指标标签与日志使用的稳定名称
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Points => "POINTS",
            Self::Coins => "COINS",
        }
    }
}

/// 流水类型
///
/// 封闭枚举，每个类型只属于一个币种；新增发放场景必须扩展此枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeType {
    // === 积分类型 ===
    /// 每日签到奖励（积分）
    SignIn,
    /// 邀请好友注册（积分）
    Invite,
    /// 完善个人资料（积分）
    ProfileComplete,
    /// 运营活动奖励（积分）
    Activity,
    /// 积分修正/回收 - 负数表示扣回，正数表示补发
    Recovery,

    // === 金币类型 ===
    /// 每日签到奖励（金币）
    CoinSignIn,
    /// 邀请好友注册（金币）
    CoinInvite,
    /// 金币消费
    CoinSpend,
    /// 金币修正/回收
    CoinRecovery,
}

impl TradeType {
    /// 返回该流水类型所属的币种
    pub fn currency(&self) -> Currency {
        match self {
            Self::SignIn
            | Self::Invite
            | Self::ProfileComplete
            | Self::Activity
            | Self::Recovery => Currency::Points,
            Self::CoinSignIn | Self::CoinInvite | Self::CoinSpend | Self::CoinRecovery => {
                Currency::Coins
            }
        }
    }

    /// 指标标签与日志使用的稳定名称
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SignIn => "SIGN_IN",
            Self::Invite => "INVITE",
            Self::ProfileComplete => "PROFILE_COMPLETE",
            Self::Activity => "ACTIVITY",
            Self::Recovery => "RECOVERY",
            Self::CoinSignIn => "COIN_SIGN_IN",
            Self::CoinInvite => "COIN_INVITE",
            Self::CoinSpend => "COIN_SPEND",
            Self::CoinRecovery => "COIN_RECOVERY",
        }
    }
}

/// 来源引用类型
///
/// 标识流水的触发来源记录，与 source_ref_id 一起构成多态引用，
/// 用于追溯和审计；账本本身不解引用这些记录
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceRefType {
    /// 签到记录
    SignInRecord,
    /// 邀请记录
    Invitation,
    /// 用户资料
    UserProfile,
    /// 订单
    Order,
    /// 运营后台操作
    AdminOperation,
}
