//! 服务层请求/响应对象

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{SourceRefType, TradeType};

/// 入账请求
///
/// 金额为带符号整数：正数入账、负数扣减、零允许（产生无影响的流水）。
/// 积分的正数入账必须携带过期时间。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordTradeRequest {
    pub user_id: String,
    pub trade_type: TradeType,
    pub amount: i64,
    pub description: String,
    pub source_ref_id: Option<String>,
    pub source_ref_type: Option<SourceRefType>,
    /// 过期时间（仅积分正数入账需要）
    pub expires_at: Option<DateTime<Utc>>,
}

impl RecordTradeRequest {
    pub fn new(
        user_id: impl Into<String>,
        trade_type: TradeType,
        amount: i64,
        description: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            trade_type,
            amount,
            description: description.into(),
            source_ref_id: None,
            source_ref_type: None,
            expires_at: None,
        }
    }

    /// 附加多态来源引用
    pub fn with_source(mut self, ref_type: SourceRefType, ref_id: impl Into<String>) -> Self {
        self.source_ref_type = Some(ref_type);
        self.source_ref_id = Some(ref_id.into());
        self
    }

    /// 附加过期时间
    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }
}
