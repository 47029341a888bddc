//! 领域事件模型与进程内事件总线
//!
//! 账本的写路径在提交后显式发布领域事件，副作用消费方（对账服务等）
//! 通过订阅事件总线接入，替代模型生命周期钩子的隐式触发。
//! 投递语义为至少一次：消费方必须以绝对值重算的方式幂等处理，
//! 重复或乱序的事件不会造成偏差。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use crate::models::Currency;

// ---------------------------------------------------------------------------
// LedgerEventKind — 事件类型
// ---------------------------------------------------------------------------

/// 账本领域事件类型
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerEventKind {
    /// 一笔流水已入账
    TradeRecorded {
        trade_id: i64,
        user_id: String,
        currency: Currency,
        amount: i64,
    },
    /// 一个过期积分单元已被回收删除
    UnitExpired {
        unit_id: i64,
        user_id: String,
        amount: i64,
    },
}

impl LedgerEventKind {
    /// 事件关联的用户 ID
    pub fn user_id(&self) -> &str {
        match self {
            Self::TradeRecorded { user_id, .. } | Self::UnitExpired { user_id, .. } => user_id,
        }
    }
}

// ---------------------------------------------------------------------------
// LedgerEvent — 事件信封
// ---------------------------------------------------------------------------

/// 领域事件信封
///
/// event_id 采用 UUID v7：时间有序，便于日志检索与去重排查
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEvent {
    /// 事件唯一标识
    pub event_id: String,
    /// 事件发生时间
    pub occurred_at: DateTime<Utc>,
    /// 事件内容
    #[serde(flatten)]
    pub kind: LedgerEventKind,
}

impl LedgerEvent {
    /// 构建新事件，自动生成 event_id 并记录当前时间
    pub fn new(kind: LedgerEventKind) -> Self {
        Self {
            event_id: Uuid::now_v7().to_string(),
            occurred_at: Utc::now(),
            kind,
        }
    }
}

// ---------------------------------------------------------------------------
// EventBus — 进程内事件总线
// ---------------------------------------------------------------------------

/// 进程内事件总线
///
/// 基于 tokio broadcast 通道：发布方不感知消费方数量，
/// 没有订阅者时事件被丢弃（此时也没有需要更新的消费方状态）。
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<LedgerEvent>,
}

impl EventBus {
    /// 创建事件总线
    ///
    /// capacity 是每个订阅者的积压上限，超出后最旧的事件被覆盖，
    /// 订阅方会收到 Lagged 并应触发一次兜底重算
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// 发布事件
    pub fn publish(&self, kind: LedgerEventKind) {
        let event = LedgerEvent::new(kind);
        match self.sender.send(event) {
            Ok(receivers) => {
                debug!(receivers, "领域事件已发布");
            }
            Err(_) => {
                // 无订阅者，事件无处投递
                debug!("领域事件无订阅者，已丢弃");
            }
        }
    }

    /// 订阅事件流
    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_and_subscribe() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(LedgerEventKind::UnitExpired {
            unit_id: 7,
            user_id: "user-1".to_string(),
            amount: 10,
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind.user_id(), "user-1");
        assert!(!event.event_id.is_empty());
        match event.kind {
            LedgerEventKind::UnitExpired { unit_id, amount, .. } => {
                assert_eq!(unit_id, 7);
                assert_eq!(amount, 10);
            }
            other => panic!("应为 UnitExpired 事件，实际: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_noop() {
        let bus = EventBus::new(16);
        // 没有订阅者时发布不应 panic 也不应报错
        bus.publish(LedgerEventKind::TradeRecorded {
            trade_id: 1,
            user_id: "user-1".to_string(),
            currency: Currency::Coins,
            amount: 20,
        });
    }

    #[tokio::test]
    async fn test_multiple_subscribers_each_receive() {
        let bus = EventBus::new(16);
        let mut rx_a = bus.subscribe();
        let mut rx_b = bus.subscribe();

        bus.publish(LedgerEventKind::UnitExpired {
            unit_id: 1,
            user_id: "user-2".to_string(),
            amount: 5,
        });

        assert_eq!(rx_a.recv().await.unwrap().kind.user_id(), "user-2");
        assert_eq!(rx_b.recv().await.unwrap().kind.user_id(), "user-2");
    }
}
