//! 积分与金币账本服务
//!
//! 为两种虚拟币种提供双轨记账：会过期的"积分"与永久有效的"金币"，
//! 因用户行为（签到、邀请、完善资料）入账，随时间被消耗或过期。
//!
//! ## 核心功能
//!
//! - **流水入账**：带符号金额的不可变流水，更正以补偿流水表达
//! - **积分单元**：每笔正数积分入账与流水同事务派生一个独立过期的单元
//! - **过期回收**：后台任务分批删除已过宽限期的单元并发布过期事件
//! - **余额对账**：从原始数据重算权威余额，检测偏差并覆盖投影缓存
//! - **余额查询**：积分实时聚合活跃单元，金币读取投影缓存
//!
//! ## 模块结构
//!
//! - `models`: 领域模型定义
//! - `error`: 错误类型定义
//! - `events`: 领域事件与进程内事件总线
//! - `repository`: 数据库仓储层
//! - `service`: 业务服务层
//! - `worker`: 后台回收任务

pub mod error;
pub mod events;
pub mod models;
pub mod repository;
pub mod service;
pub mod worker;

pub use error::{LedgerError, Result};
pub use events::{EventBus, LedgerEvent, LedgerEventKind};
pub use models::*;
pub use repository::{
    BalanceUnitRepository, PgUserDirectory, ProjectionRepository, TradeRepository,
};
pub use service::{BalanceQueryService, ReconciliationService, TradeService, dto};
pub use worker::ReclaimWorker;
