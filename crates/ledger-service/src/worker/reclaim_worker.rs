//! 过期积分回收 Worker
//!
//! 定期扫描并物理删除已过宽限期的积分单元，每删除一个单元发布一条过期事件，
//! 由对账监听重算受影响用户的积分投影。
//!
//! 任务本身无状态且幂等：对已清空的时间窗口重复扫描不会删除任何记录。
//! 按批次处理，每批的删除独立原子提交，批与批之间被中断不会留下半套状态；
//! 顺序为先删后发，消费方以绝对值重算方式容忍至少一次/重复投递。
//! 使用 `FOR UPDATE SKIP LOCKED` 保证多实例部署时批次不会重复处理。

use std::time::Duration;

use chrono::Utc;
use sqlx::PgPool;
use tracing::{debug, error, info};

use ledger_shared::config::ReclaimerConfig;
use ledger_shared::observability::metrics;
use ledger_shared::retry::{RetryPolicy, retry_with_policy};

use crate::error::{LedgerError, Result};
use crate::events::{EventBus, LedgerEventKind};
use crate::repository::BalanceUnitRepository;

/// 过期回收 Worker
///
/// 以固定间隔轮询数据库，分批回收已过宽限期的积分单元。
/// 设计为可在多实例环境中安全运行。
pub struct ReclaimWorker {
    repo: BalanceUnitRepository,
    events: EventBus,
    /// 轮询间隔（建议 300 秒）
    poll_interval: Duration,
    /// 每批删除的最大记录数
    batch_size: i64,
    /// 到期后的保留宽限期（天），业务口径一个月
    grace_days: i64,
    /// 批次失败的退避重试策略
    retry_policy: RetryPolicy,
}

impl ReclaimWorker {
    /// 按配置创建 ReclaimWorker 实例
    pub fn new(pool: PgPool, events: EventBus, config: &ReclaimerConfig) -> Self {
        Self {
            repo: BalanceUnitRepository::new(pool),
            events,
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            batch_size: config.batch_size,
            grace_days: config.grace_days,
            retry_policy: RetryPolicy::with_max_retries(config.max_chunk_retries),
        }
    }

    /// 使用默认配置创建 ReclaimWorker
    pub fn with_defaults(pool: PgPool, events: EventBus) -> Self {
        Self::new(pool, events, &ReclaimerConfig::default())
    }

    /// 主循环：持续回收直到进程退出
    pub async fn run(&self) {
        info!(
            poll_interval = ?self.poll_interval,
            batch_size = self.batch_size,
            grace_days = self.grace_days,
            "ReclaimWorker 已启动"
        );

        loop {
            match self.sweep().await {
                Ok(reclaimed) => {
                    if reclaimed > 0 {
                        info!(reclaimed, "本轮回收扫描完成");
                    }
                }
                Err(e) => {
                    // 批次重试耗尽后整轮告警放弃；残留的过期单元
                    // 仍在表中，下一轮扫描会再次处理，不会被静默跳过
                    error!(error = %e, "回收扫描失败，已超过最大重试次数，等待下一轮");
                    metrics::record_reclaim_sweep_failure();
                }
            }

            // 记录 Worker 健康状态
            metrics::set_worker_last_run("reclaim_worker");

            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// 执行一轮回收扫描
    ///
    /// cutoff 取当前时间减去宽限期：到期但仍在宽限期内的单元不会被删除
    /// （它们早已不计入可用积分）。返回本轮删除的单元总数。
    pub async fn sweep(&self) -> Result<u64> {
        let cutoff = Utc::now() - chrono::Duration::days(self.grace_days);

        let pending = self.repo.count_expired(cutoff).await?;
        if pending == 0 {
            return Ok(0);
        }
        debug!(pending, cutoff = %cutoff, "发现待回收的过期单元");

        let mut total: u64 = 0;

        loop {
            let chunk = retry_with_policy(
                &self.retry_policy,
                "reclaim_expired_chunk",
                |e: &LedgerError| e.is_retryable(),
                || self.repo.reclaim_expired_chunk(cutoff, self.batch_size),
            )
            .await?;

            if chunk.is_empty() {
                break;
            }

            let count = chunk.len();

            // 批次已提交，逐单元发布过期事件（先删后发）
            for unit in &chunk {
                self.events.publish(LedgerEventKind::UnitExpired {
                    unit_id: unit.id,
                    user_id: unit.user_id.clone(),
                    amount: unit.amount,
                });
            }

            metrics::record_units_reclaimed(count as u64);
            total += count as u64;

            info!(count, cutoff = %cutoff, "一批过期单元已回收");

            // 不满一批说明窗口已清空
            if (count as i64) < self.batch_size {
                break;
            }
        }

        Ok(total)
    }
}
