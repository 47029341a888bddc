//! 积分与金币账本服务进程
//!
//! 承载过期回收任务与对账事件监听；入账与查询作为库 API
//! 由上游策略引擎进程内调用。

use anyhow::Result;
use ledger_shared::{config::AppConfig, database::Database, observability};
use std::sync::Arc;
use tokio::signal;
use tracing::info;

use points_ledger::{
    events::EventBus,
    repository::{BalanceUnitRepository, ProjectionRepository, TradeRepository},
    service::ReconciliationService,
    worker::ReclaimWorker,
};

#[tokio::main]
async fn main() -> Result<()> {
    // 1. 统一加载配置：从 config/{service_name}.toml 加载
    let config = AppConfig::load("points-ledger").unwrap_or_else(|e| {
        eprintln!("Failed to load config, using defaults: {}", e);
        AppConfig::default()
    });

    // 2. 初始化可观测性（日志 + /metrics + /health）
    let obs_config = config
        .observability
        .clone()
        .with_service_name(&config.service_name);
    let _guard = observability::init(&obs_config).await?;

    info!("Starting points-ledger...");
    info!(environment = %config.environment, "Configuration loaded");

    // 3. 初始化数据库连接
    let db = Database::connect(&config.database).await?;
    let pool = db.pool().clone();
    info!("Database connection established");

    // 4. 创建事件总线与仓储
    let events = EventBus::default();
    let trade_repo = Arc::new(TradeRepository::new(pool.clone()));
    let unit_repo = Arc::new(BalanceUnitRepository::new(pool.clone()));
    let projection_repo = Arc::new(ProjectionRepository::new(pool.clone()));
    info!("Repositories initialized");

    // 5. 启动对账事件监听
    // 订阅必须先于 Worker 启动，避免漏掉首轮过期事件
    let reconciliation = Arc::new(ReconciliationService::new(
        trade_repo,
        unit_repo,
        projection_repo,
    ));
    let receiver = events.subscribe();
    let listener_handle = {
        let reconciliation = reconciliation.clone();
        tokio::spawn(async move {
            reconciliation.run_listener(receiver).await;
        })
    };
    info!("Reconciliation listener started");

    // 6. 启动过期回收 Worker
    let worker = ReclaimWorker::new(pool.clone(), events.clone(), &config.reclaimer);
    let worker_handle = tokio::spawn(async move {
        worker.run().await;
    });
    info!("Reclaim worker started");

    // 7. 等待退出信号
    shutdown_signal().await;

    worker_handle.abort();
    listener_handle.abort();
    db.close().await;

    info!("Service shutdown complete");
    Ok(())
}

/// 优雅关闭信号处理
///
/// 监听 Ctrl+C 和 SIGTERM 信号，用于 Kubernetes 优雅关闭
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown...");
        }
    }
}
