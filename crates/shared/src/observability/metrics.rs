//! Prometheus 指标模块
//!
//! 基于 metrics crate 和 metrics-exporter-prometheus 实现指标收集与导出。
//! 指标通过独立的 HTTP 端口暴露，供 Prometheus 抓取。

use anyhow::Result;
use axum::{Router, routing::get};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::OnceLock;
use tokio::net::TcpListener;
use tracing::{error, info};

use super::ObservabilityConfig;

/// 全局 Prometheus handle，用于渲染指标
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics 资源守卫
pub struct MetricsHandle {
    _server_handle: tokio::task::JoinHandle<()>,
}

/// 初始化 Prometheus 指标导出
///
/// 启动一个独立的 HTTP 服务器在指定端口暴露 `/metrics` 和 `/health` 端点。
pub async fn init(config: &ObservabilityConfig) -> Result<MetricsHandle> {
    let builder = PrometheusBuilder::new();
    let handle = builder.install_recorder()?;

    // 保存到全局，供其他地方获取指标快照
    let _ = PROMETHEUS_HANDLE.set(handle.clone());

    register_common_metrics(&config.service_name);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
    let server_handle = start_metrics_server(addr, handle).await?;

    Ok(MetricsHandle {
        _server_handle: server_handle,
    })
}

/// 注册通用指标（预定义的业务指标）
///
/// 描述会出现在 /metrics 端点的 HELP 注释中
fn register_common_metrics(service_name: &str) {
    metrics::describe_counter!("ledger_trades_total", "Total number of recorded trades");
    metrics::describe_counter!(
        "ledger_units_granted_total",
        "Total number of balance units granted"
    );
    metrics::describe_counter!(
        "ledger_units_reclaimed_total",
        "Total number of expired balance units reclaimed"
    );
    metrics::describe_counter!(
        "ledger_reconciliation_drift_total",
        "Total number of projection drifts detected during reconciliation"
    );
    metrics::describe_counter!(
        "ledger_reclaim_sweep_failures_total",
        "Total number of reclaim sweeps aborted after exhausting retries"
    );
    metrics::describe_gauge!(
        "worker_last_run_timestamp_seconds",
        "Unix timestamp of the last completed worker iteration"
    );

    // 记录服务启动
    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);
}

/// 启动指标 HTTP 服务器
async fn start_metrics_server(
    addr: SocketAddr,
    handle: PrometheusHandle,
) -> Result<tokio::task::JoinHandle<()>> {
    let app = Router::new()
        .route("/metrics", get(move || std::future::ready(handle.render())))
        .route("/health", get(|| async { "OK" }));

    let listener = TcpListener::bind(addr).await?;
    info!("Metrics server listening on {}", addr);

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Metrics server error: {}", e);
        }
    });

    Ok(server_handle)
}

/// 获取全局 Prometheus handle（用于自定义渲染）
pub fn get_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get()
}

// ============================================================================
// 便捷的指标记录函数
// ============================================================================

/// 记录一笔流水入账
#[inline]
pub fn record_trade(currency: &str, trade_type: &str) {
    metrics::counter!(
        "ledger_trades_total",
        "currency" => currency.to_string(),
        "trade_type" => trade_type.to_string()
    )
    .increment(1);
}

/// 记录积分单元发放
#[inline]
pub fn record_unit_granted() {
    metrics::counter!("ledger_units_granted_total").increment(1);
}

/// 记录过期单元回收数量
#[inline]
pub fn record_units_reclaimed(count: u64) {
    metrics::counter!("ledger_units_reclaimed_total").increment(count);
}

/// 记录一次对账偏差
#[inline]
pub fn record_reconciliation_drift(currency: &str) {
    metrics::counter!(
        "ledger_reconciliation_drift_total",
        "currency" => currency.to_string()
    )
    .increment(1);
}

/// 记录一次回收扫描失败告警
#[inline]
pub fn record_reclaim_sweep_failure() {
    metrics::counter!("ledger_reclaim_sweep_failures_total").increment(1);
}

/// 记录 Worker 最近一次运行时间
#[inline]
pub fn set_worker_last_run(worker: &str) {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0);
    metrics::gauge!(
        "worker_last_run_timestamp_seconds",
        "worker" => worker.to_string()
    )
    .set(now);
}
