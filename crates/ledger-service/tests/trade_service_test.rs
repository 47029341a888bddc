//! TradeService 集成测试
//!
//! 使用真实 PostgreSQL 测试入账的完整流程：校验、用户检查、
//! 流水与积分单元的同事务写入。
//!
//! ## 运行方式
//!
//! ```bash
//! DATABASE_URL=postgres://... cargo test --test trade_service_test -- --ignored
//! ```
//!
//! 需要先执行 migrations/ 下的表结构。

use chrono::{Duration, Utc};
use points_ledger::error::LedgerError;
use points_ledger::events::EventBus;
use points_ledger::models::{SourceRefType, TradeType};
use points_ledger::repository::{
    BalanceUnitRepository, PgUserDirectory, ProjectionRepository, TradeRepository,
};
use points_ledger::service::dto::RecordTradeRequest;
use points_ledger::service::{BalanceQueryService, TradeService};
use sqlx::PgPool;
use std::sync::Arc;

// ==================== 辅助函数 ====================

/// 从环境变量读取数据库 URL，未设置则 panic
fn database_url() -> String {
    std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for integration tests")
}

/// 创建 TradeService 实例（使用真实用户目录）
fn setup_trade_service(pool: &PgPool) -> TradeService<PgUserDirectory> {
    let directory = Arc::new(PgUserDirectory::new(pool.clone()));
    TradeService::new(directory, pool.clone(), EventBus::new(64))
}

/// 创建查询服务实例（使用真实仓储）
fn setup_query_service(
    pool: &PgPool,
) -> BalanceQueryService<TradeRepository, BalanceUnitRepository, ProjectionRepository> {
    BalanceQueryService::new(
        Arc::new(TradeRepository::new(pool.clone())),
        Arc::new(BalanceUnitRepository::new(pool.clone())),
        Arc::new(ProjectionRepository::new(pool.clone())),
    )
}

/// 插入测试用户（幂等，已存在则跳过）
async fn seed_user(pool: &PgPool, user_id: &str) {
    sqlx::query("INSERT INTO users (id) VALUES ($1) ON CONFLICT (id) DO NOTHING")
        .bind(user_id)
        .execute(pool)
        .await
        .expect("插入测试用户失败");
}

/// 清理测试数据，按依赖顺序删除
///
/// 只清理当前测试使用的特定 user_id，避免影响其他测试
async fn cleanup_test_data(pool: &PgPool, user_ids: &[&str]) {
    for uid in user_ids {
        for table in ["balance_units", "trades", "user_balances", "users"] {
            let column = if table == "users" { "id" } else { "user_id" };
            sqlx::query(&format!("DELETE FROM {} WHERE {} = $1", table, column))
                .bind(uid)
                .execute(pool)
                .await
                .ok();
        }
    }
}

/// 统计用户的积分单元数量
async fn count_units(pool: &PgPool, user_id: &str) -> i64 {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM balance_units WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .unwrap();
    row.0
}

/// 统计用户的流水数量
async fn count_trades(pool: &PgPool, user_id: &str) -> i64 {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM trades WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .unwrap();
    row.0
}

// ==================== 测试用例 ====================

/// 正数积分入账：流水与单元同事务创建，金额与过期时间一致
#[tokio::test]
#[ignore = "需要 PostgreSQL"]
async fn test_points_credit_creates_trade_and_unit() {
    let pool = PgPool::connect(&database_url()).await.unwrap();
    let user_id = "integ_trade_credit_001";

    cleanup_test_data(&pool, &[user_id]).await;
    seed_user(&pool, user_id).await;

    let svc = setup_trade_service(&pool);
    let expiry = Utc::now() + Duration::days(30);

    let trade = svc
        .record_trade(
            RecordTradeRequest::new(user_id, TradeType::SignIn, 10, "每日签到")
                .with_source(SourceRefType::SignInRecord, "checkin-001")
                .with_expiry(expiry),
        )
        .await
        .expect("入账应成功");

    assert!(trade.id > 0);
    assert_eq!(trade.amount, 10);

    // 恰好一个单元，金额与过期时间与流水一致
    let units: Vec<(i64, chrono::DateTime<Utc>)> =
        sqlx::query_as("SELECT amount, expired_at FROM balance_units WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(&pool)
            .await
            .unwrap();
    assert_eq!(units.len(), 1, "正数积分入账应恰好派生一个单元");
    assert_eq!(units[0].0, 10);
    assert!(
        (units[0].1 - expiry).num_milliseconds().abs() < 1,
        "单元过期时间应与请求一致"
    );

    // 查询口径：可用积分等于活跃单元金额之和
    let query = setup_query_service(&pool);
    assert_eq!(query.available_points(user_id).await.unwrap(), 10);

    // 流水可查且与入账一致
    let trades = query.list_trades(user_id, 10).await.unwrap();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].id, trade.id);
    assert_eq!(trades[0].source_ref_id.as_deref(), Some("checkin-001"));

    cleanup_test_data(&pool, &[user_id]).await;
}

/// 非正数积分流水：流水落库但不派生单元
#[tokio::test]
#[ignore = "需要 PostgreSQL"]
async fn test_non_positive_points_trade_creates_no_unit() {
    let pool = PgPool::connect(&database_url()).await.unwrap();
    let user_id = "integ_trade_debit_001";

    cleanup_test_data(&pool, &[user_id]).await;
    seed_user(&pool, user_id).await;

    let svc = setup_trade_service(&pool);

    // 负数扣回
    let trade = svc
        .record_trade(RecordTradeRequest::new(
            user_id,
            TradeType::Recovery,
            -5,
            "重复发放扣回",
        ))
        .await
        .expect("负数流水应成功落库");
    assert_eq!(trade.amount, -5);

    // 零金额流水同样允许、同样不派生单元
    svc.record_trade(RecordTradeRequest::new(
        user_id,
        TradeType::Recovery,
        0,
        "零金额修正",
    ))
    .await
    .expect("零金额流水应成功落库");

    assert_eq!(count_trades(&pool, user_id).await, 2, "两条流水都应持久化");
    assert_eq!(count_units(&pool, user_id).await, 0, "不应派生任何单元");

    cleanup_test_data(&pool, &[user_id]).await;
}

/// 正数积分缺少过期时间：拒绝且不产生任何写入
#[tokio::test]
#[ignore = "需要 PostgreSQL"]
async fn test_points_credit_without_expiry_writes_nothing() {
    let pool = PgPool::connect(&database_url()).await.unwrap();
    let user_id = "integ_trade_noexpiry_001";

    cleanup_test_data(&pool, &[user_id]).await;
    seed_user(&pool, user_id).await;

    let svc = setup_trade_service(&pool);
    let result = svc
        .record_trade(RecordTradeRequest::new(
            user_id,
            TradeType::SignIn,
            10,
            "每日签到",
        ))
        .await;

    assert!(
        matches!(result, Err(LedgerError::Validation(_))),
        "缺少过期时间应返回 Validation"
    );
    assert_eq!(count_trades(&pool, user_id).await, 0, "校验失败不应有流水");
    assert_eq!(count_units(&pool, user_id).await, 0, "校验失败不应有单元");

    cleanup_test_data(&pool, &[user_id]).await;
}

/// 未知用户：返回 UserNotFound，不产生任何写入
#[tokio::test]
#[ignore = "需要 PostgreSQL"]
async fn test_unknown_user_rejected() {
    let pool = PgPool::connect(&database_url()).await.unwrap();
    // 肯定不存在的用户，不做 seed
    let user_id = "integ_trade_nouser_404";

    cleanup_test_data(&pool, &[user_id]).await;

    let svc = setup_trade_service(&pool);
    let result = svc
        .record_trade(
            RecordTradeRequest::new(user_id, TradeType::SignIn, 10, "每日签到")
                .with_expiry(Utc::now() + Duration::days(30)),
        )
        .await;

    assert!(
        matches!(result, Err(LedgerError::UserNotFound(ref id)) if id == user_id),
        "未知用户应返回 UserNotFound"
    );
    assert_eq!(count_trades(&pool, user_id).await, 0);
}

/// 金币入账与扣减：只写流水，永不派生单元
#[tokio::test]
#[ignore = "需要 PostgreSQL"]
async fn test_coins_trades_never_create_units() {
    let pool = PgPool::connect(&database_url()).await.unwrap();
    let user_id = "integ_trade_coins_001";

    cleanup_test_data(&pool, &[user_id]).await;
    seed_user(&pool, user_id).await;

    let svc = setup_trade_service(&pool);

    svc.record_trade(RecordTradeRequest::new(
        user_id,
        TradeType::CoinInvite,
        20,
        "邀请好友奖励",
    ))
    .await
    .expect("金币入账应成功");

    svc.record_trade(RecordTradeRequest::new(
        user_id,
        TradeType::CoinSpend,
        -5,
        "兑换消费",
    ))
    .await
    .expect("金币扣减应成功");

    assert_eq!(count_trades(&pool, user_id).await, 2);
    assert_eq!(count_units(&pool, user_id).await, 0, "金币流水不应派生单元");

    // 金币流水带符号合计
    let total: (i64,) = sqlx::query_as(
        "SELECT COALESCE(SUM(amount), 0)::BIGINT FROM trades WHERE user_id = $1 AND currency = 'COINS'",
    )
    .bind(user_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(total.0, 15);

    // 金币查询读取投影：对账之前投影尚不存在，返回 0（刻意保留的陈旧语义）
    let query = setup_query_service(&pool);
    assert_eq!(query.available_coins(user_id).await.unwrap(), 0);

    cleanup_test_data(&pool, &[user_id]).await;
}
