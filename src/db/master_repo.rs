use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{MasterApplication, MasterSummary, MasterTrader, PerformancePoint};

/// Insert a pending master application. Returns `None` if the user already has one.
pub async fn insert_application(
    pool: &PgPool,
    user_id: Uuid,
    application: &MasterApplication,
    base_allocation: Decimal,
) -> anyhow::Result<Option<MasterTrader>> {
    let master = sqlx::query_as::<_, MasterTrader>(
        r#"
        INSERT INTO master_traders
            (user_id, strategy_name, strategy_description, risk_level,
             base_allocation, performance_fee_percentage)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (user_id) DO NOTHING
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(&application.strategy_name)
    .bind(&application.strategy_description)
    .bind(application.risk_level)
    .bind(base_allocation)
    .bind(application.performance_fee_percentage)
    .fetch_optional(pool)
    .await?;

    Ok(master)
}

pub async fn get_master(pool: &PgPool, id: Uuid) -> anyhow::Result<Option<MasterTrader>> {
    let master = sqlx::query_as::<_, MasterTrader>("SELECT * FROM master_traders WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(master)
}

pub async fn get_master_by_user(
    pool: &PgPool,
    user_id: Uuid,
) -> anyhow::Result<Option<MasterTrader>> {
    let master =
        sqlx::query_as::<_, MasterTrader>("SELECT * FROM master_traders WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await?;

    Ok(master)
}

/// Approve an application: the master becomes active, public, and gets its base allocation.
pub async fn approve_master(
    pool: &PgPool,
    id: Uuid,
    base_allocation: Decimal,
) -> anyhow::Result<Option<MasterTrader>> {
    let master = sqlx::query_as::<_, MasterTrader>(
        r#"
        UPDATE master_traders
        SET approval_status = 'approved', is_active = true, is_public = true,
            base_allocation = $2, updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(base_allocation)
    .fetch_optional(pool)
    .await?;

    Ok(master)
}

pub async fn set_active(
    pool: &PgPool,
    id: Uuid,
    is_active: bool,
) -> anyhow::Result<Option<MasterTrader>> {
    let master = sqlx::query_as::<_, MasterTrader>(
        "UPDATE master_traders SET is_active = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(is_active)
    .fetch_optional(pool)
    .await?;

    Ok(master)
}

/// Active, public masters with aggregates over their active subscriptions.
pub async fn list_public_masters(
    pool: &PgPool,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<MasterSummary>> {
    let masters = sqlx::query_as::<_, MasterSummary>(
        r#"
        SELECT mt.*,
               COUNT(s.id) AS followers_count,
               COALESCE(SUM(s.allocated_amount), 0) AS total_managed
        FROM master_traders mt
        LEFT JOIN copy_trading_subscriptions s
               ON s.master_trader_id = mt.id AND s.status = 'active'
        WHERE mt.is_active = true AND mt.is_public = true
        GROUP BY mt.id
        ORDER BY mt.total_return DESC NULLS LAST, mt.created_at ASC
        LIMIT $1 OFFSET $2
        "#,
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(masters)
}

pub async fn count_public_masters(pool: &PgPool) -> anyhow::Result<i64> {
    let row: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM master_traders WHERE is_active = true AND is_public = true",
    )
    .fetch_one(pool)
    .await?;

    Ok(row.0)
}

/// Most recent performance rows for a master, newest first.
pub async fn performance_history(
    pool: &PgPool,
    master_id: Uuid,
    limit: i64,
) -> anyhow::Result<Vec<PerformancePoint>> {
    let rows = sqlx::query_as::<_, PerformancePoint>(
        r#"
        SELECT * FROM master_trader_performance
        WHERE master_trader_id = $1
        ORDER BY date DESC
        LIMIT $2
        "#,
    )
    .bind(master_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
