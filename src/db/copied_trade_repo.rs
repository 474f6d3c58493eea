use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{CopiedTrade, CopySkip, NewCopiedTrade, SkipReason};

/// Insert a copied trade. Returns `None` if one already exists for the
/// (signal, subscription) pair.
pub async fn insert_copied_trade(
    pool: &PgPool,
    new: &NewCopiedTrade,
) -> anyhow::Result<Option<CopiedTrade>> {
    let trade = sqlx::query_as::<_, CopiedTrade>(
        r#"
        INSERT INTO copied_trades
            (follower_id, master_trader_id, signal_id, subscription_id, trading_pair,
             side, order_type, quantity, price, status, error_message)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        ON CONFLICT (signal_id, subscription_id) DO NOTHING
        RETURNING *
        "#,
    )
    .bind(new.follower_id)
    .bind(new.master_trader_id)
    .bind(new.signal_id)
    .bind(new.subscription_id)
    .bind(&new.trading_pair)
    .bind(new.side)
    .bind(new.order_type)
    .bind(new.quantity)
    .bind(new.price)
    .bind(new.status)
    .bind(&new.error_message)
    .fetch_optional(pool)
    .await?;

    Ok(trade)
}

pub async fn mark_executed(pool: &PgPool, id: Uuid, order_ref: &str) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        UPDATE copied_trades
        SET status = 'executed', order_ref = $2, updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(order_ref)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn mark_failed(pool: &PgPool, id: Uuid, error_message: &str) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        UPDATE copied_trades
        SET status = 'failed', error_message = $2, updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(error_message)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn get_by_signal(pool: &PgPool, signal_id: Uuid) -> anyhow::Result<Vec<CopiedTrade>> {
    let trades = sqlx::query_as::<_, CopiedTrade>(
        "SELECT * FROM copied_trades WHERE signal_id = $1 ORDER BY created_at ASC",
    )
    .bind(signal_id)
    .fetch_all(pool)
    .await?;

    Ok(trades)
}

pub async fn get_by_subscription(
    pool: &PgPool,
    subscription_id: Uuid,
) -> anyhow::Result<Vec<CopiedTrade>> {
    let trades = sqlx::query_as::<_, CopiedTrade>(
        "SELECT * FROM copied_trades WHERE subscription_id = $1 ORDER BY created_at ASC",
    )
    .bind(subscription_id)
    .fetch_all(pool)
    .await?;

    Ok(trades)
}

pub async fn get_recent_by_follower(
    pool: &PgPool,
    follower_id: Uuid,
    limit: i64,
) -> anyhow::Result<Vec<CopiedTrade>> {
    let trades = sqlx::query_as::<_, CopiedTrade>(
        r#"
        SELECT * FROM copied_trades
        WHERE follower_id = $1
        ORDER BY created_at DESC
        LIMIT $2
        "#,
    )
    .bind(follower_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(trades)
}

/// Record a skipped attempt. Repeated skips for the same pair are ignored.
pub async fn insert_skip(
    pool: &PgPool,
    signal_id: Uuid,
    subscription_id: Uuid,
    follower_id: Uuid,
    reason: SkipReason,
    detail: Option<&str>,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO copy_skips (signal_id, subscription_id, follower_id, reason, detail)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (signal_id, subscription_id) DO NOTHING
        "#,
    )
    .bind(signal_id)
    .bind(subscription_id)
    .bind(follower_id)
    .bind(reason)
    .bind(detail)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn get_skips_by_signal(pool: &PgPool, signal_id: Uuid) -> anyhow::Result<Vec<CopySkip>> {
    let skips = sqlx::query_as::<_, CopySkip>(
        "SELECT * FROM copy_skips WHERE signal_id = $1 ORDER BY created_at ASC",
    )
    .bind(signal_id)
    .fetch_all(pool)
    .await?;

    Ok(skips)
}
