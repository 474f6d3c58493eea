use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{NewSignal, Signal, SignalStatus};

pub async fn insert_signal(pool: &PgPool, new: &NewSignal) -> anyhow::Result<Signal> {
    let signal = sqlx::query_as::<_, Signal>(
        r#"
        INSERT INTO trade_signals (master_trader_id, trading_pair, side, order_type, quantity, price)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(new.master_trader_id)
    .bind(&new.trading_pair)
    .bind(new.side)
    .bind(new.order_type)
    .bind(new.quantity)
    .bind(new.price)
    .fetch_one(pool)
    .await?;

    Ok(signal)
}

pub async fn get_signal(pool: &PgPool, id: Uuid) -> anyhow::Result<Option<Signal>> {
    let signal = sqlx::query_as::<_, Signal>("SELECT * FROM trade_signals WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(signal)
}

/// Pending signals created after `since`, oldest first.
pub async fn get_pending_since(
    pool: &PgPool,
    since: DateTime<Utc>,
) -> anyhow::Result<Vec<Signal>> {
    let signals = sqlx::query_as::<_, Signal>(
        r#"
        SELECT * FROM trade_signals
        WHERE status = 'pending' AND created_at > $1
        ORDER BY created_at ASC
        "#,
    )
    .bind(since)
    .fetch_all(pool)
    .await?;

    Ok(signals)
}

pub async fn get_recent_by_master(
    pool: &PgPool,
    master_id: Uuid,
    limit: i64,
) -> anyhow::Result<Vec<Signal>> {
    let signals = sqlx::query_as::<_, Signal>(
        r#"
        SELECT * FROM trade_signals
        WHERE master_trader_id = $1
        ORDER BY created_at DESC
        LIMIT $2
        "#,
    )
    .bind(master_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(signals)
}

/// Move a pending signal to a terminal status. Returns `false` if it was
/// no longer pending.
pub async fn finish_signal(
    pool: &PgPool,
    id: Uuid,
    status: SignalStatus,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE trade_signals
        SET status = $2, updated_at = NOW()
        WHERE id = $1 AND status = 'pending'
        "#,
    )
    .bind(id)
    .bind(status)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}
