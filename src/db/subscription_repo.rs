use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{NewSubscription, Subscription, SubscriptionPatch};

/// Insert an active subscription. Returns `None` when the follower already
/// has an active subscription to the same master (partial unique index).
pub async fn insert_subscription(
    pool: &PgPool,
    new: &NewSubscription,
) -> anyhow::Result<Option<Subscription>> {
    let sub = sqlx::query_as::<_, Subscription>(
        r#"
        INSERT INTO copy_trading_subscriptions
            (follower_id, master_trader_id, currency, allocated_amount, copy_percentage,
             max_trade_amount, stop_loss_percentage, take_profit_percentage, risk_settings, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'active')
        ON CONFLICT DO NOTHING
        RETURNING *
        "#,
    )
    .bind(new.follower_id)
    .bind(new.master_trader_id)
    .bind(&new.currency)
    .bind(new.allocated_amount)
    .bind(new.copy_percentage)
    .bind(new.max_trade_amount)
    .bind(new.stop_loss_percentage)
    .bind(new.take_profit_percentage)
    .bind(Json(&new.risk_settings))
    .fetch_optional(pool)
    .await?;

    Ok(sub)
}

pub async fn get_subscription(pool: &PgPool, id: Uuid) -> anyhow::Result<Option<Subscription>> {
    let sub = sqlx::query_as::<_, Subscription>(
        "SELECT * FROM copy_trading_subscriptions WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(sub)
}

pub async fn find_active(
    pool: &PgPool,
    follower_id: Uuid,
    master_id: Uuid,
) -> anyhow::Result<Option<Subscription>> {
    let sub = sqlx::query_as::<_, Subscription>(
        r#"
        SELECT * FROM copy_trading_subscriptions
        WHERE follower_id = $1 AND master_trader_id = $2 AND status = 'active'
        "#,
    )
    .bind(follower_id)
    .bind(master_id)
    .fetch_optional(pool)
    .await?;

    Ok(sub)
}

pub async fn get_by_follower(
    pool: &PgPool,
    follower_id: Uuid,
) -> anyhow::Result<Vec<Subscription>> {
    let subs = sqlx::query_as::<_, Subscription>(
        "SELECT * FROM copy_trading_subscriptions WHERE follower_id = $1 ORDER BY created_at DESC",
    )
    .bind(follower_id)
    .fetch_all(pool)
    .await?;

    Ok(subs)
}

/// Active subscriptions on a master, oldest first so fan-out order is stable.
pub async fn get_active_by_master(
    pool: &PgPool,
    master_id: Uuid,
) -> anyhow::Result<Vec<Subscription>> {
    let subs = sqlx::query_as::<_, Subscription>(
        r#"
        SELECT * FROM copy_trading_subscriptions
        WHERE master_trader_id = $1 AND status = 'active'
        ORDER BY created_at ASC
        "#,
    )
    .bind(master_id)
    .fetch_all(pool)
    .await?;

    Ok(subs)
}

/// Apply a partial update; absent fields keep their value.
pub async fn update_subscription(
    pool: &PgPool,
    id: Uuid,
    patch: &SubscriptionPatch,
) -> anyhow::Result<Option<Subscription>> {
    let sub = sqlx::query_as::<_, Subscription>(
        r#"
        UPDATE copy_trading_subscriptions
        SET allocated_amount       = COALESCE($2, allocated_amount),
            copy_percentage        = COALESCE($3, copy_percentage),
            max_trade_amount       = COALESCE($4, max_trade_amount),
            stop_loss_percentage   = COALESCE($5, stop_loss_percentage),
            take_profit_percentage = COALESCE($6, take_profit_percentage),
            risk_settings          = COALESCE($7, risk_settings),
            status                 = COALESCE($8, status),
            updated_at             = NOW()
        WHERE id = $1 AND status <> 'stopped'
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(patch.allocated_amount)
    .bind(patch.copy_percentage)
    .bind(patch.max_trade_amount)
    .bind(patch.stop_loss_percentage)
    .bind(patch.take_profit_percentage)
    .bind(patch.risk_settings.as_ref().map(Json))
    .bind(patch.status)
    .fetch_optional(pool)
    .await?;

    Ok(sub)
}

/// Transition to `stopped`. Returns `None` if absent or already stopped.
pub async fn stop_subscription(pool: &PgPool, id: Uuid) -> anyhow::Result<Option<Subscription>> {
    let sub = sqlx::query_as::<_, Subscription>(
        r#"
        UPDATE copy_trading_subscriptions
        SET status = 'stopped', updated_at = NOW()
        WHERE id = $1 AND status <> 'stopped'
        RETURNING *
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(sub)
}
