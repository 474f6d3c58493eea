//! Persistence for masters, subscriptions, signals and copied trades.
//!
//! [`CopyStore`] is the seam the services and the propagation loop depend
//! on. [`PgStore`] backs it with the per-table repos; [`MemoryStore`] keeps
//! everything in process for tests and local runs.

pub mod copied_trade_repo;
pub mod master_repo;
pub mod memory;
pub mod pg_store;
pub mod signal_repo;
pub mod subscription_repo;

pub use memory::MemoryStore;
pub use pg_store::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{
    CopiedTrade, CopySkip, MasterApplication, MasterSummary, MasterTrader, NewCopiedTrade,
    NewSignal, NewSubscription, PerformancePoint, Signal, SignalStatus, SkipReason, Subscription,
    SubscriptionPatch,
};

pub async fn init_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    // Verify connectivity
    sqlx::query("SELECT 1").execute(&pool).await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

/// Inserts that would violate a uniqueness invariant return `Ok(None)`;
/// conditional updates that match nothing return `Ok(None)` / `Ok(false)`.
#[async_trait]
pub trait CopyStore: Send + Sync {
    async fn ping(&self) -> anyhow::Result<()>;

    // --- masters ---
    async fn insert_master_application(
        &self,
        user_id: Uuid,
        application: &MasterApplication,
        base_allocation: Decimal,
    ) -> anyhow::Result<Option<MasterTrader>>;
    async fn get_master(&self, id: Uuid) -> anyhow::Result<Option<MasterTrader>>;
    async fn get_master_by_user(&self, user_id: Uuid) -> anyhow::Result<Option<MasterTrader>>;
    async fn approve_master(
        &self,
        id: Uuid,
        base_allocation: Decimal,
    ) -> anyhow::Result<Option<MasterTrader>>;
    async fn set_master_active(
        &self,
        id: Uuid,
        is_active: bool,
    ) -> anyhow::Result<Option<MasterTrader>>;
    async fn list_public_masters(
        &self,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<MasterSummary>>;
    async fn count_public_masters(&self) -> anyhow::Result<i64>;
    async fn performance_history(
        &self,
        master_id: Uuid,
        limit: i64,
    ) -> anyhow::Result<Vec<PerformancePoint>>;

    // --- subscriptions ---
    async fn insert_subscription(
        &self,
        new: &NewSubscription,
    ) -> anyhow::Result<Option<Subscription>>;
    async fn get_subscription(&self, id: Uuid) -> anyhow::Result<Option<Subscription>>;
    async fn find_active_subscription(
        &self,
        follower_id: Uuid,
        master_id: Uuid,
    ) -> anyhow::Result<Option<Subscription>>;
    async fn subscriptions_for_follower(
        &self,
        follower_id: Uuid,
    ) -> anyhow::Result<Vec<Subscription>>;
    async fn active_subscriptions_for_master(
        &self,
        master_id: Uuid,
    ) -> anyhow::Result<Vec<Subscription>>;
    async fn update_subscription(
        &self,
        id: Uuid,
        patch: &SubscriptionPatch,
    ) -> anyhow::Result<Option<Subscription>>;
    async fn stop_subscription(&self, id: Uuid) -> anyhow::Result<Option<Subscription>>;

    // --- signals ---
    async fn insert_signal(&self, new: &NewSignal) -> anyhow::Result<Signal>;
    async fn get_signal(&self, id: Uuid) -> anyhow::Result<Option<Signal>>;
    async fn pending_signals_since(&self, since: DateTime<Utc>) -> anyhow::Result<Vec<Signal>>;
    async fn recent_signals(&self, master_id: Uuid, limit: i64) -> anyhow::Result<Vec<Signal>>;
    async fn finish_signal(&self, id: Uuid, status: SignalStatus) -> anyhow::Result<bool>;

    // --- copied trades ---
    async fn insert_copied_trade(
        &self,
        new: &NewCopiedTrade,
    ) -> anyhow::Result<Option<CopiedTrade>>;
    async fn mark_trade_executed(&self, id: Uuid, order_ref: &str) -> anyhow::Result<()>;
    async fn mark_trade_failed(&self, id: Uuid, error_message: &str) -> anyhow::Result<()>;
    async fn copied_trades_for_signal(&self, signal_id: Uuid) -> anyhow::Result<Vec<CopiedTrade>>;
    async fn copied_trades_for_subscription(
        &self,
        subscription_id: Uuid,
    ) -> anyhow::Result<Vec<CopiedTrade>>;
    async fn recent_copied_trades(
        &self,
        follower_id: Uuid,
        limit: i64,
    ) -> anyhow::Result<Vec<CopiedTrade>>;
    async fn insert_skip(
        &self,
        signal_id: Uuid,
        subscription_id: Uuid,
        follower_id: Uuid,
        reason: SkipReason,
        detail: Option<&str>,
    ) -> anyhow::Result<()>;
    async fn skips_for_signal(&self, signal_id: Uuid) -> anyhow::Result<Vec<CopySkip>>;
}
