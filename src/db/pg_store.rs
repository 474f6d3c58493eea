use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{
    CopiedTrade, CopySkip, MasterApplication, MasterSummary, MasterTrader, NewCopiedTrade,
    NewSignal, NewSubscription, PerformancePoint, Signal, SignalStatus, SkipReason, Subscription,
    SubscriptionPatch,
};

use super::{copied_trade_repo, master_repo, signal_repo, subscription_repo, CopyStore};

/// Postgres-backed store; each method delegates to the matching repo.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl CopyStore for PgStore {
    async fn ping(&self) -> anyhow::Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn insert_master_application(
        &self,
        user_id: Uuid,
        application: &MasterApplication,
        base_allocation: Decimal,
    ) -> anyhow::Result<Option<MasterTrader>> {
        master_repo::insert_application(&self.pool, user_id, application, base_allocation).await
    }

    async fn get_master(&self, id: Uuid) -> anyhow::Result<Option<MasterTrader>> {
        master_repo::get_master(&self.pool, id).await
    }

    async fn get_master_by_user(&self, user_id: Uuid) -> anyhow::Result<Option<MasterTrader>> {
        master_repo::get_master_by_user(&self.pool, user_id).await
    }

    async fn approve_master(
        &self,
        id: Uuid,
        base_allocation: Decimal,
    ) -> anyhow::Result<Option<MasterTrader>> {
        master_repo::approve_master(&self.pool, id, base_allocation).await
    }

    async fn set_master_active(
        &self,
        id: Uuid,
        is_active: bool,
    ) -> anyhow::Result<Option<MasterTrader>> {
        master_repo::set_active(&self.pool, id, is_active).await
    }

    async fn list_public_masters(
        &self,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<MasterSummary>> {
        master_repo::list_public_masters(&self.pool, limit, offset).await
    }

    async fn count_public_masters(&self) -> anyhow::Result<i64> {
        master_repo::count_public_masters(&self.pool).await
    }

    async fn performance_history(
        &self,
        master_id: Uuid,
        limit: i64,
    ) -> anyhow::Result<Vec<PerformancePoint>> {
        master_repo::performance_history(&self.pool, master_id, limit).await
    }

    async fn insert_subscription(
        &self,
        new: &NewSubscription,
    ) -> anyhow::Result<Option<Subscription>> {
        subscription_repo::insert_subscription(&self.pool, new).await
    }

    async fn get_subscription(&self, id: Uuid) -> anyhow::Result<Option<Subscription>> {
        subscription_repo::get_subscription(&self.pool, id).await
    }

    async fn find_active_subscription(
        &self,
        follower_id: Uuid,
        master_id: Uuid,
    ) -> anyhow::Result<Option<Subscription>> {
        subscription_repo::find_active(&self.pool, follower_id, master_id).await
    }

    async fn subscriptions_for_follower(
        &self,
        follower_id: Uuid,
    ) -> anyhow::Result<Vec<Subscription>> {
        subscription_repo::get_by_follower(&self.pool, follower_id).await
    }

    async fn active_subscriptions_for_master(
        &self,
        master_id: Uuid,
    ) -> anyhow::Result<Vec<Subscription>> {
        subscription_repo::get_active_by_master(&self.pool, master_id).await
    }

    async fn update_subscription(
        &self,
        id: Uuid,
        patch: &SubscriptionPatch,
    ) -> anyhow::Result<Option<Subscription>> {
        subscription_repo::update_subscription(&self.pool, id, patch).await
    }

    async fn stop_subscription(&self, id: Uuid) -> anyhow::Result<Option<Subscription>> {
        subscription_repo::stop_subscription(&self.pool, id).await
    }

    async fn insert_signal(&self, new: &NewSignal) -> anyhow::Result<Signal> {
        signal_repo::insert_signal(&self.pool, new).await
    }

    async fn get_signal(&self, id: Uuid) -> anyhow::Result<Option<Signal>> {
        signal_repo::get_signal(&self.pool, id).await
    }

    async fn pending_signals_since(&self, since: DateTime<Utc>) -> anyhow::Result<Vec<Signal>> {
        signal_repo::get_pending_since(&self.pool, since).await
    }

    async fn recent_signals(&self, master_id: Uuid, limit: i64) -> anyhow::Result<Vec<Signal>> {
        signal_repo::get_recent_by_master(&self.pool, master_id, limit).await
    }

    async fn finish_signal(&self, id: Uuid, status: SignalStatus) -> anyhow::Result<bool> {
        signal_repo::finish_signal(&self.pool, id, status).await
    }

    async fn insert_copied_trade(
        &self,
        new: &NewCopiedTrade,
    ) -> anyhow::Result<Option<CopiedTrade>> {
        copied_trade_repo::insert_copied_trade(&self.pool, new).await
    }

    async fn mark_trade_executed(&self, id: Uuid, order_ref: &str) -> anyhow::Result<()> {
        copied_trade_repo::mark_executed(&self.pool, id, order_ref).await
    }

    async fn mark_trade_failed(&self, id: Uuid, error_message: &str) -> anyhow::Result<()> {
        copied_trade_repo::mark_failed(&self.pool, id, error_message).await
    }

    async fn copied_trades_for_signal(&self, signal_id: Uuid) -> anyhow::Result<Vec<CopiedTrade>> {
        copied_trade_repo::get_by_signal(&self.pool, signal_id).await
    }

    async fn copied_trades_for_subscription(
        &self,
        subscription_id: Uuid,
    ) -> anyhow::Result<Vec<CopiedTrade>> {
        copied_trade_repo::get_by_subscription(&self.pool, subscription_id).await
    }

    async fn recent_copied_trades(
        &self,
        follower_id: Uuid,
        limit: i64,
    ) -> anyhow::Result<Vec<CopiedTrade>> {
        copied_trade_repo::get_recent_by_follower(&self.pool, follower_id, limit).await
    }

    async fn insert_skip(
        &self,
        signal_id: Uuid,
        subscription_id: Uuid,
        follower_id: Uuid,
        reason: SkipReason,
        detail: Option<&str>,
    ) -> anyhow::Result<()> {
        copied_trade_repo::insert_skip(
            &self.pool,
            signal_id,
            subscription_id,
            follower_id,
            reason,
            detail,
        )
        .await
    }

    async fn skips_for_signal(&self, signal_id: Uuid) -> anyhow::Result<Vec<CopySkip>> {
        copied_trade_repo::get_skips_by_signal(&self.pool, signal_id).await
    }
}
