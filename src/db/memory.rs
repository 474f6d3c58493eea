use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::{
    ApprovalStatus, CopiedTrade, CopiedTradeStatus, CopySkip, MasterApplication, MasterSummary,
    MasterTrader, NewCopiedTrade, NewSignal, NewSubscription, PerformancePoint, Signal,
    SignalStatus, SkipReason, Subscription, SubscriptionPatch, SubscriptionStatus,
};

use super::CopyStore;

/// In-process store with the same uniqueness rules as the Postgres schema.
///
/// Rows are kept in insertion order so "oldest first" scans are stable even
/// when two rows share a timestamp.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Tables>>,
    faults: Arc<Faults>,
}

#[derive(Default)]
struct Tables {
    masters: Vec<MasterTrader>,
    performance: Vec<PerformancePoint>,
    subscriptions: Vec<Subscription>,
    signals: Vec<Signal>,
    copied_trades: Vec<CopiedTrade>,
    skips: Vec<CopySkip>,
}

#[derive(Default)]
struct Faults {
    subscription_reads: AtomicBool,
    subscription_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subscription lookup fail, to exercise error paths.
    pub fn fail_subscription_reads(&self, fail: bool) {
        self.faults.subscription_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every subscription insert/update/stop fail.
    pub fn fail_subscription_writes(&self, fail: bool) {
        self.faults.subscription_writes.store(fail, Ordering::SeqCst);
    }

    fn check_reads(&self) -> anyhow::Result<()> {
        if self.faults.subscription_reads.load(Ordering::SeqCst) {
            anyhow::bail!("subscription store unavailable");
        }
        Ok(())
    }

    fn check_writes(&self) -> anyhow::Result<()> {
        if self.faults.subscription_writes.load(Ordering::SeqCst) {
            anyhow::bail!("subscription store rejected write");
        }
        Ok(())
    }

    /// Insert a signal with an explicit creation time.
    pub async fn insert_signal_at(&self, new: &NewSignal, created_at: DateTime<Utc>) -> Signal {
        let signal = Signal {
            id: Uuid::new_v4(),
            master_trader_id: new.master_trader_id,
            trading_pair: new.trading_pair.clone(),
            side: new.side,
            order_type: new.order_type,
            quantity: new.quantity,
            price: new.price,
            status: SignalStatus::Pending,
            created_at,
            updated_at: created_at,
        };
        self.inner.lock().await.signals.push(signal.clone());
        signal
    }

    pub async fn insert_performance(&self, point: PerformancePoint) {
        self.inner.lock().await.performance.push(point);
    }

    pub async fn all_copied_trades(&self) -> Vec<CopiedTrade> {
        self.inner.lock().await.copied_trades.clone()
    }
}

#[async_trait]
impl CopyStore for MemoryStore {
    async fn ping(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn insert_master_application(
        &self,
        user_id: Uuid,
        application: &MasterApplication,
        base_allocation: Decimal,
    ) -> anyhow::Result<Option<MasterTrader>> {
        let mut tables = self.inner.lock().await;
        if tables.masters.iter().any(|m| m.user_id == user_id) {
            return Ok(None);
        }
        let now = Utc::now();
        let master = MasterTrader {
            id: Uuid::new_v4(),
            user_id,
            strategy_name: application.strategy_name.clone(),
            strategy_description: application.strategy_description.clone(),
            risk_level: application.risk_level,
            base_allocation,
            performance_fee_percentage: application.performance_fee_percentage,
            total_return: None,
            win_rate: None,
            max_drawdown: None,
            approval_status: ApprovalStatus::Pending,
            is_active: false,
            is_public: false,
            created_at: now,
            updated_at: now,
        };
        tables.masters.push(master.clone());
        Ok(Some(master))
    }

    async fn get_master(&self, id: Uuid) -> anyhow::Result<Option<MasterTrader>> {
        let tables = self.inner.lock().await;
        Ok(tables.masters.iter().find(|m| m.id == id).cloned())
    }

    async fn get_master_by_user(&self, user_id: Uuid) -> anyhow::Result<Option<MasterTrader>> {
        let tables = self.inner.lock().await;
        Ok(tables.masters.iter().find(|m| m.user_id == user_id).cloned())
    }

    async fn approve_master(
        &self,
        id: Uuid,
        base_allocation: Decimal,
    ) -> anyhow::Result<Option<MasterTrader>> {
        let mut tables = self.inner.lock().await;
        let Some(master) = tables.masters.iter_mut().find(|m| m.id == id) else {
            return Ok(None);
        };
        master.approval_status = ApprovalStatus::Approved;
        master.is_active = true;
        master.is_public = true;
        master.base_allocation = base_allocation;
        master.updated_at = Utc::now();
        Ok(Some(master.clone()))
    }

    async fn set_master_active(
        &self,
        id: Uuid,
        is_active: bool,
    ) -> anyhow::Result<Option<MasterTrader>> {
        let mut tables = self.inner.lock().await;
        let Some(master) = tables.masters.iter_mut().find(|m| m.id == id) else {
            return Ok(None);
        };
        master.is_active = is_active;
        master.updated_at = Utc::now();
        Ok(Some(master.clone()))
    }

    async fn list_public_masters(
        &self,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<MasterSummary>> {
        let tables = self.inner.lock().await;
        let mut summaries: Vec<MasterSummary> = tables
            .masters
            .iter()
            .filter(|m| m.is_active && m.is_public)
            .map(|m| {
                let active: Vec<&Subscription> = tables
                    .subscriptions
                    .iter()
                    .filter(|s| s.master_trader_id == m.id && s.is_active())
                    .collect();
                MasterSummary {
                    master: m.clone(),
                    followers_count: active.len() as i64,
                    total_managed: active.iter().map(|s| s.allocated_amount).sum(),
                }
            })
            .collect();

        // total_return DESC NULLS LAST; stable sort keeps creation order for ties
        summaries.sort_by(|a, b| match (a.master.total_return, b.master.total_return) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });

        Ok(summaries
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn count_public_masters(&self) -> anyhow::Result<i64> {
        let tables = self.inner.lock().await;
        Ok(tables
            .masters
            .iter()
            .filter(|m| m.is_active && m.is_public)
            .count() as i64)
    }

    async fn performance_history(
        &self,
        master_id: Uuid,
        limit: i64,
    ) -> anyhow::Result<Vec<PerformancePoint>> {
        let tables = self.inner.lock().await;
        let mut rows: Vec<PerformancePoint> = tables
            .performance
            .iter()
            .filter(|p| p.master_trader_id == master_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.date.cmp(&a.date));
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }

    async fn insert_subscription(
        &self,
        new: &NewSubscription,
    ) -> anyhow::Result<Option<Subscription>> {
        self.check_writes()?;
        let mut tables = self.inner.lock().await;
        let duplicate = tables.subscriptions.iter().any(|s| {
            s.follower_id == new.follower_id
                && s.master_trader_id == new.master_trader_id
                && s.is_active()
        });
        if duplicate {
            return Ok(None);
        }
        let now = Utc::now();
        let sub = Subscription {
            id: Uuid::new_v4(),
            follower_id: new.follower_id,
            master_trader_id: new.master_trader_id,
            currency: new.currency.clone(),
            allocated_amount: new.allocated_amount,
            copy_percentage: new.copy_percentage,
            max_trade_amount: new.max_trade_amount,
            stop_loss_percentage: new.stop_loss_percentage,
            take_profit_percentage: new.take_profit_percentage,
            risk_settings: Json(new.risk_settings.clone()),
            status: SubscriptionStatus::Active,
            profit_loss_amount: Decimal::ZERO,
            profit_loss_percentage: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        };
        tables.subscriptions.push(sub.clone());
        Ok(Some(sub))
    }

    async fn get_subscription(&self, id: Uuid) -> anyhow::Result<Option<Subscription>> {
        self.check_reads()?;
        let tables = self.inner.lock().await;
        Ok(tables.subscriptions.iter().find(|s| s.id == id).cloned())
    }

    async fn find_active_subscription(
        &self,
        follower_id: Uuid,
        master_id: Uuid,
    ) -> anyhow::Result<Option<Subscription>> {
        self.check_reads()?;
        let tables = self.inner.lock().await;
        Ok(tables
            .subscriptions
            .iter()
            .find(|s| s.follower_id == follower_id && s.master_trader_id == master_id && s.is_active())
            .cloned())
    }

    async fn subscriptions_for_follower(
        &self,
        follower_id: Uuid,
    ) -> anyhow::Result<Vec<Subscription>> {
        self.check_reads()?;
        let tables = self.inner.lock().await;
        Ok(tables
            .subscriptions
            .iter()
            .rev()
            .filter(|s| s.follower_id == follower_id)
            .cloned()
            .collect())
    }

    async fn active_subscriptions_for_master(
        &self,
        master_id: Uuid,
    ) -> anyhow::Result<Vec<Subscription>> {
        self.check_reads()?;
        let tables = self.inner.lock().await;
        Ok(tables
            .subscriptions
            .iter()
            .filter(|s| s.master_trader_id == master_id && s.is_active())
            .cloned()
            .collect())
    }

    async fn update_subscription(
        &self,
        id: Uuid,
        patch: &SubscriptionPatch,
    ) -> anyhow::Result<Option<Subscription>> {
        self.check_writes()?;
        let mut tables = self.inner.lock().await;
        let Some(idx) = tables
            .subscriptions
            .iter()
            .position(|s| s.id == id && s.status != SubscriptionStatus::Stopped)
        else {
            return Ok(None);
        };

        let mut updated = tables.subscriptions[idx].clone();
        patch.apply_to(&mut updated);
        if updated.is_active() {
            let clash = tables.subscriptions.iter().any(|s| {
                s.id != id
                    && s.follower_id == updated.follower_id
                    && s.master_trader_id == updated.master_trader_id
                    && s.is_active()
            });
            if clash {
                anyhow::bail!("duplicate active subscription for follower/master pair");
            }
        }
        updated.updated_at = Utc::now();
        tables.subscriptions[idx] = updated.clone();
        Ok(Some(updated))
    }

    async fn stop_subscription(&self, id: Uuid) -> anyhow::Result<Option<Subscription>> {
        self.check_writes()?;
        let mut tables = self.inner.lock().await;
        let Some(sub) = tables
            .subscriptions
            .iter_mut()
            .find(|s| s.id == id && s.status != SubscriptionStatus::Stopped)
        else {
            return Ok(None);
        };
        sub.status = SubscriptionStatus::Stopped;
        sub.updated_at = Utc::now();
        Ok(Some(sub.clone()))
    }

    async fn insert_signal(&self, new: &NewSignal) -> anyhow::Result<Signal> {
        Ok(self.insert_signal_at(new, Utc::now()).await)
    }

    async fn get_signal(&self, id: Uuid) -> anyhow::Result<Option<Signal>> {
        let tables = self.inner.lock().await;
        Ok(tables.signals.iter().find(|s| s.id == id).cloned())
    }

    async fn pending_signals_since(&self, since: DateTime<Utc>) -> anyhow::Result<Vec<Signal>> {
        let tables = self.inner.lock().await;
        let mut pending: Vec<Signal> = tables
            .signals
            .iter()
            .filter(|s| s.status == SignalStatus::Pending && s.created_at > since)
            .cloned()
            .collect();
        pending.sort_by_key(|s| s.created_at);
        Ok(pending)
    }

    async fn recent_signals(&self, master_id: Uuid, limit: i64) -> anyhow::Result<Vec<Signal>> {
        let tables = self.inner.lock().await;
        let mut signals: Vec<Signal> = tables
            .signals
            .iter()
            .filter(|s| s.master_trader_id == master_id)
            .cloned()
            .collect();
        signals.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        signals.truncate(limit.max(0) as usize);
        Ok(signals)
    }

    async fn finish_signal(&self, id: Uuid, status: SignalStatus) -> anyhow::Result<bool> {
        let mut tables = self.inner.lock().await;
        match tables
            .signals
            .iter_mut()
            .find(|s| s.id == id && s.status == SignalStatus::Pending)
        {
            Some(signal) => {
                signal.status = status;
                signal.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_copied_trade(
        &self,
        new: &NewCopiedTrade,
    ) -> anyhow::Result<Option<CopiedTrade>> {
        let mut tables = self.inner.lock().await;
        let duplicate = tables
            .copied_trades
            .iter()
            .any(|t| t.signal_id == new.signal_id && t.subscription_id == new.subscription_id);
        if duplicate {
            return Ok(None);
        }
        let now = Utc::now();
        let trade = CopiedTrade {
            id: Uuid::new_v4(),
            follower_id: new.follower_id,
            master_trader_id: new.master_trader_id,
            signal_id: new.signal_id,
            subscription_id: new.subscription_id,
            trading_pair: new.trading_pair.clone(),
            side: new.side,
            order_type: new.order_type,
            quantity: new.quantity,
            price: new.price,
            status: new.status,
            order_ref: None,
            error_message: new.error_message.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.copied_trades.push(trade.clone());
        Ok(Some(trade))
    }

    async fn mark_trade_executed(&self, id: Uuid, order_ref: &str) -> anyhow::Result<()> {
        let mut tables = self.inner.lock().await;
        if let Some(trade) = tables.copied_trades.iter_mut().find(|t| t.id == id) {
            trade.status = CopiedTradeStatus::Executed;
            trade.order_ref = Some(order_ref.to_string());
            trade.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn mark_trade_failed(&self, id: Uuid, error_message: &str) -> anyhow::Result<()> {
        let mut tables = self.inner.lock().await;
        if let Some(trade) = tables.copied_trades.iter_mut().find(|t| t.id == id) {
            trade.status = CopiedTradeStatus::Failed;
            trade.error_message = Some(error_message.to_string());
            trade.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn copied_trades_for_signal(&self, signal_id: Uuid) -> anyhow::Result<Vec<CopiedTrade>> {
        let tables = self.inner.lock().await;
        Ok(tables
            .copied_trades
            .iter()
            .filter(|t| t.signal_id == signal_id)
            .cloned()
            .collect())
    }

    async fn copied_trades_for_subscription(
        &self,
        subscription_id: Uuid,
    ) -> anyhow::Result<Vec<CopiedTrade>> {
        let tables = self.inner.lock().await;
        Ok(tables
            .copied_trades
            .iter()
            .filter(|t| t.subscription_id == subscription_id)
            .cloned()
            .collect())
    }

    async fn recent_copied_trades(
        &self,
        follower_id: Uuid,
        limit: i64,
    ) -> anyhow::Result<Vec<CopiedTrade>> {
        let tables = self.inner.lock().await;
        Ok(tables
            .copied_trades
            .iter()
            .rev()
            .filter(|t| t.follower_id == follower_id)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn insert_skip(
        &self,
        signal_id: Uuid,
        subscription_id: Uuid,
        follower_id: Uuid,
        reason: SkipReason,
        detail: Option<&str>,
    ) -> anyhow::Result<()> {
        let mut tables = self.inner.lock().await;
        let exists = tables
            .skips
            .iter()
            .any(|s| s.signal_id == signal_id && s.subscription_id == subscription_id);
        if !exists {
            tables.skips.push(CopySkip {
                id: Uuid::new_v4(),
                signal_id,
                subscription_id,
                follower_id,
                reason,
                detail: detail.map(str::to_string),
                created_at: Utc::now(),
            });
        }
        Ok(())
    }

    async fn skips_for_signal(&self, signal_id: Uuid) -> anyhow::Result<Vec<CopySkip>> {
        let tables = self.inner.lock().await;
        Ok(tables
            .skips
            .iter()
            .filter(|s| s.signal_id == signal_id)
            .cloned()
            .collect())
    }
}
