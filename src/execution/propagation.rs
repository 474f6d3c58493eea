use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::task::JoinHandle;
use metrics::{counter, gauge, histogram};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::db::CopyStore;
use crate::models::{
    CopiedTradeStatus, MasterTrader, NewCopiedTrade, Signal, SignalStatus, SkipReason,
    Subscription,
};

use super::capital_ledger::{CapitalLedger, ReserveOutcome};
use super::position_sizer::{self, SizingDecision, SizingParams};
use super::scheduler::Scheduler;
use super::trading_engine::{OrderRequest, TradingEngine};

/// Configuration for the propagation loop.
#[derive(Debug, Clone)]
pub struct PropagationConfig {
    pub interval: Duration,
    /// Pending signals older than this are no longer scanned.
    pub lookback: chrono::Duration,
    pub sizing: SizingParams,
    /// Write a `copy_skips` row for each skipped follower.
    pub record_skips: bool,
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            lookback: chrono::Duration::hours(1),
            sizing: SizingParams::default(),
            record_skips: true,
        }
    }
}

/// What one tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub signals_seen: usize,
    pub signals_executed: usize,
    pub signals_failed: usize,
    pub trades_executed: usize,
    pub trades_failed: usize,
    pub skipped: usize,
    /// Followers that already had a copied trade for the signal.
    pub duplicates: usize,
}

enum FollowerOutcome {
    Executed,
    Failed,
    Skipped,
    Duplicate,
}

/// Fans pending master signals out to their followers.
#[derive(Clone)]
pub struct Propagator {
    store: Arc<dyn CopyStore>,
    ledger: CapitalLedger,
    engine: Arc<dyn TradingEngine>,
    config: PropagationConfig,
}

impl Propagator {
    pub fn new(
        store: Arc<dyn CopyStore>,
        ledger: CapitalLedger,
        engine: Arc<dyn TradingEngine>,
        config: PropagationConfig,
    ) -> Self {
        Self {
            store,
            ledger,
            engine,
            config,
        }
    }

    pub fn config(&self) -> &PropagationConfig {
        &self.config
    }

    /// Scan pending signals oldest-first and process each to a terminal status.
    pub async fn run_tick(&self) -> anyhow::Result<TickReport> {
        let started = Instant::now();
        let since = Utc::now() - self.config.lookback;
        let pending = self.store.pending_signals_since(since).await?;
        gauge!("pending_signals").set(pending.len() as f64);

        let mut report = TickReport {
            signals_seen: pending.len(),
            ..TickReport::default()
        };

        for signal in &pending {
            self.process_signal(signal, &mut report).await;
        }

        histogram!("propagation_tick_seconds").record(started.elapsed().as_secs_f64());
        if report.signals_seen > 0 {
            tracing::info!(
                signals = report.signals_seen,
                executed = report.signals_executed,
                failed = report.signals_failed,
                trades_executed = report.trades_executed,
                trades_failed = report.trades_failed,
                skipped = report.skipped,
                "Propagation tick complete"
            );
        }
        Ok(report)
    }

    async fn process_signal(&self, signal: &Signal, report: &mut TickReport) {
        let followers = match self.fan_out_set(signal).await {
            Ok(set) => set,
            Err(e) => {
                tracing::error!(
                    signal_id = %signal.id,
                    error = %e,
                    "Signal fan-out lookup failed"
                );
                self.finish(signal, SignalStatus::Failed, report).await;
                return;
            }
        };

        tracing::info!(
            signal_id = %signal.id,
            master_id = %signal.master_trader_id,
            pair = %signal.trading_pair,
            side = %signal.side,
            followers = followers.as_ref().map(|(_, subs)| subs.len()).unwrap_or(0),
            "Propagating signal"
        );

        if let Some((master, subs)) = &followers {
            for sub in subs {
                match self.attempt_follower(signal, master, sub).await {
                    FollowerOutcome::Executed => report.trades_executed += 1,
                    FollowerOutcome::Failed => report.trades_failed += 1,
                    FollowerOutcome::Skipped => report.skipped += 1,
                    FollowerOutcome::Duplicate => report.duplicates += 1,
                }
            }
        }

        self.finish(signal, SignalStatus::Executed, report).await;
    }

    /// The signal's master and its active subscriptions. `None` when the
    /// master is deactivated (nothing to copy).
    async fn fan_out_set(
        &self,
        signal: &Signal,
    ) -> anyhow::Result<Option<(MasterTrader, Vec<Subscription>)>> {
        let master = self
            .store
            .get_master(signal.master_trader_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("master {} not found", signal.master_trader_id))?;

        if !master.is_active {
            tracing::info!(
                signal_id = %signal.id,
                master_id = %master.id,
                "Master inactive, signal has no followers to copy"
            );
            return Ok(None);
        }

        let subs = self
            .store
            .active_subscriptions_for_master(master.id)
            .await?;
        Ok(Some((master, subs)))
    }

    async fn finish(&self, signal: &Signal, status: SignalStatus, report: &mut TickReport) {
        match self.store.finish_signal(signal.id, status).await {
            Ok(true) => match status {
                SignalStatus::Failed => {
                    report.signals_failed += 1;
                    counter!("signals_failed_total").increment(1);
                }
                _ => {
                    report.signals_executed += 1;
                    counter!("signals_executed_total").increment(1);
                }
            },
            Ok(false) => {
                tracing::debug!(signal_id = %signal.id, "Signal already terminal");
            }
            Err(e) => {
                tracing::error!(signal_id = %signal.id, error = %e, "Failed to finish signal");
            }
        }
    }

    async fn attempt_follower(
        &self,
        signal: &Signal,
        master: &MasterTrader,
        sub: &Subscription,
    ) -> FollowerOutcome {
        // 1. Size
        let quantity = match position_sizer::size_order(signal, master, sub, &self.config.sizing) {
            SizingDecision::Quantity(q) => q,
            SizingDecision::Skip(reason) => {
                self.record_skip(signal, sub, reason, None).await;
                return FollowerOutcome::Skipped;
            }
        };

        // 2. Balance check in the pair's settlement currency
        let currency = signal
            .quote_currency()
            .unwrap_or_else(|| sub.currency.clone());
        let Some(required) = quantity.checked_mul(signal.price) else {
            self.record_skip(signal, sub, SkipReason::Overflow, Some("order notional overflows"))
                .await;
            return FollowerOutcome::Skipped;
        };

        match self.ledger.reserve(sub.follower_id, &currency, required).await {
            Ok(ReserveOutcome::Approved) => {}
            Ok(ReserveOutcome::Insufficient { available }) => {
                let detail = format!("required {required} {currency}, available {available}");
                self.record_skip(signal, sub, SkipReason::InsufficientFunds, Some(&detail))
                    .await;
                return FollowerOutcome::Skipped;
            }
            Err(e) => {
                tracing::warn!(
                    signal_id = %signal.id,
                    subscription_id = %sub.id,
                    follower_id = %sub.follower_id,
                    error = %e,
                    "Ledger check failed"
                );
                let msg = format!("ledger check failed: {e}");
                return match self
                    .record_trade(signal, sub, quantity, CopiedTradeStatus::Failed, Some(msg))
                    .await
                {
                    Ok(_) => {
                        counter!("copied_trades_failed").increment(1);
                        FollowerOutcome::Failed
                    }
                    Err(outcome) => outcome,
                };
            }
        }

        // 3. Record pending, then submit
        let trade_id = match self
            .record_trade(signal, sub, quantity, CopiedTradeStatus::Pending, None)
            .await
        {
            Ok(id) => id,
            Err(outcome) => return outcome,
        };

        let order = OrderRequest {
            account_id: sub.follower_id,
            trading_pair: signal.trading_pair.clone(),
            side: signal.side,
            order_type: signal.order_type,
            quantity,
            price: signal.price,
            is_copy_trade: true,
            copy_trade_id: trade_id,
        };

        // 4. Outcome
        match self.engine.submit_order(&order).await {
            Ok(ack) => {
                counter!("copied_trades_executed").increment(1);
                if let Err(e) = self.store.mark_trade_executed(trade_id, &ack.order_ref).await {
                    tracing::error!(copied_trade_id = %trade_id, error = %e, "Failed to mark trade executed");
                }
                tracing::info!(
                    signal_id = %signal.id,
                    copied_trade_id = %trade_id,
                    follower_id = %sub.follower_id,
                    quantity = %quantity,
                    order_ref = %ack.order_ref,
                    "Copied trade executed"
                );
                FollowerOutcome::Executed
            }
            Err(e) => {
                counter!("copied_trades_failed").increment(1);
                let msg = e.to_string();
                tracing::warn!(
                    signal_id = %signal.id,
                    copied_trade_id = %trade_id,
                    follower_id = %sub.follower_id,
                    error = %msg,
                    "Copied trade failed"
                );
                if let Err(e) = self.store.mark_trade_failed(trade_id, &msg).await {
                    tracing::error!(copied_trade_id = %trade_id, error = %e, "Failed to mark trade failed");
                }
                FollowerOutcome::Failed
            }
        }
    }

    /// Insert the copied-trade row. `Err` carries the outcome to report when
    /// no row was written.
    async fn record_trade(
        &self,
        signal: &Signal,
        sub: &Subscription,
        quantity: Decimal,
        status: CopiedTradeStatus,
        error_message: Option<String>,
    ) -> Result<Uuid, FollowerOutcome> {
        let new = NewCopiedTrade {
            follower_id: sub.follower_id,
            master_trader_id: signal.master_trader_id,
            signal_id: signal.id,
            subscription_id: sub.id,
            trading_pair: signal.trading_pair.clone(),
            side: signal.side,
            order_type: signal.order_type,
            quantity,
            price: signal.price,
            status,
            error_message,
        };

        match self.store.insert_copied_trade(&new).await {
            Ok(Some(trade)) => Ok(trade.id),
            Ok(None) => {
                tracing::warn!(
                    signal_id = %signal.id,
                    subscription_id = %sub.id,
                    "Copied trade already exists, not resubmitting"
                );
                Err(FollowerOutcome::Duplicate)
            }
            Err(e) => {
                tracing::error!(
                    signal_id = %signal.id,
                    subscription_id = %sub.id,
                    error = %e,
                    "Failed to record copied trade"
                );
                Err(FollowerOutcome::Failed)
            }
        }
    }

    async fn record_skip(
        &self,
        signal: &Signal,
        sub: &Subscription,
        reason: SkipReason,
        detail: Option<&str>,
    ) {
        counter!("copy_attempts_skipped").increment(1);
        tracing::info!(
            signal_id = %signal.id,
            subscription_id = %sub.id,
            follower_id = %sub.follower_id,
            reason = %reason,
            detail = detail.unwrap_or(""),
            "Follower skipped for signal"
        );

        if !self.config.record_skips {
            return;
        }
        if let Err(e) = self
            .store
            .insert_skip(signal.id, sub.id, sub.follower_id, reason, detail)
            .await
        {
            tracing::warn!(signal_id = %signal.id, error = %e, "Failed to record skip");
        }
    }
}

/// Run the propagation loop until the scheduler stops producing ticks.
///
/// Ticks run inline, so a slow tick delays the next one instead of racing it.
pub async fn run_propagation_loop<S: Scheduler>(
    propagator: Propagator,
    mut scheduler: S,
    pause_flag: Arc<AtomicBool>,
) {
    tracing::info!(
        interval_secs = propagator.config.interval.as_secs(),
        lookback_secs = propagator.config.lookback.num_seconds(),
        record_skips = propagator.config.record_skips,
        "Propagation loop started"
    );

    while scheduler.next_tick().await {
        if pause_flag.load(Ordering::Relaxed) {
            tracing::debug!("Propagation paused, skipping tick");
            continue;
        }

        // Own task per tick: a panic ends that tick, not the loop
        let tick = propagator.clone();
        match tokio::spawn(async move { tick.run_tick().await }).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => tracing::error!(error = %e, "Propagation tick failed"),
            Err(e) => tracing::error!(error = %e, "Propagation tick aborted"),
        }
    }

    tracing::warn!("Propagation scheduler finished, loop exiting");
}

/// Spawn [`run_propagation_loop`] with a watcher that logs how it ended.
/// The returned handle resolves once the loop is gone.
pub fn spawn_propagation_loop<S: Scheduler + 'static>(
    propagator: Propagator,
    scheduler: S,
    pause_flag: Arc<AtomicBool>,
) -> JoinHandle<()> {
    let handle = tokio::spawn(run_propagation_loop(propagator, scheduler, pause_flag));
    tokio::spawn(async move {
        match handle.await {
            Ok(()) => tracing::warn!("Propagation loop stopped"),
            Err(e) => tracing::error!(error = %e, "Propagation loop died"),
        }
    })
}
