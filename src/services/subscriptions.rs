use std::sync::Arc;

use metrics::counter;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::db::CopyStore;
use crate::errors::{AppError, UpstreamError};
use crate::execution::{AccountLocks, CapitalLedger, ReserveOutcome, TradingEngine};
use crate::models::{
    NewSubscription, RiskSettings, Subscription, SubscriptionPatch, SubscriptionStatus,
    MAX_AMOUNT,
};

use super::notifier::{self, Notifier};

fn default_copy_percentage() -> Decimal {
    Decimal::ONE_HUNDRED
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubscribeRequest {
    pub master_trader_id: Uuid,
    pub allocated_amount: Decimal,
    #[serde(default = "default_copy_percentage")]
    pub copy_percentage: Decimal,
    pub max_trade_amount: Option<Decimal>,
    pub stop_loss_percentage: Option<Decimal>,
    pub take_profit_percentage: Option<Decimal>,
    #[serde(default)]
    pub risk_settings: RiskSettings,
}

/// Subscribe / update / unsubscribe with the capital lock kept in step with
/// the subscription record.
///
/// Every mutation runs under the follower's [`AccountLocks`] guard and applies
/// the ledger delta first; if the record write then fails the delta is
/// reversed before the error is returned.
#[derive(Clone)]
pub struct SubscriptionService {
    store: Arc<dyn CopyStore>,
    ledger: CapitalLedger,
    engine: Arc<dyn TradingEngine>,
    locks: AccountLocks,
    notifier: Option<Arc<Notifier>>,
    settlement_currency: String,
}

impl SubscriptionService {
    pub fn new(
        store: Arc<dyn CopyStore>,
        ledger: CapitalLedger,
        engine: Arc<dyn TradingEngine>,
        locks: AccountLocks,
        notifier: Option<Arc<Notifier>>,
        settlement_currency: String,
    ) -> Self {
        Self {
            store,
            ledger,
            engine,
            locks,
            notifier,
            settlement_currency: settlement_currency.to_uppercase(),
        }
    }

    pub async fn subscribe(
        &self,
        follower_id: Uuid,
        req: SubscribeRequest,
    ) -> Result<Subscription, AppError> {
        validate_allocation(req.allocated_amount)?;
        validate_copy_percentage(req.copy_percentage)?;
        validate_caps(
            req.max_trade_amount,
            req.stop_loss_percentage,
            req.take_profit_percentage,
        )?;
        req.risk_settings.validate().map_err(AppError::Validation)?;

        let master = self
            .store
            .get_master(req.master_trader_id)
            .await?
            .filter(|m| m.is_active)
            .ok_or_else(|| AppError::NotFound("Master trader not found or inactive".into()))?;

        let _guard = self.locks.acquire(follower_id).await;

        if self
            .store
            .find_active_subscription(follower_id, master.id)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict("Already subscribed to this master trader".into()));
        }

        let currency = self.settlement_currency.clone();
        self.check_free_balance(follower_id, &currency, req.allocated_amount)
            .await?;
        self.ledger
            .lock(follower_id, &currency, req.allocated_amount)
            .await
            .map_err(lock_error)?;

        let new = NewSubscription {
            follower_id,
            master_trader_id: master.id,
            currency: currency.clone(),
            allocated_amount: req.allocated_amount,
            copy_percentage: req.copy_percentage,
            max_trade_amount: req.max_trade_amount,
            stop_loss_percentage: req.stop_loss_percentage,
            take_profit_percentage: req.take_profit_percentage,
            risk_settings: req.risk_settings,
        };

        let sub = match self.store.insert_subscription(&new).await {
            Ok(Some(sub)) => sub,
            Ok(None) => {
                self.compensate(follower_id, &currency, -req.allocated_amount).await;
                return Err(AppError::Conflict("Already subscribed to this master trader".into()));
            }
            Err(e) => {
                self.compensate(follower_id, &currency, -req.allocated_amount).await;
                return Err(e.into());
            }
        };

        counter!("subscriptions_created").increment(1);
        tracing::info!(
            subscription_id = %sub.id,
            follower_id = %follower_id,
            master_id = %master.id,
            allocated = %sub.allocated_amount,
            "Subscription created"
        );

        if let Some(n) = self.notifier.clone() {
            let notification = notifier::new_follower(&master, &sub);
            let user_id = master.user_id;
            tokio::spawn(async move {
                n.send(user_id, &notification).await;
            });
        }

        Ok(sub)
    }

    pub async fn list(&self, follower_id: Uuid) -> Result<Vec<Subscription>, AppError> {
        Ok(self.store.subscriptions_for_follower(follower_id).await?)
    }

    pub async fn update(
        &self,
        follower_id: Uuid,
        subscription_id: Uuid,
        patch: SubscriptionPatch,
    ) -> Result<Subscription, AppError> {
        if patch.status == Some(SubscriptionStatus::Stopped) {
            return Err(AppError::Validation(
                "Use unsubscribe to stop a subscription".into(),
            ));
        }
        if let Some(amount) = patch.allocated_amount {
            validate_allocation(amount)?;
        }
        if let Some(pct) = patch.copy_percentage {
            validate_copy_percentage(pct)?;
        }
        validate_caps(
            patch.max_trade_amount,
            patch.stop_loss_percentage,
            patch.take_profit_percentage,
        )?;
        if let Some(risk) = &patch.risk_settings {
            risk.validate().map_err(AppError::Validation)?;
        }

        let _guard = self.locks.acquire(follower_id).await;
        let sub = self.owned(follower_id, subscription_id).await?;
        if sub.status == SubscriptionStatus::Stopped {
            return Err(AppError::Conflict("Subscription is stopped".into()));
        }

        if patch.status == Some(SubscriptionStatus::Active) && !sub.is_active() {
            let clash = self
                .store
                .find_active_subscription(follower_id, sub.master_trader_id)
                .await?;
            if clash.is_some_and(|other| other.id != sub.id) {
                return Err(AppError::Conflict(
                    "Another active subscription to this master exists".into(),
                ));
            }
        }

        let delta = patch
            .allocated_amount
            .map(|amount| amount - sub.allocated_amount)
            .unwrap_or(Decimal::ZERO);

        if delta > Decimal::ZERO {
            self.check_free_balance(follower_id, &sub.currency, delta).await?;
            self.ledger
                .lock(follower_id, &sub.currency, delta)
                .await
                .map_err(lock_error)?;
        } else if delta < Decimal::ZERO {
            self.ledger.unlock(follower_id, &sub.currency, -delta).await?;
        }

        let updated = match self.store.update_subscription(sub.id, &patch).await {
            Ok(Some(updated)) => updated,
            Ok(None) => {
                self.compensate(follower_id, &sub.currency, -delta).await;
                return Err(AppError::Conflict("Subscription is stopped".into()));
            }
            Err(e) => {
                self.compensate(follower_id, &sub.currency, -delta).await;
                return Err(e.into());
            }
        };

        tracing::info!(
            subscription_id = %updated.id,
            follower_id = %follower_id,
            delta = %delta,
            status = %updated.status,
            "Subscription updated"
        );
        Ok(updated)
    }

    pub async fn unsubscribe(
        &self,
        follower_id: Uuid,
        subscription_id: Uuid,
    ) -> Result<Subscription, AppError> {
        let _guard = self.locks.acquire(follower_id).await;
        let sub = self.owned(follower_id, subscription_id).await?;
        if sub.status == SubscriptionStatus::Stopped {
            return Err(AppError::Conflict("Subscription already stopped".into()));
        }

        self.ledger
            .unlock(follower_id, &sub.currency, sub.allocated_amount)
            .await?;

        let stopped = match self.store.stop_subscription(sub.id).await {
            Ok(Some(stopped)) => stopped,
            Ok(None) => {
                self.compensate(follower_id, &sub.currency, sub.allocated_amount).await;
                return Err(AppError::Conflict("Subscription already stopped".into()));
            }
            Err(e) => {
                self.compensate(follower_id, &sub.currency, sub.allocated_amount).await;
                return Err(e.into());
            }
        };

        counter!("subscriptions_stopped").increment(1);
        tracing::info!(
            subscription_id = %stopped.id,
            follower_id = %follower_id,
            unlocked = %stopped.allocated_amount,
            "Subscription stopped"
        );

        if let Err(e) = self
            .engine
            .close_copied_positions(follower_id, stopped.id)
            .await
        {
            tracing::warn!(
                subscription_id = %stopped.id,
                error = %e,
                "Failed to request closure of copied positions"
            );
        }

        Ok(stopped)
    }

    /// Fetch a subscription the caller owns; foreign ids read as absent.
    async fn owned(&self, follower_id: Uuid, subscription_id: Uuid) -> Result<Subscription, AppError> {
        self.store
            .get_subscription(subscription_id)
            .await?
            .filter(|s| s.follower_id == follower_id)
            .ok_or_else(|| AppError::NotFound("Subscription not found".into()))
    }

    async fn check_free_balance(
        &self,
        follower_id: Uuid,
        currency: &str,
        amount: Decimal,
    ) -> Result<(), AppError> {
        match self.ledger.reserve(follower_id, currency, amount).await? {
            ReserveOutcome::Approved => Ok(()),
            ReserveOutcome::Insufficient { available } => Err(AppError::InsufficientFunds(
                format!("required {amount} {currency}, available {available}"),
            )),
        }
    }

    /// Reverse a lock delta after the record write failed.
    async fn compensate(&self, follower_id: Uuid, currency: &str, delta: Decimal) {
        let result = if delta > Decimal::ZERO {
            self.ledger.lock(follower_id, currency, delta).await
        } else if delta < Decimal::ZERO {
            self.ledger.unlock(follower_id, currency, -delta).await
        } else {
            Ok(())
        };

        if let Err(e) = result {
            tracing::error!(
                follower_id = %follower_id,
                currency,
                delta = %delta,
                error = %e,
                "Failed to roll back capital lock, ledger needs reconciliation"
            );
        }
    }
}

fn lock_error(e: UpstreamError) -> AppError {
    match e {
        UpstreamError::Rejected(msg) => AppError::InsufficientFunds(msg),
        other => other.into(),
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_allocation(amount: Decimal) -> Result<(), AppError> {
    if amount <= Decimal::ZERO {
        return Err(AppError::Validation("allocated_amount must be positive".into()));
    }
    if amount > MAX_AMOUNT {
        return Err(AppError::Validation(format!(
            "allocated_amount must not exceed {MAX_AMOUNT}"
        )));
    }
    Ok(())
}

fn validate_copy_percentage(pct: Decimal) -> Result<(), AppError> {
    if pct <= Decimal::ZERO || pct > Decimal::ONE_HUNDRED {
        return Err(AppError::Validation(
            "copy_percentage must be in (0, 100]".into(),
        ));
    }
    Ok(())
}

fn validate_caps(
    max_trade_amount: Option<Decimal>,
    stop_loss: Option<Decimal>,
    take_profit: Option<Decimal>,
) -> Result<(), AppError> {
    if max_trade_amount.is_some_and(|v| v <= Decimal::ZERO || v > MAX_AMOUNT) {
        return Err(AppError::Validation(format!(
            "max_trade_amount must be in (0, {MAX_AMOUNT}]"
        )));
    }
    for (name, value) in [
        ("stop_loss_percentage", stop_loss),
        ("take_profit_percentage", take_profit),
    ] {
        if value.is_some_and(|v| v <= Decimal::ZERO || v > Decimal::ONE_HUNDRED) {
            return Err(AppError::Validation(format!("{name} must be in (0, 100]")));
        }
    }
    Ok(())
}
