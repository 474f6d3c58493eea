use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::errors::UpstreamError;

/// Balance operations exposed by the wallet service.
///
/// The copy-trading core never moves free funds itself; it only adjusts how
/// much of a follower's balance is locked.
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn free_balance(&self, account_id: Uuid, currency: &str)
        -> Result<Decimal, UpstreamError>;

    /// Positive `delta` locks, negative unlocks.
    async fn adjust_locked(
        &self,
        account_id: Uuid,
        currency: &str,
        delta: Decimal,
    ) -> Result<(), UpstreamError>;
}

// ---------------------------------------------------------------------------
// CapitalLedger
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReserveOutcome {
    Approved,
    Insufficient { available: Decimal },
}

/// Check/lock/unlock follower capital against the external ledger.
#[derive(Clone)]
pub struct CapitalLedger {
    ledger: Arc<dyn Ledger>,
}

impl CapitalLedger {
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        Self { ledger }
    }

    /// Read-only check that the free balance covers `amount`. Locks nothing.
    pub async fn reserve(
        &self,
        account_id: Uuid,
        currency: &str,
        amount: Decimal,
    ) -> Result<ReserveOutcome, UpstreamError> {
        let available = self.ledger.free_balance(account_id, currency).await?;
        if available < amount {
            tracing::debug!(
                account_id = %account_id,
                currency,
                required = %amount,
                available = %available,
                "Capital ledger: insufficient free balance"
            );
            return Ok(ReserveOutcome::Insufficient { available });
        }
        Ok(ReserveOutcome::Approved)
    }

    pub async fn lock(
        &self,
        account_id: Uuid,
        currency: &str,
        amount: Decimal,
    ) -> Result<(), UpstreamError> {
        self.ledger.adjust_locked(account_id, currency, amount).await?;
        tracing::debug!(account_id = %account_id, currency, amount = %amount, "Capital ledger: locked");
        Ok(())
    }

    pub async fn unlock(
        &self,
        account_id: Uuid,
        currency: &str,
        amount: Decimal,
    ) -> Result<(), UpstreamError> {
        self.ledger.adjust_locked(account_id, currency, -amount).await?;
        tracing::debug!(account_id = %account_id, currency, amount = %amount, "Capital ledger: unlocked");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// InMemoryLedger
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
struct Balance {
    total: Decimal,
    locked: Decimal,
}

/// Process-local ledger with total/locked per (account, currency).
///
/// Used when no wallet service is configured and throughout the tests.
#[derive(Clone, Default)]
pub struct InMemoryLedger {
    inner: Arc<Mutex<LedgerInner>>,
}

#[derive(Default)]
struct LedgerInner {
    balances: HashMap<(Uuid, String), Balance>,
    unavailable: HashSet<Uuid>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `amount` to the account's total balance.
    pub async fn deposit(&self, account_id: Uuid, currency: &str, amount: Decimal) {
        let mut inner = self.inner.lock().await;
        let balance = inner
            .balances
            .entry((account_id, currency.to_uppercase()))
            .or_default();
        balance.total += amount;
    }

    /// Overwrite the total, keeping locks. Mirrors an external balance resync.
    pub async fn set_total(&self, account_id: Uuid, currency: &str, total: Decimal) {
        let mut inner = self.inner.lock().await;
        let balance = inner
            .balances
            .entry((account_id, currency.to_uppercase()))
            .or_default();
        tracing::info!(
            account_id = %account_id,
            old_total = %balance.total,
            new_total = %total,
            "In-memory ledger: total overwritten"
        );
        balance.total = total;
    }

    pub async fn locked(&self, account_id: Uuid, currency: &str) -> Decimal {
        let inner = self.inner.lock().await;
        inner
            .balances
            .get(&(account_id, currency.to_uppercase()))
            .map(|b| b.locked)
            .unwrap_or(Decimal::ZERO)
    }

    /// Make every call for `account_id` fail like a transport error.
    pub async fn set_unavailable(&self, account_id: Uuid, unavailable: bool) {
        let mut inner = self.inner.lock().await;
        if unavailable {
            inner.unavailable.insert(account_id);
        } else {
            inner.unavailable.remove(&account_id);
        }
    }
}

#[async_trait]
impl Ledger for InMemoryLedger {
    async fn free_balance(
        &self,
        account_id: Uuid,
        currency: &str,
    ) -> Result<Decimal, UpstreamError> {
        let inner = self.inner.lock().await;
        if inner.unavailable.contains(&account_id) {
            return Err(UpstreamError::Unexpected("ledger unavailable".into()));
        }
        let balance = inner
            .balances
            .get(&(account_id, currency.to_uppercase()))
            .copied()
            .unwrap_or_default();
        Ok((balance.total - balance.locked).max(Decimal::ZERO))
    }

    async fn adjust_locked(
        &self,
        account_id: Uuid,
        currency: &str,
        delta: Decimal,
    ) -> Result<(), UpstreamError> {
        let mut inner = self.inner.lock().await;
        if inner.unavailable.contains(&account_id) {
            return Err(UpstreamError::Unexpected("ledger unavailable".into()));
        }
        let balance = inner
            .balances
            .entry((account_id, currency.to_uppercase()))
            .or_default();
        let new_locked = balance.locked + delta;
        if new_locked > balance.total {
            return Err(UpstreamError::Rejected(format!(
                "cannot lock {delta}: only {} free",
                balance.total - balance.locked
            )));
        }
        if new_locked < Decimal::ZERO {
            return Err(UpstreamError::Rejected(format!(
                "cannot unlock {}: only {} locked",
                -delta, balance.locked
            )));
        }
        balance.locked = new_locked;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// HttpLedger
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct BalanceResponse {
    free_balance: Decimal,
}

#[derive(Debug, Serialize)]
struct AdjustLockedRequest<'a> {
    user_id: Uuid,
    currency: &'a str,
    delta: Decimal,
}

#[derive(Debug, Deserialize)]
struct WalletAck {
    success: bool,
    error: Option<String>,
}

/// Wallet-service client.
#[derive(Debug, Clone)]
pub struct HttpLedger {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpLedger {
    pub fn new(base_url: String, token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }
}

#[async_trait]
impl Ledger for HttpLedger {
    async fn free_balance(
        &self,
        account_id: Uuid,
        currency: &str,
    ) -> Result<Decimal, UpstreamError> {
        let url = format!("{}/api/v1/wallets/{account_id}/{currency}", self.base_url);
        let resp = self.authed(self.http.get(&url)).send().await?;
        if !resp.status().is_success() {
            return Err(UpstreamError::Unexpected(format!(
                "wallet balance returned {}",
                resp.status()
            )));
        }
        let body: BalanceResponse = resp.json().await?;
        Ok(body.free_balance)
    }

    async fn adjust_locked(
        &self,
        account_id: Uuid,
        currency: &str,
        delta: Decimal,
    ) -> Result<(), UpstreamError> {
        let url = format!("{}/api/v1/wallets/locks", self.base_url);
        let body = AdjustLockedRequest {
            user_id: account_id,
            currency,
            delta,
        };
        let resp = self.authed(self.http.post(&url)).json(&body).send().await?;
        let status = resp.status();
        let ack: WalletAck = resp
            .json()
            .await
            .map_err(|e| UpstreamError::Unexpected(format!("wallet lock returned {status}: {e}")))?;
        if !ack.success {
            return Err(UpstreamError::Rejected(
                ack.error.unwrap_or_else(|| "lock adjustment refused".into()),
            ));
        }
        Ok(())
    }
}
