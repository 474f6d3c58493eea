use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use copytrade::config::AppConfig;
use copytrade::db::{CopyStore, MemoryStore};
use copytrade::errors::UpstreamError;
use copytrade::execution::{
    AccountLocks, CapitalLedger, InMemoryLedger, OrderAck, OrderRequest, PropagationConfig,
    Propagator, TradingEngine,
};
use copytrade::models::{
    MasterApplication, MasterTrader, NewSignal, OrderType, RiskLevel, Side,
};
use copytrade::services::subscriptions::SubscribeRequest;
use copytrade::services::{MasterService, SignalService, SubscriptionService};
use copytrade::AppState;

/// Trading engine double: records submissions, rejects chosen accounts.
#[derive(Default)]
pub struct FakeEngine {
    pub submitted: Mutex<Vec<OrderRequest>>,
    pub closed: Mutex<Vec<(Uuid, Uuid)>>,
    rejecting: Mutex<HashSet<Uuid>>,
    panics_left: AtomicUsize,
}

#[allow(dead_code)]
impl FakeEngine {
    pub fn reject(&self, account_id: Uuid) {
        self.rejecting.lock().unwrap().insert(account_id);
    }

    /// Panic inside the next `n` submissions.
    pub fn panic_next(&self, n: usize) {
        self.panics_left.store(n, Ordering::SeqCst);
    }

    pub fn submitted_count(&self) -> usize {
        self.submitted.lock().unwrap().len()
    }
}

#[async_trait]
impl TradingEngine for FakeEngine {
    async fn submit_order(&self, order: &OrderRequest) -> Result<OrderAck, UpstreamError> {
        let armed = self
            .panics_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if armed {
            panic!("engine blew up");
        }
        self.submitted.lock().unwrap().push(order.clone());
        if self.rejecting.lock().unwrap().contains(&order.account_id) {
            return Err(UpstreamError::Rejected("account restricted".into()));
        }
        Ok(OrderAck {
            order_ref: format!("ord-{}", order.copy_trade_id),
        })
    }

    async fn close_copied_positions(
        &self,
        account_id: Uuid,
        subscription_id: Uuid,
    ) -> Result<(), UpstreamError> {
        self.closed.lock().unwrap().push((account_id, subscription_id));
        Ok(())
    }
}

/// Everything wired on in-memory collaborators.
pub struct TestEnv {
    pub store: MemoryStore,
    pub ledger: InMemoryLedger,
    pub engine: Arc<FakeEngine>,
    pub propagator: Propagator,
    pub subscriptions: SubscriptionService,
    pub masters: MasterService,
}

#[allow(dead_code)]
impl TestEnv {
    pub fn new() -> Self {
        Self::with_config(PropagationConfig::default())
    }

    pub fn with_config(config: PropagationConfig) -> Self {
        let store = MemoryStore::new();
        let ledger = InMemoryLedger::new();
        let engine = Arc::new(FakeEngine::default());
        let dyn_store: Arc<dyn CopyStore> = Arc::new(store.clone());
        let capital = CapitalLedger::new(Arc::new(ledger.clone()));

        let propagator = Propagator::new(dyn_store.clone(), capital.clone(), engine.clone(), config);
        let subscriptions = SubscriptionService::new(
            dyn_store.clone(),
            capital,
            engine.clone(),
            AccountLocks::new(),
            None,
            "USDT".into(),
        );
        let masters = MasterService::new(dyn_store, Decimal::from(10_000));

        Self {
            store,
            ledger,
            engine,
            propagator,
            subscriptions,
            masters,
        }
    }

    /// Approved, active master with the given base allocation.
    pub async fn master(&self, base_allocation: Decimal) -> MasterTrader {
        let app = MasterApplication {
            strategy_name: "test strategy".into(),
            strategy_description: None,
            risk_level: RiskLevel::Moderate,
            performance_fee_percentage: Decimal::ZERO,
            base_allocation: Some(base_allocation),
        };
        let master = self.masters.apply(Uuid::new_v4(), app).await.unwrap();
        self.masters.approve(master.id, None).await.unwrap()
    }

    /// New follower holding `balance` USDT.
    pub async fn follower(&self, balance: Decimal) -> Uuid {
        let id = Uuid::new_v4();
        self.ledger.deposit(id, "USDT", balance).await;
        id
    }

    pub async fn locked(&self, follower: Uuid) -> Decimal {
        self.ledger.locked(follower, "USDT").await
    }

    pub fn state(&self, config: AppConfig) -> AppState {
        let store: Arc<dyn CopyStore> = Arc::new(self.store.clone());
        AppState {
            signals: SignalService::new(store.clone()),
            masters: self.masters.clone(),
            subscriptions: self.subscriptions.clone(),
            store,
            config,
            metrics_handle: copytrade::metrics::init_metrics(),
            pause_flag: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[allow(dead_code)]
pub fn subscribe_request(master_id: Uuid, allocated: Decimal, copy_pct: Decimal) -> SubscribeRequest {
    SubscribeRequest {
        master_trader_id: master_id,
        allocated_amount: allocated,
        copy_percentage: copy_pct,
        max_trade_amount: None,
        stop_loss_percentage: None,
        take_profit_percentage: None,
        risk_settings: Default::default(),
    }
}

#[allow(dead_code)]
pub fn buy_signal(master_id: Uuid, quantity: Decimal, price: Decimal) -> NewSignal {
    NewSignal {
        master_trader_id: master_id,
        trading_pair: "BTC/USDT".into(),
        side: Side::Buy,
        order_type: OrderType::Market,
        quantity,
        price,
    }
}
