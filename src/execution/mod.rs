pub mod account_locks;
pub mod capital_ledger;
pub mod position_sizer;
pub mod propagation;
pub mod scheduler;
pub mod trading_engine;

pub use account_locks::AccountLocks;
pub use capital_ledger::{CapitalLedger, HttpLedger, InMemoryLedger, Ledger, ReserveOutcome};
pub use propagation::{
    run_propagation_loop, spawn_propagation_loop, PropagationConfig, Propagator, TickReport,
};
pub use scheduler::{IntervalScheduler, ManualScheduler, ManualTicker, Scheduler};
pub use trading_engine::{DryRunEngine, HttpTradingEngine, OrderAck, OrderRequest, TradingEngine};
