pub mod api;
pub mod config;
pub mod db;
pub mod errors;
pub mod execution;
pub mod metrics;
pub mod models;
pub mod services;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::CopyStore;
use crate::services::{MasterService, SignalService, SubscriptionService};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CopyStore>,
    pub config: AppConfig,
    pub metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
    /// Shared with the propagation loop; `true` skips ticks.
    pub pause_flag: Arc<AtomicBool>,
    pub masters: MasterService,
    pub subscriptions: SubscriptionService,
    pub signals: SignalService,
}
