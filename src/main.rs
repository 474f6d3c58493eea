use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use copytrade::api::router::create_router;
use copytrade::config::{AppConfig, StoreBackend};
use copytrade::db::{self, CopyStore, MemoryStore, PgStore};
use copytrade::execution::{
    spawn_propagation_loop, AccountLocks, CapitalLedger, DryRunEngine, HttpLedger,
    HttpTradingEngine, InMemoryLedger, IntervalScheduler, Ledger, Propagator, TradingEngine,
};
use copytrade::services::{MasterService, Notifier, SignalService, SubscriptionService};
use copytrade::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    let addr = format!("{}:{}", config.host, config.port);
    let metrics_handle = copytrade::metrics::init_metrics();

    // --- Persistence ---
    let store: Arc<dyn CopyStore> = match (config.store_backend, &config.database_url) {
        (StoreBackend::Postgres, Some(url)) => {
            tracing::info!("Connecting to database...");
            let pool = db::init_pool(url).await?;
            tracing::info!("Database connected, migrations applied");
            Arc::new(PgStore::new(pool))
        }
        _ => {
            tracing::warn!("Using in-memory store, state is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    // --- Collaborators ---
    let ledger: Arc<dyn Ledger> = match &config.wallet_service_url {
        Some(url) => Arc::new(HttpLedger::new(url.clone(), config.internal_api_token.clone())),
        None => {
            tracing::warn!("WALLET_SERVICE_URL not set, using in-memory ledger");
            Arc::new(InMemoryLedger::new())
        }
    };
    let capital = CapitalLedger::new(ledger);

    let engine: Arc<dyn TradingEngine> = match &config.trading_engine_url {
        Some(url) => Arc::new(HttpTradingEngine::new(
            url.clone(),
            config.internal_api_token.clone(),
        )),
        None => {
            tracing::warn!("TRADING_ENGINE_URL not set, copied orders run in dry-run mode");
            Arc::new(DryRunEngine)
        }
    };

    let notifier = config.notification_service_url.as_ref().map(|url| {
        Arc::new(Notifier::new(url.clone(), config.internal_api_token.clone()))
    });
    if notifier.is_none() {
        tracing::info!("Notifications disabled (NOTIFICATION_SERVICE_URL not set)");
    }

    // --- Propagation loop ---
    let pause_flag = Arc::new(AtomicBool::new(false));
    if config.propagation_enabled {
        let propagation = config.propagation();
        let scheduler = IntervalScheduler::new(propagation.interval);
        let propagator = Propagator::new(store.clone(), capital.clone(), engine.clone(), propagation);
        let _propagation = spawn_propagation_loop(propagator, scheduler, pause_flag.clone());
        tracing::info!(
            interval_secs = config.propagation_interval_secs,
            "Propagation loop spawned"
        );
    } else {
        tracing::info!("Propagation disabled (PROPAGATION_ENABLED=false)");
    }

    let state = AppState {
        masters: MasterService::new(store.clone(), config.default_base_allocation),
        subscriptions: SubscriptionService::new(
            store.clone(),
            capital,
            engine,
            AccountLocks::new(),
            notifier,
            config.settlement_currency.clone(),
        ),
        signals: SignalService::new(store.clone()),
        store,
        config,
        metrics_handle,
        pause_flag,
    };
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {addr}");
    axum::serve(listener, router).await?;

    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(EnvFilter::from_default_env());
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}
