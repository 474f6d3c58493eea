use rust_decimal::Decimal;
use std::env;
use std::time::Duration;

use crate::execution::position_sizer::SizingParams;
use crate::execution::PropagationConfig;

/// Where durable state lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub store_backend: StoreBackend,
    pub host: String,
    pub port: u16,
    pub api_token: Option<String>,
    /// Bearer token for `/api/v1/admin/*`; falls back to `api_token` when unset.
    pub admin_api_token: Option<String>,

    // Collaborators (absent → local stand-in)
    pub trading_engine_url: Option<String>,
    pub wallet_service_url: Option<String>,
    pub notification_service_url: Option<String>,
    pub internal_api_token: Option<String>,

    // Propagation
    pub propagation_enabled: bool,
    pub propagation_interval_secs: u64,
    pub signal_lookback_secs: i64,
    pub default_base_allocation: Decimal,
    pub settlement_currency: String,
    pub cap_allocation_ratio: bool,
    pub record_skipped_attempts: bool,
    pub order_quantity_dp: u32,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let store_backend = match env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "postgres".into())
            .to_lowercase()
            .as_str()
        {
            "memory" => StoreBackend::Memory,
            "postgres" => StoreBackend::Postgres,
            other => anyhow::bail!("unknown STORE_BACKEND: {other}"),
        };

        let database_url = env::var("DATABASE_URL").ok();
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            anyhow::bail!("DATABASE_URL must be set");
        }

        Ok(Self {
            database_url,
            store_backend,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()?,
            api_token: non_empty("API_TOKEN"),
            admin_api_token: non_empty("ADMIN_API_TOKEN"),

            trading_engine_url: non_empty("TRADING_ENGINE_URL"),
            wallet_service_url: non_empty("WALLET_SERVICE_URL"),
            notification_service_url: non_empty("NOTIFICATION_SERVICE_URL"),
            internal_api_token: non_empty("INTERNAL_API_TOKEN"),

            propagation_enabled: env::var("PROPAGATION_ENABLED")
                .unwrap_or_else(|_| "true".into())
                .parse()
                .unwrap_or(true),
            propagation_interval_secs: env::var("PROPAGATION_INTERVAL_SECS")
                .unwrap_or_else(|_| "5".into())
                .parse()
                .unwrap_or(5)
                .max(1),
            signal_lookback_secs: env::var("SIGNAL_LOOKBACK_SECS")
                .unwrap_or_else(|_| "3600".into())
                .parse()
                .unwrap_or(3600),
            default_base_allocation: env::var("DEFAULT_BASE_ALLOCATION")
                .unwrap_or_else(|_| "10000".into())
                .parse()
                .unwrap_or(Decimal::from(10_000)),
            settlement_currency: env::var("SETTLEMENT_CURRENCY")
                .unwrap_or_else(|_| "USDT".into())
                .to_uppercase(),
            cap_allocation_ratio: env::var("CAP_ALLOCATION_RATIO")
                .unwrap_or_else(|_| "false".into())
                .parse()
                .unwrap_or(false),
            record_skipped_attempts: env::var("RECORD_SKIPPED_ATTEMPTS")
                .unwrap_or_else(|_| "true".into())
                .parse()
                .unwrap_or(true),
            order_quantity_dp: env::var("ORDER_QUANTITY_DP")
                .unwrap_or_else(|_| "8".into())
                .parse()
                .unwrap_or(8),
        })
    }

    /// Settings the propagation loop runs with.
    pub fn propagation(&self) -> PropagationConfig {
        PropagationConfig {
            interval: Duration::from_secs(self.propagation_interval_secs),
            lookback: chrono::Duration::seconds(self.signal_lookback_secs),
            sizing: SizingParams {
                cap_allocation_ratio: self.cap_allocation_ratio,
                quantity_dp: self.order_quantity_dp,
            },
            record_skips: self.record_skipped_attempts,
        }
    }

    /// Defaults with an in-memory store; handy for tests and local runs.
    pub fn for_memory() -> Self {
        Self {
            database_url: None,
            store_backend: StoreBackend::Memory,
            host: "127.0.0.1".into(),
            port: 8080,
            api_token: None,
            admin_api_token: None,
            trading_engine_url: None,
            wallet_service_url: None,
            notification_service_url: None,
            internal_api_token: None,
            propagation_enabled: true,
            propagation_interval_secs: 5,
            signal_lookback_secs: 3600,
            default_base_allocation: Decimal::from(10_000),
            settlement_currency: "USDT".into(),
            cap_allocation_ratio: false,
            record_skipped_attempts: true,
            order_quantity_dp: 8,
        }
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_propagation_derivation() {
        let mut config = AppConfig::for_memory();
        config.signal_lookback_secs = 60;
        config.cap_allocation_ratio = true;
        config.order_quantity_dp = 4;

        let p = config.propagation();
        assert_eq!(p.interval, Duration::from_secs(5));
        assert_eq!(p.lookback, chrono::Duration::seconds(60));
        assert!(p.sizing.cap_allocation_ratio);
        assert_eq!(p.sizing.quantity_dp, 4);
        assert!(p.record_skips);
    }
}
