use std::sync::Arc;

use metrics::counter;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::db::CopyStore;
use crate::errors::AppError;
use crate::models::{split_pair, NewSignal, OrderType, Side, Signal, MAX_AMOUNT};

fn default_order_type() -> OrderType {
    OrderType::Market
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PublishSignalRequest {
    pub trading_pair: String,
    pub side: Side,
    #[serde(default = "default_order_type")]
    pub order_type: OrderType,
    pub quantity: Decimal,
    pub price: Decimal,
}

/// Records master trades as pending signals for the propagation loop.
#[derive(Clone)]
pub struct SignalService {
    store: Arc<dyn CopyStore>,
}

impl SignalService {
    pub fn new(store: Arc<dyn CopyStore>) -> Self {
        Self { store }
    }

    pub async fn publish(&self, user_id: Uuid, req: PublishSignalRequest) -> Result<Signal, AppError> {
        let (base, quote) = split_pair(&req.trading_pair).ok_or_else(|| {
            AppError::Validation("trading_pair must look like BASE/QUOTE".into())
        })?;
        if req.quantity <= Decimal::ZERO {
            return Err(AppError::Validation("quantity must be positive".into()));
        }
        if req.quantity > MAX_AMOUNT || req.price > MAX_AMOUNT {
            return Err(AppError::Validation(format!(
                "quantity and price must not exceed {MAX_AMOUNT}"
            )));
        }
        match req.order_type {
            OrderType::Limit if req.price <= Decimal::ZERO => {
                return Err(AppError::Validation("limit orders need a positive price".into()));
            }
            OrderType::Market if req.price < Decimal::ZERO => {
                return Err(AppError::Validation("price cannot be negative".into()));
            }
            _ => {}
        }

        let master = self
            .store
            .get_master_by_user(user_id)
            .await?
            .filter(|m| m.is_active)
            .ok_or_else(|| AppError::NotFound("No active master trader for caller".into()))?;

        let new = NewSignal {
            master_trader_id: master.id,
            trading_pair: format!("{}/{}", base.to_uppercase(), quote.to_uppercase()),
            side: req.side,
            order_type: req.order_type,
            quantity: req.quantity,
            price: req.price,
        };
        let signal = self.store.insert_signal(&new).await?;

        counter!("signals_received_total").increment(1);
        tracing::info!(
            signal_id = %signal.id,
            master_id = %master.id,
            pair = %signal.trading_pair,
            side = %signal.side,
            quantity = %signal.quantity,
            price = %signal.price,
            "Signal published"
        );
        Ok(signal)
    }
}
