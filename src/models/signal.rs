use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::{text_enum, Side};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalStatus {
    Pending,
    Executed,
    Failed,
    Cancelled,
}

text_enum!(SignalStatus {
    Pending => "pending",
    Executed => "executed",
    Failed => "failed",
    Cancelled => "cancelled",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Market,
    Limit,
}

text_enum!(OrderType {
    Market => "market",
    Limit => "limit",
});

/// Database row for trade_signals table: one master trade awaiting fan-out.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Signal {
    pub id: Uuid,
    pub master_trader_id: Uuid,
    pub trading_pair: String,
    pub side: Side,
    pub order_type: OrderType,
    pub quantity: Decimal,
    pub price: Decimal,
    pub status: SignalStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Signal {
    pub fn quote_currency(&self) -> Option<String> {
        super::quote_currency(&self.trading_pair)
    }
}

/// A master trade as observed, before it is persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSignal {
    pub master_trader_id: Uuid,
    pub trading_pair: String,
    pub side: Side,
    pub order_type: OrderType,
    pub quantity: Decimal,
    pub price: Decimal,
}
