use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::{text_enum, OrderType, Side};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CopiedTradeStatus {
    Pending,
    Executed,
    Failed,
}

text_enum!(CopiedTradeStatus {
    Pending => "pending",
    Executed => "executed",
    Failed => "failed",
});

/// Database row for copied_trades table: one attempt per (signal, subscription).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CopiedTrade {
    pub id: Uuid,
    pub follower_id: Uuid,
    pub master_trader_id: Uuid,
    pub signal_id: Uuid,
    pub subscription_id: Uuid,
    pub trading_pair: String,
    pub side: Side,
    pub order_type: OrderType,
    pub quantity: Decimal,
    pub price: Decimal,
    pub status: CopiedTradeStatus,
    pub order_ref: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCopiedTrade {
    pub follower_id: Uuid,
    pub master_trader_id: Uuid,
    pub signal_id: Uuid,
    pub subscription_id: Uuid,
    pub trading_pair: String,
    pub side: Side,
    pub order_type: OrderType,
    pub quantity: Decimal,
    pub price: Decimal,
    pub status: CopiedTradeStatus,
    pub error_message: Option<String>,
}

/// Why a follower produced no copied trade for a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    InsufficientFunds,
    MasterMismatch,
    InvalidBaseAllocation,
    PairNotAllowed,
    SellsDisabled,
    BelowMinimum,
    ZeroQuantity,
    Overflow,
}

text_enum!(SkipReason {
    InsufficientFunds => "insufficient_funds",
    MasterMismatch => "master_mismatch",
    InvalidBaseAllocation => "invalid_base_allocation",
    PairNotAllowed => "pair_not_allowed",
    SellsDisabled => "sells_disabled",
    BelowMinimum => "below_minimum",
    ZeroQuantity => "zero_quantity",
    Overflow => "overflow",
});

/// Database row for copy_skips table (audit of skipped follower attempts).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CopySkip {
    pub id: Uuid,
    pub signal_id: Uuid,
    pub subscription_id: Uuid,
    pub follower_id: Uuid,
    pub reason: SkipReason,
    pub detail: Option<String>,
    pub created_at: DateTime<Utc>,
}
