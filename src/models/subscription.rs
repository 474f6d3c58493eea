use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use super::{text_enum, RiskSettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Paused,
    Stopped,
}

text_enum!(SubscriptionStatus {
    Active => "active",
    Paused => "paused",
    Stopped => "stopped",
});

/// Database row for copy_trading_subscriptions table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Subscription {
    pub id: Uuid,
    pub follower_id: Uuid,
    pub master_trader_id: Uuid,
    /// Currency the allocation is locked in.
    pub currency: String,
    pub allocated_amount: Decimal,
    pub copy_percentage: Decimal,
    pub max_trade_amount: Option<Decimal>,
    pub stop_loss_percentage: Option<Decimal>,
    pub take_profit_percentage: Option<Decimal>,
    pub risk_settings: Json<RiskSettings>,
    pub status: SubscriptionStatus,
    pub profit_loss_amount: Decimal,
    pub profit_loss_percentage: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    pub fn is_active(&self) -> bool {
        self.status == SubscriptionStatus::Active
    }
}

#[derive(Debug, Clone)]
pub struct NewSubscription {
    pub follower_id: Uuid,
    pub master_trader_id: Uuid,
    pub currency: String,
    pub allocated_amount: Decimal,
    pub copy_percentage: Decimal,
    pub max_trade_amount: Option<Decimal>,
    pub stop_loss_percentage: Option<Decimal>,
    pub take_profit_percentage: Option<Decimal>,
    pub risk_settings: RiskSettings,
}

/// Partial update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubscriptionPatch {
    pub allocated_amount: Option<Decimal>,
    pub copy_percentage: Option<Decimal>,
    pub max_trade_amount: Option<Decimal>,
    pub stop_loss_percentage: Option<Decimal>,
    pub take_profit_percentage: Option<Decimal>,
    pub risk_settings: Option<RiskSettings>,
    pub status: Option<SubscriptionStatus>,
}

impl SubscriptionPatch {
    /// Apply the patch onto an in-memory copy of the row.
    pub fn apply_to(&self, sub: &mut Subscription) {
        if let Some(v) = self.allocated_amount {
            sub.allocated_amount = v;
        }
        if let Some(v) = self.copy_percentage {
            sub.copy_percentage = v;
        }
        if let Some(v) = self.max_trade_amount {
            sub.max_trade_amount = Some(v);
        }
        if let Some(v) = self.stop_loss_percentage {
            sub.stop_loss_percentage = Some(v);
        }
        if let Some(v) = self.take_profit_percentage {
            sub.take_profit_percentage = Some(v);
        }
        if let Some(v) = &self.risk_settings {
            sub.risk_settings = Json(v.clone());
        }
        if let Some(v) = self.status {
            sub.status = v;
        }
    }
}
