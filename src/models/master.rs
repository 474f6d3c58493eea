use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::text_enum;

/// Self-declared risk appetite of a master's strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Conservative,
    Moderate,
    Aggressive,
    HighRisk,
}

text_enum!(RiskLevel {
    Conservative => "conservative",
    Moderate => "moderate",
    Aggressive => "aggressive",
    HighRisk => "high_risk",
});

/// Admin review state of a master application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

text_enum!(ApprovalStatus {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
});

/// Database row for master_traders table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MasterTrader {
    pub id: Uuid,
    pub user_id: Uuid,
    pub strategy_name: String,
    pub strategy_description: Option<String>,
    pub risk_level: RiskLevel,
    /// Reference capital a follower's allocation is scaled against.
    pub base_allocation: Decimal,
    pub performance_fee_percentage: Decimal,
    pub total_return: Option<Decimal>,
    pub win_rate: Option<Decimal>,
    pub max_drawdown: Option<Decimal>,
    pub approval_status: ApprovalStatus,
    pub is_active: bool,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Listing row: a master plus aggregates over its active subscriptions.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MasterSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub master: MasterTrader,
    pub followers_count: i64,
    pub total_managed: Decimal,
}

/// Database row for master_trader_performance table (written by reporting jobs).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PerformancePoint {
    pub id: Uuid,
    pub master_trader_id: Uuid,
    pub date: NaiveDate,
    pub daily_return: Decimal,
    pub cumulative_return: Decimal,
    pub followers_count: i32,
}

/// Input for a new master application.
#[derive(Debug, Clone, Deserialize)]
pub struct MasterApplication {
    pub strategy_name: String,
    pub strategy_description: Option<String>,
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub performance_fee_percentage: Decimal,
    pub base_allocation: Option<Decimal>,
}
