use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::db::CopyStore;
use crate::models::{CopiedTrade, Subscription};

const RECENT_TRADES: i64 = 50;

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct AnalyticsSummary {
    pub total_allocated: Decimal,
    pub total_pnl: Decimal,
    pub average_return: Decimal,
    pub active_subscriptions: usize,
}

#[derive(Debug, Serialize)]
pub struct CopyAnalytics {
    pub summary: AnalyticsSummary,
    pub subscriptions: Vec<Subscription>,
    pub recent_trades: Vec<CopiedTrade>,
}

/// Aggregate P&L across a follower's active subscriptions.
pub async fn follower_analytics(
    store: &dyn CopyStore,
    follower_id: Uuid,
) -> anyhow::Result<CopyAnalytics> {
    let active: Vec<Subscription> = store
        .subscriptions_for_follower(follower_id)
        .await?
        .into_iter()
        .filter(Subscription::is_active)
        .collect();
    let recent_trades = store.recent_copied_trades(follower_id, RECENT_TRADES).await?;

    Ok(CopyAnalytics {
        summary: summarize(&active),
        subscriptions: active,
        recent_trades,
    })
}

fn summarize(active: &[Subscription]) -> AnalyticsSummary {
    let total_allocated: Decimal = active.iter().map(|s| s.allocated_amount).sum();
    let total_pnl: Decimal = active.iter().map(|s| s.profit_loss_amount).sum();
    let average_return = if active.is_empty() {
        Decimal::ZERO
    } else {
        let sum: Decimal = active.iter().map(|s| s.profit_loss_percentage).sum();
        (sum / Decimal::from(active.len())).round_dp(4)
    };

    AnalyticsSummary {
        total_allocated,
        total_pnl,
        average_return,
        active_subscriptions: active.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RiskSettings, SubscriptionStatus};
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use sqlx::types::Json;

    fn sub(allocated: Decimal, pnl: Decimal, pnl_pct: Decimal) -> Subscription {
        Subscription {
            id: Uuid::new_v4(),
            follower_id: Uuid::new_v4(),
            master_trader_id: Uuid::new_v4(),
            currency: "USDT".into(),
            allocated_amount: allocated,
            copy_percentage: dec!(100),
            max_trade_amount: None,
            stop_loss_percentage: None,
            take_profit_percentage: None,
            risk_settings: Json(RiskSettings::default()),
            status: SubscriptionStatus::Active,
            profit_loss_amount: pnl,
            profit_loss_percentage: pnl_pct,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_summary_aggregates() {
        let subs = [sub(dec!(1000), dec!(50), dec!(5)), sub(dec!(3000), dec!(-30), dec!(-1))];
        let summary = summarize(&subs);
        assert_eq!(summary.total_allocated, dec!(4000));
        assert_eq!(summary.total_pnl, dec!(20));
        assert_eq!(summary.average_return, dec!(2));
        assert_eq!(summary.active_subscriptions, 2);
    }

    #[test]
    fn test_empty_summary() {
        let summary = summarize(&[]);
        assert_eq!(summary.average_return, Decimal::ZERO);
        assert_eq!(summary.active_subscriptions, 0);
    }
}
