use rust_decimal::{Decimal, RoundingStrategy};

use crate::models::{MasterTrader, Side, Signal, SkipReason, Subscription};

/// Knobs that shape sizing but are not per-subscription.
#[derive(Debug, Clone, Copy)]
pub struct SizingParams {
    /// Clamp `allocated_amount / base_allocation` to 1.0.
    pub cap_allocation_ratio: bool,
    /// Decimal places a copied quantity is rounded down to.
    pub quantity_dp: u32,
}

impl Default for SizingParams {
    fn default() -> Self {
        Self {
            cap_allocation_ratio: false,
            quantity_dp: 8,
        }
    }
}

/// Outcome of sizing one follower for one signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizingDecision {
    Quantity(Decimal),
    Skip(SkipReason),
}

/// Compute the follower's order quantity for a master's signal.
///
/// `signal.quantity * (allocated / base_allocation) * (copy_percentage / 100)`,
/// clamped by `max_trade_amount` and the subscription's risk settings, then
/// rounded down to the configured precision.
pub fn size_order(
    signal: &Signal,
    master: &MasterTrader,
    sub: &Subscription,
    params: &SizingParams,
) -> SizingDecision {
    if sub.master_trader_id != signal.master_trader_id || master.id != signal.master_trader_id {
        return SizingDecision::Skip(SkipReason::MasterMismatch);
    }
    if master.base_allocation <= Decimal::ZERO {
        return SizingDecision::Skip(SkipReason::InvalidBaseAllocation);
    }

    let risk = &sub.risk_settings.0;
    if !risk.allows_pair(&signal.trading_pair) {
        return SizingDecision::Skip(SkipReason::PairNotAllowed);
    }
    if signal.side == Side::Sell && !risk.copy_sells {
        return SizingDecision::Skip(SkipReason::SellsDisabled);
    }

    let Some(mut quantity) = proportional_quantity(
        signal.quantity,
        sub.allocated_amount,
        master.base_allocation,
        sub.copy_percentage,
        params.cap_allocation_ratio,
    ) else {
        return SizingDecision::Skip(SkipReason::Overflow);
    };

    if let Some(cap) = sub.max_trade_amount {
        quantity = quantity.min(cap);
    }

    if let Some(max_notional) = risk.max_order_notional {
        if signal.price > Decimal::ZERO {
            // An overflowing notional is above any representable cap.
            let over_cap = quantity
                .checked_mul(signal.price)
                .map_or(true, |notional| notional > max_notional);
            if over_cap {
                match max_notional.checked_div(signal.price) {
                    Some(q) => quantity = quantity.min(q),
                    None => return SizingDecision::Skip(SkipReason::Overflow),
                }
            }
        }
    }

    let quantity = quantity.round_dp_with_strategy(params.quantity_dp, RoundingStrategy::ToZero);
    if quantity <= Decimal::ZERO {
        return SizingDecision::Skip(SkipReason::ZeroQuantity);
    }

    if let Some(min) = risk.min_order_quantity {
        if quantity < min {
            return SizingDecision::Skip(SkipReason::BelowMinimum);
        }
    }

    SizingDecision::Quantity(quantity)
}

/// Proportional share of the master's quantity before any caps.
/// `None` when the result does not fit in a `Decimal`.
fn proportional_quantity(
    master_quantity: Decimal,
    allocated_amount: Decimal,
    base_allocation: Decimal,
    copy_percentage: Decimal,
    cap_ratio: bool,
) -> Option<Decimal> {
    let mut ratio = allocated_amount.checked_div(base_allocation)?;
    if cap_ratio {
        ratio = ratio.min(Decimal::ONE);
    }
    let copy_factor = copy_percentage.checked_div(Decimal::ONE_HUNDRED)?;
    master_quantity.checked_mul(ratio)?.checked_mul(copy_factor)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
