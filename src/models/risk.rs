use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Per-subscription risk controls applied while sizing copied orders.
///
/// Unknown keys are rejected so a typo in a client payload fails loudly
/// instead of silently disabling a limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RiskSettings {
    /// Pairs this follower copies; empty means every pair.
    pub allowed_pairs: Vec<String>,
    /// Whether sell signals are mirrored.
    pub copy_sells: bool,
    /// Sized quantities below this are skipped.
    pub min_order_quantity: Option<Decimal>,
    /// Upper bound on `quantity * price` for a single copied order.
    pub max_order_notional: Option<Decimal>,
}

impl Default for RiskSettings {
    fn default() -> Self {
        Self {
            allowed_pairs: Vec::new(),
            copy_sells: true,
            min_order_quantity: None,
            max_order_notional: None,
        }
    }
}

impl RiskSettings {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(min) = self.min_order_quantity {
            if min <= Decimal::ZERO {
                return Err("min_order_quantity must be positive".into());
            }
        }
        if let Some(max) = self.max_order_notional {
            if max <= Decimal::ZERO {
                return Err("max_order_notional must be positive".into());
            }
        }
        if self.allowed_pairs.iter().any(|p| super::split_pair(p).is_none()) {
            return Err("allowed_pairs entries must look like BASE/QUOTE".into());
        }
        Ok(())
    }

    pub fn allows_pair(&self, pair: &str) -> bool {
        self.allowed_pairs.is_empty()
            || self
                .allowed_pairs
                .iter()
                .any(|p| normalize_pair(p) == normalize_pair(pair))
    }
}

fn normalize_pair(pair: &str) -> String {
    pair.trim().to_uppercase().replace('-', "/")
}
