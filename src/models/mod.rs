pub mod copied_trade;
pub mod master;
pub mod risk;
pub mod signal;
pub mod subscription;

pub use copied_trade::{CopiedTrade, CopiedTradeStatus, CopySkip, NewCopiedTrade, SkipReason};
pub use master::{
    ApprovalStatus, MasterApplication, MasterSummary, MasterTrader, PerformancePoint, RiskLevel,
};
pub use risk::RiskSettings;
pub use signal::{NewSignal, OrderType, Signal, SignalStatus};
pub use subscription::{NewSubscription, Subscription, SubscriptionPatch, SubscriptionStatus};

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Implements `as_str`, `Display`, `FromStr` and the Postgres TEXT codec for a
/// fieldless enum so it can be bound and decoded directly by sqlx.
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    other => Err(format!("unknown {} value: {other}", stringify!($name))),
                }
            }
        }

        impl sqlx::Type<sqlx::Postgres> for $name {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <String as sqlx::Type<sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
                <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
            }
        }

        impl<'q> sqlx::Encode<'q, sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut sqlx::postgres::PgArgumentBuffer,
            ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
                <&str as sqlx::Encode<'q, sqlx::Postgres>>::encode_by_ref(&self.as_str(), buf)
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::Postgres> for $name {
            fn decode(
                value: sqlx::postgres::PgValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                let text = <&str as sqlx::Decode<'r, sqlx::Postgres>>::decode(value)?;
                text.parse().map_err(Into::into)
            }
        }
    };
}

pub(crate) use text_enum;

// ---------------------------------------------------------------------------
// Side
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

text_enum!(Side {
    Buy => "buy",
    Sell => "sell",
});

// ---------------------------------------------------------------------------
// Trading pairs
// ---------------------------------------------------------------------------

/// Split a `BASE/QUOTE` or `BASE-QUOTE` symbol into its two currencies.
pub fn split_pair(pair: &str) -> Option<(&str, &str)> {
    let (base, quote) = pair.split_once('/').or_else(|| pair.split_once('-'))?;
    let (base, quote) = (base.trim(), quote.trim());
    if base.is_empty() || quote.is_empty() || quote.contains(['/', '-']) {
        return None;
    }
    Some((base, quote))
}

/// Settlement (quote) currency of a trading pair, upper-cased.
pub fn quote_currency(pair: &str) -> Option<String> {
    split_pair(pair).map(|(_, quote)| quote.to_uppercase())
}

// ---------------------------------------------------------------------------
// Amount bounds
// ---------------------------------------------------------------------------

/// Largest quantity, price or capital amount accepted from callers.
pub const MAX_AMOUNT: Decimal = dec!(1000000000000);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_pair_accepts_both_separators() {
        assert_eq!(split_pair("BTC/USDT"), Some(("BTC", "USDT")));
        assert_eq!(split_pair("eth-usdc"), Some(("eth", "usdc")));
        assert_eq!(quote_currency("eth-usdc").as_deref(), Some("USDC"));
    }

    #[test]
    fn test_split_pair_rejects_malformed() {
        assert_eq!(split_pair("BTCUSDT"), None);
        assert_eq!(split_pair("/USDT"), None);
        assert_eq!(split_pair("BTC/USDT/X"), None);
    }

    #[test]
    fn test_side_parses_case_insensitively() {
        assert_eq!("BUY".parse::<Side>(), Ok(Side::Buy));
        assert_eq!(Side::Sell.to_string(), "sell");
        assert!("hold".parse::<Side>().is_err());
    }
}
