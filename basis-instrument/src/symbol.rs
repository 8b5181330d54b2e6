use crate::{Underlying, asset::AssetNameInternal, exchange::ExchangeId};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use smol_str::{SmolStr, StrExt, format_smolstr};
use std::fmt::{Display, Formatter};

/// Kind of market a [`Symbol`] trades on.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display,
)]
#[serde(rename_all = "snake_case")]
pub enum MarketKind {
    Spot,
    Perpetual,
}

/// Trading pair - a base and quote asset on a [`MarketKind`].
///
/// Immutable and hashable so it can key maps shared across the ecosystem. The venue-specific
/// wire representation of a pair differs per venue, see [`Symbol::market_name`].
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
pub struct Symbol {
    #[serde(flatten)]
    pub underlying: Underlying<AssetNameInternal>,
    pub kind: MarketKind,
}

impl Symbol {
    /// Construct a new [`Symbol`] from the provided base, quote and [`MarketKind`].
    pub fn new<A>(base: A, quote: A, kind: MarketKind) -> Self
    where
        A: Into<AssetNameInternal>,
    {
        Self {
            underlying: Underlying::new(base.into(), quote.into()),
            kind,
        }
    }

    /// Construct a spot [`Symbol`].
    pub fn spot<A>(base: A, quote: A) -> Self
    where
        A: Into<AssetNameInternal>,
    {
        Self::new(base, quote, MarketKind::Spot)
    }

    /// Construct a perpetual [`Symbol`].
    pub fn perpetual<A>(base: A, quote: A) -> Self
    where
        A: Into<AssetNameInternal>,
    {
        Self::new(base, quote, MarketKind::Perpetual)
    }

    pub fn base(&self) -> &AssetNameInternal {
        &self.underlying.base
    }

    pub fn quote(&self) -> &AssetNameInternal {
        &self.underlying.quote
    }

    /// Venue-specific market name for this [`Symbol`].
    ///
    /// eg/ MEXC spot "BTCUSDT", Gate.io perpetuals "BTC_USDT".
    pub fn market_name(&self, exchange: ExchangeId) -> SmolStr {
        match exchange {
            ExchangeId::MexcSpot => format_smolstr!(
                "{}{}",
                self.underlying.base.name().to_uppercase_smolstr(),
                self.underlying.quote.name().to_uppercase_smolstr(),
            ),
            ExchangeId::GateioPerpetualsUsd | ExchangeId::Mock => format_smolstr!(
                "{}_{}",
                self.underlying.base.name().to_uppercase_smolstr(),
                self.underlying.quote.name().to_uppercase_smolstr(),
            ),
        }
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}_{}_{}",
            self.underlying.base, self.underlying.quote, self.kind
        )
    }
}

impl<A> From<(A, A, MarketKind)> for Symbol
where
    A: Into<AssetNameInternal>,
{
    fn from((base, quote, kind): (A, A, MarketKind)) -> Self {
        Self::new(base, quote, kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_market_name_per_venue() {
        struct TestCase {
            input: Symbol,
            exchange: ExchangeId,
            expected: &'static str,
        }

        let tests = vec![
            TestCase {
                // TC0: MEXC spot concatenates upper-case base and quote
                input: Symbol::spot("btc", "usdt"),
                exchange: ExchangeId::MexcSpot,
                expected: "BTCUSDT",
            },
            TestCase {
                // TC1: Gate.io perpetuals separates with an underscore
                input: Symbol::perpetual("btc", "usdt"),
                exchange: ExchangeId::GateioPerpetualsUsd,
                expected: "BTC_USDT",
            },
            TestCase {
                // TC2: mixed-case construction is normalised
                input: Symbol::spot("Eth", "USDT"),
                exchange: ExchangeId::MexcSpot,
                expected: "ETHUSDT",
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            assert_eq!(
                test.input.market_name(test.exchange),
                test.expected,
                "TC{index} failed"
            );
        }
    }

    #[test]
    fn test_symbol_serde_round_trip() {
        let symbol = Symbol::perpetual("btc", "usdt");
        let json = serde_json::to_string(&symbol).unwrap();
        assert_eq!(serde_json::from_str::<Symbol>(&json).unwrap(), symbol);
    }
}
