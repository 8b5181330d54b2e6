#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_crate_dependencies,
    unused_extern_crates,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms
)]
#![allow(clippy::type_complexity)]

//! # Basis-Instrument
//! Core exchange, symbol and asset data structures shared across the basis trading ecosystem,
//! alongside the venue trading rules ([`spec::SymbolSpec`]) used to round order amounts before
//! dispatch.

use derive_more::Constructor;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Defines the [`ExchangeId`](exchange::ExchangeId) enum covering the venues the basis
/// ecosystem connects to.
pub mod exchange;

/// Asset name newtypes.
///
/// eg/ `AssetNameInternal("btc")`, `AssetNameExchange("BTC")`.
pub mod asset;

/// [`Symbol`](symbol::Symbol) trading pair and its venue-specific market naming.
pub mod symbol;

/// Venue trading rules for a [`Symbol`](symbol::Symbol) - precisions, minimums, fees and
/// contract size - plus the rounding operations derived from them.
pub mod spec;

/// Underlying of a trading pair - a base and quote asset.
///
/// eg/ Underlying { base: "btc", quote: "usdt" }
#[derive(
    Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Constructor,
)]
pub struct Underlying<AssetKey> {
    pub base: AssetKey,
    pub quote: AssetKey,
}

/// [`Side`] of an order or trade - Buy or Sell.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Deserialize, Serialize)]
pub enum Side {
    #[serde(alias = "buy", alias = "BUY", alias = "b")]
    Buy,
    #[serde(alias = "sell", alias = "SELL", alias = "s")]
    Sell,
}

impl Side {
    /// Return the opposing [`Side`].
    pub fn flip(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl Display for Side {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Side::Buy => "buy",
                Side::Sell => "sell",
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_flip() {
        assert_eq!(Side::Buy.flip(), Side::Sell);
        assert_eq!(Side::Sell.flip(), Side::Buy);
    }

    #[test]
    fn test_side_de_aliases() {
        for (input, expected) in [
            (r#""Buy""#, Side::Buy),
            (r#""buy""#, Side::Buy),
            (r#""BUY""#, Side::Buy),
            (r#""b""#, Side::Buy),
            (r#""sell""#, Side::Sell),
            (r#""SELL""#, Side::Sell),
        ] {
            assert_eq!(serde_json::from_str::<Side>(input).unwrap(), expected);
        }
    }
}
