use crate::symbol::MarketKind;
use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Unique identifier for a venue server.
///
/// ### Notes
/// A venue may have a distinct server per [`MarketKind`]. For example, Gate.io spot and
/// Gate.io USDT perpetuals have distinct APIs, so they would be represented as unique variants.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display,
)]
#[serde(rename = "exchange", rename_all = "snake_case")]
pub enum ExchangeId {
    Mock,
    MexcSpot,
    GateioPerpetualsUsd,
}

impl ExchangeId {
    /// Return the &str representation of this [`ExchangeId`].
    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeId::Mock => "mock",
            ExchangeId::MexcSpot => "mexc_spot",
            ExchangeId::GateioPerpetualsUsd => "gateio_perpetuals_usd",
        }
    }

    /// Determine if the venue served by this [`ExchangeId`] supports the provided [`MarketKind`].
    pub fn supports(&self, kind: MarketKind) -> bool {
        match self {
            ExchangeId::Mock => true,
            ExchangeId::MexcSpot => matches!(kind, MarketKind::Spot),
            ExchangeId::GateioPerpetualsUsd => matches!(kind, MarketKind::Perpetual),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exchange_id_serde_round_trip() {
        for exchange in [ExchangeId::MexcSpot, ExchangeId::GateioPerpetualsUsd] {
            let json = serde_json::to_string(&exchange).unwrap();
            assert_eq!(serde_json::from_str::<ExchangeId>(&json).unwrap(), exchange);
        }
    }

    #[test]
    fn test_supports_market_kind() {
        assert!(ExchangeId::MexcSpot.supports(MarketKind::Spot));
        assert!(!ExchangeId::MexcSpot.supports(MarketKind::Perpetual));
        assert!(ExchangeId::GateioPerpetualsUsd.supports(MarketKind::Perpetual));
        assert!(!ExchangeId::GateioPerpetualsUsd.supports(MarketKind::Spot));
    }
}
