use super::GateioPerpetualsUsd;
use crate::{Identifier, subscription::Subscription};
use basis_instrument::exchange::ExchangeId;
use smol_str::SmolStr;

/// Translates an ecosystem [`Subscription`] into a [`GateioMarket`] used to generate
/// [`Connector::requests`](crate::exchange::Connector::requests).
///
/// eg/ GateioMarket("BTC_USDT")
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct GateioMarket(pub SmolStr);

impl<Kind> Identifier<GateioMarket> for Subscription<GateioPerpetualsUsd, Kind> {
    fn id(&self) -> GateioMarket {
        GateioMarket(self.symbol.market_name(ExchangeId::GateioPerpetualsUsd))
    }
}

impl AsRef<str> for GateioMarket {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
