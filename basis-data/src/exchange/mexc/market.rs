use super::Mexc;
use crate::{Identifier, subscription::Subscription};
use basis_instrument::exchange::ExchangeId;
use smol_str::SmolStr;

/// Translates an ecosystem [`Subscription`] into a [`MexcMarket`] used to generate
/// [`Connector::requests`](crate::exchange::Connector::requests).
///
/// eg/ MexcMarket("BTCUSDT")
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct MexcMarket(pub SmolStr);

impl<Kind> Identifier<MexcMarket> for Subscription<Mexc, Kind> {
    fn id(&self) -> MexcMarket {
        MexcMarket(self.symbol.market_name(ExchangeId::MexcSpot))
    }
}

impl AsRef<str> for MexcMarket {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
