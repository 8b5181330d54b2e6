use crate::{Identifier, subscription::Subscription};
use basis_integration::subscription::SubscriptionId;
use smol_str::format_smolstr;

/// Venue specific channel and market combination used to build venue subscription payloads,
/// and to identify the origin of consumed payloads.
///
/// ### Examples
/// - `ExchangeSub("futures.book_ticker", "BTC_USDT")`
/// - `ExchangeSub("spot@public.aggre.bookTicker.v3.api.pb", "BTCUSDT")`
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct ExchangeSub<Channel, Market> {
    /// Venue specific channel the subscription is for.
    pub channel: Channel,
    /// Venue specific market the subscription is for.
    pub market: Market,
}

impl<Channel, Market> ExchangeSub<Channel, Market>
where
    Channel: AsRef<str>,
    Market: AsRef<str>,
{
    /// Construct a new [`Self`] from the provided [`Subscription`].
    pub fn new<Exchange, Kind>(subscription: &Subscription<Exchange, Kind>) -> Self
    where
        Subscription<Exchange, Kind>: Identifier<Channel> + Identifier<Market>,
    {
        Self {
            channel: subscription.id(),
            market: subscription.id(),
        }
    }
}

impl<Channel, Market> Identifier<SubscriptionId> for ExchangeSub<Channel, Market>
where
    Channel: AsRef<str>,
    Market: AsRef<str>,
{
    fn id(&self) -> SubscriptionId {
        SubscriptionId::from(format_smolstr!(
            "{}|{}",
            self.channel.as_ref(),
            self.market.as_ref()
        ))
    }
}

impl<Channel, Market> From<(Channel, Market)> for ExchangeSub<Channel, Market>
where
    Channel: AsRef<str>,
    Market: AsRef<str>,
{
    fn from((channel, market): (Channel, Market)) -> Self {
        Self { channel, market }
    }
}
