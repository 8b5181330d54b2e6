use super::GateioPerpetualsUsd;
use crate::{
    Identifier,
    subscription::{Subscription, book::{BookTickers, OrderBooksL2}},
};

/// Translates an ecosystem [`Subscription`] into a [`GateioChannel`] used to generate
/// [`Connector::requests`](crate::exchange::Connector::requests).
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct GateioChannel(pub &'static str);

impl GateioChannel {
    /// Real-time best bid/ask channel.
    ///
    /// See docs: <https://www.gate.io/docs/developers/futures/ws/en/#best-ask-bid-subscription>
    pub const FUTURES_BOOK_TICKER: Self = Self("futures.book_ticker");

    /// Incremental order book update channel.
    ///
    /// See docs: <https://www.gate.io/docs/developers/futures/ws/en/#order-book-update-subscription>
    pub const FUTURES_ORDER_BOOK_UPDATE: Self = Self("futures.order_book_update");
}

impl Identifier<GateioChannel> for Subscription<GateioPerpetualsUsd, BookTickers> {
    fn id(&self) -> GateioChannel {
        GateioChannel::FUTURES_BOOK_TICKER
    }
}

impl Identifier<GateioChannel> for Subscription<GateioPerpetualsUsd, OrderBooksL2> {
    fn id(&self) -> GateioChannel {
        GateioChannel::FUTURES_ORDER_BOOK_UPDATE
    }
}

impl AsRef<str> for GateioChannel {
    fn as_ref(&self) -> &str {
        self.0
    }
}
