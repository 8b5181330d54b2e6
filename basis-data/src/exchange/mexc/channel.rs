use super::Mexc;
use crate::{
    Identifier,
    subscription::{Subscription, book::BookTickers},
};

/// Translates an ecosystem [`Subscription`] into a [`MexcChannel`] base string.
///
/// The actual topic sent to MEXC is constructed by appending "@<interval>@<symbol>" to this
/// base string, eg/ "spot@public.aggre.bookTicker.v3.api.pb@100ms@BTCUSDT".
///
/// See docs: <https://mexcdevelop.github.io/apidocs/spot_v3_en/#individual-symbol-book-ticker-streams>
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct MexcChannel(pub &'static str);

impl MexcChannel {
    /// Base channel for the real-time aggregated book ticker stream (Protocol Buffers).
    pub const AGGREGATED_BOOK_TICKER_PB: Self = Self("spot@public.aggre.bookTicker.v3.api.pb");
}

impl Identifier<MexcChannel> for Subscription<Mexc, BookTickers> {
    fn id(&self) -> MexcChannel {
        MexcChannel::AGGREGATED_BOOK_TICKER_PB
    }
}

impl AsRef<str> for MexcChannel {
    fn as_ref(&self) -> &str {
        self.0
    }
}
