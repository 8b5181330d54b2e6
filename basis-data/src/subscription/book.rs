use super::SubscriptionKind;
use crate::books::{Level, OrderBookEvent, mid_price};
use chrono::{DateTime, Utc};
use derive_more::Constructor;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// [`Subscription`](super::Subscription) [`SubscriptionKind`] that yields [`BookTicker`]
/// market events - the best non-aggregated bid and ask on each side of the book.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct BookTickers;

impl SubscriptionKind for BookTickers {
    type Event = BookTicker;
    fn as_str(&self) -> &'static str {
        "book_ticker"
    }
}

impl std::fmt::Display for BookTickers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Normalised top-of-book snapshot for one symbol at one venue.
///
/// The `update_id` is venue-assigned and monotonically increasing, so the view with the
/// greatest `update_id` seen is always the latest.
#[derive(
    Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Constructor,
)]
pub struct BookTicker {
    pub time_exchange: DateTime<Utc>,
    pub update_id: u64,
    pub bid: Level,
    pub ask: Level,
}

impl BookTicker {
    /// Calculate the mid-price by taking the average of the best bid and ask prices.
    pub fn mid_price(&self) -> Decimal {
        mid_price(self.bid.price, self.ask.price)
    }
}

/// [`Subscription`](super::Subscription) [`SubscriptionKind`] that yields L2
/// [`OrderBookEvent`] market events - the book with orders at each price level aggregated.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct OrderBooksL2;

impl SubscriptionKind for OrderBooksL2 {
    type Event = OrderBookEvent;
    fn as_str(&self) -> &'static str {
        "order_books_l2"
    }
}

impl std::fmt::Display for OrderBooksL2 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_book_ticker_mid_price() {
        let ticker = BookTicker::new(
            Utc::now(),
            1,
            Level::new(dec!(100.00), dec!(1)),
            Level::new(dec!(100.10), dec!(2)),
        );
        assert_eq!(ticker.mid_price(), dec!(100.05));
    }
}
