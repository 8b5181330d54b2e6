use chrono::{DateTime, Utc};
use derive_more::Constructor;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Single price level - a price and the amount resting at it.
#[derive(
    Debug, Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize,
    Constructor,
)]
pub struct Level {
    pub price: Decimal,
    pub amount: Decimal,
}

impl<P, A> From<(P, A)> for Level
where
    P: Into<Decimal>,
    A: Into<Decimal>,
{
    fn from((price, amount): (P, A)) -> Self {
        Self::new(price.into(), amount.into())
    }
}

/// Normalised local order book snapshot - bids descending, asks ascending.
///
/// Populated from a venue REST snapshot, then patched with streaming diffs via
/// [`OrderBook::update`]. A level amount of zero in an update removes the level.
#[derive(Clone, PartialEq, Eq, Debug, Default, Deserialize, Serialize)]
pub struct OrderBook {
    last_update_id: u64,
    time_exchange: Option<DateTime<Utc>>,
    bids: Vec<Level>,
    asks: Vec<Level>,
}

/// Streaming change to a local [`OrderBook`].
#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub enum OrderBookEvent {
    Snapshot(OrderBook),
    Update(OrderBook),
}

impl OrderBook {
    /// Construct a new sorted [`OrderBook`].
    ///
    /// The passed bid and ask levels do not need to be pre-sorted.
    pub fn new<IterBids, IterAsks, L>(
        last_update_id: u64,
        time_exchange: Option<DateTime<Utc>>,
        bids: IterBids,
        asks: IterAsks,
    ) -> Self
    where
        IterBids: IntoIterator<Item = L>,
        IterAsks: IntoIterator<Item = L>,
        L: Into<Level>,
    {
        let mut bids = bids.into_iter().map(L::into).collect::<Vec<_>>();
        let mut asks = asks.into_iter().map(L::into).collect::<Vec<_>>();
        bids.sort_unstable_by(|a, b| cmp_desc(&a.price, &b.price));
        asks.sort_unstable_by(|a, b| a.price.cmp(&b.price));

        Self {
            last_update_id,
            time_exchange,
            bids,
            asks,
        }
    }

    /// Monotonically increasing venue update id of the last applied event.
    pub fn last_update_id(&self) -> u64 {
        self.last_update_id
    }

    pub fn time_exchange(&self) -> Option<DateTime<Utc>> {
        self.time_exchange
    }

    /// Return a reference to the descending bid levels.
    pub fn bids(&self) -> &[Level] {
        &self.bids
    }

    /// Return a reference to the ascending ask levels.
    pub fn asks(&self) -> &[Level] {
        &self.asks
    }

    pub fn best_bid(&self) -> Option<Level> {
        self.bids.first().copied()
    }

    pub fn best_ask(&self) -> Option<Level> {
        self.asks.first().copied()
    }

    /// Update the local book from a new [`OrderBookEvent`].
    ///
    /// Updates carrying a `last_update_id` at or before the current one are ignored - the
    /// venue re-sends overlapping diffs after reconnects.
    pub fn update(&mut self, event: &OrderBookEvent) {
        match event {
            OrderBookEvent::Snapshot(snapshot) => {
                *self = snapshot.clone();
            }
            OrderBookEvent::Update(update) => {
                if update.last_update_id <= self.last_update_id {
                    return;
                }
                self.last_update_id = update.last_update_id;
                self.time_exchange = update.time_exchange;
                upsert_levels(&mut self.bids, &update.bids, cmp_desc);
                upsert_levels(&mut self.asks, &update.asks, |a, b| a.cmp(b));
            }
        }
    }

    /// Calculate the mid-price by taking the average of the best bid and ask prices.
    pub fn mid_price(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(mid_price(bid.price, ask.price)),
            _ => None,
        }
    }
}

fn cmp_desc(a: &Decimal, b: &Decimal) -> Ordering {
    b.cmp(a)
}

fn upsert_levels<F>(levels: &mut Vec<Level>, updates: &[Level], cmp: F)
where
    F: Fn(&Decimal, &Decimal) -> Ordering + Copy,
{
    for update in updates {
        match levels.binary_search_by(|level| cmp(&level.price, &update.price)) {
            Ok(index) if update.amount.is_zero() => {
                levels.remove(index);
            }
            Ok(index) => levels[index].amount = update.amount,
            Err(_) if update.amount.is_zero() => {}
            Err(index) => levels.insert(index, *update),
        }
    }
}

/// Calculate the mid-price of the provided best bid and ask prices.
pub fn mid_price(best_bid: Decimal, best_ask: Decimal) -> Decimal {
    (best_bid + best_ask) / Decimal::TWO
}

/// Calculate the volume weighted mid-price (micro-price) of the provided best bid and ask
/// [`Level`]s.
pub fn volume_weighted_mid_price(best_bid: Level, best_ask: Level) -> Decimal {
    ((best_bid.price * best_ask.amount) + (best_ask.price * best_bid.amount))
        / (best_bid.amount + best_ask.amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn book() -> OrderBook {
        OrderBook::new(
            100,
            None,
            vec![(dec!(100.00), dec!(1)), (dec!(99.00), dec!(2))],
            vec![(dec!(100.10), dec!(1)), (dec!(101.00), dec!(3))],
        )
    }

    #[test]
    fn test_new_sorts_levels() {
        let book = OrderBook::new(
            1,
            None,
            vec![(dec!(99), dec!(1)), (dec!(100), dec!(1))],
            vec![(dec!(101), dec!(1)), (dec!(100.1), dec!(1))],
        );
        assert_eq!(book.best_bid().unwrap().price, dec!(100));
        assert_eq!(book.best_ask().unwrap().price, dec!(100.1));
    }

    #[test]
    fn test_update_upserts_and_removes_levels() {
        let mut book = book();

        book.update(&OrderBookEvent::Update(OrderBook::new(
            101,
            None,
            // Replace best bid amount, delete second bid, insert new bid
            vec![
                (dec!(100.00), dec!(5)),
                (dec!(99.00), dec!(0)),
                (dec!(99.50), dec!(4)),
            ],
            vec![(dec!(100.10), dec!(0))],
        )));

        assert_eq!(
            book.bids(),
            &[
                Level::new(dec!(100.00), dec!(5)),
                Level::new(dec!(99.50), dec!(4)),
            ]
        );
        assert_eq!(book.asks(), &[Level::new(dec!(101.00), dec!(3))]);
        assert_eq!(book.last_update_id(), 101);
    }

    #[test]
    fn test_update_ignores_stale_sequence() {
        let mut book = book();
        let before = book.clone();

        book.update(&OrderBookEvent::Update(OrderBook::new(
            100,
            None,
            vec![(dec!(50), dec!(1))],
            Vec::<(Decimal, Decimal)>::new(),
        )));

        assert_eq!(book, before);
    }

    #[test]
    fn test_mid_price() {
        assert_eq!(book().mid_price(), Some(dec!(100.05)));
    }

    #[test]
    fn test_volume_weighted_mid_price() {
        let bid = Level::new(dec!(100), dec!(2));
        let ask = Level::new(dec!(102), dec!(1));
        // (100*1 + 102*2) / 3
        assert_eq!(
            volume_weighted_mid_price(bid, ask),
            dec!(304) / dec!(3)
        );
    }
}
