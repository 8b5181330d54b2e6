use crate::error::DataError;
use basis_instrument::{exchange::ExchangeId, symbol::Symbol};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Convenient new type containing a collection of [`MarketEvent<T>`](MarketEvent)s.
#[derive(Debug)]
pub struct MarketIter<T>(pub Vec<Result<MarketEvent<T>, DataError>>);

impl<T> FromIterator<Result<MarketEvent<T>, DataError>> for MarketIter<T> {
    fn from_iter<Iter>(iter: Iter) -> Self
    where
        Iter: IntoIterator<Item = Result<MarketEvent<T>, DataError>>,
    {
        Self(iter.into_iter().collect())
    }
}

/// Normalised [`MarketEvent<T>`](Self) wrapping the `T` data variant in metadata.
///
/// ### Examples
/// - `MarketEvent<BookTicker>`
/// - `MarketEvent<OrderBookEvent>`
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct MarketEvent<T> {
    pub time_exchange: DateTime<Utc>,
    pub time_received: DateTime<Utc>,
    pub exchange: ExchangeId,
    pub symbol: Symbol,
    pub kind: T,
}

impl<T> MarketEvent<T> {
    pub fn map_kind<F, O>(self, op: F) -> MarketEvent<O>
    where
        F: FnOnce(T) -> O,
    {
        MarketEvent {
            time_exchange: self.time_exchange,
            time_received: self.time_received,
            exchange: self.exchange,
            symbol: self.symbol,
            kind: op(self.kind),
        }
    }
}
