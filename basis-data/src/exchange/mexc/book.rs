use super::proto;
use crate::{
    books::Level,
    error::DataError,
    event::{MarketEvent, MarketIter},
    subscription::book::BookTicker,
};
use basis_instrument::{exchange::ExchangeId, symbol::Symbol};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

fn ms_epoch_to_datetime_utc(ms: i64) -> Result<DateTime<Utc>, DataError> {
    if ms < 0 {
        return Err(DataError::Socket(format!(
            "invalid MEXC timestamp: negative unix_epoch_ms: {ms}"
        )));
    }
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| DataError::Socket(format!("invalid MEXC timestamp: unix_epoch_ms: {ms}")))
}

fn parse_level(price: &str, quantity: &str) -> Result<Level, DataError> {
    let price = price.parse::<Decimal>().map_err(|error| {
        DataError::Socket(format!(
            "failed to parse price from MEXC agg book ticker: '{price}', error: {error}"
        ))
    })?;
    let amount = quantity.parse::<Decimal>().map_err(|error| {
        DataError::Socket(format!(
            "failed to parse quantity from MEXC agg book ticker: '{quantity}', error: {error}"
        ))
    })?;
    Ok(Level::new(price, amount))
}

impl From<(ExchangeId, Symbol, proto::PushDataV3ApiWrapper)> for MarketIter<BookTicker> {
    fn from(
        (exchange_id, symbol, wrapper): (ExchangeId, Symbol, proto::PushDataV3ApiWrapper),
    ) -> Self {
        let time_received = Utc::now();

        let Some(proto::push_data_v3_api_wrapper::Body::PublicAggreBookTicker(ticker)) =
            wrapper.body
        else {
            return Self(vec![]);
        };

        let time_exchange = wrapper
            .send_time
            .or(wrapper.create_time)
            .and_then(|ms| ms_epoch_to_datetime_utc(ms).ok())
            .unwrap_or(time_received);

        let bid = match parse_level(&ticker.bid_price, &ticker.bid_quantity) {
            Ok(level) => level,
            Err(error) => return Self(vec![Err(error)]),
        };
        let ask = match parse_level(&ticker.ask_price, &ticker.ask_quantity) {
            Ok(level) => level,
            Err(error) => return Self(vec![Err(error)]),
        };

        Self(vec![Ok(MarketEvent {
            time_exchange,
            time_received,
            exchange: exchange_id,
            symbol,
            kind: BookTicker {
                time_exchange,
                // The aggregated stream carries no explicit sequence - the send time in ms is
                // venue-assigned and monotonically increasing at the aggregation interval.
                update_id: time_exchange.timestamp_millis() as u64,
                bid,
                ask,
            },
        })])
    }
}
