use super::de_decimal_flexible;
use crate::{
    Identifier,
    books::Level,
    event::{MarketEvent, MarketIter},
    exchange::{gateio::channel::GateioChannel, subscription::ExchangeSub},
    subscription::book::BookTicker,
};
use basis_instrument::{exchange::ExchangeId, symbol::Symbol};
use basis_integration::subscription::SubscriptionId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::exchange::gateio::message::GateioMessage;

pub type GateioFuturesBookTicker = GateioMessage<GateioFuturesBookTickerInner>;

/// Gate.io real-time futures best bid/ask message.
///
/// ### Raw Payload Examples
/// See docs: <https://www.gate.io/docs/developers/futures/ws/en/#best-ask-bid-subscription>
/// ```json
/// {
///     "t": 1615366379123,
///     "u": 2517661076,
///     "s": "BTC_USDT",
///     "b": "54696.6",
///     "B": 1223,
///     "a": "54696.7",
///     "A": 1543
/// }
/// ```
#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct GateioFuturesBookTickerInner {
    #[serde(rename = "s", deserialize_with = "de_book_ticker_subscription_id")]
    pub subscription_id: SubscriptionId,
    #[serde(
        rename = "t",
        deserialize_with = "basis_integration::de::de_u64_epoch_ms_as_datetime_utc"
    )]
    pub time: DateTime<Utc>,
    #[serde(rename = "u")]
    pub update_id: u64,
    #[serde(rename = "b", deserialize_with = "de_decimal_flexible")]
    pub best_bid_price: Decimal,
    #[serde(rename = "B", deserialize_with = "de_decimal_flexible")]
    pub best_bid_amount: Decimal,
    #[serde(rename = "a", deserialize_with = "de_decimal_flexible")]
    pub best_ask_price: Decimal,
    #[serde(rename = "A", deserialize_with = "de_decimal_flexible")]
    pub best_ask_amount: Decimal,
}

impl Identifier<Option<SubscriptionId>> for GateioFuturesBookTicker {
    fn id(&self) -> Option<SubscriptionId> {
        Some(self.data.subscription_id.clone())
    }
}

impl From<(ExchangeId, Symbol, GateioFuturesBookTicker)> for MarketIter<BookTicker> {
    fn from(
        (exchange_id, symbol, ticker): (ExchangeId, Symbol, GateioFuturesBookTicker),
    ) -> Self {
        Self(vec![Ok(MarketEvent {
            time_exchange: ticker.data.time,
            time_received: Utc::now(),
            exchange: exchange_id,
            symbol,
            kind: BookTicker {
                time_exchange: ticker.data.time,
                update_id: ticker.data.update_id,
                bid: Level {
                    price: ticker.data.best_bid_price,
                    amount: ticker.data.best_bid_amount,
                },
                ask: Level {
                    price: ticker.data.best_ask_price,
                    amount: ticker.data.best_ask_amount,
                },
            },
        })])
    }
}

fn de_book_ticker_subscription_id<'de, D>(deserializer: D) -> Result<SubscriptionId, D::Error>
where
    D: serde::de::Deserializer<'de>,
{
    <&str as Deserialize<'de>>::deserialize(deserializer)
        .map(|market| ExchangeSub::from((GateioChannel::FUTURES_BOOK_TICKER, market)).id())
}

#[cfg(test)]
mod tests {
    use super::*;

    mod de {
        use super::*;
        use rust_decimal_macros::dec;

        #[test]
        fn test_gateio_futures_book_ticker_inner() {
            struct TestCase {
                input: &'static str,
                expected: GateioFuturesBookTickerInner,
            }

            let tests = vec![
                TestCase {
                    // TC0: quantities as plain numbers (futures contract counts)
                    input: r#"
                    {
                        "t": 1615366379123,
                        "u": 2517661076,
                        "s": "BTC_USDT",
                        "b": "54696.6",
                        "B": 1223,
                        "a": "54696.7",
                        "A": 1543
                    }
                    "#,
                    expected: GateioFuturesBookTickerInner {
                        subscription_id: SubscriptionId::from("futures.book_ticker|BTC_USDT"),
                        time: DateTime::from_timestamp_millis(1615366379123).unwrap(),
                        update_id: 2517661076,
                        best_bid_price: dec!(54696.6),
                        best_bid_amount: dec!(1223),
                        best_ask_price: dec!(54696.7),
                        best_ask_amount: dec!(1543),
                    },
                },
                TestCase {
                    // TC1: quantities as strings
                    input: r#"
                    {
                        "t": 1615366379124,
                        "u": 2517661077,
                        "s": "ETH_USDT",
                        "b": "1215.27",
                        "B": "32.49",
                        "a": "1215.28",
                        "A": "13.93"
                    }
                    "#,
                    expected: GateioFuturesBookTickerInner {
                        subscription_id: SubscriptionId::from("futures.book_ticker|ETH_USDT"),
                        time: DateTime::from_timestamp_millis(1615366379124).unwrap(),
                        update_id: 2517661077,
                        best_bid_price: dec!(1215.27),
                        best_bid_amount: dec!(32.49),
                        best_ask_price: dec!(1215.28),
                        best_ask_amount: dec!(13.93),
                    },
                },
            ];

            for (index, test) in tests.into_iter().enumerate() {
                let actual =
                    serde_json::from_str::<GateioFuturesBookTickerInner>(test.input).unwrap();
                assert_eq!(actual, test.expected, "TC{index} failed");
            }
        }
    }
}
