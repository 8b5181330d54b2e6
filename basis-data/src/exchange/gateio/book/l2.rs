use super::de_decimal_flexible;
use crate::{
    Identifier,
    books::{Level, OrderBook, OrderBookEvent},
    error::DataError,
    event::MarketEvent,
    exchange::{
        Connector,
        gateio::{GateioPerpetualsUsd, channel::GateioChannel, message::GateioMessage},
        subscription::ExchangeSub,
    },
    subscription::{Map, book::OrderBooksL2},
    transformer::ExchangeTransformer,
};
use async_trait::async_trait;
use basis_instrument::symbol::Symbol;
use basis_integration::{
    Transformer, protocol::websocket::WsMessage, subscription::SubscriptionId,
};
use chrono::{DateTime, Utc};
use fnv::FnvHashMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

pub type GateioFuturesOrderBookL2 = GateioMessage<GateioOrderBookUpdate>;

/// Gate.io incremental order book update.
///
/// `first_update_id` (U) and `last_update_id` (u) sequence consecutive diffs: a diff follows
/// on from the previous iff `U == prev_u + 1`.
///
/// ### Raw Payload Examples
/// See docs: <https://www.gate.io/docs/developers/futures/ws/en/#order-book-update-notification>
/// ```json
/// {
///     "t": 1615366381417,
///     "s": "BTC_USDT",
///     "U": 2517661101,
///     "u": 2517661110,
///     "b": [ { "p": "54672.1", "s": 0 }, { "p": "54664.5", "s": 58794 } ],
///     "a": [ { "p": "54743.6", "s": 0 } ]
/// }
/// ```
#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct GateioOrderBookUpdate {
    #[serde(rename = "s", deserialize_with = "de_ob_l2_subscription_id")]
    pub subscription_id: SubscriptionId,
    #[serde(
        rename = "t",
        deserialize_with = "basis_integration::de::de_u64_epoch_ms_as_datetime_utc"
    )]
    pub time: DateTime<Utc>,
    #[serde(rename = "U")]
    pub first_update_id: u64,
    #[serde(rename = "u")]
    pub last_update_id: u64,
    #[serde(rename = "b", default)]
    pub bids: Vec<GateioLevel>,
    #[serde(rename = "a", default)]
    pub asks: Vec<GateioLevel>,
}

#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct GateioLevel {
    #[serde(rename = "p", deserialize_with = "de_decimal_flexible")]
    pub price: Decimal,
    #[serde(rename = "s", deserialize_with = "de_decimal_flexible")]
    pub size: Decimal,
}

impl From<&GateioLevel> for Level {
    fn from(level: &GateioLevel) -> Self {
        Self {
            price: level.price,
            amount: level.size,
        }
    }
}

impl Identifier<Option<SubscriptionId>> for GateioFuturesOrderBookL2 {
    fn id(&self) -> Option<SubscriptionId> {
        Some(self.data.subscription_id.clone())
    }
}

fn de_ob_l2_subscription_id<'de, D>(deserializer: D) -> Result<SubscriptionId, D::Error>
where
    D: serde::de::Deserializer<'de>,
{
    <&str as Deserialize<'de>>::deserialize(deserializer)
        .map(|market| ExchangeSub::from((GateioChannel::FUTURES_ORDER_BOOK_UPDATE, market)).id())
}

/// Stateful [`ExchangeTransformer`] sequencing Gate.io order book diffs.
///
/// Tracks the `last_update_id` applied per symbol; a diff whose `first_update_id` skips ahead
/// means updates were lost, which surfaces as a terminal [`DataError::InvalidSequence`] so the
/// reconnecting stream re-initialises and the consumer re-seeds from a REST snapshot.
/// Diffs entirely at or before the tracked id are discarded (overlap after reconnect).
#[derive(Debug)]
pub struct GateioFuturesOrderBooksL2Transformer {
    instrument_map: Map<Symbol>,
    sequences: FnvHashMap<SubscriptionId, u64>,
}

#[async_trait]
impl ExchangeTransformer<GateioPerpetualsUsd, OrderBooksL2>
    for GateioFuturesOrderBooksL2Transformer
{
    async fn init(
        instrument_map: Map<Symbol>,
        _: mpsc::UnboundedSender<WsMessage>,
    ) -> Result<Self, DataError> {
        Ok(Self {
            instrument_map,
            sequences: FnvHashMap::default(),
        })
    }
}

impl Transformer for GateioFuturesOrderBooksL2Transformer {
    type Error = DataError;
    type Input = GateioFuturesOrderBookL2;
    type Output = MarketEvent<OrderBookEvent>;
    type OutputIter = Vec<Result<Self::Output, Self::Error>>;

    fn transform(&mut self, input: Self::Input) -> Self::OutputIter {
        let subscription_id = input.data.subscription_id.clone();

        let symbol = match self.instrument_map.find(&subscription_id) {
            Ok(symbol) => symbol.clone(),
            Err(unidentifiable) => return vec![Err(DataError::from(unidentifiable))],
        };

        let update = input.data;

        // Sequence the diff against the last applied update id for this symbol
        if let Some(prev_last_update_id) = self.sequences.get(&subscription_id).copied() {
            if update.last_update_id <= prev_last_update_id {
                return vec![];
            }
            if update.first_update_id > prev_last_update_id + 1 {
                return vec![Err(DataError::InvalidSequence {
                    prev_last_update_id,
                    first_update_id: update.first_update_id,
                })];
            }
        }
        self.sequences
            .insert(subscription_id, update.last_update_id);

        vec![Ok(MarketEvent {
            time_exchange: update.time,
            time_received: Utc::now(),
            exchange: GateioPerpetualsUsd::ID,
            symbol,
            kind: OrderBookEvent::Update(OrderBook::new(
                update.last_update_id,
                Some(update.time),
                update.bids.iter().map(Level::from),
                update.asks.iter().map(Level::from),
            )),
        })]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn update(first: u64, last: u64) -> GateioFuturesOrderBookL2 {
        GateioMessage {
            channel: "futures.order_book_update".to_string(),
            error: None,
            data: GateioOrderBookUpdate {
                subscription_id: SubscriptionId::from("futures.order_book_update|BTC_USDT"),
                time: Utc::now(),
                first_update_id: first,
                last_update_id: last,
                bids: vec![GateioLevel {
                    price: dec!(54672.1),
                    size: dec!(1),
                }],
                asks: vec![],
            },
        }
    }

    fn transformer() -> GateioFuturesOrderBooksL2Transformer {
        GateioFuturesOrderBooksL2Transformer {
            instrument_map: Map::from_iter([(
                SubscriptionId::from("futures.order_book_update|BTC_USDT"),
                Symbol::perpetual("btc", "usdt"),
            )]),
            sequences: FnvHashMap::default(),
        }
    }

    #[test]
    fn test_contiguous_updates_are_applied() {
        let mut transformer = transformer();

        let first = transformer.transform(update(100, 110));
        assert!(first[0].is_ok());

        let next = transformer.transform(update(111, 120));
        assert!(next[0].is_ok());
    }

    #[test]
    fn test_overlapping_update_is_discarded() {
        let mut transformer = transformer();
        let _ = transformer.transform(update(100, 110));

        let overlap = transformer.transform(update(105, 110));
        assert!(overlap.is_empty());
    }

    #[test]
    fn test_gap_surfaces_invalid_sequence() {
        let mut transformer = transformer();
        let _ = transformer.transform(update(100, 110));

        let gap = transformer.transform(update(115, 120));
        assert!(matches!(
            gap.first(),
            Some(Err(DataError::InvalidSequence {
                prev_last_update_id: 110,
                first_update_id: 115,
            }))
        ));
    }

    mod de {
        use super::*;

        #[test]
        fn test_gateio_order_book_update() {
            let input = r#"
            {
                "t": 1615366381417,
                "s": "BTC_USDT",
                "U": 2517661101,
                "u": 2517661110,
                "b": [ { "p": "54672.1", "s": 0 }, { "p": "54664.5", "s": 58794 } ],
                "a": [ { "p": "54743.6", "s": 0 } ]
            }
            "#;

            let actual = serde_json::from_str::<GateioOrderBookUpdate>(input).unwrap();
            assert_eq!(
                actual.subscription_id,
                SubscriptionId::from("futures.order_book_update|BTC_USDT")
            );
            assert_eq!(actual.first_update_id, 2517661101);
            assert_eq!(actual.last_update_id, 2517661110);
            assert_eq!(actual.bids.len(), 2);
            assert_eq!(actual.asks.len(), 1);
            assert_eq!(actual.bids[1].size, dec!(58794));
        }
    }
}
