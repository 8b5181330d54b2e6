use self::{
    channel::MexcChannel,
    market::MexcMarket,
    subscription::{MexcAggInterval, MexcWsMethod, MexcWsSub},
    validator::MexcWebSocketSubValidator,
};
use crate::{
    ExchangeWsPbStream,
    exchange::{Connector, StreamSelector, subscription::ExchangeSub},
    subscriber::WebSocketSubscriber,
    subscription::{Map, book::BookTickers},
    transformer::stateless::StatelessTransformer,
};
use basis_instrument::{exchange::ExchangeId, symbol::Symbol};
use basis_integration::{
    error::SocketError, protocol::websocket::WsMessage, subscription::SubscriptionId,
};
use smol_str::format_smolstr;
use std::borrow::Cow;
use tracing::warn;
use url::Url;

/// Defines the type that translates an ecosystem
/// [`Subscription`](crate::subscription::Subscription) into a venue specific channel.
pub mod channel;

/// Defines the type that translates an ecosystem
/// [`Subscription`](crate::subscription::Subscription) into a venue specific market.
pub mod market;

/// Subscription payload and response types.
pub mod subscription;

/// [`SubscriptionValidator`](crate::subscriber::validator::SubscriptionValidator) variant that
/// buffers binary frames received while JSON acks are still being validated.
pub mod validator;

/// Hand-rolled prost message definitions for the MEXC V3 push protocol.
pub mod proto;

/// Book ticker conversion from protobuf push messages.
pub mod book;

/// MEXC WebSocket API base URL for public market data streams.
///
/// See docs: <https://mexcdevelop.github.io/apidocs/spot_v3_en/#websocket-market-data>
pub const BASE_URL_MEXC: &str = "wss://wbs-api.mexc.com/ws";

/// [`Mexc`] venue connector.
///
/// MEXC uses Protocol Buffers for its V3 public data streams - subscription management stays
/// JSON, data frames are binary.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct Mexc;

impl Connector for Mexc {
    const ID: ExchangeId = ExchangeId::MexcSpot;
    type Channel = MexcChannel;
    type Market = MexcMarket;
    type Subscriber = WebSocketSubscriber;
    type SubValidator = MexcWebSocketSubValidator;
    type SubResponse = self::subscription::MexcSubResponse;

    fn url() -> Result<Url, SocketError> {
        Url::parse(BASE_URL_MEXC).map_err(SocketError::UrlParse)
    }

    fn requests(exchange_subs: Vec<ExchangeSub<Self::Channel, Self::Market>>) -> Vec<WsMessage> {
        if exchange_subs.is_empty() {
            return Vec::new();
        }

        let interval = MexcAggInterval::default();
        let topics = exchange_subs
            .into_iter()
            .map(|sub| {
                format!(
                    "{}@{}@{}",
                    sub.channel.as_ref(),
                    interval.as_str(),
                    sub.market.as_ref()
                )
            })
            .collect::<Vec<String>>();

        let subscription = MexcWsSub {
            method: MexcWsMethod::Subscription,
            params: Cow::Owned(topics),
            id: chrono::Utc::now().timestamp_millis() as u64,
        };

        match serde_json::to_string(&subscription) {
            Ok(payload) => vec![WsMessage::text(payload)],
            Err(error) => {
                warn!(%error, "failed to serialize MEXC subscription request");
                Vec::new()
            }
        }
    }

    /// MEXC acknowledges all topics in a single batched subscription message with one
    /// response.
    fn expected_responses(_: &Map<Symbol>) -> usize {
        1
    }
}

/// Strip the trailing `@{interval}@{symbol}` segments off a push topic, returning the
/// base channel and the embedded symbol.
///
/// The base channel itself contains `@` separators
/// (eg/ `spot@public.aggre.bookTicker.v3.api.pb@100ms@BTCUSDT`), so the topic is peeled
/// from the right.
fn split_push_topic(topic: &str) -> Option<(&str, &str)> {
    let (rest, symbol) = topic.rsplit_once('@')?;
    let (base_channel, _interval) = rest.rsplit_once('@')?;
    Some((base_channel, symbol))
}

impl crate::Identifier<Option<SubscriptionId>> for proto::PushDataV3ApiWrapper {
    fn id(&self) -> Option<SubscriptionId> {
        // SubscriptionIds for Mexc streams are keyed `"{base_channel}|{symbol}"`, dropping
        // the aggregation interval. The envelope's explicit symbol field wins over the one
        // embedded in the topic when present.
        let id = match split_push_topic(&self.channel) {
            Some((base_channel, topic_symbol)) => {
                let symbol = self.symbol.as_deref().unwrap_or(topic_symbol);
                format_smolstr!("{base_channel}|{symbol}")
            }
            // Malformed topic - keyed as-is so the mismatch surfaces as Unidentifiable
            None => self.channel.as_str().into(),
        };

        Some(SubscriptionId::from(id))
    }
}

impl StreamSelector<BookTickers> for Mexc {
    type Stream =
        ExchangeWsPbStream<StatelessTransformer<Self, BookTickers, proto::PushDataV3ApiWrapper>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Identifier;

    #[test]
    fn test_push_data_wrapper_subscription_id() {
        struct TestCase {
            input: proto::PushDataV3ApiWrapper,
            expected: SubscriptionId,
        }

        let tests = vec![
            TestCase {
                // TC0: symbol taken from the explicit field when present
                input: proto::PushDataV3ApiWrapper {
                    channel: "spot@public.aggre.bookTicker.v3.api.pb@100ms@BTCUSDT".to_string(),
                    symbol: Some("BTCUSDT".to_string()),
                    symbol_id: None,
                    create_time: None,
                    send_time: None,
                    body: None,
                },
                expected: SubscriptionId::from(
                    "spot@public.aggre.bookTicker.v3.api.pb|BTCUSDT",
                ),
            },
            TestCase {
                // TC1: symbol parsed from the channel when the field is absent
                input: proto::PushDataV3ApiWrapper {
                    channel: "spot@public.aggre.bookTicker.v3.api.pb@10ms@ETHUSDT".to_string(),
                    symbol: None,
                    symbol_id: None,
                    create_time: None,
                    send_time: None,
                    body: None,
                },
                expected: SubscriptionId::from(
                    "spot@public.aggre.bookTicker.v3.api.pb|ETHUSDT",
                ),
            },
            TestCase {
                // TC2: malformed topic (no interval/symbol segments) keyed as-is
                input: proto::PushDataV3ApiWrapper {
                    channel: "spot.heartbeat".to_string(),
                    symbol: None,
                    symbol_id: None,
                    create_time: None,
                    send_time: None,
                    body: None,
                },
                expected: SubscriptionId::from("spot.heartbeat"),
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            assert_eq!(test.input.id(), Some(test.expected), "TC{index} failed");
        }
    }
}
