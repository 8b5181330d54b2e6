use self::{
    book::{l1::GateioFuturesBookTicker, l2::GateioFuturesOrderBooksL2Transformer},
    channel::GateioChannel,
    market::GateioMarket,
    subscription::GateioSubResponse,
};
use crate::{
    ExchangeWsStream,
    exchange::{Connector, PingInterval, StreamSelector, subscription::ExchangeSub},
    subscriber::{WebSocketSubscriber, validator::WebSocketSubValidator},
    subscription::book::{BookTickers, OrderBooksL2},
    transformer::stateless::StatelessTransformer,
};
use basis_instrument::exchange::ExchangeId;
use basis_integration::{error::SocketError, protocol::websocket::WsMessage};
use serde_json::json;
use url::Url;

/// Defines the type that translates an ecosystem
/// [`Subscription`](crate::subscription::Subscription) into a venue specific channel.
pub mod channel;

/// Defines the type that translates an ecosystem
/// [`Subscription`](crate::subscription::Subscription) into a venue specific market.
pub mod market;

/// Generic [`GateioMessage<T>`](message::GateioMessage) envelope common to all Gate.io
/// channels.
pub mod message;

/// Subscription response type and [`Validator`](basis_integration::Validator) implementation.
pub mod subscription;

/// Book ticker (l1) and order book diff (l2) types.
pub mod book;

/// [`GateioPerpetualsUsd`] WebSocket server base url.
///
/// See docs: <https://www.gate.io/docs/developers/futures/ws/en/>
pub const BASE_URL_GATEIO_PERPETUALS_USD: &str = "wss://fx-ws.gateio.ws/v4/ws/usdt";

/// Interval at which application-level pings are sent to keep the connection alive.
const PING_INTERVAL_SECONDS: u64 = 15;

/// [`GateioPerpetualsUsd`] venue connector.
///
/// Gate.io requires one subscription payload per channel/market combination, and expects
/// application-level `futures.ping` messages on top of protocol-level pings.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct GateioPerpetualsUsd;

impl Connector for GateioPerpetualsUsd {
    const ID: ExchangeId = ExchangeId::GateioPerpetualsUsd;
    type Channel = GateioChannel;
    type Market = GateioMarket;
    type Subscriber = WebSocketSubscriber;
    type SubValidator = WebSocketSubValidator;
    type SubResponse = GateioSubResponse;

    fn url() -> Result<Url, SocketError> {
        Url::parse(BASE_URL_GATEIO_PERPETUALS_USD).map_err(SocketError::UrlParse)
    }

    fn ping_interval() -> Option<PingInterval> {
        Some(PingInterval {
            interval: tokio::time::interval(std::time::Duration::from_secs(PING_INTERVAL_SECONDS)),
            ping: || {
                WsMessage::text(
                    json!({
                        "time": chrono::Utc::now().timestamp(),
                        "channel": "futures.ping",
                    })
                    .to_string(),
                )
            },
        })
    }

    fn requests(exchange_subs: Vec<ExchangeSub<Self::Channel, Self::Market>>) -> Vec<WsMessage> {
        exchange_subs
            .into_iter()
            .map(|ExchangeSub { channel, market }| {
                WsMessage::text(
                    json!({
                        "time": chrono::Utc::now().timestamp(),
                        "channel": channel.as_ref(),
                        "event": "subscribe",
                        "payload": [market.as_ref()],
                    })
                    .to_string(),
                )
            })
            .collect()
    }
}

impl StreamSelector<BookTickers> for GateioPerpetualsUsd {
    type Stream =
        ExchangeWsStream<StatelessTransformer<Self, BookTickers, GateioFuturesBookTicker>>;
}

impl StreamSelector<OrderBooksL2> for GateioPerpetualsUsd {
    type Stream = ExchangeWsStream<GateioFuturesOrderBooksL2Transformer>;
}
