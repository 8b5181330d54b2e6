#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_crate_dependencies,
    unused_extern_crates,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms
)]
#![allow(clippy::type_complexity, type_alias_bounds)]

//! # Basis-Data
//! WebSocket integrations streaming normalised public market data from the venues the basis
//! trading ecosystem trades on - MEXC spot and Gate.io USDT perpetuals.
//!
//! Each venue implements the [`Connector`](exchange::Connector) abstraction, which defines how
//! to translate ecosystem [`Subscription`]s into venue subscription payloads, and how to
//! validate the venue accepted them. Consumed payloads are transformed into normalised
//! [`MarketEvent`]s.
//!
//! The [`MarketFeed`](feed::MarketFeed) sits on top: it seeds state from REST snapshots,
//! drives a reconnecting stream per venue, maintains the latest top-of-book and order book
//! views, and fans events out to registered handlers.

use crate::{
    error::DataError,
    event::MarketEvent,
    exchange::{Connector, PingInterval},
    subscriber::{Subscribed, Subscriber},
    subscription::{Subscription, SubscriptionKind},
    transformer::ExchangeTransformer,
};
use async_trait::async_trait;
use basis_instrument::exchange::ExchangeId;
use basis_integration::{
    Transformer,
    protocol::{
        StreamParser,
        websocket::{WebSocketJsonParser, WebSocketProtobufParser, WsError, WsMessage, WsSink,
            WsStream, is_websocket_disconnected},
    },
    stream::ExchangeStream,
};
use futures::{SinkExt, Stream, StreamExt};
use std::collections::VecDeque;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

/// All [`Error`](std::error::Error)s generated in Basis-Data.
pub mod error;

/// Generic [`MarketEvent<T>`](MarketEvent) used in every market stream.
pub mod event;

/// [`Connector`] implementations for each venue.
pub mod exchange;

/// Reconnecting stream utilities and the [`init_market_stream`](streams::consumer::init_market_stream)
/// entry point.
pub mod streams;

/// [`Subscriber`], [`SubscriptionMapper`](subscriber::mapper::SubscriptionMapper) and
/// [`SubscriptionValidator`](subscriber::validator::SubscriptionValidator) defining how a
/// [`Connector`] subscribes to venue streams.
pub mod subscriber;

/// [`Subscription`] types communicating which stream kinds to initialise, and the normalised
/// output events they yield.
pub mod subscription;

/// Sorted local [`OrderBook`](books::OrderBook) and level types.
pub mod books;

/// [`ExchangeTransformer`] implementations translating venue payloads into normalised events.
pub mod transformer;

/// Venue-facing public market data surface - snapshot seeding, top-of-book cache, handler
/// fan-out.
pub mod feed;

/// Convenient type alias for an [`ExchangeStream`] over a WebSocket carrying JSON frames.
pub type ExchangeWsStream<Transformer> =
    ExchangeStream<WebSocketJsonParser, WsStream, Transformer>;

/// Convenient type alias for an [`ExchangeStream`] over a WebSocket carrying protobuf frames.
pub type ExchangeWsPbStream<Transformer> =
    ExchangeStream<WebSocketProtobufParser, WsStream, Transformer>;

/// Defines a generic identification type for the implementor.
pub trait Identifier<T> {
    fn id(&self) -> T;
}

/// [`Stream`] yielding [`MarketEvent<Kind::Event>`](MarketEvent)s for the
/// [`SubscriptionKind`] of the provided [`Subscription`]s.
#[async_trait]
pub trait MarketStream<Exchange, Kind>
where
    Self: Stream<Item = Result<MarketEvent<Kind::Event>, DataError>> + Send + Sized + Unpin,
    Exchange: Connector,
    Kind: SubscriptionKind,
{
    async fn init(subscriptions: &[Subscription<Exchange, Kind>]) -> Result<Self, DataError>
    where
        Subscription<Exchange, Kind>: Identifier<Exchange::Channel> + Identifier<Exchange::Market>;
}

#[async_trait]
impl<Exchange, Kind, Transformer, Parser> MarketStream<Exchange, Kind>
    for ExchangeStream<Parser, WsStream, Transformer>
where
    Exchange: Connector + Send + Sync,
    Kind: SubscriptionKind + Send + Sync,
    Transformer: ExchangeTransformer<Exchange, Kind> + Send,
    Kind::Event: Send,
    Parser: StreamParser<Transformer::Input, Message = WsMessage, Error = WsError> + Send,
{
    async fn init(subscriptions: &[Subscription<Exchange, Kind>]) -> Result<Self, DataError>
    where
        Subscription<Exchange, Kind>: Identifier<Exchange::Channel> + Identifier<Exchange::Market>,
    {
        // Connect & subscribe
        let Subscribed {
            websocket,
            map: instrument_map,
            buffered_websocket_events,
        } = Exchange::Subscriber::subscribe(subscriptions).await?;

        // Split WebSocket into WsStream & WsSink components
        let (ws_sink, ws_stream) = websocket.split();

        // Spawn task to distribute Transformer messages (eg/ custom pongs) to the venue
        let (ws_sink_tx, ws_sink_rx) = mpsc::unbounded_channel();
        tokio::spawn(distribute_messages_to_exchange(
            Exchange::ID,
            ws_sink,
            ws_sink_rx,
        ));

        // Spawn optional task to distribute application-level pings to the venue
        if let Some(ping_interval) = Exchange::ping_interval() {
            tokio::spawn(schedule_pings_to_exchange(
                Exchange::ID,
                ws_sink_tx.clone(),
                ping_interval,
            ));
        }

        // Initialise Transformer associated with this Exchange and SubscriptionKind
        let mut transformer = Transformer::init(instrument_map, ws_sink_tx).await?;

        // Process any data events buffered during subscription validation
        let processed = process_buffered_events::<Parser, Transformer>(
            &mut transformer,
            buffered_websocket_events,
        );

        Ok(ExchangeStream::new(ws_stream, transformer, processed))
    }
}

/// Re-parse and transform venue messages buffered while subscription acks were being validated,
/// so no data received during the handshake is lost.
pub fn process_buffered_events<Parser, StreamTransformer>(
    transformer: &mut StreamTransformer,
    events: Vec<WsMessage>,
) -> VecDeque<Result<StreamTransformer::Output, StreamTransformer::Error>>
where
    Parser: StreamParser<StreamTransformer::Input, Message = WsMessage, Error = WsError>,
    StreamTransformer: Transformer,
{
    events
        .into_iter()
        .filter_map(|event| {
            Parser::parse(Ok(event))?
                .inspect_err(|error| {
                    warn!(
                        ?error,
                        "failed to parse message buffered during subscription validation"
                    )
                })
                .ok()
        })
        .flat_map(|parsed| transformer.transform(parsed))
        .collect()
}

/// Transmit [`WsMessage`]s sent from the [`ExchangeTransformer`] to the venue via the
/// [`WsSink`].
///
/// Runs as a separate task so the transformer can stay synchronous.
pub async fn distribute_messages_to_exchange(
    exchange: ExchangeId,
    mut ws_sink: WsSink,
    mut ws_sink_rx: mpsc::UnboundedReceiver<WsMessage>,
) {
    while let Some(message) = ws_sink_rx.recv().await {
        if let Err(error) = ws_sink.send(message).await {
            if is_websocket_disconnected(&error) {
                break;
            }

            // Log error only if the WsMessage failed to send over a connected WebSocket
            error!(
                %exchange,
                %error,
                "failed to send output message to the venue via WsSink"
            );
        }
    }
}

/// Schedule the sending of application-level ping [`WsMessage`]s to the venue using the
/// provided [`PingInterval`].
///
/// Additional to the protocol-level pings already handled by `tokio_tungstenite`.
pub async fn schedule_pings_to_exchange(
    exchange: ExchangeId,
    ws_sink_tx: mpsc::UnboundedSender<WsMessage>,
    PingInterval { mut interval, ping }: PingInterval,
) {
    loop {
        interval.tick().await;

        let payload = ping();
        debug!(%exchange, %payload, "sending application-level ping to venue");

        if ws_sink_tx.send(payload).is_err() {
            break;
        }
    }
}
