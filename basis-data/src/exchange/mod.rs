use self::subscription::ExchangeSub;
use crate::{
    subscriber::{Subscriber, validator::SubscriptionValidator},
    subscription::Map,
};
use basis_instrument::{exchange::ExchangeId, symbol::Symbol};
use basis_integration::{Validator, error::SocketError, protocol::websocket::WsMessage};
use serde::de::DeserializeOwned;
use std::{fmt::Debug, time::Duration};
use url::Url;

/// `Mexc` [`Connector`] and [`StreamSelector`] implementations.
pub mod mexc;

/// `GateioPerpetualsUsd` [`Connector`] and [`StreamSelector`] implementations.
pub mod gateio;

/// Generic [`ExchangeSub`] containing a channel and market combination used by a [`Connector`]
/// to build [`WsMessage`] subscription payloads.
pub mod subscription;

/// Default [`Duration`] the [`Connector::SubValidator`] will wait to receive all success
/// responses to actioned subscription requests.
pub const DEFAULT_SUBSCRIPTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Defines the market stream type associated with a venue and
/// [`SubscriptionKind`](crate::subscription::SubscriptionKind).
///
/// Must be implemented by a venue [`Connector`] for every [`SubscriptionKind`] it supports.
pub trait StreamSelector<Kind>
where
    Self: Connector,
    Kind: crate::subscription::SubscriptionKind,
{
    type Stream: crate::MarketStream<Self, Kind>;
}

/// Primary venue abstraction. Defines how to translate ecosystem types into venue specific
/// types, as well as connecting, subscribing, and interacting with the venue server.
pub trait Connector
where
    Self: Clone + Default + Debug + Sized,
{
    /// Unique identifier for the venue server being connected with.
    const ID: ExchangeId;

    /// Type that defines how to translate an ecosystem
    /// [`Subscription`](crate::subscription::Subscription) into a venue specific channel.
    ///
    /// eg/ GateioChannel("futures.book_ticker")
    type Channel: AsRef<str>;

    /// Type that defines how to translate an ecosystem
    /// [`Subscription`](crate::subscription::Subscription) into a venue specific market.
    ///
    /// eg/ MexcMarket("BTCUSDT"), GateioMarket("BTC_USDT")
    type Market: AsRef<str>;

    /// [`Subscriber`] type establishing a connection with the venue server and actioning
    /// subscriptions over the socket.
    type Subscriber: Subscriber;

    /// [`SubscriptionValidator`] type listening to responses from the venue server and
    /// validating the actioned subscriptions succeeded.
    type SubValidator: SubscriptionValidator;

    /// Deserialisable response the [`Self::SubValidator`] expects in response to the
    /// subscription payloads sent. Implements [`Validator`] to determine the outcome.
    type SubResponse: Validator + Debug + DeserializeOwned;

    /// Base [`Url`] of the venue server being connected with.
    fn url() -> Result<Url, SocketError>;

    /// Defines the [`PingInterval`] of application-level pings for the venue server.
    ///
    /// Defaults to `None`, meaning that no application-level pings are sent.
    fn ping_interval() -> Option<PingInterval> {
        None
    }

    /// Defines how to translate a collection of [`ExchangeSub`]s into the [`WsMessage`]
    /// subscription payloads sent to the venue server.
    fn requests(exchange_subs: Vec<ExchangeSub<Self::Channel, Self::Market>>) -> Vec<WsMessage>;

    /// Number of subscription responses expected from the venue server in response to the
    /// payloads sent, used to validate all subscriptions were accepted.
    fn expected_responses(map: &Map<Symbol>) -> usize {
        map.len()
    }

    /// Expected [`Duration`] the [`SubscriptionValidator`] will wait to receive all success
    /// responses to actioned subscription requests.
    fn subscription_timeout() -> Duration {
        DEFAULT_SUBSCRIPTION_TIMEOUT
    }
}

/// Defines the frequency and construction function for application-level ping
/// [`WsMessage`]s - used for venues that require additional pings beyond the protocol level.
#[derive(Debug)]
pub struct PingInterval {
    pub interval: tokio::time::Interval,
    pub ping: fn() -> WsMessage,
}
