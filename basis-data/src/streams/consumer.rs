use crate::{
    Identifier, MarketStream,
    error::DataError,
    event::MarketEvent,
    exchange::StreamSelector,
    streams::{
        reconnect,
        reconnect::stream::{
            ReconnectingStream, ReconnectionBackoffPolicy, init_reconnecting_stream,
        },
    },
    subscription::{Subscription, SubscriptionKind},
};
use basis_instrument::exchange::ExchangeId;
use futures::Stream;
use tracing::info;

/// Default [`ReconnectionBackoffPolicy`] for a reconnecting market stream.
pub const STREAM_RECONNECTION_POLICY: ReconnectionBackoffPolicy = ReconnectionBackoffPolicy {
    backoff_ms_initial: 125,
    backoff_multiplier: 2,
    backoff_ms_max: 60000,
};

/// Convenient type alias for a [`MarketEvent`] [`Result`] consumed via a reconnecting market
/// stream.
pub type MarketStreamResult<Kind> =
    reconnect::Event<ExchangeId, Result<MarketEvent<Kind>, DataError>>;

/// Convenient type alias for a [`MarketEvent`] consumed via a reconnecting market stream.
pub type MarketStreamEvent<Kind> = reconnect::Event<ExchangeId, MarketEvent<Kind>>;

/// Initialise a reconnecting market stream from a collection of [`Subscription`]s.
///
/// The provided [`ReconnectionBackoffPolicy`] dictates how the exponential backoff scales
/// between reconnection attempts. Each re-initialisation re-runs the full
/// connect / subscribe / validate sequence, so active subscriptions are always re-sent before
/// the stream reports data again.
pub async fn init_market_stream<Exchange, Kind>(
    policy: ReconnectionBackoffPolicy,
    subscriptions: Vec<Subscription<Exchange, Kind>>,
) -> Result<impl Stream<Item = MarketStreamResult<Kind::Event>>, DataError>
where
    Exchange: StreamSelector<Kind>,
    Kind: SubscriptionKind,
    Subscription<Exchange, Kind>: Identifier<Exchange::Channel> + Identifier<Exchange::Market>,
{
    let exchange = Exchange::ID;

    let stream_key = subscriptions
        .first()
        .map(|sub| StreamKey {
            exchange,
            kind: sub.kind.as_str(),
        })
        .ok_or(DataError::SubscriptionsEmpty)?;

    info!(
        %exchange,
        ?subscriptions,
        ?policy,
        ?stream_key,
        "market stream with auto reconnect running"
    );

    Ok(init_reconnecting_stream(move || {
        let subscriptions = subscriptions.clone();
        async move { Exchange::Stream::init(&subscriptions).await }
    })
    .await?
    .with_reconnect_backoff(policy, stream_key)
    .with_termination_on_error(|error| error.is_terminal(), stream_key)
    .with_reconnection_events(exchange))
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct StreamKey<Kind = &'static str> {
    pub exchange: ExchangeId,
    pub kind: Kind,
}

impl std::fmt::Debug for StreamKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "market_stream-{}-{}", self.exchange, self.kind)
    }
}
