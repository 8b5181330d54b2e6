use crate::{
    error::DataError,
    event::MarketEvent,
    subscription::{Map, SubscriptionKind},
};
use async_trait::async_trait;
use basis_instrument::symbol::Symbol;
use basis_integration::{Transformer, protocol::websocket::WsMessage};
use tokio::sync::mpsc;

/// Generic stateless [`ExchangeTransformer`] suitable for most streams.
pub mod stateless;

/// Defines how to construct a [`Transformer`] used by market streams to translate venue
/// specific types into normalised events.
#[async_trait]
pub trait ExchangeTransformer<Exchange, Kind>
where
    Self: Transformer<Output = MarketEvent<Kind::Event>, Error = DataError> + Sized,
    Kind: SubscriptionKind,
{
    /// Initialise a new [`Self`].
    ///
    /// The [`mpsc::UnboundedSender`] can be used by [`Self`] to send messages back to the
    /// venue (eg/ custom pong payloads).
    async fn init(
        instrument_map: Map<Symbol>,
        ws_sink_tx: mpsc::UnboundedSender<WsMessage>,
    ) -> Result<Self, DataError>;
}
