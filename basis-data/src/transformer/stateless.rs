use super::ExchangeTransformer;
use crate::{
    Identifier,
    error::DataError,
    event::{MarketEvent, MarketIter},
    exchange::Connector,
    subscription::{Map, SubscriptionKind},
};
use async_trait::async_trait;
use basis_instrument::{exchange::ExchangeId, symbol::Symbol};
use basis_integration::{
    Transformer, protocol::websocket::WsMessage, subscription::SubscriptionId,
};
use std::marker::PhantomData;
use tokio::sync::mpsc;

/// Standard generic stateless [`ExchangeTransformer`] translating venue specific types into
/// normalised events. Used for book ticker and stateless order book diff streams.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct StatelessTransformer<Exchange, Kind, Input> {
    instrument_map: Map<Symbol>,
    phantom: PhantomData<(Exchange, Kind, Input)>,
}

#[async_trait]
impl<Exchange, Kind, Input> ExchangeTransformer<Exchange, Kind>
    for StatelessTransformer<Exchange, Kind, Input>
where
    Exchange: Connector + Send,
    Kind: SubscriptionKind + Send,
    Input: Identifier<Option<SubscriptionId>> + Send,
    MarketIter<Kind::Event>: From<(ExchangeId, Symbol, Input)>,
{
    async fn init(
        instrument_map: Map<Symbol>,
        _: mpsc::UnboundedSender<WsMessage>,
    ) -> Result<Self, DataError> {
        Ok(Self {
            instrument_map,
            phantom: PhantomData,
        })
    }
}

impl<Exchange, Kind, Input> Transformer for StatelessTransformer<Exchange, Kind, Input>
where
    Exchange: Connector,
    Kind: SubscriptionKind,
    Input: Identifier<Option<SubscriptionId>>,
    MarketIter<Kind::Event>: From<(ExchangeId, Symbol, Input)>,
{
    type Error = DataError;
    type Input = Input;
    type Output = MarketEvent<Kind::Event>;
    type OutputIter = Vec<Result<Self::Output, Self::Error>>;

    fn transform(&mut self, input: Self::Input) -> Self::OutputIter {
        // Determine if the message has an identifiable SubscriptionId
        let subscription_id = match input.id() {
            Some(subscription_id) => subscription_id,
            None => return vec![],
        };

        // Find the Symbol associated with the Input and transform
        match self.instrument_map.find(&subscription_id) {
            Ok(symbol) => {
                MarketIter::<Kind::Event>::from((Exchange::ID, symbol.clone(), input)).0
            }
            Err(unidentifiable) => vec![Err(DataError::from(unidentifiable))],
        }
    }
}
