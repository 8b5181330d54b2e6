use crate::exchange::Connector;
use basis_instrument::symbol::Symbol;
use basis_integration::{
    Validator, error::SocketError, protocol::websocket::WsMessage, subscription::SubscriptionId,
};
use fnv::FnvHashMap;
use serde::{Deserialize, Serialize};
use std::{
    borrow::Borrow,
    fmt::{Debug, Display, Formatter},
    hash::Hash,
};

/// Book ticker and order book [`SubscriptionKind`]s and their normalised output events.
pub mod book;

/// Defines the type of a [`Subscription`], and the output [`Self::Event`] it yields.
pub trait SubscriptionKind
where
    Self: Debug + Clone,
{
    type Event: Debug;
    fn as_str(&self) -> &'static str;
}

/// Subscription to a venue market data stream of a [`SubscriptionKind`] for one [`Symbol`].
#[derive(Debug, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub struct Subscription<Exchange, Kind> {
    pub exchange: Exchange,
    pub symbol: Symbol,
    pub kind: Kind,
}

impl<Exchange, Kind> Display for Subscription<Exchange, Kind>
where
    Exchange: Display,
    Kind: SubscriptionKind,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}_{}", self.exchange, self.kind.as_str(), self.symbol)
    }
}

impl<Exchange, Kind> Subscription<Exchange, Kind> {
    /// Construct a new [`Subscription`] using the provided configuration.
    pub fn new<S>(exchange: Exchange, symbol: S, kind: Kind) -> Self
    where
        S: Into<Symbol>,
    {
        Self {
            exchange,
            symbol: symbol.into(),
            kind,
        }
    }
}

impl<Exchange, S, Kind> From<(Exchange, S, Kind)> for Subscription<Exchange, Kind>
where
    S: Into<Symbol>,
{
    fn from((exchange, symbol, kind): (Exchange, S, Kind)) -> Self {
        Self::new(exchange, symbol, kind)
    }
}

impl<Exchange, Kind> Validator for &Subscription<Exchange, Kind>
where
    Exchange: Connector,
{
    fn validate(self) -> Result<Self, SocketError>
    where
        Self: Sized,
    {
        let exchange = Exchange::ID;

        if exchange.supports(self.symbol.kind) {
            Ok(self)
        } else {
            Err(SocketError::Unsupported {
                entity: exchange.as_str(),
                item: self.symbol.kind.to_string(),
            })
        }
    }
}

/// Metadata generated from a collection of [`Subscription`]s, including the venue specific
/// subscription payloads to be sent.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct SubscriptionMeta {
    /// Mapping between a [`SubscriptionId`] and its associated [`Symbol`].
    pub instrument_map: Map<Symbol>,
    /// Venue specific subscription payloads to be sent.
    pub ws_subscriptions: Vec<WsMessage>,
}

/// New type `FnvHashMap` mapping a [`SubscriptionId`] to some associated type `T`.
///
/// Used by [`ExchangeTransformer`](crate::transformer::ExchangeTransformer)s to identify the
/// [`Symbol`] associated with incoming venue messages.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Map<T>(pub FnvHashMap<SubscriptionId, T>);

impl<T> FromIterator<(SubscriptionId, T)> for Map<T> {
    fn from_iter<Iter>(iter: Iter) -> Self
    where
        Iter: IntoIterator<Item = (SubscriptionId, T)>,
    {
        Self(iter.into_iter().collect())
    }
}

impl<T> Map<T> {
    /// Find the `T` associated with the provided [`SubscriptionId`].
    pub fn find<SubId>(&self, id: &SubId) -> Result<&T, SocketError>
    where
        SubscriptionId: Borrow<SubId>,
        SubId: AsRef<str> + Hash + Eq + ?Sized,
    {
        self.0
            .get(id)
            .ok_or_else(|| SocketError::Unidentifiable(SubscriptionId::from(id.as_ref())))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_find() {
        let map = Map::from_iter([(
            SubscriptionId::from("present"),
            Symbol::spot("btc", "usdt"),
        )]);

        assert_eq!(
            map.find("present").unwrap(),
            &Symbol::spot("btc", "usdt")
        );
        assert!(matches!(
            map.find("not present"),
            Err(SocketError::Unidentifiable(_))
        ));
    }
}
