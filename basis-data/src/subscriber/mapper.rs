use crate::{
    Identifier,
    exchange::{Connector, subscription::ExchangeSub},
    subscription::{Map, Subscription, SubscriptionKind, SubscriptionMeta},
};
use fnv::FnvHashMap;

/// Defines how to map a collection of [`Subscription`]s into venue specific
/// [`SubscriptionMeta`], containing the subscription payloads to send.
pub trait SubscriptionMapper {
    fn map<Exchange, Kind>(
        subscriptions: &[Subscription<Exchange, Kind>],
    ) -> SubscriptionMeta
    where
        Exchange: Connector,
        Kind: SubscriptionKind,
        Subscription<Exchange, Kind>: Identifier<Exchange::Channel> + Identifier<Exchange::Market>;
}

/// Standard [`SubscriptionMapper`] for WebSocket venues.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct WebSocketSubMapper;

impl SubscriptionMapper for WebSocketSubMapper {
    fn map<Exchange, Kind>(subscriptions: &[Subscription<Exchange, Kind>]) -> SubscriptionMeta
    where
        Exchange: Connector,
        Kind: SubscriptionKind,
        Subscription<Exchange, Kind>: Identifier<Exchange::Channel> + Identifier<Exchange::Market>,
    {
        // Allocate SubscriptionId map to track the origin of each actioned subscription
        let mut instrument_map = Map(FnvHashMap::with_capacity_and_hasher(
            subscriptions.len(),
            Default::default(),
        ));

        // Map Subscriptions to venue specific subscriptions
        let exchange_subs = subscriptions
            .iter()
            .map(|subscription| {
                let exchange_sub = ExchangeSub::new(subscription);

                // Use the ExchangeSub SubscriptionId to key this Subscription's Symbol
                instrument_map
                    .0
                    .insert(exchange_sub.id(), subscription.symbol.clone());

                exchange_sub
            })
            .collect::<Vec<ExchangeSub<Exchange::Channel, Exchange::Market>>>();

        // Construct WebSocket subscription payloads
        let ws_subscriptions = Exchange::requests(exchange_subs);

        SubscriptionMeta {
            instrument_map,
            ws_subscriptions,
        }
    }
}
