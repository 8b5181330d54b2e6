use self::payload::{MexcPrivateData, MexcPrivateMessage};
use crate::{
    AccountEvent, AccountEventKind,
    error::{ClientError, ConnectivityError},
};
use basis_instrument::symbol::Symbol;
use basis_integration::{
    Transformer,
    error::SocketError,
    protocol::websocket::{
        WebSocket, WebSocketJsonParser, WsMessage, WsSink, WsStream, is_websocket_disconnected,
    },
    snapshot::Snapshot,
    stream::ExchangeStream,
};
use fnv::FnvHashMap;
use futures::{SinkExt, Stream, StreamExt};
use pin_project::pin_project;
use smol_str::SmolStr;
use std::{
    pin::Pin,
    task::{Context, Poll},
};
use tokio::{sync::mpsc, time::timeout};
use tracing::{debug, error, warn};

/// Private payload types.
pub mod payload;

/// Private stream topics subscribed after connecting with a listen key.
pub const PRIVATE_TOPICS: [&str; 3] = [
    "spot@private.orders.v3.api",
    "spot@private.account.v3.api",
    "spot@private.deals.v3.api",
];

/// MEXC account event stream.
#[derive(Debug)]
#[pin_project]
pub struct MexcAccountStream {
    #[pin]
    inner: ExchangeStream<WebSocketJsonParser, WsStream, MexcAccountStreamTransformer>,
}

impl MexcAccountStream {
    pub fn new(
        inner: ExchangeStream<WebSocketJsonParser, WsStream, MexcAccountStreamTransformer>,
    ) -> Self {
        Self { inner }
    }
}

impl Stream for MexcAccountStream {
    type Item = AccountEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.project().inner.poll_next(cx) {
            Poll::Ready(Some(item)) => match item {
                Ok(item) => Poll::Ready(Some(item)),
                Err(err) => match err {
                    // Deserialise errors are expected for pong and ack payloads the
                    // transformer input type does not model - skip them
                    SocketError::Deserialise { .. } => {
                        debug!(?err, "skipping non-account payload on MexcAccountStream");
                        cx.waker().wake_by_ref();
                        Poll::Pending
                    }
                    _ => {
                        error!(?err, "terminal error received - closing MexcAccountStream");
                        Poll::Ready(None)
                    }
                },
            },
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Translates private push payloads into normalised [`AccountEvent`]s.
#[derive(Debug)]
pub struct MexcAccountStreamTransformer {
    /// Venue market name (eg/ "BTCUSDT") to ecosystem [`Symbol`].
    symbols: FnvHashMap<SmolStr, Symbol>,
}

impl MexcAccountStreamTransformer {
    pub fn new(symbols: FnvHashMap<SmolStr, Symbol>) -> Self {
        Self { symbols }
    }

    fn symbol(&self, market: Option<&str>) -> Option<Symbol> {
        market
            .and_then(|market| self.symbols.get(market))
            .cloned()
    }
}

impl Transformer for MexcAccountStreamTransformer {
    type Error = SocketError;
    type Input = MexcPrivateMessage;
    type Output = AccountEvent;
    type OutputIter = Vec<Result<Self::Output, Self::Error>>;

    fn transform(&mut self, message: Self::Input) -> Self::OutputIter {
        let exchange = basis_instrument::exchange::ExchangeId::MexcSpot;

        match message.data {
            MexcPrivateData::Order(order) => {
                let Some(symbol) = self.symbol(message.symbol.as_deref()) else {
                    // Updates for untracked symbols are filtered, not errors
                    warn!(symbol = ?message.symbol, "order update for untracked symbol");
                    return vec![];
                };
                vec![Ok(AccountEvent::new(
                    exchange,
                    AccountEventKind::OrderSnapshot(Snapshot(
                        order.into_order(symbol, message.time),
                    )),
                ))]
            }
            MexcPrivateData::Deal(deal) => {
                let Some(symbol) = self.symbol(message.symbol.as_deref()) else {
                    warn!(symbol = ?message.symbol, "fill for untracked symbol");
                    return vec![];
                };
                vec![Ok(AccountEvent::new(
                    exchange,
                    AccountEventKind::Trade(deal.into_trade(symbol, message.time)),
                ))]
            }
            MexcPrivateData::Account(account) => vec![Ok(AccountEvent::new(
                exchange,
                AccountEventKind::BalanceSnapshot(Snapshot(account.into_balance())),
            ))],
        }
    }
}

/// Send the message over the WebSocket and validate the venue acknowledged it.
pub async fn send_validate(
    websocket: &mut WebSocket,
    message: WsMessage,
) -> Result<(), ClientError> {
    websocket
        .send(message.clone())
        .await
        .map_err(SocketError::from)?;
    debug!(payload = ?message, "WebSocket message sent");

    let timeout_duration = std::time::Duration::from_secs(5);
    let response = timeout(timeout_duration, websocket.next())
        .await
        .map_err(|_| ClientError::Connectivity(ConnectivityError::Timeout))?;

    if let Some(Ok(payload)) = response {
        debug!(?payload, "received response");
        if let Ok(text) = payload.to_text() {
            if text.contains(r#""code":0"#) {
                return Ok(());
            }
        }
    }

    Err(ClientError::Connectivity(ConnectivityError::Socket(
        format!("WebSocket message not confirmed: {message}"),
    )))
}

/// Forward [`WsMessage`]s from the keep-alive task to the venue via the [`WsSink`].
pub async fn distribute_messages_to_exchange(
    mut ws_sink: WsSink,
    mut ws_sink_rx: mpsc::UnboundedReceiver<WsMessage>,
) {
    while let Some(message) = ws_sink_rx.recv().await {
        if let Err(error) = ws_sink.send(message).await {
            if is_websocket_disconnected(&error) {
                break;
            }
            error!(%error, "failed to send message to MEXC via WsSink");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::OrderStatus;

    fn transformer() -> MexcAccountStreamTransformer {
        MexcAccountStreamTransformer::new(FnvHashMap::from_iter([(
            SmolStr::new("BTCUSDT"),
            Symbol::spot("btc", "usdt"),
        )]))
    }

    #[test]
    fn test_transform_order_update() {
        let input = r#"
        {
            "c": "spot@private.orders.v3.api",
            "s": "BTCUSDT",
            "t": 1643817121000,
            "d": { "i": "1", "S": 1, "o": 1, "p": "100.01", "v": "0.2", "cv": "0.2", "s": 2 }
        }
        "#;
        let message = serde_json::from_str::<MexcPrivateMessage>(input).unwrap();

        let events = transformer().transform(message);
        assert_eq!(events.len(), 1);
        match events.into_iter().next().unwrap().unwrap().kind {
            AccountEventKind::OrderSnapshot(Snapshot(order)) => {
                assert_eq!(order.status, OrderStatus::Filled);
            }
            other => panic!("unexpected event kind: {other:?}"),
        }
    }

    #[test]
    fn test_transform_untracked_symbol_is_filtered() {
        let input = r#"
        {
            "c": "spot@private.orders.v3.api",
            "s": "ETHUSDT",
            "t": 1643817121000,
            "d": { "i": "1", "S": 1, "o": 1, "p": "100.01", "v": "0.2", "cv": "0.2", "s": 2 }
        }
        "#;
        let message = serde_json::from_str::<MexcPrivateMessage>(input).unwrap();

        assert!(transformer().transform(message).is_empty());
    }
}
