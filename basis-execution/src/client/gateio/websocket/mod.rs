use self::payload::{GateioBalancePush, GateioPrivateMessage, GateioUserTrade};
use crate::{
    AccountEvent, AccountEventKind,
    client::gateio::types::GateioFuturesOrder,
    error::{ClientError, ConnectivityError},
};
use basis_instrument::{asset::AssetNameExchange, symbol::Symbol};
use basis_integration::{
    Transformer,
    error::SocketError,
    protocol::websocket::{WebSocket, WebSocketJsonParser, WsMessage, WsStream},
    snapshot::Snapshot,
    stream::ExchangeStream,
};
use fnv::FnvHashMap;
use futures::{SinkExt, Stream, StreamExt};
use hmac::Mac;
use pin_project::pin_project;
use rust_decimal::Decimal;
use smol_str::SmolStr;
use std::{
    pin::Pin,
    task::{Context, Poll},
};
use tokio::time::timeout;
use tracing::{debug, error, warn};

/// Private payload types.
pub mod payload;

/// Private channels subscribed with in-band signed payloads.
pub const PRIVATE_CHANNELS: [&str; 3] =
    ["futures.orders", "futures.usertrades", "futures.balances"];

/// Gate.io futures account event stream.
#[derive(Debug)]
#[pin_project]
pub struct GateioAccountStream {
    #[pin]
    inner: ExchangeStream<WebSocketJsonParser, WsStream, GateioAccountStreamTransformer>,
}

impl GateioAccountStream {
    pub fn new(
        inner: ExchangeStream<WebSocketJsonParser, WsStream, GateioAccountStreamTransformer>,
    ) -> Self {
        Self { inner }
    }
}

impl Stream for GateioAccountStream {
    type Item = AccountEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.project().inner.poll_next(cx) {
            Poll::Ready(Some(item)) => match item {
                Ok(item) => Poll::Ready(Some(item)),
                Err(err) => match err {
                    // Pongs and ack payloads the transformer input does not model
                    SocketError::Deserialise { .. } => {
                        debug!(?err, "skipping non-account payload on GateioAccountStream");
                        cx.waker().wake_by_ref();
                        Poll::Pending
                    }
                    _ => {
                        error!(?err, "terminal error received - closing GateioAccountStream");
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
pub struct GateioAccountStreamTransformer {
    /// Venue contract name (eg/ "BTC_USDT") to ecosystem [`Symbol`] and contract size.
    markets: FnvHashMap<SmolStr, (Symbol, Decimal)>,
    settle_asset: AssetNameExchange,
}

impl GateioAccountStreamTransformer {
    pub fn new(
        markets: FnvHashMap<SmolStr, (Symbol, Decimal)>,
        settle_asset: AssetNameExchange,
    ) -> Self {
        Self {
            markets,
            settle_asset,
        }
    }
}

impl Transformer for GateioAccountStreamTransformer {
    type Error = SocketError;
    type Input = GateioPrivateMessage;
    type Output = AccountEvent;
    type OutputIter = Vec<Result<Self::Output, Self::Error>>;

    fn transform(&mut self, message: Self::Input) -> Self::OutputIter {
        let exchange = basis_instrument::exchange::ExchangeId::GateioPerpetualsUsd;

        // Subscription acks and heartbeats carry no account data
        if message.event != "update" {
            return vec![];
        }

        match message.channel.as_str() {
            "futures.orders" => {
                let orders = match serde_json::from_value::<Vec<GateioFuturesOrder>>(
                    message.result,
                ) {
                    Ok(orders) => orders,
                    Err(error) => {
                        return vec![Err(SocketError::Deserialise {
                            error,
                            payload: "futures.orders update".to_string(),
                        })];
                    }
                };

                orders
                    .into_iter()
                    .filter_map(|order| {
                        let Some((symbol, contract_size)) =
                            self.markets.get(order.contract.as_str()).cloned()
                        else {
                            warn!(contract = %order.contract, "order update for untracked contract");
                            return None;
                        };
                        Some(Ok(AccountEvent::new(
                            exchange,
                            AccountEventKind::OrderSnapshot(Snapshot(
                                order.into_order(symbol, contract_size),
                            )),
                        )))
                    })
                    .collect()
            }
            "futures.usertrades" => {
                let trades = match serde_json::from_value::<Vec<GateioUserTrade>>(message.result)
                {
                    Ok(trades) => trades,
                    Err(error) => {
                        return vec![Err(SocketError::Deserialise {
                            error,
                            payload: "futures.usertrades update".to_string(),
                        })];
                    }
                };

                trades
                    .into_iter()
                    .filter_map(|trade| {
                        let Some((symbol, contract_size)) =
                            self.markets.get(trade.contract.as_str()).cloned()
                        else {
                            warn!(contract = %trade.contract, "fill for untracked contract");
                            return None;
                        };
                        Some(Ok(AccountEvent::new(
                            exchange,
                            AccountEventKind::Trade(trade.into_trade(symbol, contract_size)),
                        )))
                    })
                    .collect()
            }
            "futures.balances" => {
                let balances =
                    match serde_json::from_value::<Vec<GateioBalancePush>>(message.result) {
                        Ok(balances) => balances,
                        Err(error) => {
                            return vec![Err(SocketError::Deserialise {
                                error,
                                payload: "futures.balances update".to_string(),
                            })];
                        }
                    };

                balances
                    .into_iter()
                    .filter_map(|balance| {
                        balance.into_balance(self.settle_asset.clone()).map(|balance| {
                            Ok(AccountEvent::new(
                                exchange,
                                AccountEventKind::BalanceSnapshot(Snapshot(balance)),
                            ))
                        })
                    })
                    .collect()
            }
            _ => vec![],
        }
    }
}

/// Build the in-band authenticated subscription payload for a private channel.
///
/// The signature is HMAC-SHA512 over `"api\n{channel}\n\n{timestamp}"`, carried inside the
/// subscribe message - no separate login round trip or refreshable token is required.
pub fn generate_signed_subscription(
    api_key: &str,
    api_secret: &str,
    channel: &str,
    payload: &[&str],
) -> WsMessage {
    let timestamp = chrono::Utc::now().timestamp();

    let signature = {
        let mut mac = hmac::Hmac::<sha2::Sha512>::new_from_slice(api_secret.as_bytes())
            .expect("ApiCredentials secret invalid length");
        mac.update(format!("api\n{channel}\n\n{timestamp}").as_bytes());
        hex::encode(mac.finalize().into_bytes())
    };

    WsMessage::text(
        serde_json::json!({
            "time": timestamp,
            "channel": channel,
            "event": "subscribe",
            "payload": payload,
            "auth": {
                "method": "api_key",
                "KEY": api_key,
                "SIGN": signature,
            }
        })
        .to_string(),
    )
}

/// Send the subscription over the WebSocket and validate the venue acknowledged it.
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
            if text.contains(r#""status":"success""#) || text.contains(r#""error":null"#) {
                return Ok(());
            }
        }
    }

    Err(ClientError::Connectivity(ConnectivityError::Socket(
        format!("WebSocket subscription not confirmed: {message}"),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::OrderStatus;
    use rust_decimal_macros::dec;

    fn transformer() -> GateioAccountStreamTransformer {
        GateioAccountStreamTransformer::new(
            FnvHashMap::from_iter([(
                SmolStr::new("BTC_USDT"),
                (Symbol::perpetual("btc", "usdt"), dec!(0.0001)),
            )]),
            AssetNameExchange::new("USDT"),
        )
    }

    #[test]
    fn test_transform_order_update() {
        let input = r#"
        {
            "channel": "futures.orders",
            "event": "update",
            "result": [
                {
                    "id": 123456789,
                    "contract": "BTC_USDT",
                    "size": -2000,
                    "left": 0,
                    "price": "100.15",
                    "tif": "gtc",
                    "text": "t-basis",
                    "status": "finished",
                    "finish_as": "filled",
                    "create_time": 1643817120.1
                }
            ]
        }
        "#;
        let message = serde_json::from_str::<GateioPrivateMessage>(input).unwrap();

        let events = transformer().transform(message);
        assert_eq!(events.len(), 1);
        match events.into_iter().next().unwrap().unwrap().kind {
            AccountEventKind::OrderSnapshot(Snapshot(order)) => {
                assert_eq!(order.status, OrderStatus::Filled);
                assert_eq!(order.quantity, dec!(0.2));
            }
            other => panic!("unexpected event kind: {other:?}"),
        }
    }

    #[test]
    fn test_transform_subscription_ack_is_skipped() {
        let input = r#"
        {
            "channel": "futures.orders",
            "event": "subscribe",
            "result": { "status": "success" }
        }
        "#;
        let message = serde_json::from_str::<GateioPrivateMessage>(input).unwrap();

        assert!(transformer().transform(message).is_empty());
    }

    #[test]
    fn test_generate_signed_subscription_shape() {
        let message =
            generate_signed_subscription("key", "secret", "futures.orders", &["BTC_USDT"]);
        let text = message.to_text().unwrap();
        let value = serde_json::from_str::<serde_json::Value>(text).unwrap();

        assert_eq!(value["channel"], "futures.orders");
        assert_eq!(value["event"], "subscribe");
        assert_eq!(value["auth"]["method"], "api_key");
        assert_eq!(value["auth"]["KEY"], "key");
        // HMAC-SHA512 hex signature is 128 chars
        assert_eq!(value["auth"]["SIGN"].as_str().unwrap().len(), 128);
    }
}
