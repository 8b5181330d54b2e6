use crate::{
    exchange::Connector,
    subscription::{Map, SubscriptionKind},
};
use async_trait::async_trait;
use basis_instrument::symbol::Symbol;
use basis_integration::{
    Validator,
    error::SocketError,
    protocol::{
        StreamParser,
        websocket::{WebSocket, WebSocketJsonParser, WsMessage},
    },
};
use futures::StreamExt;
use tracing::debug;

/// Defines how to validate that actioned market data
/// [`Subscription`](crate::subscription::Subscription)s were accepted by the venue.
#[async_trait]
pub trait SubscriptionValidator {
    async fn validate<Exchange, Kind>(
        instrument_map: Map<Symbol>,
        websocket: &mut WebSocket,
    ) -> Result<(Map<Symbol>, Vec<WsMessage>), SocketError>
    where
        Exchange: Connector + Send,
        Kind: SubscriptionKind + Send;
}

/// Standard [`SubscriptionValidator`] for JSON [`WebSocket`] venues.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct WebSocketSubValidator;

#[async_trait]
impl SubscriptionValidator for WebSocketSubValidator {
    async fn validate<Exchange, Kind>(
        instrument_map: Map<Symbol>,
        websocket: &mut WebSocket,
    ) -> Result<(Map<Symbol>, Vec<WsMessage>), SocketError>
    where
        Exchange: Connector + Send,
        Kind: SubscriptionKind + Send,
    {
        // Establish venue specific subscription validation parameters
        let timeout = Exchange::subscription_timeout();
        let expected_responses = Exchange::expected_responses(&instrument_map);

        // Track subscription outcomes, buffering any data frames arriving before all acks
        let mut success_responses = 0usize;
        let mut buffered_events = Vec::new();

        loop {
            // Break if all Subscriptions were a success
            if success_responses == expected_responses {
                debug!(exchange = %Exchange::ID, "validated venue WebSocket subscriptions");
                break Ok((instrument_map, buffered_events));
            }

            tokio::select! {
                // If the timeout is reached, return a Subscribe error
                _ = tokio::time::sleep(timeout) => {
                    break Err(SocketError::Subscribe(
                        format!("subscription validation timeout reached: {timeout:?}")
                    ))
                },
                // Parse incoming messages and determine subscription outcomes
                message = websocket.next() => {
                    let response = match message {
                        Some(response) => response,
                        None => break Err(SocketError::Subscribe(
                            "WebSocket stream terminated unexpectedly".to_string()
                        )),
                    };

                    let ws_message = response.map_err(SocketError::from)?;

                    match <WebSocketJsonParser as StreamParser<Exchange::SubResponse>>::parse(
                        Ok(ws_message.clone())
                    ) {
                        Some(Ok(response)) => match response.validate() {
                            // Subscription success
                            Ok(response) => {
                                success_responses += 1;
                                debug!(
                                    exchange = %Exchange::ID,
                                    %success_responses,
                                    %expected_responses,
                                    payload = ?response,
                                    "received valid Ok subscription response",
                                );
                            }

                            // Subscription failure
                            Err(err) => break Err(err),
                        }
                        Some(Err(SocketError::Deserialise { .. })) => {
                            // Already active subscription data payload - buffer for re-play
                            buffered_events.push(ws_message);
                            continue
                        }
                        Some(Err(SocketError::Terminated(close_frame))) => {
                            break Err(SocketError::Subscribe(
                                format!("received WebSocket CloseFrame: {close_frame}")
                            ))
                        }
                        _ => {
                            // Pings, Pongs, Frames, etc.
                            continue
                        }
                    }
                }
            }
        }
    }
}
