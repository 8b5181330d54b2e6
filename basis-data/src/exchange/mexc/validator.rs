use super::subscription::MexcSubResponse;
use crate::{
    exchange::Connector,
    subscriber::validator::SubscriptionValidator,
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

/// [`SubscriptionValidator`] for MEXC that parses JSON subscription confirmations while
/// buffering binary protobuf frames until validation completes.
///
/// MEXC starts pushing binary data as soon as a topic is live, potentially before the JSON
/// ack for the batched subscription arrives.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct MexcWebSocketSubValidator;

#[async_trait]
impl SubscriptionValidator for MexcWebSocketSubValidator {
    async fn validate<Exchange, Kind>(
        instrument_map: Map<Symbol>,
        websocket: &mut WebSocket,
    ) -> Result<(Map<Symbol>, Vec<WsMessage>), SocketError>
    where
        Exchange: Connector + Send,
        Kind: SubscriptionKind + Send,
    {
        let timeout = Exchange::subscription_timeout();
        let expected_responses = Exchange::expected_responses(&instrument_map);
        let mut success_responses = 0usize;
        let mut buffered_events = Vec::new();

        loop {
            if success_responses >= expected_responses {
                debug!(exchange = %Exchange::ID, "validated MEXC WebSocket subscriptions");
                break Ok((instrument_map, buffered_events));
            }

            tokio::select! {
                _ = tokio::time::sleep(timeout) => {
                    break Err(SocketError::Subscribe(
                        format!("subscription validation timeout reached: {timeout:?}")
                    ))
                },
                maybe_message = websocket.next() => {
                    let Some(response) = maybe_message else {
                        break Err(SocketError::Subscribe(
                            "WebSocket stream terminated unexpectedly".to_string()
                        ));
                    };

                    let ws_message = response.map_err(SocketError::from)?;

                    match <WebSocketJsonParser as StreamParser<MexcSubResponse>>::parse(
                        Ok(ws_message.clone())
                    ) {
                        Some(Ok(sub_response)) => match sub_response.validate() {
                            Ok(validated) => {
                                success_responses += 1;
                                debug!(
                                    exchange = %Exchange::ID,
                                    %success_responses,
                                    %expected_responses,
                                    payload = ?validated,
                                    "received valid Ok subscription response"
                                );
                            }
                            Err(err) => break Err(err),
                        },
                        Some(Err(SocketError::Terminated(close_frame))) => {
                            break Err(SocketError::Subscribe(
                                format!("received WebSocket CloseFrame: {close_frame}")
                            ))
                        }
                        _ => {
                            // Binary data frames and unparseable payloads are buffered and
                            // re-played into the protobuf stream after validation
                            buffered_events.push(ws_message);
                            continue;
                        }
                    }
                }
            }
        }
    }
}
