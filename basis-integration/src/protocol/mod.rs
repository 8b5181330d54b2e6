use crate::error::SocketError;
use futures::Stream;

/// WebSocket type aliases and [`StreamParser`] implementations for JSON and protobuf frames.
pub mod websocket;

/// HTTP client capable of executing signed and unsigned requests.
pub mod http;

/// `StreamParser`s parse the input messages of a stream protocol (eg/ WebSocket) and
/// deserialise them into an `Output`.
pub trait StreamParser<Output> {
    type Stream: Stream;
    type Message;
    type Error;

    fn parse(input: Result<Self::Message, Self::Error>) -> Option<Result<Output, SocketError>>;
}
