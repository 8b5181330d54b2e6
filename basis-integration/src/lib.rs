#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_crate_dependencies,
    unused_extern_crates,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms
)]
#![allow(clippy::type_complexity, type_alias_bounds)]

//! # Basis-Integration
//! Low-level framework for composing venue integrations over the web.
//!
//! Used by the other basis trading ecosystem crates to build robust market data and trade
//! execution integrations:
//! * **RestClient** provides configurable signed HTTP communication between client and server.
//! * **ExchangeStream** provides configurable communication over asynchronous stream protocols
//!   (WebSocket text frames, WebSocket protobuf frames, etc.).
//!
//! Both translate between wire payloads and ecosystem data models via arbitrary transformations.

use crate::error::SocketError;
use serde::{Deserialize, Serialize};

/// All [`Error`](std::error::Error)s generated in Basis-Integration.
pub mod error;

/// [`StreamParser`](protocol::StreamParser) implementations for transforming protocol specific
/// messages into a generic output, plus the signed REST client framework.
pub mod protocol;

/// Flexible [`Metric`](metric::Metric) type for representing real-time measurements generically.
pub mod metric;

/// Utilities to assist deserialisation.
pub mod de;

/// [`SubscriptionId`](subscription::SubscriptionId) newtype uniquely identifying a data stream
/// that has been subscribed to.
pub mod subscription;

/// Named [`event_feed`](channel::event_feed)s connecting the engine's long-running
/// component tasks.
pub mod channel;

/// Generic [`ExchangeStream`](stream::ExchangeStream) - the poll/parse/transform loop at the
/// heart of every socket integration.
pub mod stream;

/// Windowed [`RateLimiter`](rate_limit::RateLimiter) respecting per-venue request rates,
/// with a reserved share for order operations.
pub mod rate_limit;

/// [`Snapshot`](snapshot::Snapshot) marker wrapper for state-replacing values.
pub mod snapshot;

/// [`Validator`]s determine if their internal state satisfies some use case defined by the
/// implementor.
pub trait Validator {
    /// Check if `Self` is valid for some use case.
    fn validate(self) -> Result<Self, SocketError>
    where
        Self: Sized;
}

/// [`Transformer`]s transform any `Input` into an iterator of
/// `Result<Self::Output, Self::Error>`s.
pub trait Transformer {
    type Error;
    type Input;
    type Output;
    type OutputIter: IntoIterator<Item = Result<Self::Output, Self::Error>>;

    fn transform(&mut self, input: Self::Input) -> Self::OutputIter;
}

/// Communicates whether something is terminal (eg/ requires the stream to restart).
pub trait Terminal {
    fn is_terminal(&self) -> bool;
}

/// Indicates an `Iterator` or `Stream` has ended.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Deserialize, Serialize,
)]
pub struct FeedEnded;
