use serde::{Deserialize, Serialize};

/// Utilities for initialising and combining continually reconnecting [`Stream`](futures::Stream)s.
pub mod stream;

/// Item of a reconnecting stream - either a data `Item`, or a notification that the stream
/// `Origin` is reconnecting after a disconnect.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Deserialize, Serialize)]
pub enum Event<Origin, T> {
    Reconnecting(Origin),
    Item(T),
}

impl<Origin, T> Event<Origin, T> {
    /// Map the inner `Item` of this [`Event`], leaving `Reconnecting` untouched.
    pub fn map<F, O>(self, op: F) -> Event<Origin, O>
    where
        F: FnOnce(T) -> O,
    {
        match self {
            Event::Reconnecting(origin) => Event::Reconnecting(origin),
            Event::Item(item) => Event::Item(op(item)),
        }
    }
}
