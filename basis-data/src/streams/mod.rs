/// Reconnecting stream utilities - backoff policies and the [`reconnect::Event`] wrapper.
pub mod reconnect;

/// [`init_market_stream`](consumer::init_market_stream) - the entry point for initialising a
/// reconnecting market stream from a collection of subscriptions.
pub mod consumer;
