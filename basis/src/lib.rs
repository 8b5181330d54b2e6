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

//! # Basis
//! Delta-neutral spot-futures basis arbitrage engine.
//!
//! One [`ArbitrageEngine`](engine::ArbitrageEngine) instance drives a single symbol: it
//! ingests top-of-book updates from a spot venue and a futures venue via the
//! [`ExchangeManager`](manager::ExchangeManager), detects when the spread between them
//! exceeds the entry threshold, dispatches both legs in parallel, keeps the pair
//! delta-balanced while it is open, and exits when the spread compresses. Engine context is
//! periodically snapshot to disk by the [`SnapshotManager`](snapshot::SnapshotManager) so
//! in-flight order identity survives restarts.

/// Engine configuration, injected programmatically by the embedding application.
pub mod config;

/// Binds one spot venue and one futures venue for a symbol - role-keyed market/trading
/// access, parallel order placement, event fan-out.
pub mod manager;

/// The per-symbol arbitrage state machine.
pub mod engine;

/// Durable engine context snapshots for crash recovery.
pub mod snapshot;

// Dev-dependency used by the integration tests to install a subscriber.
#[cfg(test)]
use tracing_subscriber as _;
