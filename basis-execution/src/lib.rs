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

//! # Basis-Execution
//! Normalised private trading interfaces for the venues the basis trading ecosystem trades
//! on. Each venue implements the [`ExecutionClient`](client::ExecutionClient) trait; the
//! [`PrivateExchange`](private::PrivateExchange) layers order and balance bookkeeping on top,
//! keeping a venue-truthful view of open orders across reconnects.

use crate::{balance::AssetBalance, order::Order, trade::Trade};
use basis_instrument::exchange::ExchangeId;
use basis_integration::snapshot::Snapshot;
use derive_more::{Constructor, From};
use serde::{Deserialize, Serialize};

/// Asset balances.
pub mod balance;

/// [`ExecutionClient`](client::ExecutionClient) trait and venue implementations.
pub mod client;

/// All [`Error`](std::error::Error)s generated in Basis-Execution.
pub mod error;

/// [`Order`] model - identifiers, status, requests.
pub mod order;

/// Fills.
pub mod trade;

/// Order and balance bookkeeping shared by every venue.
pub mod account;

/// Venue-facing private trading surface combining an
/// [`ExecutionClient`](client::ExecutionClient) with [`account`] bookkeeping.
pub mod private;

/// Account change event streamed from a venue private connection.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Constructor)]
pub struct AccountEvent {
    pub exchange: ExchangeId,
    pub kind: AccountEventKind,
}

/// Kinds of [`AccountEvent`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, From)]
pub enum AccountEventKind {
    /// Full [`AccountSnapshot`] - replaces all existing state.
    Snapshot(AccountSnapshot),

    /// Single [`AssetBalance`] snapshot - replaces existing balance state.
    BalanceSnapshot(Snapshot<AssetBalance>),

    /// Single [`Order`] snapshot - replaces existing order state.
    OrderSnapshot(Snapshot<Order>),

    /// [`Order`] partial or full fill.
    Trade(Trade),
}

/// Full account state fetched from a venue - balances and open orders.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Constructor)]
pub struct AccountSnapshot {
    pub exchange: ExchangeId,
    pub balances: Vec<AssetBalance>,
    pub orders: Vec<Order>,
}
