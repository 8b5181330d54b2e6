use crate::{
    AccountEvent, AccountSnapshot,
    balance::AssetBalance,
    error::{ApiError, ClientError, OrderError},
    order::{Order, id::OrderId, request::OrderRequestOpen},
};
use basis_instrument::{asset::AssetNameExchange, exchange::ExchangeId, symbol::Symbol};
use futures::Stream;
use rust_decimal::Decimal;
use std::future::Future;

/// MEXC spot [`ExecutionClient`] - signed REST plus listen-key private WebSocket.
pub mod mexc;

/// Gate.io USDT perpetuals [`ExecutionClient`] - signed REST plus in-band signed WebSocket
/// subscriptions.
pub mod gateio;

/// In-memory [`ExecutionClient`] simulating a venue account, used for integration testing.
pub mod mock;

/// Unified private trading interface implemented per venue.
///
/// Implementations are cheap to clone and safe to share across tasks - signing is stateless
/// and the underlying HTTP client is reference counted.
pub trait ExecutionClient
where
    Self: Clone,
{
    const EXCHANGE: ExchangeId;

    type Config: Clone;
    type AccountStream: Stream<Item = AccountEvent> + Send + Unpin;

    fn new(config: Self::Config) -> Self;

    /// Fetch the current account state - balances and open orders.
    fn account_snapshot(
        &self,
        symbols: &[Symbol],
    ) -> impl Future<Output = Result<AccountSnapshot, ClientError>> + Send;

    /// Initialise the private event stream, including any venue authentication handshake.
    fn account_stream(
        &self,
        symbols: &[Symbol],
    ) -> impl Future<Output = Result<Self::AccountStream, ClientError>> + Send;

    /// Open an order, returning the venue's view of it.
    fn open_order(
        &self,
        request: OrderRequestOpen,
    ) -> impl Future<Output = Result<Order, OrderError>> + Send;

    /// Cancel an order by venue id.
    fn cancel_order(
        &self,
        symbol: &Symbol,
        id: &OrderId,
    ) -> impl Future<Output = Result<Order, OrderError>> + Send;

    /// Cancel all open orders, optionally scoped to one symbol.
    fn cancel_all(
        &self,
        symbol: Option<&Symbol>,
    ) -> impl Future<Output = Result<Vec<Order>, ClientError>> + Send;

    /// Fetch the venue-authoritative view of a single order.
    fn fetch_order(
        &self,
        symbol: &Symbol,
        id: &OrderId,
    ) -> impl Future<Output = Result<Order, ClientError>> + Send;

    /// Fetch all open orders, optionally scoped to one symbol.
    fn fetch_open_orders(
        &self,
        symbol: Option<&Symbol>,
    ) -> impl Future<Output = Result<Vec<Order>, ClientError>> + Send;

    /// Fetch all asset balances.
    fn fetch_balances(
        &self,
    ) -> impl Future<Output = Result<Vec<AssetBalance>, ClientError>> + Send;

    /// Request an on-chain withdrawal.
    ///
    /// Venues without withdrawal support surface
    /// [`ApiError::UnsupportedOperation`].
    fn withdraw(
        &self,
        _request: WithdrawRequest,
    ) -> impl Future<Output = Result<WithdrawalId, ClientError>> + Send {
        async {
            Err(ClientError::Api(ApiError::UnsupportedOperation(
                format!("{} does not support withdrawals", Self::EXCHANGE),
            )))
        }
    }
}

/// API key pair used to authenticate signed requests.
#[derive(Debug, Clone)]
pub struct ApiCredentials {
    pub key: String,
    pub secret: String,
}

/// On-chain withdrawal request.
#[derive(Debug, Clone)]
pub struct WithdrawRequest {
    pub asset: AssetNameExchange,
    pub chain: Option<String>,
    pub address: String,
    pub amount: Decimal,
}

/// Venue-assigned withdrawal identifier.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct WithdrawalId(pub String);
