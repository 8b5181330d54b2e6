use crate::{
    AccountEvent, AccountEventKind,
    account::{AccountBalances, AccountOrders},
    balance::AssetBalance,
    client::{ExecutionClient, WithdrawRequest, WithdrawalId},
    error::{ApiError, ClientError, OrderError},
    order::{Order, OrderKind, id::OrderId, request::OrderRequestOpen},
};
use basis_instrument::{Side, asset::AssetNameExchange, spec::SymbolSpec, symbol::Symbol};
use basis_integration::channel::{EventRx, EventTx, event_feed};
use fnv::FnvHashMap;
use futures::StreamExt;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::{fmt::Debug, sync::Arc, time::Duration};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Initial delay between private stream re-initialisation attempts, doubled up to
/// [`STREAM_BACKOFF_MAX`] on repeated failures.
const STREAM_BACKOFF_INITIAL: Duration = Duration::from_millis(125);
const STREAM_BACKOFF_MAX: Duration = Duration::from_secs(60);

/// Private trading surface for one venue account.
///
/// Combines an [`ExecutionClient`] with order/balance bookkeeping. The private event stream
/// runs on a supervised task: on disconnect it re-authenticates, re-subscribes, and
/// reconciles open orders against the venue before resuming, so no update missed during the
/// gap leaves a stale order behind.
pub struct PrivateExchange<Client> {
    client: Client,
    specs: FnvHashMap<Symbol, SymbolSpec>,
    state: Arc<AccountState>,
    stream_task: Option<JoinHandle<()>>,
}

impl<Client> Debug for PrivateExchange<Client> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateExchange").finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
pub(crate) struct AccountState {
    orders: RwLock<AccountOrders>,
    balances: RwLock<AccountBalances>,
}

impl AccountState {
    fn process_event(&self, event: &AccountEvent) {
        match &event.kind {
            AccountEventKind::Snapshot(snapshot) => {
                self.balances.write().replace_all(snapshot.balances.clone());
                let mut orders = self.orders.write();
                for order in &snapshot.orders {
                    orders.update_order(order.clone());
                }
            }
            AccountEventKind::BalanceSnapshot(balance) => {
                self.balances.write().update(balance.value().clone());
            }
            AccountEventKind::OrderSnapshot(order) => {
                self.orders.write().update_order(order.value().clone());
            }
            // Fills mutate positions upstream - the order state they imply arrives as its
            // own OrderSnapshot
            AccountEventKind::Trade(_) => {}
        }
    }
}

impl<Client> PrivateExchange<Client>
where
    Client: ExecutionClient + Send + Sync + 'static,
{
    /// Initialise the private surface: fetch the initial account snapshot, start the
    /// supervised event stream, and return the receiving half of the forwarded events.
    pub async fn init(
        client: Client,
        specs: FnvHashMap<Symbol, SymbolSpec>,
    ) -> Result<(Self, EventRx<AccountEvent>), ClientError> {
        let symbols = specs.keys().cloned().collect::<Vec<_>>();
        let state = Arc::new(AccountState::default());

        // Seed bookkeeping from the venue-authoritative snapshot
        let snapshot = client.account_snapshot(&symbols).await?;
        state.process_event(&AccountEvent::new(
            Client::EXCHANGE,
            AccountEventKind::Snapshot(snapshot),
        ));

        let (events_tx, events_rx) = event_feed::<AccountEvent>("account_events");

        let stream_task = tokio::spawn(run_account_stream(
            client.clone(),
            symbols,
            Arc::clone(&state),
            events_tx,
        ));

        Ok((
            Self {
                client,
                specs,
                state,
                stream_task: Some(stream_task),
            },
            events_rx,
        ))
    }

    /// Place a limit order, rounding amounts against the venue trading rules first.
    pub async fn place_limit_order(
        &self,
        symbol: &Symbol,
        side: Side,
        price: Decimal,
        quantity: Decimal,
    ) -> Result<Order, OrderError> {
        self.place_order(symbol, side, OrderKind::Limit, price, quantity)
            .await
    }

    /// Place a market order. The price is the expected execution level, used for rounding
    /// and bookkeeping only.
    pub async fn place_market_order(
        &self,
        symbol: &Symbol,
        side: Side,
        price: Decimal,
        quantity: Decimal,
    ) -> Result<Order, OrderError> {
        self.place_order(symbol, side, OrderKind::Market, price, quantity)
            .await
    }

    async fn place_order(
        &self,
        symbol: &Symbol,
        side: Side,
        kind: OrderKind,
        price: Decimal,
        quantity: Decimal,
    ) -> Result<Order, OrderError> {
        let request = self
            .prepare_request(symbol, side, kind, price, quantity)
            .map_err(|error| OrderError {
                client_order_id: None,
                error,
            })?;

        let order = self.client.open_order(request).await?;
        self.state.orders.write().update_order(order.clone());
        Ok(order)
    }

    /// Round and validate a prospective order against the venue [`SymbolSpec`].
    fn prepare_request(
        &self,
        symbol: &Symbol,
        side: Side,
        kind: OrderKind,
        price: Decimal,
        quantity: Decimal,
    ) -> Result<OrderRequestOpen, ClientError> {
        let spec = self.spec(symbol)?;

        if !spec.active {
            return Err(ClientError::Api(ApiError::TradingDisabled(
                symbol.to_string(),
            )));
        }

        let price = price
            .round_dp_with_strategy(spec.quote_precision, rust_decimal::RoundingStrategy::ToZero)
            .normalize();
        // Futures quantities additionally snap to the contract-size multiple
        let quantity = spec.round_base_to_contracts(spec.round_base(quantity));

        if !spec.meets_minimums(price, quantity) {
            return Err(ClientError::Api(ApiError::OrderRejected(format!(
                "below venue minimums: quantity {quantity} at price {price}"
            ))));
        }

        Ok(OrderRequestOpen {
            cid: crate::order::id::ClientOrderId::random(),
            symbol: symbol.clone(),
            side,
            kind,
            time_in_force: match kind {
                OrderKind::Limit => crate::order::TimeInForce::GoodUntilCancelled,
                OrderKind::Market => crate::order::TimeInForce::ImmediateOrCancel,
            },
            price,
            quantity,
        })
    }

    /// Cancel an order by venue id.
    pub async fn cancel_order(&self, symbol: &Symbol, id: &OrderId) -> Result<Order, OrderError> {
        let order = self.client.cancel_order(symbol, id).await?;
        self.state.orders.write().update_order(order.clone());
        Ok(order)
    }

    /// Cancel all open orders, optionally scoped to one symbol.
    pub async fn cancel_all_orders(
        &self,
        symbol: Option<&Symbol>,
    ) -> Result<Vec<Order>, ClientError> {
        let cancelled = self.client.cancel_all(symbol).await?;
        {
            let mut orders = self.state.orders.write();
            for order in &cancelled {
                orders.update_order(order.clone());
            }
        }
        Ok(cancelled)
    }

    /// Resolve an order: open map, then executed history, then the venue itself.
    ///
    /// The REST fallback is authoritative and its result is written back to the appropriate
    /// map, so no stale open order survives a reconnect.
    pub async fn get_active_order(
        &self,
        symbol: &Symbol,
        id: &OrderId,
    ) -> Result<Order, ClientError> {
        {
            let orders = self.state.orders.read();
            if let Some(order) = orders.open_order(symbol, id) {
                return Ok(order.clone());
            }
            if let Some(order) = orders.executed_order(symbol, id) {
                return Ok(order.clone());
            }
        }

        let order = self.client.fetch_order(symbol, id).await?;
        self.state.orders.write().update_order(order.clone());
        Ok(order)
    }

    /// All open orders, optionally filtered by symbol.
    ///
    /// With `force` the venue view is fetched and reconciled into the open map first.
    pub async fn get_open_orders(
        &self,
        symbol: Option<&Symbol>,
        force: bool,
    ) -> Result<Vec<Order>, ClientError> {
        if force {
            let venue_orders = self.client.fetch_open_orders(symbol).await?;
            let mut orders = self.state.orders.write();
            match symbol {
                Some(symbol) => orders.reconcile_open_orders(symbol, venue_orders),
                None => {
                    for order in venue_orders {
                        orders.update_order(order);
                    }
                }
            }
        }

        Ok(self.state.orders.read().open_orders(symbol))
    }

    /// Balance for the provided asset.
    ///
    /// With `force` all balances are re-fetched first; otherwise unknown assets yield a zero
    /// placeholder rather than a stale reading.
    pub async fn get_asset_balance(
        &self,
        asset: &AssetNameExchange,
        force: bool,
    ) -> Result<AssetBalance, ClientError> {
        if force {
            let balances = self.client.fetch_balances().await?;
            self.state.balances.write().replace_all(balances);
        }

        Ok(self.state.balances.read().balance(asset))
    }

    /// Request an on-chain withdrawal.
    pub async fn withdraw(&self, request: WithdrawRequest) -> Result<WithdrawalId, ClientError> {
        self.client.withdraw(request).await
    }

    /// Venue trading rules for the provided symbol.
    pub fn spec(&self, symbol: &Symbol) -> Result<&SymbolSpec, ClientError> {
        self.specs.get(symbol).ok_or_else(|| {
            ClientError::Api(ApiError::SymbolInvalid(
                symbol.to_string(),
                "no SymbolSpec loaded".to_string(),
            ))
        })
    }

    /// Stop the private event stream.
    pub fn close(&mut self) {
        if let Some(task) = self.stream_task.take() {
            task.abort();
        }
    }
}

impl<Client> Drop for PrivateExchange<Client> {
    fn drop(&mut self) {
        if let Some(task) = self.stream_task.take() {
            task.abort();
        }
    }
}

/// Supervise the venue private event stream.
///
/// Each (re)initialisation re-authenticates and re-subscribes, then reconciles open orders
/// and balances via REST before driving events, converging bookkeeping with venue truth.
async fn run_account_stream<Client>(
    client: Client,
    symbols: Vec<Symbol>,
    state: Arc<AccountState>,
    events_tx: EventTx<AccountEvent>,
) where
    Client: ExecutionClient + Send + Sync,
{
    let mut backoff = STREAM_BACKOFF_INITIAL;

    loop {
        let mut stream = match client.account_stream(&symbols).await {
            Ok(stream) => {
                info!(exchange = %Client::EXCHANGE, "private account stream initialised");
                backoff = STREAM_BACKOFF_INITIAL;
                stream
            }
            Err(error) => {
                error!(
                    exchange = %Client::EXCHANGE,
                    %error,
                    "failed to initialise private account stream - backing off"
                );
                tokio::time::sleep(backoff).await;
                backoff = std::cmp::min(backoff * 2, STREAM_BACKOFF_MAX);
                continue;
            }
        };

        // Reconcile state missed while disconnected
        match client.account_snapshot(&symbols).await {
            Ok(snapshot) => {
                let event =
                    AccountEvent::new(Client::EXCHANGE, AccountEventKind::Snapshot(snapshot));
                state.process_event(&event);
                events_tx.send(event);
            }
            Err(error) => {
                warn!(
                    exchange = %Client::EXCHANGE,
                    %error,
                    "failed to reconcile account snapshot after stream init"
                );
            }
        }

        while let Some(event) = stream.next().await {
            state.process_event(&event);
            events_tx.send(event);
        }

        warn!(
            exchange = %Client::EXCHANGE,
            "private account stream ended - re-initialising"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AccountSnapshot, balance::Balance, order::OrderStatus};
    use basis_integration::snapshot::Snapshot;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn order(id: &str, status: OrderStatus) -> Order {
        Order {
            id: OrderId::new(id),
            cid: None,
            symbol: Symbol::spot("btc", "usdt"),
            side: Side::Buy,
            kind: OrderKind::Limit,
            price: dec!(100.01),
            quantity: dec!(0.2),
            filled_quantity: dec!(0),
            status,
            time_exchange: Utc::now(),
        }
    }

    #[test]
    fn test_account_state_processes_snapshot() {
        let state = AccountState::default();

        state.process_event(&AccountEvent::new(
            basis_instrument::exchange::ExchangeId::Mock,
            AccountEventKind::Snapshot(AccountSnapshot::new(
                basis_instrument::exchange::ExchangeId::Mock,
                vec![AssetBalance::new(
                    AssetNameExchange::new("USDT"),
                    Balance::new(dec!(100), dec!(80)),
                    Utc::now(),
                )],
                vec![order("1", OrderStatus::New)],
            )),
        ));

        assert_eq!(
            state
                .balances
                .read()
                .balance(&AssetNameExchange::new("USDT"))
                .balance
                .free,
            dec!(80)
        );
        assert_eq!(state.orders.read().open_orders(None).len(), 1);
    }

    #[test]
    fn test_account_state_order_snapshot_moves_done_to_executed() {
        let state = AccountState::default();
        let symbol = Symbol::spot("btc", "usdt");

        state.process_event(&AccountEvent::new(
            basis_instrument::exchange::ExchangeId::Mock,
            AccountEventKind::OrderSnapshot(Snapshot(order("1", OrderStatus::New))),
        ));
        assert_eq!(state.orders.read().open_orders(Some(&symbol)).len(), 1);

        state.process_event(&AccountEvent::new(
            basis_instrument::exchange::ExchangeId::Mock,
            AccountEventKind::OrderSnapshot(Snapshot(order("1", OrderStatus::Filled))),
        ));
        assert!(state.orders.read().open_orders(Some(&symbol)).is_empty());
        assert!(
            state
                .orders
                .read()
                .executed_order(&symbol, &OrderId::new("1"))
                .is_some()
        );
    }
}
