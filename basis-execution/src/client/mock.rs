use crate::{
    AccountEvent, AccountEventKind, AccountSnapshot,
    balance::AssetBalance,
    client::ExecutionClient,
    error::{ApiError, ClientError, OrderError},
    order::{Order, OrderStatus, id::OrderId, request::OrderRequestOpen},
    trade::{Liquidity, Trade, TradeId},
};
use basis_instrument::{exchange::ExchangeId, symbol::Symbol};
use basis_integration::snapshot::Snapshot;
use chrono::Utc;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use smol_str::format_smolstr;
use std::{collections::VecDeque, sync::Arc};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// Scripted outcome for the next [`MockExecutionClient::open_order`] call.
#[derive(Debug, Clone)]
pub enum MockFill {
    /// Order rests then fills fully - an ack is returned and a `Filled` snapshot plus a
    /// matching [`Trade`] are streamed.
    Full,
    /// Order fills the provided quantity then stalls as `PartiallyFilled`.
    Partial(Decimal),
    /// Order rests with no fills.
    None,
    /// Venue rejects the order outright.
    Reject(ApiError),
}

#[derive(Debug)]
struct MockState {
    exchange: ExchangeId,
    balances: Vec<AssetBalance>,
    open_orders: Vec<Order>,
    done_orders: Vec<Order>,
    next_order_id: u64,
    next_trade_id: u64,
    fill_plan: VecDeque<MockFill>,
    event_txs: Vec<mpsc::UnboundedSender<AccountEvent>>,
    /// Count of order operations, exposed for test assertions.
    pub order_operations: u64,
}

/// In-memory [`ExecutionClient`] simulating a venue account.
///
/// Fills are scripted per-order via [`MockExecutionClient::script_fill`]; unscripted orders
/// fill fully. All account mutations are streamed as [`AccountEvent`]s, mirroring how the
/// real clients deliver them.
#[derive(Debug, Clone)]
pub struct MockExecutionClient {
    state: Arc<Mutex<MockState>>,
}

/// Configuration for a [`MockExecutionClient`].
#[derive(Debug, Clone)]
pub struct MockConfig {
    pub exchange: ExchangeId,
    pub balances: Vec<AssetBalance>,
}

impl MockExecutionClient {
    /// Script the outcome of the next opened order. Outcomes apply in FIFO order.
    pub fn script_fill(&self, fill: MockFill) {
        self.state.lock().fill_plan.push_back(fill);
    }

    /// Number of order operations (open/cancel) performed against this mock.
    pub fn order_operations(&self) -> u64 {
        self.state.lock().order_operations
    }

    /// Venue this mock is standing in for.
    pub fn exchange(&self) -> ExchangeId {
        self.state.lock().exchange
    }

    /// Drive a fill for a currently open order, streaming the updated order snapshot and
    /// matching trade. Returns false if the order is unknown.
    pub fn fill_order(&self, id: &OrderId, quantity: Decimal) -> bool {
        let mut state = self.state.lock();
        let Some(position) = state.open_orders.iter().position(|order| &order.id == id) else {
            return false;
        };

        let mut order = state.open_orders[position].clone();
        order.filled_quantity = (order.filled_quantity + quantity).min(order.quantity);
        order.status = if order.filled_quantity == order.quantity {
            OrderStatus::Filled
        } else {
            OrderStatus::PartiallyFilled
        };

        if order.is_done() {
            state.open_orders.remove(position);
            state.done_orders.push(order.clone());
        } else {
            state.open_orders[position] = order.clone();
        }

        let trade = state.trade_for(&order, quantity);
        state.emit(AccountEventKind::OrderSnapshot(Snapshot(order)));
        state.emit(AccountEventKind::Trade(trade));
        true
    }

    fn next_outcome(&self) -> MockFill {
        self.state
            .lock()
            .fill_plan
            .pop_front()
            .unwrap_or(MockFill::Full)
    }
}

impl MockState {
    fn emit(&mut self, kind: AccountEventKind) {
        let event = AccountEvent::new(self.exchange, kind);
        self.event_txs
            .retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn trade_for(&mut self, order: &Order, quantity: Decimal) -> Trade {
        self.next_trade_id += 1;
        Trade {
            id: TradeId::from(format_smolstr!("mock-trade-{}", self.next_trade_id)),
            order_id: order.id.clone(),
            symbol: order.symbol.clone(),
            time_exchange: Utc::now(),
            side: order.side,
            price: order.price,
            quantity,
            liquidity: Liquidity::Taker,
            fees: Decimal::ZERO,
        }
    }
}

impl ExecutionClient for MockExecutionClient {
    const EXCHANGE: ExchangeId = ExchangeId::Mock;

    type Config = MockConfig;
    type AccountStream = UnboundedReceiverStream<AccountEvent>;

    fn new(config: Self::Config) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                exchange: config.exchange,
                balances: config.balances,
                open_orders: Vec::new(),
                done_orders: Vec::new(),
                next_order_id: 0,
                next_trade_id: 0,
                fill_plan: VecDeque::new(),
                event_txs: Vec::new(),
                order_operations: 0,
            })),
        }
    }

    async fn account_snapshot(&self, _: &[Symbol]) -> Result<AccountSnapshot, ClientError> {
        let state = self.state.lock();
        Ok(AccountSnapshot::new(
            state.exchange,
            state.balances.clone(),
            state.open_orders.clone(),
        ))
    }

    async fn account_stream(&self, _: &[Symbol]) -> Result<Self::AccountStream, ClientError> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.state.lock().event_txs.push(tx);
        Ok(UnboundedReceiverStream::new(rx))
    }

    async fn open_order(&self, request: OrderRequestOpen) -> Result<Order, OrderError> {
        let outcome = self.next_outcome();

        let mut state = self.state.lock();
        state.order_operations += 1;

        if let MockFill::Reject(api_error) = outcome {
            return Err(OrderError {
                client_order_id: Some(request.cid),
                error: ClientError::Api(api_error),
            });
        }

        state.next_order_id += 1;
        let order = Order {
            id: OrderId::new(format!("mock-{}", state.next_order_id)),
            cid: Some(request.cid),
            symbol: request.symbol,
            side: request.side,
            kind: request.kind,
            price: request.price,
            quantity: request.quantity,
            filled_quantity: Decimal::ZERO,
            status: OrderStatus::New,
            time_exchange: Utc::now(),
        };
        state.open_orders.push(order.clone());
        drop(state);

        // Stream the scripted post-ack lifecycle
        match outcome {
            MockFill::Full => {
                self.fill_order(&order.id, order.quantity);
            }
            MockFill::Partial(quantity) => {
                self.fill_order(&order.id, quantity);
            }
            MockFill::None | MockFill::Reject(_) => {}
        }

        Ok(order)
    }

    async fn cancel_order(&self, _: &Symbol, id: &OrderId) -> Result<Order, OrderError> {
        let mut state = self.state.lock();
        state.order_operations += 1;

        let Some(position) = state.open_orders.iter().position(|order| &order.id == id) else {
            // Idempotent against already-done orders
            if let Some(done) = state.done_orders.iter().find(|order| &order.id == id) {
                return Ok(done.clone());
            }
            return Err(OrderError {
                client_order_id: None,
                error: ClientError::Api(ApiError::OrderNotFound),
            });
        };

        let mut order = state.open_orders.remove(position);
        order.status = if order.filled_quantity.is_zero() {
            OrderStatus::Cancelled
        } else {
            OrderStatus::PartiallyCancelled
        };
        state.done_orders.push(order.clone());
        state.emit(AccountEventKind::OrderSnapshot(Snapshot(order.clone())));

        Ok(order)
    }

    async fn cancel_all(&self, symbol: Option<&Symbol>) -> Result<Vec<Order>, ClientError> {
        let open = {
            let state = self.state.lock();
            state
                .open_orders
                .iter()
                .filter(|order| symbol.is_none_or(|symbol| &order.symbol == symbol))
                .map(|order| (order.symbol.clone(), order.id.clone()))
                .collect::<Vec<_>>()
        };

        let mut cancelled = Vec::with_capacity(open.len());
        for (symbol, id) in open {
            if let Ok(order) = self.cancel_order(&symbol, &id).await {
                cancelled.push(order);
            }
        }
        Ok(cancelled)
    }

    async fn fetch_order(&self, _: &Symbol, id: &OrderId) -> Result<Order, ClientError> {
        let state = self.state.lock();
        state
            .open_orders
            .iter()
            .chain(state.done_orders.iter())
            .find(|order| &order.id == id)
            .cloned()
            .ok_or(ClientError::Api(ApiError::OrderNotFound))
    }

    async fn fetch_open_orders(&self, symbol: Option<&Symbol>) -> Result<Vec<Order>, ClientError> {
        let state = self.state.lock();
        Ok(state
            .open_orders
            .iter()
            .filter(|order| symbol.is_none_or(|symbol| &order.symbol == symbol))
            .cloned()
            .collect())
    }

    async fn fetch_balances(&self) -> Result<Vec<AssetBalance>, ClientError> {
        Ok(self.state.lock().balances.clone())
    }
}
