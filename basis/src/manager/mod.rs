use basis_data::{feed::{BookTickerHandler, MarketFeed}, subscription::book::BookTicker};
use basis_execution::{
    AccountEvent,
    client::ExecutionClient,
    error::OrderError,
    order::{Order, OrderKind},
    private::PrivateExchange,
};
use basis_instrument::{Side, symbol::Symbol};
use basis_integration::channel::{EventRx, EventTx, event_feed};
use derive_more::Display;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, sync::Arc};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Leg a venue plays in the pair, independent of its venue identity.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display,
)]
#[serde(rename_all = "snake_case")]
pub enum VenueRole {
    Spot,
    Futures,
}

impl VenueRole {
    pub fn other(self) -> Self {
        match self {
            VenueRole::Spot => VenueRole::Futures,
            VenueRole::Futures => VenueRole::Spot,
        }
    }
}

/// Read-only market data access the manager requires per role.
///
/// [`MarketFeed`] implements this for live trading; tests substitute scripted feeds.
pub trait MarketView
where
    Self: Send + Sync + 'static,
{
    fn best_bid_ask(&self, symbol: &Symbol) -> Option<BookTicker>;
    fn register_book_ticker_handler(&self, handler: BookTickerHandler);
}

impl MarketView for MarketFeed {
    fn best_bid_ask(&self, symbol: &Symbol) -> Option<BookTicker> {
        MarketFeed::best_bid_ask(self, symbol)
    }

    fn register_book_ticker_handler(&self, handler: BookTickerHandler) {
        MarketFeed::register_book_ticker_handler(self, handler)
    }
}

/// One leg of the pair - a symbol's market data view and private trading surface on one
/// venue.
pub struct Venue<Client> {
    pub role: VenueRole,
    pub symbol: Symbol,
    /// Hard cap on the quote notional of a single order sent to this leg.
    pub max_position_quote: Decimal,
    /// Unwind precedence - legs with a lower value are cancelled first when a pair
    /// placement partially fails.
    pub priority: u8,
    pub market: Arc<dyn MarketView>,
    pub private: PrivateExchange<Client>,
}

impl<Client> Debug for Venue<Client> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Venue")
            .field("role", &self.role)
            .field("symbol", &self.symbol)
            .finish_non_exhaustive()
    }
}

/// Parameters for one leg of a parallel placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderParams {
    pub side: Side,
    pub kind: OrderKind,
    pub price: Decimal,
    pub quantity: Decimal,
}

/// Event fanned out to the engine - every upstream update forwarded once per subscriber.
#[derive(Debug, Clone)]
pub enum ManagerEvent {
    BookTicker { role: VenueRole, ticker: BookTicker },
    Account { role: VenueRole, event: AccountEvent },
}

/// Aggregate result of a parallel pair placement.
#[derive(Debug)]
pub enum PlacementOutcome {
    /// Every requested leg is open on its venue.
    Placed {
        spot: Option<Order>,
        futures: Option<Order>,
    },
    /// At least one leg failed. Successful legs were best-effort cancelled; any leg that
    /// had already fully filled before the cancel reached the venue is reported so the
    /// caller can flatten it.
    Failed {
        errors: Vec<(VenueRole, OrderError)>,
        cancelled: Vec<(VenueRole, Order)>,
        already_filled: Vec<(VenueRole, Order)>,
    },
}

impl PlacementOutcome {
    pub fn is_placed(&self) -> bool {
        matches!(self, PlacementOutcome::Placed { .. })
    }
}

/// Binds one spot venue and one futures venue for a single symbol.
///
/// Fans upstream market and account events out to the engine, and places paired orders in
/// parallel with cancel-on-partial-success semantics.
#[derive(Debug)]
pub struct ExchangeManager<Spot, Fut> {
    pub spot: Venue<Spot>,
    pub futures: Venue<Fut>,
    fanout_tasks: Vec<JoinHandle<()>>,
}

impl<Spot, Fut> ExchangeManager<Spot, Fut>
where
    Spot: ExecutionClient + Send + Sync + 'static,
    Fut: ExecutionClient + Send + Sync + 'static,
{
    /// Initialise the manager, wiring venue events into a single bus consumed by the
    /// engine.
    ///
    /// Bus sends never block - subscribers schedule heavy work on their own tasks.
    pub fn init(
        spot: Venue<Spot>,
        futures: Venue<Fut>,
        spot_account_rx: EventRx<AccountEvent>,
        futures_account_rx: EventRx<AccountEvent>,
    ) -> (Self, EventRx<ManagerEvent>) {
        let (events_tx, events_rx) = event_feed::<ManagerEvent>("manager_events");

        // Forward book ticker updates from both market views
        for (role, market) in [
            (VenueRole::Spot, Arc::clone(&spot.market)),
            (VenueRole::Futures, Arc::clone(&futures.market)),
        ] {
            let tx = events_tx.clone();
            market.register_book_ticker_handler(Arc::new(move |_, ticker| {
                tx.send(ManagerEvent::BookTicker {
                    role,
                    ticker: ticker.clone(),
                });
            }));
        }

        // Forward private account events from both venues
        let fanout_tasks = vec![
            tokio::spawn(forward_account_events(
                VenueRole::Spot,
                spot_account_rx,
                events_tx.clone(),
            )),
            tokio::spawn(forward_account_events(
                VenueRole::Futures,
                futures_account_rx,
                events_tx,
            )),
        ];

        (
            Self {
                spot,
                futures,
                fanout_tasks,
            },
            events_rx,
        )
    }

    /// Latest top-of-book for the provided role.
    pub fn book_ticker(&self, role: VenueRole) -> Option<BookTicker> {
        match role {
            VenueRole::Spot => self.spot.market.best_bid_ask(&self.spot.symbol),
            VenueRole::Futures => self.futures.market.best_bid_ask(&self.futures.symbol),
        }
    }

    /// Place both legs simultaneously and wait for all results.
    ///
    /// If one leg fails while the other succeeds, the successful leg is best-effort
    /// cancelled and the overall placement reports failure. A leg that filled before the
    /// cancel reached the venue is surfaced via
    /// [`PlacementOutcome::Failed::already_filled`].
    pub async fn place_order_parallel(
        &self,
        spot: Option<OrderParams>,
        futures: Option<OrderParams>,
    ) -> PlacementOutcome {
        let spot_leg = async {
            match &spot {
                Some(params) => Some(self.place_leg(VenueRole::Spot, params).await),
                None => None,
            }
        };
        let futures_leg = async {
            match &futures {
                Some(params) => Some(self.place_leg(VenueRole::Futures, params).await),
                None => None,
            }
        };

        // Fire both legs concurrently - target wall-clock is a single round trip
        let (spot_result, futures_result) = tokio::join!(spot_leg, futures_leg);

        let mut errors = Vec::new();
        let mut placed = Vec::new();
        for (role, result) in [
            (VenueRole::Spot, spot_result),
            (VenueRole::Futures, futures_result),
        ] {
            match result {
                Some(Ok(order)) => placed.push((role, order)),
                Some(Err(error)) => errors.push((role, error)),
                None => {}
            }
        }

        if errors.is_empty() {
            let mut spot_order = None;
            let mut futures_order = None;
            for (role, order) in placed {
                match role {
                    VenueRole::Spot => spot_order = Some(order),
                    VenueRole::Futures => futures_order = Some(order),
                }
            }
            return PlacementOutcome::Placed {
                spot: spot_order,
                futures: futures_order,
            };
        }

        // Partial success - unwind the surviving legs in role priority order
        placed.sort_by_key(|(role, _)| match role {
            VenueRole::Spot => self.spot.priority,
            VenueRole::Futures => self.futures.priority,
        });
        let mut cancelled = Vec::new();
        let mut already_filled = Vec::new();
        for (role, order) in placed {
            let state = match self.cancel_leg(role, &order).await {
                Ok(state) => state,
                Err(error) => {
                    // The order may have filled before the cancel arrived - fetch the
                    // authoritative state so the caller can flatten
                    warn!(%role, %error, "cancel on partial-success failed - fetching state");
                    match self.fetch_leg(role, &order).await {
                        Ok(state) => state,
                        Err(error) => {
                            warn!(%role, %error, "failed to fetch leg state after cancel failure");
                            already_filled.push((role, order));
                            continue;
                        }
                    }
                }
            };

            if state.status == basis_execution::order::OrderStatus::Filled {
                already_filled.push((role, state));
            } else {
                cancelled.push((role, state));
            }
        }

        PlacementOutcome::Failed {
            errors,
            cancelled,
            already_filled,
        }
    }

    async fn place_leg(&self, role: VenueRole, params: &OrderParams) -> Result<Order, OrderError> {
        // Role-level guard on single-order notional
        let max_position_quote = match role {
            VenueRole::Spot => self.spot.max_position_quote,
            VenueRole::Futures => self.futures.max_position_quote,
        };
        if params.price * params.quantity > max_position_quote {
            return Err(OrderError {
                client_order_id: None,
                error: basis_execution::error::ClientError::Api(
                    basis_execution::error::ApiError::OrderRejected(format!(
                        "notional {} exceeds role limit {max_position_quote}",
                        params.price * params.quantity
                    )),
                ),
            });
        }

        match (role, params.kind) {
            (VenueRole::Spot, OrderKind::Limit) => {
                self.spot
                    .private
                    .place_limit_order(&self.spot.symbol, params.side, params.price, params.quantity)
                    .await
            }
            (VenueRole::Spot, OrderKind::Market) => {
                self.spot
                    .private
                    .place_market_order(&self.spot.symbol, params.side, params.price, params.quantity)
                    .await
            }
            (VenueRole::Futures, OrderKind::Limit) => {
                self.futures
                    .private
                    .place_limit_order(
                        &self.futures.symbol,
                        params.side,
                        params.price,
                        params.quantity,
                    )
                    .await
            }
            (VenueRole::Futures, OrderKind::Market) => {
                self.futures
                    .private
                    .place_market_order(
                        &self.futures.symbol,
                        params.side,
                        params.price,
                        params.quantity,
                    )
                    .await
            }
        }
    }

    async fn cancel_leg(&self, role: VenueRole, order: &Order) -> Result<Order, OrderError> {
        match role {
            VenueRole::Spot => {
                self.spot
                    .private
                    .cancel_order(&self.spot.symbol, &order.id)
                    .await
            }
            VenueRole::Futures => {
                self.futures
                    .private
                    .cancel_order(&self.futures.symbol, &order.id)
                    .await
            }
        }
    }

    async fn fetch_leg(
        &self,
        role: VenueRole,
        order: &Order,
    ) -> Result<Order, basis_execution::error::ClientError> {
        match role {
            VenueRole::Spot => {
                self.spot
                    .private
                    .get_active_order(&self.spot.symbol, &order.id)
                    .await
            }
            VenueRole::Futures => {
                self.futures
                    .private
                    .get_active_order(&self.futures.symbol, &order.id)
                    .await
            }
        }
    }

    /// Cancel all outstanding orders on both venues.
    pub async fn cancel_all_orders(&self) {
        let (spot, futures) = tokio::join!(
            self.spot.private.cancel_all_orders(Some(&self.spot.symbol)),
            self.futures
                .private
                .cancel_all_orders(Some(&self.futures.symbol)),
        );

        for (role, result) in [(VenueRole::Spot, spot), (VenueRole::Futures, futures)] {
            match result {
                Ok(cancelled) if !cancelled.is_empty() => {
                    info!(%role, count = cancelled.len(), "cancelled outstanding orders")
                }
                Ok(_) => {}
                Err(error) => warn!(%role, %error, "failed to cancel outstanding orders"),
            }
        }
    }

    /// Stop event fan-out and the venue private streams.
    pub fn shutdown(&mut self) {
        for task in self.fanout_tasks.drain(..) {
            task.abort();
        }
        self.spot.private.close();
        self.futures.private.close();
    }
}

async fn forward_account_events(
    role: VenueRole,
    mut rx: EventRx<AccountEvent>,
    tx: EventTx<ManagerEvent>,
) {
    while let Some(event) = rx.recv().await {
        if !tx.send(ManagerEvent::Account { role, event }) {
            break;
        }
    }
}
