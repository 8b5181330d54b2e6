use crate::{
    books::{OrderBook, OrderBookEvent},
    error::DataError,
    event::MarketEvent,
    exchange::{gateio::GateioPerpetualsUsd, mexc::Mexc},
    streams::{
        consumer::{MarketStreamResult, STREAM_RECONNECTION_POLICY, init_market_stream},
        reconnect::Event,
    },
    subscription::{
        Subscription,
        book::{BookTicker, BookTickers, OrderBooksL2},
    },
};
use basis_instrument::{exchange::ExchangeId, symbol::Symbol};
use chrono::{TimeDelta, Utc};
use fnv::FnvHashMap;
use futures::{Stream, StreamExt};
use parking_lot::RwLock;
use std::{
    fmt::Debug,
    future::Future,
    pin::Pin,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// REST depth snapshot fetching used to seed and re-seed feed state.
pub mod snapshot;

/// Venue symbol catalog fetching ([`SymbolSpec`](basis_instrument::spec::SymbolSpec)s).
pub mod catalog;

/// Maximum age of a streamed event before it is rejected as stale.
pub const MAX_EVENT_AGE: TimeDelta = TimeDelta::seconds(5);

/// Handler invoked with every accepted top-of-book update.
///
/// Handlers run on the feed driver task and must not block - schedule heavy work elsewhere.
pub type BookTickerHandler = Arc<dyn Fn(&Symbol, &BookTicker) + Send + Sync>;

/// Handler invoked with every accepted order book change.
pub type OrderBookHandler = Arc<dyn Fn(&Symbol, &OrderBook, BookUpdateKind) + Send + Sync>;

/// Origin of an order book change delivered to an [`OrderBookHandler`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BookUpdateKind {
    Snapshot,
    Diff,
}

type ReseedFn = Arc<
    dyn Fn(Symbol) -> Pin<Box<dyn Future<Output = Result<OrderBook, DataError>> + Send>>
        + Send
        + Sync,
>;

/// Counters tracking feed throughput and health.
#[derive(Debug, Default)]
pub struct FeedMetrics {
    pub book_ticker_updates: AtomicU64,
    pub orderbook_updates: AtomicU64,
    pub stale_rejections: AtomicU64,
    pub decode_errors: AtomicU64,
    pub process_nanos_total: AtomicU64,
}

/// Public market data surface for one venue.
///
/// Owns the reconnecting streams for the requested symbols, maintains the latest top-of-book
/// and order book views, and fans accepted updates out to registered handlers.
///
/// Methods labelled "current" only ever reflect the latest streaming state - a seeded view is
/// replaced by the first accepted stream event and never returned stale-tolerantly.
pub struct MarketFeed {
    state: Arc<FeedState>,
    symbols: Vec<Symbol>,
    tasks: Vec<JoinHandle<()>>,
}

impl Debug for MarketFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketFeed")
            .field("exchange", &self.state.exchange)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub(crate) struct FeedState {
    exchange: ExchangeId,
    tickers: RwLock<FnvHashMap<Symbol, BookTicker>>,
    books: RwLock<FnvHashMap<Symbol, OrderBook>>,
    ticker_handlers: RwLock<Vec<BookTickerHandlerEntry>>,
    book_handlers: RwLock<Vec<OrderBookHandlerEntry>>,
    metrics: FeedMetrics,
}

struct BookTickerHandlerEntry(BookTickerHandler);
struct OrderBookHandlerEntry(OrderBookHandler);

impl Debug for BookTickerHandlerEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BookTickerHandler")
    }
}

impl Debug for OrderBookHandlerEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderBookHandler")
    }
}

impl FeedState {
    fn new(exchange: ExchangeId) -> Self {
        Self {
            exchange,
            tickers: RwLock::new(FnvHashMap::default()),
            books: RwLock::new(FnvHashMap::default()),
            ticker_handlers: RwLock::new(Vec::new()),
            book_handlers: RwLock::new(Vec::new()),
            metrics: FeedMetrics::default(),
        }
    }

    /// Seed state from a REST depth snapshot - the book is stored whole, and the top level
    /// becomes the initial best bid/ask with a zero `update_id` so the first accepted stream
    /// event always supersedes it.
    fn seed(&self, symbol: Symbol, book: OrderBook) {
        if let (Some(bid), Some(ask)) = (book.best_bid(), book.best_ask()) {
            let seeded = BookTicker {
                time_exchange: book.time_exchange().unwrap_or_else(Utc::now),
                update_id: 0,
                bid,
                ask,
            };
            self.tickers.write().insert(symbol.clone(), seeded);
        }

        let kind = BookUpdateKind::Snapshot;
        for OrderBookHandlerEntry(handler) in self.book_handlers.read().iter() {
            handler(&symbol, &book, kind);
        }
        self.books.write().insert(symbol, book);
    }

    fn update_book_ticker(&self, event: MarketEvent<BookTicker>) {
        let started = std::time::Instant::now();

        // Freshness gate - an event aged exactly the maximum is already stale
        if Utc::now() - event.time_exchange >= MAX_EVENT_AGE {
            self.metrics.stale_rejections.fetch_add(1, Ordering::Relaxed);
            return;
        }

        {
            let mut tickers = self.tickers.write();
            // Reject regressions - venue update ids only move forward
            if let Some(current) = tickers.get(&event.symbol) {
                if current.update_id >= event.kind.update_id {
                    return;
                }
            }
            tickers.insert(event.symbol.clone(), event.kind.clone());
        }

        for BookTickerHandlerEntry(handler) in self.ticker_handlers.read().iter() {
            handler(&event.symbol, &event.kind);
        }

        self.metrics
            .book_ticker_updates
            .fetch_add(1, Ordering::Relaxed);
        self.metrics
            .process_nanos_total
            .fetch_add(started.elapsed().as_nanos() as u64, Ordering::Relaxed);
    }

    fn update_order_book(&self, event: MarketEvent<OrderBookEvent>) {
        let updated = {
            let mut books = self.books.write();
            let book = books.entry(event.symbol.clone()).or_default();
            book.update(&event.kind);
            book.clone()
        };

        let kind = match &event.kind {
            OrderBookEvent::Snapshot(_) => BookUpdateKind::Snapshot,
            OrderBookEvent::Update(_) => BookUpdateKind::Diff,
        };
        for OrderBookHandlerEntry(handler) in self.book_handlers.read().iter() {
            handler(&event.symbol, &updated, kind);
        }

        self.metrics.orderbook_updates.fetch_add(1, Ordering::Relaxed);
    }
}

impl MarketFeed {
    /// Initialise a [`MarketFeed`] for MEXC spot.
    ///
    /// Fetches an initial REST depth snapshot per symbol, then drives the reconnecting
    /// book ticker stream.
    pub async fn mexc(symbols: Vec<Symbol>) -> Result<Self, DataError> {
        Self::init(ExchangeId::MexcSpot, symbols).await
    }

    /// Initialise a [`MarketFeed`] for Gate.io USDT perpetuals.
    ///
    /// Drives both the book ticker stream and the incremental order book stream; the order
    /// book baseline comes from a REST depth snapshot that is re-fetched after every
    /// reconnect.
    pub async fn gateio_perpetuals(symbols: Vec<Symbol>) -> Result<Self, DataError> {
        Self::init(ExchangeId::GateioPerpetualsUsd, symbols).await
    }

    async fn init(exchange: ExchangeId, symbols: Vec<Symbol>) -> Result<Self, DataError> {
        let mut feed = Self {
            state: Arc::new(FeedState::new(exchange)),
            symbols,
            tasks: Vec::new(),
        };
        feed.restart_streams().await?;
        Ok(feed)
    }

    fn reseed_fn(exchange: ExchangeId) -> Result<ReseedFn, DataError> {
        match exchange {
            ExchangeId::MexcSpot => {
                let rest = snapshot::public_rest_client(snapshot::HTTP_BASE_URL_MEXC);
                Ok(Arc::new(move |symbol| {
                    let rest = rest.clone();
                    Box::pin(async move { snapshot::fetch_mexc_depth(&rest, &symbol).await })
                }))
            }
            ExchangeId::GateioPerpetualsUsd => {
                let rest = snapshot::public_rest_client(snapshot::HTTP_BASE_URL_GATEIO);
                Ok(Arc::new(move |symbol| {
                    let rest = rest.clone();
                    Box::pin(
                        async move { snapshot::fetch_gateio_futures_depth(&rest, &symbol).await },
                    )
                }))
            }
            ExchangeId::Mock => Err(DataError::Socket(
                "no public market data feed exists for the mock venue".to_string(),
            )),
        }
    }

    /// Seed state from REST snapshots and (re)start the venue streams for the current
    /// symbol set.
    ///
    /// Also serves as the subscription reconciliation path: adding or removing a symbol
    /// replaces the streams, and every replacement re-sends the full subscription set
    /// before data flows again.
    async fn restart_streams(&mut self) -> Result<(), DataError> {
        for task in self.tasks.drain(..) {
            task.abort();
        }
        if self.symbols.is_empty() {
            return Ok(());
        }

        let exchange = self.state.exchange;
        let reseed = Self::reseed_fn(exchange)?;

        for symbol in &self.symbols {
            let book = reseed(symbol.clone()).await?;
            self.state.seed(symbol.clone(), book);
        }

        match exchange {
            ExchangeId::MexcSpot => {
                let subscriptions = self
                    .symbols
                    .iter()
                    .map(|symbol| Subscription::new(Mexc, symbol.clone(), BookTickers))
                    .collect::<Vec<_>>();
                let stream = init_market_stream::<Mexc, BookTickers>(
                    STREAM_RECONNECTION_POLICY,
                    subscriptions,
                )
                .await?;

                self.tasks.push(tokio::spawn(run_book_ticker_driver(
                    Arc::clone(&self.state),
                    stream,
                    self.symbols.clone(),
                    reseed,
                )));
            }
            ExchangeId::GateioPerpetualsUsd => {
                let ticker_subscriptions = self
                    .symbols
                    .iter()
                    .map(|symbol| {
                        Subscription::new(GateioPerpetualsUsd, symbol.clone(), BookTickers)
                    })
                    .collect::<Vec<_>>();
                let ticker_stream = init_market_stream::<GateioPerpetualsUsd, BookTickers>(
                    STREAM_RECONNECTION_POLICY,
                    ticker_subscriptions,
                )
                .await?;

                let book_subscriptions = self
                    .symbols
                    .iter()
                    .map(|symbol| {
                        Subscription::new(GateioPerpetualsUsd, symbol.clone(), OrderBooksL2)
                    })
                    .collect::<Vec<_>>();
                let book_stream = init_market_stream::<GateioPerpetualsUsd, OrderBooksL2>(
                    STREAM_RECONNECTION_POLICY,
                    book_subscriptions,
                )
                .await?;

                self.tasks.push(tokio::spawn(run_book_ticker_driver(
                    Arc::clone(&self.state),
                    ticker_stream,
                    self.symbols.clone(),
                    Arc::clone(&reseed),
                )));
                self.tasks.push(tokio::spawn(run_order_book_driver(
                    Arc::clone(&self.state),
                    book_stream,
                    self.symbols.clone(),
                    reseed,
                )));
            }
            ExchangeId::Mock => {}
        }

        Ok(())
    }

    /// Start streaming an additional symbol.
    pub async fn add_symbol(&mut self, symbol: Symbol) -> Result<(), DataError> {
        if self.symbols.contains(&symbol) {
            return Ok(());
        }
        self.symbols.push(symbol);
        self.restart_streams().await
    }

    /// Stop streaming a symbol and drop its cached state.
    pub async fn remove_symbol(&mut self, symbol: &Symbol) -> Result<(), DataError> {
        if !self.symbols.contains(symbol) {
            return Ok(());
        }
        self.symbols.retain(|tracked| tracked != symbol);
        self.state.tickers.write().remove(symbol);
        self.state.books.write().remove(symbol);
        self.restart_streams().await
    }

    /// Venue this feed streams from.
    pub fn exchange(&self) -> ExchangeId {
        self.state.exchange
    }

    /// Latest accepted top-of-book for the provided symbol.
    pub fn best_bid_ask(&self, symbol: &Symbol) -> Option<BookTicker> {
        self.state.tickers.read().get(symbol).cloned()
    }

    /// Latest order book view for the provided symbol.
    pub fn order_book(&self, symbol: &Symbol) -> Option<OrderBook> {
        self.state.books.read().get(symbol).cloned()
    }

    /// Register a handler invoked with every accepted top-of-book update.
    pub fn register_book_ticker_handler(&self, handler: BookTickerHandler) {
        self.state
            .ticker_handlers
            .write()
            .push(BookTickerHandlerEntry(handler));
    }

    /// Register a handler invoked with every accepted order book change.
    pub fn register_order_book_handler(&self, handler: OrderBookHandler) {
        self.state
            .book_handlers
            .write()
            .push(OrderBookHandlerEntry(handler));
    }

    /// Feed throughput and health counters.
    pub fn metrics(&self) -> &FeedMetrics {
        &self.state.metrics
    }

    /// Stop the feed driver tasks.
    pub fn close(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for MarketFeed {
    fn drop(&mut self) {
        self.close();
    }
}

async fn run_book_ticker_driver<St>(
    state: Arc<FeedState>,
    stream: St,
    symbols: Vec<Symbol>,
    reseed: ReseedFn,
) where
    St: Stream<Item = MarketStreamResult<BookTicker>>,
{
    futures::pin_mut!(stream);

    while let Some(event) = stream.next().await {
        match event {
            Event::Reconnecting(exchange) => {
                warn!(%exchange, "book ticker stream reconnecting - re-seeding feed state");
                reseed_all(&state, &symbols, &reseed);
            }
            Event::Item(Ok(market_event)) => state.update_book_ticker(market_event),
            Event::Item(Err(error)) => {
                debug!(?error, "book ticker stream produced recoverable error");
                state.metrics.decode_errors.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

async fn run_order_book_driver<St>(
    state: Arc<FeedState>,
    stream: St,
    symbols: Vec<Symbol>,
    reseed: ReseedFn,
) where
    St: Stream<Item = MarketStreamResult<OrderBookEvent>>,
{
    futures::pin_mut!(stream);

    while let Some(event) = stream.next().await {
        match event {
            Event::Reconnecting(exchange) => {
                warn!(%exchange, "order book stream reconnecting - re-seeding feed state");
                reseed_all(&state, &symbols, &reseed);
            }
            Event::Item(Ok(market_event)) => state.update_order_book(market_event),
            Event::Item(Err(error)) => {
                debug!(?error, "order book stream produced recoverable error");
                state.metrics.decode_errors.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

/// Re-fetch REST snapshots for every symbol off the driver path.
fn reseed_all(state: &Arc<FeedState>, symbols: &[Symbol], reseed: &ReseedFn) {
    for symbol in symbols {
        let state = Arc::clone(state);
        let reseed = Arc::clone(reseed);
        let symbol = symbol.clone();
        tokio::spawn(async move {
            match reseed(symbol.clone()).await {
                Ok(book) => state.seed(symbol, book),
                Err(error) => {
                    warn!(?error, %symbol, "failed to re-seed order book snapshot")
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::books::Level;
    use rust_decimal_macros::dec;

    fn market_event(
        symbol: Symbol,
        update_id: u64,
        age: TimeDelta,
        bid_price: rust_decimal::Decimal,
    ) -> MarketEvent<BookTicker> {
        let time_exchange = Utc::now() - age;
        MarketEvent {
            time_exchange,
            time_received: Utc::now(),
            exchange: ExchangeId::MexcSpot,
            symbol,
            kind: BookTicker {
                time_exchange,
                update_id,
                bid: Level::new(bid_price, dec!(1)),
                ask: Level::new(bid_price + dec!(0.01), dec!(1)),
            },
        }
    }

    #[test]
    fn test_update_book_ticker_keeps_greatest_update_id() {
        let state = FeedState::new(ExchangeId::MexcSpot);
        let symbol = Symbol::spot("btc", "usdt");

        state.update_book_ticker(market_event(
            symbol.clone(),
            10,
            TimeDelta::zero(),
            dec!(100.00),
        ));
        // Regression to an earlier update id is rejected
        state.update_book_ticker(market_event(
            symbol.clone(),
            9,
            TimeDelta::zero(),
            dec!(99.00),
        ));

        let current = state.tickers.read().get(&symbol).cloned().unwrap();
        assert_eq!(current.update_id, 10);
        assert_eq!(current.bid.price, dec!(100.00));

        // A greater update id supersedes
        state.update_book_ticker(market_event(
            symbol.clone(),
            11,
            TimeDelta::zero(),
            dec!(101.00),
        ));
        let current = state.tickers.read().get(&symbol).cloned().unwrap();
        assert_eq!(current.update_id, 11);
    }

    #[test]
    fn test_update_book_ticker_rejects_stale() {
        let state = FeedState::new(ExchangeId::MexcSpot);
        let symbol = Symbol::spot("btc", "usdt");

        // An event aged exactly the maximum is treated as stale
        state.update_book_ticker(market_event(
            symbol.clone(),
            10,
            MAX_EVENT_AGE,
            dec!(100.00),
        ));

        assert!(state.tickers.read().get(&symbol).is_none());
        assert_eq!(state.metrics.stale_rejections.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_handlers_invoked_on_accepted_update() {
        let state = FeedState::new(ExchangeId::MexcSpot);
        let symbol = Symbol::spot("btc", "usdt");

        let invocations = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&invocations);
        state
            .ticker_handlers
            .write()
            .push(BookTickerHandlerEntry(Arc::new(move |_, _| {
                counter.fetch_add(1, Ordering::Relaxed);
            })));

        state.update_book_ticker(market_event(
            symbol.clone(),
            10,
            TimeDelta::zero(),
            dec!(100.00),
        ));
        // Rejected regression must not reach handlers
        state.update_book_ticker(market_event(symbol, 9, TimeDelta::zero(), dec!(99.00)));

        assert_eq!(invocations.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_seed_populates_ticker_from_book_top() {
        let state = FeedState::new(ExchangeId::MexcSpot);
        let symbol = Symbol::spot("btc", "usdt");

        state.seed(
            symbol.clone(),
            OrderBook::new(
                50,
                None,
                vec![(dec!(100.00), dec!(1))],
                vec![(dec!(100.10), dec!(2))],
            ),
        );

        let seeded = state.tickers.read().get(&symbol).cloned().unwrap();
        assert_eq!(seeded.update_id, 0);
        assert_eq!(seeded.bid.price, dec!(100.00));
        assert_eq!(seeded.ask.price, dec!(100.10));
    }
}
