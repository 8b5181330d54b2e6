//! End-to-end engine scenarios driven against mock venues and scripted market feeds.

use basis::{
    config::{EngineConfig, TradingParams},
    engine::{ArbitrageEngine, context::EngineState},
    manager::{ExchangeManager, MarketView, Venue, VenueRole},
    snapshot::SnapshotManager,
};
use basis_data::{books::Level, feed::BookTickerHandler, subscription::book::BookTicker};
use basis_execution::{
    balance::{AssetBalance, Balance},
    client::{
        ExecutionClient,
        mock::{MockConfig, MockExecutionClient, MockFill},
    },
    error::ApiError,
    order::{OrderStatus, request::OrderRequestOpen},
    private::PrivateExchange,
};
use basis_instrument::{
    Side, asset::AssetNameExchange, exchange::ExchangeId, spec::SymbolSpec, symbol::Symbol,
};
use chrono::Utc;
use fnv::FnvHashMap;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::{path::PathBuf, sync::Arc};

/// Scripted [`MarketView`] with settable top-of-book state.
#[derive(Default)]
struct ScriptedFeed {
    tickers: Mutex<FnvHashMap<Symbol, BookTicker>>,
    handlers: Mutex<Vec<BookTickerHandler>>,
    next_update_id: Mutex<u64>,
}

impl ScriptedFeed {
    fn set_top(&self, symbol: &Symbol, bid: Decimal, bid_qty: Decimal, ask: Decimal, ask_qty: Decimal) {
        let update_id = {
            let mut next = self.next_update_id.lock();
            *next += 1;
            *next
        };
        let ticker = BookTicker {
            time_exchange: Utc::now(),
            update_id,
            bid: Level::new(bid, bid_qty),
            ask: Level::new(ask, ask_qty),
        };
        self.tickers.lock().insert(symbol.clone(), ticker.clone());
        for handler in self.handlers.lock().iter() {
            handler(symbol, &ticker);
        }
    }
}

impl MarketView for ScriptedFeed {
    fn best_bid_ask(&self, symbol: &Symbol) -> Option<BookTicker> {
        self.tickers.lock().get(symbol).cloned()
    }

    fn register_book_ticker_handler(&self, handler: BookTickerHandler) {
        self.handlers.lock().push(handler);
    }
}

fn spot_symbol() -> Symbol {
    Symbol::spot("btc", "usdt")
}

fn futures_symbol() -> Symbol {
    Symbol::perpetual("btc", "usdt")
}

fn spot_spec() -> SymbolSpec {
    SymbolSpec {
        symbol: spot_symbol(),
        base_precision: 4,
        quote_precision: 2,
        min_base_quantity: dec!(0.0001),
        min_quote_notional: dec!(5),
        maker_fee: dec!(0.0),
        taker_fee: dec!(0.0005),
        active: true,
        contract_size: None,
    }
}

fn futures_spec() -> SymbolSpec {
    SymbolSpec {
        symbol: futures_symbol(),
        base_precision: 4,
        quote_precision: 2,
        min_base_quantity: dec!(0.0001),
        min_quote_notional: dec!(5),
        maker_fee: dec!(-0.00025),
        taker_fee: dec!(0.00075),
        active: true,
        contract_size: Some(dec!(0.0001)),
    }
}

fn balances() -> Vec<AssetBalance> {
    vec![
        AssetBalance::new(
            AssetNameExchange::new("USDT"),
            Balance::new(dec!(1000), dec!(1000)),
            Utc::now(),
        ),
        AssetBalance::new(
            AssetNameExchange::new("BTC"),
            Balance::new(dec!(1), dec!(1)),
            Utc::now(),
        ),
    ]
}

fn snapshot_root(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "basis_scenarios_{tag}_{}_{}",
        std::process::id(),
        Utc::now().timestamp_nanos_opt().unwrap_or_default(),
    ))
}

fn config(tag: &str) -> EngineConfig {
    EngineConfig {
        task_id: format!("arbitrage_btc_usdt_{tag}"),
        symbol: spot_symbol(),
        base_position_size_quote: dec!(20),
        max_position_multiplier: dec!(2),
        futures_leverage: dec!(1),
        params: TradingParams::default(),
        snapshot_root: snapshot_root(tag),
        stream_backoff: basis_data::streams::consumer::STREAM_RECONNECTION_POLICY,
    }
}

struct Harness {
    engine: ArbitrageEngine<MockExecutionClient, MockExecutionClient>,
    spot_client: MockExecutionClient,
    futures_client: MockExecutionClient,
    spot_feed: Arc<ScriptedFeed>,
    futures_feed: Arc<ScriptedFeed>,
}

async fn harness(tag: &str) -> Harness {
    let config = config(tag);

    let spot_client = MockExecutionClient::new(MockConfig {
        exchange: ExchangeId::Mock,
        balances: balances(),
    });
    let futures_client = MockExecutionClient::new(MockConfig {
        exchange: ExchangeId::Mock,
        balances: balances(),
    });

    let (spot_private, spot_events) = PrivateExchange::init(
        spot_client.clone(),
        FnvHashMap::from_iter([(spot_symbol(), spot_spec())]),
    )
    .await
    .unwrap();
    let (futures_private, futures_events) = PrivateExchange::init(
        futures_client.clone(),
        FnvHashMap::from_iter([(futures_symbol(), futures_spec())]),
    )
    .await
    .unwrap();

    let spot_feed = Arc::new(ScriptedFeed::default());
    let futures_feed = Arc::new(ScriptedFeed::default());

    let (manager, events) = ExchangeManager::init(
        Venue {
            role: VenueRole::Spot,
            symbol: spot_symbol(),
            max_position_quote: dec!(100),
            priority: 0,
            market: Arc::clone(&spot_feed) as Arc<dyn MarketView>,
            private: spot_private,
        },
        Venue {
            role: VenueRole::Futures,
            symbol: futures_symbol(),
            max_position_quote: dec!(100),
            priority: 1,
            market: Arc::clone(&futures_feed) as Arc<dyn MarketView>,
            private: futures_private,
        },
        spot_events,
        futures_events,
    );

    let snapshots = Arc::new(SnapshotManager::new(config.snapshot_root.clone()));
    let engine = ArbitrageEngine::new(&config, manager, events, snapshots).unwrap();

    Harness {
        engine,
        spot_client,
        futures_client,
        spot_feed,
        futures_feed,
    }
}

/// Let spawned forwarding tasks drain their channels.
async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

/// Advance the engine through Idle -> Initializing -> Monitoring.
async fn start(harness: &mut Harness) {
    harness.engine.step().await; // Idle -> Initializing
    harness.engine.step().await; // Initializing -> Monitoring
    settle().await;
    harness.engine.drain_events();
    assert_eq!(harness.engine.context().state, EngineState::Monitoring);
}

/// Quantity the engine trades for a 20 USDT base size at the given entry ask, after spot
/// precision rounding (4 dp).
fn entry_quantity(ask: Decimal) -> Decimal {
    (dec!(20) / ask)
        .round_dp_with_strategy(4, rust_decimal::RoundingStrategy::ToZero)
        .normalize()
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_scenario_clean_round_trip() {
    let mut harness = harness("clean_round_trip").await;
    start(&mut harness).await;

    // Entry books: futures bid exceeds spot ask by ~0.14%
    harness
        .spot_feed
        .set_top(&spot_symbol(), dec!(100.00), dec!(1), dec!(100.01), dec!(1));
    harness
        .futures_feed
        .set_top(&futures_symbol(), dec!(100.15), dec!(1), dec!(100.16), dec!(1));

    harness.engine.step().await; // Monitoring -> Analyzing (opportunity found)
    assert_eq!(harness.engine.context().state, EngineState::Analyzing);
    harness.engine.step().await; // Analyzing -> Executing (still valid)
    assert_eq!(harness.engine.context().state, EngineState::Executing);
    harness.engine.step().await; // Executing: pair placed, both legs fill
    assert_eq!(harness.engine.context().state, EngineState::Monitoring);

    settle().await;
    harness.engine.drain_events();

    let quantity = entry_quantity(dec!(100.01));
    let context = harness.engine.context();
    assert_eq!(context.arbitrage_cycles, 1);
    assert_eq!(context.positions.spot.signed_quantity, quantity);
    assert_eq!(context.positions.futures.signed_quantity, -quantity);
    // Delta-neutral while the pair is open
    assert_eq!(context.positions.delta(), dec!(0));
    assert!(context.position_open_time.is_some());
    assert!(context.active_orders.is_empty());

    // Exit books: unwind cost (100.13 - 100.10) / 100.13 is below the 0.03% threshold
    harness
        .spot_feed
        .set_top(&spot_symbol(), dec!(100.10), dec!(1), dec!(100.11), dec!(1));
    harness
        .futures_feed
        .set_top(&futures_symbol(), dec!(100.12), dec!(1), dec!(100.13), dec!(1));

    harness.engine.step().await; // Monitoring: exit condition met, exit pair placed
    settle().await;
    harness.engine.drain_events();

    let context = harness.engine.context();
    assert_eq!(context.positions.spot.signed_quantity, dec!(0));
    assert_eq!(context.positions.futures.signed_quantity, dec!(0));
    assert!(context.position_open_time.is_none());
    // Bought at 100.01, sold at 100.10; shorted at 100.15, covered at 100.13
    assert!(context.total_profit_quote > dec!(0));
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_scenario_partial_leg_failure() {
    let mut harness = harness("partial_leg_failure").await;
    start(&mut harness).await;

    harness
        .spot_feed
        .set_top(&spot_symbol(), dec!(99.99), dec!(1), dec!(100.00), dec!(1));
    harness
        .futures_feed
        .set_top(&futures_symbol(), dec!(100.15), dec!(1), dec!(100.16), dec!(1));

    // Spot leg fills immediately; futures leg is rejected with a margin error
    harness.futures_client.script_fill(MockFill::Reject(
        ApiError::BalanceInsufficient("USDT".to_string(), "margin".to_string()),
    ));

    harness.engine.step().await; // Monitoring -> Analyzing
    harness.engine.step().await; // Analyzing -> Executing
    harness.engine.step().await; // Executing: mixed result, spot flattened
    assert_eq!(harness.engine.context().state, EngineState::ErrorRecovery);

    settle().await;
    harness.engine.drain_events();

    harness.engine.step().await; // ErrorRecovery -> Monitoring
    settle().await;
    harness.engine.drain_events();

    let context = harness.engine.context();
    assert_eq!(context.state, EngineState::Monitoring);
    // No long position lingers: entry fill was reversed by the flatten market order
    assert_eq!(context.positions.spot.signed_quantity, dec!(0));
    assert_eq!(context.positions.futures.signed_quantity, dec!(0));
    assert!(context.active_orders.is_empty());
    assert_eq!(context.arbitrage_cycles, 0);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_scenario_reconnect_reconciliation() {
    let mut harness = harness("reconnect").await;
    start(&mut harness).await;

    harness
        .spot_feed
        .set_top(&spot_symbol(), dec!(99.99), dec!(1), dec!(100.00), dec!(1));
    harness
        .futures_feed
        .set_top(&futures_symbol(), dec!(100.15), dec!(1), dec!(100.16), dec!(1));

    // Futures leg only partially fills then stalls
    harness.futures_client.script_fill(MockFill::Partial(dec!(0.1)));

    harness.engine.step().await;
    harness.engine.step().await;
    harness.engine.step().await;
    settle().await;
    harness.engine.drain_events();

    let futures_order = {
        let context = harness.engine.context();
        assert_eq!(context.positions.futures.signed_quantity, dec!(-0.1));
        let (id, order) = context.active_orders.futures.iter().next().unwrap();
        assert_eq!(order.status, OrderStatus::PartiallyFilled);
        id.clone()
    };

    // The remaining fill lands while the private stream is down: the engine misses the
    // push (left queued, undrained), then receives a venue account snapshot on reconnect
    // that no longer lists the order as open
    harness.futures_client.fill_order(&futures_order, dec!(0.1));
    let snapshot = harness
        .futures_client
        .account_snapshot(&[futures_symbol()])
        .await
        .unwrap();
    harness.engine.handle_event(basis::manager::ManagerEvent::Account {
        role: VenueRole::Futures,
        event: basis_execution::AccountEvent::new(
            ExchangeId::Mock,
            basis_execution::AccountEventKind::Snapshot(snapshot),
        ),
    });

    // Within a single tick the engine re-fetches venue truth and converges
    harness.engine.step().await;
    settle().await;

    let context = harness.engine.context();
    assert!(context.active_orders.futures.is_empty());
    assert_eq!(context.positions.futures.signed_quantity, dec!(-0.2));

    // The missed push eventually replays - it must not double-count
    harness.engine.drain_events();
    let context = harness.engine.context();
    assert_eq!(context.positions.futures.signed_quantity, dec!(-0.2));
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_scenario_crash_recovery() {
    let root = snapshot_root("crash_recovery");
    let task_id = "arbitrage_btc_usdt_crash_recovery";

    // A previous process placed leg A and was killed before leg B - its snapshot records
    // one active order the venue still knows about
    let spot_client = MockExecutionClient::new(MockConfig {
        exchange: ExchangeId::Mock,
        balances: balances(),
    });
    spot_client.script_fill(MockFill::None);
    let leg_a = spot_client
        .open_order(OrderRequestOpen::limit(
            spot_symbol(),
            Side::Buy,
            dec!(100.00),
            dec!(0.2),
        ))
        .await
        .unwrap();

    let snapshots = SnapshotManager::new(root.clone());
    {
        let mut context = basis::engine::context::EngineContext::new(
            task_id.to_string(),
            spot_symbol(),
            dec!(20),
            dec!(2),
            dec!(1),
            TradingParams::default(),
        );
        context.state = EngineState::Executing;
        context.active_orders.insert(VenueRole::Spot, leg_a.clone());
        let snapshot = snapshots.create_snapshot(&context);
        snapshots.save(&snapshot).unwrap();
    }

    // Restart: rebuild the stack around the same mock spot venue
    let futures_client = MockExecutionClient::new(MockConfig {
        exchange: ExchangeId::Mock,
        balances: balances(),
    });
    let (spot_private, spot_events) = PrivateExchange::init(
        spot_client.clone(),
        FnvHashMap::from_iter([(spot_symbol(), spot_spec())]),
    )
    .await
    .unwrap();
    let (futures_private, futures_events) = PrivateExchange::init(
        futures_client.clone(),
        FnvHashMap::from_iter([(futures_symbol(), futures_spec())]),
    )
    .await
    .unwrap();

    let spot_feed = Arc::new(ScriptedFeed::default());
    let futures_feed = Arc::new(ScriptedFeed::default());
    let (manager, events) = ExchangeManager::init(
        Venue {
            role: VenueRole::Spot,
            symbol: spot_symbol(),
            max_position_quote: dec!(100),
            priority: 0,
            market: Arc::clone(&spot_feed) as Arc<dyn MarketView>,
            private: spot_private,
        },
        Venue {
            role: VenueRole::Futures,
            symbol: futures_symbol(),
            max_position_quote: dec!(100),
            priority: 1,
            market: Arc::clone(&futures_feed) as Arc<dyn MarketView>,
            private: futures_private,
        },
        spot_events,
        futures_events,
    );

    let mut config = config("crash_recovery");
    config.task_id = task_id.to_string();
    config.snapshot_root = root;
    let mut engine = ArbitrageEngine::new(
        &config,
        manager,
        events,
        Arc::new(SnapshotManager::new(config.snapshot_root.clone())),
    )
    .unwrap();

    // Restored context carries the recorded leg
    assert_eq!(engine.context().active_orders.count(), 1);

    engine.step().await; // Idle -> Initializing
    engine.step().await; // Initializing: leg A revalidated as still open -> ErrorRecovery
    assert_eq!(engine.context().state, EngineState::ErrorRecovery);

    engine.step().await; // ErrorRecovery: cancel all -> Monitoring
    settle().await;
    engine.drain_events();

    let context = engine.context();
    assert_eq!(context.state, EngineState::Monitoring);
    assert!(context.active_orders.is_empty());
    // No duplicate submission happened: the only operations against the spot venue are
    // the original placement and the recovery cancel
    assert_eq!(spot_client.order_operations(), 2);
    assert_eq!(context.arbitrage_cycles, 0);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_scenario_delta_drift_rebalance() {
    let mut harness = harness("delta_drift").await;
    start(&mut harness).await;

    harness
        .spot_feed
        .set_top(&spot_symbol(), dec!(99.99), dec!(1), dec!(100.00), dec!(1));
    harness
        .futures_feed
        .set_top(&futures_symbol(), dec!(100.15), dec!(1), dec!(100.16), dec!(1));

    // Spot fills fully (0.2), futures fills 0.15 then stalls: delta 0.05 (> 2% tolerance)
    harness.futures_client.script_fill(MockFill::Partial(dec!(0.15)));

    harness.engine.step().await;
    harness.engine.step().await;
    harness.engine.step().await;
    settle().await;
    harness.engine.drain_events();

    {
        let context = harness.engine.context();
        assert_eq!(context.positions.spot.signed_quantity, dec!(0.2));
        assert_eq!(context.positions.futures.signed_quantity, dec!(-0.15));
        assert!(context.positions.imbalance_pct() > dec!(2));
    }

    // Monitoring detects the imbalance and issues a market sell on the excess (spot) leg
    harness.engine.step().await;
    settle().await;
    harness.engine.drain_events();

    let context = harness.engine.context();
    assert_eq!(context.positions.spot.signed_quantity, dec!(0.15));
    assert_eq!(context.positions.futures.signed_quantity, dec!(-0.15));
    assert_eq!(context.positions.delta(), dec!(0));
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_scenario_stale_opportunity_discarded() {
    let mut harness = harness("stale_opportunity").await;
    start(&mut harness).await;

    harness
        .spot_feed
        .set_top(&spot_symbol(), dec!(99.99), dec!(1), dec!(100.00), dec!(1));
    harness
        .futures_feed
        .set_top(&futures_symbol(), dec!(100.15), dec!(1), dec!(100.16), dec!(1));

    harness.engine.step().await; // Monitoring -> Analyzing
    assert_eq!(harness.engine.context().state, EngineState::Analyzing);

    // 6 seconds elapse before executing begins
    {
        let context = harness.engine.context_mut();
        let opportunity = context.current_opportunity.as_mut().unwrap();
        opportunity.time -= chrono::TimeDelta::seconds(6);
    }

    harness.engine.step().await; // Analyzing: stale -> discarded
    let context = harness.engine.context();
    assert_eq!(context.state, EngineState::Monitoring);
    assert!(context.current_opportunity.is_none());

    // No orders reached either venue
    assert_eq!(harness.spot_client.order_operations(), 0);
    assert_eq!(harness.futures_client.order_operations(), 0);
}
