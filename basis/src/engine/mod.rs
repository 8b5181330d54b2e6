use self::context::{
    ArbitrageOpportunity, Direction, EngineContext, EngineState,
};
use crate::{
    config::EngineConfig,
    manager::{ExchangeManager, ManagerEvent, OrderParams, PlacementOutcome, VenueRole},
    snapshot::SnapshotManager,
};
use basis_execution::{
    AccountEventKind,
    client::ExecutionClient,
    order::{Order, OrderKind, id::OrderId},
};
use basis_instrument::Side;
use basis_integration::channel::EventRx;
use chrono::Utc;
use rust_decimal::Decimal;
use std::{fmt::Debug, sync::Arc, time::Duration};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

/// Serializable engine state - context, positions, thresholds, counters.
pub mod context;

/// Opportunity detection and exit condition evaluation.
pub mod opportunity;

/// Engine tick cadence.
pub const TICK_INTERVAL: Duration = Duration::from_millis(10);

/// Minimum interval between opportunity analyses, bounding CPU under dense tick streams.
pub const ANALYSIS_THROTTLE: Duration = Duration::from_millis(100);

/// Pause before re-entering monitoring after a failure.
const RECOVERY_PAUSE: Duration = Duration::from_secs(1);

/// Periodic snapshot cadence when the context has not changed materially.
const SNAPSHOT_HEARTBEAT: Duration = Duration::from_secs(30);

/// The per-symbol arbitrage state machine.
///
/// ```text
/// Idle -> Initializing -> Monitoring <-> Analyzing -> Executing -> Monitoring
///                             |                           |
///                             +------ ErrorRecovery <-----+
/// ```
///
/// The context is owned exclusively by this instance - mutations are serialized through
/// the engine loop, so a snapshot can be taken at any instant without tearing. Failures
/// never propagate out of a state handler: every error logs and transitions to
/// [`EngineState::ErrorRecovery`].
pub struct ArbitrageEngine<Spot, Fut>
where
    Spot: ExecutionClient,
    Fut: ExecutionClient,
{
    manager: ExchangeManager<Spot, Fut>,
    events: Option<EventRx<ManagerEvent>>,
    context: EngineContext,
    snapshots: Arc<SnapshotManager>,
    /// Orders whose venue-authoritative state must be re-fetched - populated when an
    /// account snapshot no longer lists a tracked order as open.
    pending_revalidation: Vec<(VenueRole, OrderId)>,
    last_analysis: Option<tokio::time::Instant>,
    last_snapshot: tokio::time::Instant,
    dirty: bool,
}

impl<Spot, Fut> Debug for ArbitrageEngine<Spot, Fut>
where
    Spot: ExecutionClient,
    Fut: ExecutionClient,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArbitrageEngine")
            .field("task_id", &self.context.task_id)
            .field("state", &self.context.state)
            .finish_non_exhaustive()
    }
}

impl<Spot, Fut> ArbitrageEngine<Spot, Fut>
where
    Spot: ExecutionClient + Send + Sync + 'static,
    Fut: ExecutionClient + Send + Sync + 'static,
{
    /// Construct an engine, restoring the latest valid context snapshot if one exists.
    ///
    /// A corrupt latest snapshot aborts startup - trading on silently dropped state risks
    /// duplicate submissions.
    pub fn new(
        config: &EngineConfig,
        manager: ExchangeManager<Spot, Fut>,
        events: EventRx<ManagerEvent>,
        snapshots: Arc<SnapshotManager>,
    ) -> Result<Self, crate::snapshot::SnapshotError> {
        let context = match snapshots.load_latest(&config.task_id)? {
            Some(snapshot) => {
                info!(
                    task_id = %config.task_id,
                    snapshot_id = %snapshot.snapshot_id,
                    active_orders = snapshot.order_count,
                    "restored engine context from snapshot"
                );
                let mut context = snapshot.context;
                context.state = EngineState::Idle;
                context
            }
            None => EngineContext::new(
                config.task_id.clone(),
                config.symbol.clone(),
                config.base_position_size_quote,
                config.max_position_multiplier,
                config.futures_leverage,
                config.params.clone(),
            ),
        };

        Ok(Self {
            manager,
            events: Some(events),
            context,
            snapshots,
            pending_revalidation: Vec::new(),
            last_analysis: None,
            last_snapshot: tokio::time::Instant::now(),
            dirty: true,
        })
    }

    /// Read access to the engine context, primarily for inspection and tests.
    pub fn context(&self) -> &EngineContext {
        &self.context
    }

    /// Mutable access to the engine context.
    ///
    /// The context is single-owner: this is intended for recovery orchestration and test
    /// harnesses, not for concurrent mutation.
    pub fn context_mut(&mut self) -> &mut EngineContext {
        self.dirty = true;
        &mut self.context
    }

    /// Drain and process any events currently queued on the manager bus.
    pub fn drain_events(&mut self) {
        let mut pending = Vec::new();
        if let Some(events) = self.events.as_mut() {
            while let Some(event) = events.try_next() {
                pending.push(event);
            }
        }
        for event in pending {
            self.handle_event(event);
        }
    }

    /// Drive the engine until the shutdown signal fires, then run cleanup.
    pub async fn run(mut self, mut shutdown: oneshot::Receiver<()>) -> EngineContext {
        let mut events = self.events.take().expect("engine events consumed twice");
        let mut ticker = tokio::time::interval(TICK_INTERVAL);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        info!(task_id = %self.context.task_id, "arbitrage engine running");

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!(task_id = %self.context.task_id, "shutdown signal received");
                    break;
                }
                maybe_event = events.recv() => {
                    match maybe_event {
                        Some(event) => self.handle_event(event),
                        None => {
                            warn!(task_id = %self.context.task_id, "manager event bus closed");
                            break;
                        }
                    }
                }
                _ = ticker.tick() => {
                    self.step().await;
                }
            }

            self.maybe_snapshot();
        }

        self.cleanup().await;
        self.context
    }

    /// Cancel outstanding orders and stop background tasks.
    pub async fn cleanup(&mut self) {
        let _ = tokio::time::timeout(Duration::from_secs(3), async {
            self.manager.cancel_all_orders().await;
        })
        .await;
        self.manager.shutdown();
        self.snapshot_now();
    }

    /// Process one fanned-out manager event.
    ///
    /// Runs on the engine loop - long work is deferred to the next [`Self::step`].
    pub fn handle_event(&mut self, event: ManagerEvent) {
        match event {
            ManagerEvent::BookTicker { .. } => {
                self.context.orderbook_updates += 1;
            }
            ManagerEvent::Account { role, event } => match event.kind {
                AccountEventKind::OrderSnapshot(snapshot) => {
                    self.process_order_update(role, snapshot.0);
                }
                AccountEventKind::Trade(trade) => {
                    self.context.total_fees_quote += trade.fees;
                    self.dirty = true;
                }
                AccountEventKind::Snapshot(snapshot) => {
                    // Upsert venue-open orders, then queue revalidation for tracked orders
                    // the venue no longer lists as open - they finished while disconnected
                    // and their terminal state must be fetched, not guessed
                    let open_ids = snapshot
                        .orders
                        .iter()
                        .map(|order| order.id.clone())
                        .collect::<Vec<_>>();

                    for order in snapshot.orders {
                        self.process_order_update(role, order);
                    }

                    let missing = self
                        .context
                        .active_orders
                        .role(role)
                        .keys()
                        .filter(|id| !open_ids.contains(id))
                        .cloned()
                        .collect::<Vec<_>>();
                    for id in missing {
                        debug!(
                            task_id = %self.context.task_id,
                            %role,
                            %id,
                            "tracked order absent from venue snapshot - queueing revalidation"
                        );
                        self.pending_revalidation.push((role, id));
                    }
                }
                AccountEventKind::BalanceSnapshot(_) => {
                    // Balance bookkeeping lives in the private exchange
                }
            },
        }
    }

    /// Execute one state machine dispatch.
    pub async fn step(&mut self) {
        if !self.pending_revalidation.is_empty() {
            self.revalidate_pending().await;
        }

        match self.context.state {
            EngineState::Idle => self.transition(EngineState::Initializing),
            EngineState::Initializing => self.handle_initializing().await,
            EngineState::Monitoring => self.handle_monitoring().await,
            EngineState::Analyzing => self.handle_analyzing(),
            EngineState::Executing => self.handle_executing().await,
            EngineState::ErrorRecovery => self.handle_error_recovery().await,
        }
    }

    fn transition(&mut self, next: EngineState) {
        let previous = self.context.state;
        if previous != next {
            info!(task_id = %self.context.task_id, ?previous, ?next, "state transition");
            self.context.state = next;
            self.dirty = true;
        }
    }

    // ---------- state handlers ----------

    /// Revalidate recovered active orders against venue truth, then start monitoring.
    ///
    /// Orders the venues still recognise as open are kept; done orders are retired through
    /// the normal fill path; unknown orders are dropped. Any surviving active order after a
    /// restart means a dangling leg - recovery cancels it before trading resumes.
    async fn handle_initializing(&mut self) {
        let recovered = self
            .context
            .active_orders
            .iter()
            .map(|(role, order)| (role, order.clone()))
            .collect::<Vec<_>>();

        let mut dangling = false;
        for (role, order) in recovered {
            let current = match role {
                VenueRole::Spot => {
                    self.manager
                        .spot
                        .private
                        .get_active_order(&self.manager.spot.symbol, &order.id)
                        .await
                }
                VenueRole::Futures => {
                    self.manager
                        .futures
                        .private
                        .get_active_order(&self.manager.futures.symbol, &order.id)
                        .await
                }
            };

            match current {
                Ok(current) if current.is_done() => {
                    debug!(%role, id = %current.id, "recovered order already done - retiring");
                    self.process_order_update(role, current);
                }
                Ok(current) => {
                    debug!(%role, id = %current.id, "recovered order still open on venue");
                    self.context.active_orders.insert(role, current);
                    self.dirty = true;
                    dangling = true;
                }
                Err(error) => {
                    warn!(
                        %role,
                        id = %order.id,
                        %error,
                        "recovered order unknown to venue - dropping"
                    );
                    self.context.active_orders.remove(role, &order.id);
                    self.dirty = true;
                }
            }
        }

        // Load venue minimum notionals from the symbol catalogs
        if let Ok(spec) = self.manager.spot.private.spec(&self.manager.spot.symbol) {
            self.context.min_quote_quantity.spot = spec.min_quote_notional;
        }
        if let Ok(spec) = self
            .manager
            .futures
            .private
            .spec(&self.manager.futures.symbol)
        {
            self.context.min_quote_quantity.futures = spec.min_quote_notional;
        }

        if dangling {
            warn!(
                task_id = %self.context.task_id,
                "recovered in-flight orders - entering recovery before trading"
            );
            self.transition(EngineState::ErrorRecovery);
        } else {
            self.transition(EngineState::Monitoring);
        }
    }

    /// Watch the pair: exit or rebalance held positions, otherwise look for entries.
    async fn handle_monitoring(&mut self) {
        let (Some(spot), Some(futures)) = (
            self.manager.book_ticker(VenueRole::Spot),
            self.manager.book_ticker(VenueRole::Futures),
        ) else {
            return;
        };

        if self.context.positions.has_positions() {
            if self.should_exit_positions(&spot, &futures) {
                self.exit_all_positions(&spot, &futures).await;
                return;
            }

            let imbalance_pct = self.context.positions.imbalance_pct();
            if imbalance_pct > self.context.params.delta_tolerance_pct {
                warn!(
                    task_id = %self.context.task_id,
                    %imbalance_pct,
                    "delta imbalance beyond tolerance - rebalancing"
                );
                self.rebalance_delta(&spot, &futures).await;
                return;
            }
        }

        // Throttle analysis to bound CPU under dense tick streams
        let now = tokio::time::Instant::now();
        if self
            .last_analysis
            .is_some_and(|last| now.duration_since(last) < ANALYSIS_THROTTLE)
        {
            return;
        }
        self.last_analysis = Some(now);

        if let Some(found) = opportunity::identify(&self.context, &spot, &futures) {
            info!(
                task_id = %self.context.task_id,
                spread_pct = %found.spread_pct,
                direction = ?found.direction,
                "arbitrage opportunity found"
            );
            self.context.current_opportunity = Some(found);
            self.dirty = true;
            self.transition(EngineState::Analyzing);
        }
    }

    /// Re-validate the current opportunity immediately before committing capital.
    fn handle_analyzing(&mut self) {
        let Some(found) = self.context.current_opportunity.clone() else {
            self.transition(EngineState::Monitoring);
            return;
        };

        if !found.is_fresh(Utc::now()) {
            info!(task_id = %self.context.task_id, "opportunity stale - discarding");
            self.context.current_opportunity = None;
            self.dirty = true;
            self.transition(EngineState::Monitoring);
            return;
        }

        // Still profitable against the current books?
        let still_valid = match (
            self.manager.book_ticker(VenueRole::Spot),
            self.manager.book_ticker(VenueRole::Futures),
        ) {
            (Some(spot), Some(futures)) => {
                opportunity::identify(&self.context, &spot, &futures)
                    .is_some_and(|current| current.direction == found.direction)
            }
            _ => false,
        };

        if still_valid {
            self.transition(EngineState::Executing);
        } else {
            info!(task_id = %self.context.task_id, "opportunity no longer valid");
            self.context.current_opportunity = None;
            self.dirty = true;
            self.transition(EngineState::Monitoring);
        }
    }

    /// Dispatch both legs in parallel and account for the outcome.
    async fn handle_executing(&mut self) {
        let Some(found) = self.context.current_opportunity.clone() else {
            self.transition(EngineState::Monitoring);
            return;
        };

        let quantity = match self.executable_quantity(&found).await {
            quantity if quantity > Decimal::ZERO => quantity,
            _ => {
                warn!(task_id = %self.context.task_id, "no executable quantity available");
                self.context.current_opportunity = None;
                self.dirty = true;
                self.transition(EngineState::ErrorRecovery);
                return;
            }
        };

        let (spot_params, futures_params) = match found.direction {
            Direction::SpotToFutures => (
                OrderParams {
                    side: Side::Buy,
                    kind: OrderKind::Limit,
                    price: found.buy_price,
                    quantity,
                },
                OrderParams {
                    side: Side::Sell,
                    kind: OrderKind::Limit,
                    price: found.sell_price,
                    quantity,
                },
            ),
            Direction::FuturesToSpot => (
                OrderParams {
                    side: Side::Sell,
                    kind: OrderKind::Limit,
                    price: found.sell_price,
                    quantity,
                },
                OrderParams {
                    side: Side::Buy,
                    kind: OrderKind::Limit,
                    price: found.buy_price,
                    quantity,
                },
            ),
        };

        info!(
            task_id = %self.context.task_id,
            %quantity,
            buy_price = %found.buy_price,
            sell_price = %found.sell_price,
            "executing arbitrage pair"
        );
        let started = tokio::time::Instant::now();
        let outcome = self
            .manager
            .place_order_parallel(Some(spot_params), Some(futures_params))
            .await;
        debug!(
            task_id = %self.context.task_id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "pair placement completed"
        );

        self.context.order_operations += 2;

        match outcome {
            PlacementOutcome::Placed { spot, futures } => {
                if let Some(order) = spot {
                    self.context.active_orders.insert(VenueRole::Spot, order);
                }
                if let Some(order) = futures {
                    self.context.active_orders.insert(VenueRole::Futures, order);
                }

                self.context.position_open_time.get_or_insert_with(Utc::now);
                self.context.arbitrage_cycles += 1;
                self.context.total_volume_quote += quantity * found.buy_price;
                self.context.current_opportunity = None;
                self.dirty = true;
                self.transition(EngineState::Monitoring);
            }
            PlacementOutcome::Failed {
                errors,
                cancelled,
                already_filled,
            } => {
                for (role, error) in &errors {
                    error!(task_id = %self.context.task_id, %role, %error, "leg failed");
                }
                for (role, order) in &cancelled {
                    info!(
                        task_id = %self.context.task_id,
                        %role,
                        id = %order.id,
                        "surviving leg cancelled"
                    );
                }

                // Legs that filled before the cancel arrived leave naked exposure - flatten
                // with a market order in the opposite direction
                for (role, order) in already_filled {
                    warn!(
                        task_id = %self.context.task_id,
                        %role,
                        id = %order.id,
                        filled = %order.filled_quantity,
                        "leg filled before cancel - flattening"
                    );
                    self.flatten_leg(role, &order).await;
                }

                self.context.current_opportunity = None;
                self.dirty = true;
                self.transition(EngineState::ErrorRecovery);
            }
        }
    }

    /// Clear failed state, cancel outstanding orders, pause, and resume monitoring.
    async fn handle_error_recovery(&mut self) {
        info!(task_id = %self.context.task_id, "attempting error recovery");

        self.context.current_opportunity = None;
        self.dirty = true;

        self.manager.cancel_all_orders().await;

        tokio::time::sleep(RECOVERY_PAUSE).await;
        self.transition(EngineState::Monitoring);
    }

    // ---------- order and position accounting ----------

    /// Fetch venue-authoritative state for orders flagged during snapshot reconciliation.
    async fn revalidate_pending(&mut self) {
        let pending = std::mem::take(&mut self.pending_revalidation);
        for (role, id) in pending {
            let current = match role {
                VenueRole::Spot => {
                    self.manager
                        .spot
                        .private
                        .get_active_order(&self.manager.spot.symbol, &id)
                        .await
                }
                VenueRole::Futures => {
                    self.manager
                        .futures
                        .private
                        .get_active_order(&self.manager.futures.symbol, &id)
                        .await
                }
            };

            match current {
                Ok(current) => self.process_order_update(role, current),
                Err(error) => {
                    warn!(
                        task_id = %self.context.task_id,
                        %role,
                        %id,
                        %error,
                        "revalidation fetch failed - dropping order from tracking"
                    );
                    self.context.active_orders.remove(role, &id);
                    self.dirty = true;
                }
            }
        }
    }

    /// Account for an order update from a venue. Idempotent per (order id, filled
    /// quantity): fills are applied as deltas against the previously observed state, and a
    /// retired order is never processed twice even if its terminal update replays.
    pub fn process_order_update(&mut self, role: VenueRole, order: Order) {
        if order.is_done() && self.context.is_retired(&order.id) {
            return;
        }

        let previous_filled = self
            .context
            .active_orders
            .role(role)
            .get(&order.id)
            .map(|previous| previous.filled_quantity)
            .unwrap_or(Decimal::ZERO);

        let fill_delta = order.filled_quantity - previous_filled;
        if fill_delta > Decimal::ZERO {
            let realised = self
                .context
                .positions
                .position_mut(role)
                .apply_fill(order.side, fill_delta, order.price);
            self.context.total_profit_quote += realised;

            info!(
                task_id = %self.context.task_id,
                %role,
                id = %order.id,
                %fill_delta,
                price = %order.price,
                delta = %self.context.positions.delta(),
                "order fill processed"
            );
        }

        if order.is_done() {
            self.context.active_orders.remove(role, &order.id);
            self.context.note_retired(order.id);
        } else {
            self.context.active_orders.insert(role, order);
        }

        // A fully flat book closes the position epoch
        if !self.context.positions.has_positions() {
            self.context.position_open_time = None;
        }

        self.dirty = true;
    }

    /// Exit condition for the held pair - unwind cost below the threshold, or the optional
    /// position age limit exceeded.
    fn should_exit_positions(
        &self,
        spot: &basis_data::subscription::book::BookTicker,
        futures: &basis_data::subscription::book::BookTicker,
    ) -> bool {
        if let Some(age_limit_secs) = self.context.params.position_age_limit_secs {
            if let Some(open_time) = self.context.position_open_time {
                let age = Utc::now() - open_time;
                if age >= chrono::TimeDelta::seconds(age_limit_secs as i64) {
                    info!(
                        task_id = %self.context.task_id,
                        age_secs = age.num_seconds(),
                        "force exit - position age limit reached"
                    );
                    return true;
                }
            }
        }

        match opportunity::exit_cost_pct(&self.context.positions, spot, futures) {
            Some(exit_cost) if exit_cost < self.context.params.exit_threshold_pct => {
                info!(
                    task_id = %self.context.task_id,
                    %exit_cost,
                    threshold = %self.context.params.exit_threshold_pct,
                    "exit condition met"
                );
                true
            }
            _ => false,
        }
    }

    /// Close both legs at the current top of book.
    async fn exit_all_positions(
        &mut self,
        spot: &basis_data::subscription::book::BookTicker,
        futures: &basis_data::subscription::book::BookTicker,
    ) {
        let spot_position = self.context.positions.spot;
        let futures_position = self.context.positions.futures;

        let spot_params = (!spot_position.signed_quantity.is_zero()).then(|| {
            let side = if spot_position.signed_quantity > Decimal::ZERO {
                Side::Sell
            } else {
                Side::Buy
            };
            OrderParams {
                side,
                kind: OrderKind::Limit,
                price: match side {
                    Side::Sell => spot.bid.price,
                    Side::Buy => spot.ask.price,
                },
                quantity: spot_position.signed_quantity.abs(),
            }
        });

        let futures_params = (!futures_position.signed_quantity.is_zero()).then(|| {
            let side = if futures_position.signed_quantity > Decimal::ZERO {
                Side::Sell
            } else {
                Side::Buy
            };
            OrderParams {
                side,
                kind: OrderKind::Limit,
                price: match side {
                    Side::Sell => futures.bid.price,
                    Side::Buy => futures.ask.price,
                },
                quantity: futures_position.signed_quantity.abs(),
            }
        });

        if spot_params.is_none() && futures_params.is_none() {
            return;
        }

        info!(task_id = %self.context.task_id, "exiting positions");
        let legs = spot_params.is_some() as u64 + futures_params.is_some() as u64;
        let outcome = self
            .manager
            .place_order_parallel(spot_params, futures_params)
            .await;
        self.context.order_operations += legs;

        match outcome {
            PlacementOutcome::Placed { spot, futures } => {
                if let Some(order) = spot {
                    self.context.active_orders.insert(VenueRole::Spot, order);
                }
                if let Some(order) = futures {
                    self.context.active_orders.insert(VenueRole::Futures, order);
                }
                self.dirty = true;
            }
            PlacementOutcome::Failed { errors, .. } => {
                for (role, error) in errors {
                    error!(task_id = %self.context.task_id, %role, %error, "exit leg failed");
                }
                self.transition(EngineState::ErrorRecovery);
            }
        }
    }

    /// Issue a market order on the leg with excess exposure to restore delta neutrality,
    /// bounded by the available balance on that leg.
    async fn rebalance_delta(
        &mut self,
        spot: &basis_data::subscription::book::BookTicker,
        futures: &basis_data::subscription::book::BookTicker,
    ) {
        let delta = self.context.positions.delta();
        if delta.is_zero() {
            return;
        }

        // The leg with the larger absolute exposure carries the excess
        let excess_role = if self.context.positions.spot.signed_quantity.abs()
            >= self.context.positions.futures.signed_quantity.abs()
        {
            VenueRole::Spot
        } else {
            VenueRole::Futures
        };

        // Reduce the net exposure: sell when net long, buy when net short
        let side = if delta > Decimal::ZERO {
            Side::Sell
        } else {
            Side::Buy
        };
        let ticker = match excess_role {
            VenueRole::Spot => spot,
            VenueRole::Futures => futures,
        };
        let price = match side {
            Side::Sell => ticker.bid.price,
            Side::Buy => ticker.ask.price,
        };

        let mut quantity = delta.abs();

        // Bound the correction by the available balance on the spot leg
        if excess_role == VenueRole::Spot {
            let symbol = self.manager.spot.symbol.clone();
            let asset = match side {
                Side::Sell => {
                    basis_instrument::asset::AssetNameExchange::new(
                        symbol.base().name().to_uppercase(),
                    )
                }
                Side::Buy => basis_instrument::asset::AssetNameExchange::new(
                    symbol.quote().name().to_uppercase(),
                ),
            };
            if let Ok(balance) = self.manager.spot.private.get_asset_balance(&asset, false).await {
                let available = match side {
                    Side::Sell => balance.balance.free,
                    Side::Buy if price > Decimal::ZERO => balance.balance.free / price,
                    Side::Buy => Decimal::ZERO,
                };
                if available < quantity {
                    warn!(
                        task_id = %self.context.task_id,
                        %available,
                        wanted = %quantity,
                        "rebalance bounded by available balance"
                    );
                    quantity = available;
                }
            }
        }

        if quantity <= Decimal::ZERO {
            warn!(task_id = %self.context.task_id, "insufficient balance to rebalance");
            return;
        }

        info!(
            task_id = %self.context.task_id,
            %excess_role,
            %side,
            %quantity,
            "rebalancing delta with market order"
        );

        let params = OrderParams {
            side,
            kind: OrderKind::Market,
            price,
            quantity,
        };
        let outcome = match excess_role {
            VenueRole::Spot => self.manager.place_order_parallel(Some(params), None).await,
            VenueRole::Futures => self.manager.place_order_parallel(None, Some(params)).await,
        };
        self.context.order_operations += 1;

        match outcome {
            PlacementOutcome::Placed { spot, futures } => {
                if let Some(order) = spot {
                    self.context.active_orders.insert(VenueRole::Spot, order);
                }
                if let Some(order) = futures {
                    self.context.active_orders.insert(VenueRole::Futures, order);
                }
                self.dirty = true;
            }
            PlacementOutcome::Failed { errors, .. } => {
                for (role, error) in errors {
                    error!(task_id = %self.context.task_id, %role, %error, "rebalance failed");
                }
                self.transition(EngineState::ErrorRecovery);
            }
        }
    }

    /// Reverse a leg that filled when its pair could not be completed.
    async fn flatten_leg(&mut self, role: VenueRole, order: &Order) {
        if order.filled_quantity.is_zero() {
            return;
        }

        let Some(ticker) = self.manager.book_ticker(role) else {
            error!(
                task_id = %self.context.task_id,
                %role,
                "no market data to flatten leg - recovery will cancel and retry"
            );
            return;
        };

        let side = order.side.flip();
        let params = OrderParams {
            side,
            kind: OrderKind::Market,
            price: match side {
                Side::Sell => ticker.bid.price,
                Side::Buy => ticker.ask.price,
            },
            quantity: order.filled_quantity,
        };

        let outcome = match role {
            VenueRole::Spot => self.manager.place_order_parallel(Some(params), None).await,
            VenueRole::Futures => self.manager.place_order_parallel(None, Some(params)).await,
        };
        self.context.order_operations += 1;

        match outcome {
            PlacementOutcome::Placed { spot, futures } => {
                if let Some(flatten) = spot {
                    self.context.active_orders.insert(VenueRole::Spot, flatten);
                }
                if let Some(flatten) = futures {
                    self.context.active_orders.insert(VenueRole::Futures, flatten);
                }
                self.dirty = true;
            }
            PlacementOutcome::Failed { errors, .. } => {
                for (role, error) in errors {
                    error!(
                        task_id = %self.context.task_id,
                        %role,
                        %error,
                        "failed to flatten leg - naked exposure remains"
                    );
                }
            }
        }
    }

    /// Position size for an entry - the configured base size capped by the opportunity and
    /// the available balance on the buying leg.
    async fn executable_quantity(&self, found: &ArbitrageOpportunity) -> Decimal {
        let mut quantity = (self.context.base_position_size_quote / found.buy_price)
            .min(found.max_quantity);

        // Balance check applies to the spot leg - futures margin is venue-managed
        let symbol = self.manager.spot.symbol.clone();
        match found.direction {
            Direction::SpotToFutures => {
                let quote = basis_instrument::asset::AssetNameExchange::new(
                    symbol.quote().name().to_uppercase(),
                );
                if let Ok(balance) =
                    self.manager.spot.private.get_asset_balance(&quote, false).await
                {
                    // 1% headroom for taker fees
                    let required_per_unit = found.buy_price * Decimal::new(101, 2);
                    let affordable = if required_per_unit.is_zero() {
                        Decimal::ZERO
                    } else {
                        balance.balance.free / required_per_unit
                    };
                    quantity = quantity.min(affordable);
                }
            }
            Direction::FuturesToSpot => {
                let base = basis_instrument::asset::AssetNameExchange::new(
                    symbol.base().name().to_uppercase(),
                );
                if let Ok(balance) =
                    self.manager.spot.private.get_asset_balance(&base, false).await
                {
                    quantity = quantity.min(balance.balance.free);
                }
            }
        }

        quantity
    }

    // ---------- persistence ----------

    /// Snapshot on material change, with a heartbeat snapshot while idle.
    fn maybe_snapshot(&mut self) {
        let now = tokio::time::Instant::now();
        if !self.dirty && now.duration_since(self.last_snapshot) < SNAPSHOT_HEARTBEAT {
            return;
        }

        self.dirty = false;
        self.last_snapshot = now;

        // Persistence never blocks the tick path
        let snapshot = self.snapshots.create_snapshot(&self.context);
        let snapshots = Arc::clone(&self.snapshots);
        tokio::task::spawn_blocking(move || {
            if let Err(error) = snapshots.save(&snapshot) {
                // Snapshot write failure does not stop trading
                error!(%error, "failed to save context snapshot");
            }
        });
    }

    /// Synchronous snapshot, used during cleanup when spawning is no longer appropriate.
    fn snapshot_now(&mut self) {
        let snapshot = self.snapshots.create_snapshot(&self.context);
        if let Err(error) = self.snapshots.save(&snapshot) {
            error!(%error, "failed to save final context snapshot");
        }
        self.dirty = false;
    }
}
