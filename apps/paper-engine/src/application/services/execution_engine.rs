//! Execution Engine
//!
//! The single owner of orders, positions, strategy guards and the event queue.
//! Every mutation goes through one `&mut self` method, so the engine itself
//! needs no locking; [`EngineLoop`](super::EngineLoop) serializes callers.
//!
//! All operations take an explicit `now`. Ticks carry their own timestamp.
//! Pending orders are expired against that time before anything else happens,
//! so an order past its validity can never fill.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::application::dto::{
    AlertEvent, ClosedOrder, DataGap, EngineEvent, EngineSnapshot, HaltedKey,
    PortfolioSummary, ReconcileCommand, SNAPSHOT_VERSION, StateCorruption, Tick, TradeRequest,
};
use crate::application::ports::{
    FeeModel, InstrumentLookup, LotValidator, PricePolicy, StoreError,
};
use crate::domain::instrument::Instrument;
use crate::domain::order_execution::{
    CancelReason, CancelRejected, FillSimulator, LegFill, Order, OrderBook, OrderChanges,
    OrderError, OrderEvent, OrderFill, OrderLeg, OrderOrigin, OrderSide, OrderStatus, OrderType,
    PlaceOrderCommand, RejectReason, SlippageModel, StrategyShape, Validity,
};
use crate::domain::position::{
    ExitReason, ExitTriggered, FillOutcome, Position, PositionBook, PositionClosed, PositionEvent,
    PositionFill, PositionUpdated, TradeRecord,
};
use crate::domain::session::MarketSession;
use crate::domain::shared::{InstrumentToken, OrderId, PositionKey, Quantity, StrategyTag, Timestamp};
use crate::domain::stop_enforcement::{
    PositionDirection, PriceMonitor, SameTickPriority, StopTargetLevels, StrategyGuard,
    TriggerResult,
};
use crate::error::EngineError;
use crate::observability;

// ============================================================================
// Configuration
// ============================================================================

/// Engine behaviour settings.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Trading session.
    pub session: MarketSession,
    /// Reject DAY/IOC orders outside the session.
    pub enforce_market_hours: bool,
    /// Accept AMO orders while the market is closed.
    pub allow_amo: bool,
    /// Adverse slippage.
    pub slippage: SlippageModel,
    /// Which level wins when stop-loss and target trigger on one tick.
    pub same_tick_priority: SameTickPriority,
    /// Consecutive priceless ticks before a data gap alert.
    pub data_gap_alert_cycles: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            session: MarketSession::nse(),
            enforce_market_hours: true,
            allow_amo: true,
            slippage: SlippageModel::default(),
            same_tick_priority: SameTickPriority::default(),
            data_gap_alert_cycles: 5,
        }
    }
}

/// Collaborators behind the engine's driven ports.
#[derive(Clone)]
pub struct EnginePorts {
    /// Fee schedule.
    pub fees: Arc<dyn FeeModel>,
    /// Lot sizes.
    pub lots: Arc<dyn LotValidator>,
    /// Instrument registry.
    pub instruments: Arc<dyn InstrumentLookup>,
    /// Reference and mark price selection.
    pub prices: Arc<dyn PricePolicy>,
}

/// What one tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Tick was older than the last one for its instrument and was dropped.
    pub stale: bool,
    /// Pending orders filled.
    pub fills: usize,
    /// Stop-loss or target exits executed.
    pub exits: usize,
}

/// Result of an engine-generated exit.
struct ExitFill {
    order_id: OrderId,
    net_price: Decimal,
    trades: Vec<TradeRecord>,
}

// ============================================================================
// Engine
// ============================================================================

/// Paper-trading execution and position engine.
pub struct ExecutionEngine {
    settings: EngineSettings,
    ports: EnginePorts,
    monitor: PriceMonitor,
    orders: OrderBook,
    /// Terminal statuses of orders known only from a restored snapshot.
    closed: HashMap<OrderId, OrderStatus>,
    positions: PositionBook,
    guards: BTreeMap<String, StrategyGuard>,
    order_counter: u64,
    last_ticks: HashMap<InstrumentToken, Tick>,
    gap_cycles: HashMap<InstrumentToken, u32>,
    clock: Option<Timestamp>,
    events: Vec<EngineEvent>,
}

impl ExecutionEngine {
    /// Create an empty engine.
    #[must_use]
    pub fn new(settings: EngineSettings, ports: EnginePorts) -> Self {
        let monitor = PriceMonitor::new(settings.same_tick_priority);
        Self {
            settings,
            ports,
            monitor,
            orders: OrderBook::new(),
            closed: HashMap::new(),
            positions: PositionBook::new(),
            guards: BTreeMap::new(),
            order_counter: 0,
            last_ticks: HashMap::new(),
            gap_cycles: HashMap::new(),
            clock: None,
            events: Vec::new(),
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Engine settings.
    #[must_use]
    pub const fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Latest time the engine has seen.
    #[must_use]
    pub const fn clock(&self) -> Option<Timestamp> {
        self.clock
    }

    /// Look up any order the engine has seen.
    #[must_use]
    pub fn order(&self, id: &OrderId) -> Option<&Order> {
        self.orders.get(id)
    }

    /// Pending orders in placement order.
    pub fn pending_orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.pending_orders()
    }

    /// Look up an open position.
    #[must_use]
    pub fn position(&self, key: &PositionKey) -> Option<&Position> {
        self.positions.get(key)
    }

    /// Open positions in key order.
    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.positions()
    }

    /// Closed trade records.
    #[must_use]
    pub fn trades(&self) -> &[TradeRecord] {
        self.positions.trades()
    }

    /// Active net-level guards.
    pub fn guards(&self) -> impl Iterator<Item = &StrategyGuard> {
        self.guards.values()
    }

    /// Instruments that need ticks: legs of pending orders, open positions
    /// and legs of active strategy guards. Sorted, without duplicates.
    #[must_use]
    pub fn subscribed_instruments(&self) -> Vec<InstrumentToken> {
        let orders = self.orders.pending_orders().flat_map(|o| o.instruments());
        let positions = self.positions.positions().map(|p| &p.key().instrument);
        let guards = self
            .guards
            .values()
            .flat_map(|g| g.legs().iter().map(|leg| &leg.instrument));

        orders
            .chain(positions)
            .chain(guards)
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Whether a position key is halted.
    #[must_use]
    pub fn is_halted(&self, key: &PositionKey) -> bool {
        self.positions.is_halted(key)
    }

    /// Portfolio totals with order and trade counts.
    #[must_use]
    pub fn portfolio_summary(&self) -> PortfolioSummary {
        let totals = self.positions.totals(self.clock.unwrap_or_else(Timestamp::now));
        PortfolioSummary::from_totals(
            &totals,
            self.orders.pending_len(),
            self.positions.trades().len(),
            self.positions.halted().count(),
            self.clock,
        )
    }

    /// Take every event emitted since the last drain, in emission order.
    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Make an instrument resolvable.
    pub fn register_instrument(&mut self, instrument: Instrument) {
        let token = instrument.token().clone();
        if self.ports.instruments.register(instrument) {
            tracing::debug!(instrument = %token, "Instrument registered");
        }
    }

    /// Validate and place a trade request.
    ///
    /// A rejected request still gets an order id and an `ORDER_REJECTED`
    /// event. Nothing else changes.
    ///
    /// # Errors
    ///
    /// Returns `Validation` with the rejection reason.
    pub fn place(&mut self, request: &TradeRequest, now: Timestamp) -> Result<OrderId, EngineError> {
        self.advance_clock(now);
        let id = self.next_order_id();
        let command = request.to_command(id.clone());

        if let Err(reason) = self.validate(&command, now) {
            tracing::warn!(
                order_id = %id,
                strategy = %command.strategy_tag,
                code = %reason.code,
                reason = %reason.message,
                "Order rejected"
            );
            observability::record_order_rejected(&reason.code);
            self.store(Order::rejected(command, reason.clone(), now));
            return Err(EngineError::Validation {
                order_id: id,
                reason,
            });
        }

        let expires_at = self.expiry_for(command.validity, now);
        tracing::info!(
            order_id = %id,
            strategy = %command.strategy_tag,
            shape = %command.shape,
            side = %command.side,
            quantity = %command.quantity,
            limit = %command.limit_price,
            validity = %command.validity,
            "Order placed"
        );
        observability::record_order_placed(
            &command.shape.to_string(),
            &command.validity.to_string(),
        );
        self.store(Order::place(command, now, expires_at));
        Ok(id)
    }

    /// Cancel a pending order.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown ids, `RaceRejection` if the order already
    /// filled and `InvalidState` for other terminal orders.
    pub fn cancel(&mut self, order_id: &OrderId, now: Timestamp) -> Result<(), EngineError> {
        self.advance_clock(now);
        let Some(order) = self.orders.get_mut(order_id) else {
            return Err(self.refuse_unknown(order_id, "cancel", now));
        };

        let result = order.cancel(CancelReason::user_requested(), now);
        let events = order.drain_events();
        self.emit_order_events(events);

        match result {
            Ok(()) => {
                self.orders.release(order_id);
                observability::record_order_cancelled("USER_REQUESTED");
                tracing::info!(order_id = %order_id, "Order cancelled");
                Ok(())
            }
            Err(err) => Err(self.refuse(order_id, "cancel", err, now)),
        }
    }

    /// Amend a pending order.
    ///
    /// # Errors
    ///
    /// Same as [`cancel`](Self::cancel), plus `Validation` when the new
    /// quantity or levels are invalid. The order is unchanged on error.
    pub fn modify(
        &mut self,
        order_id: &OrderId,
        changes: OrderChanges,
        now: Timestamp,
    ) -> Result<(), EngineError> {
        self.advance_clock(now);
        let Some(order) = self.orders.get(order_id) else {
            return Err(self.refuse_unknown(order_id, "modify", now));
        };

        if let (true, Some(quantity)) = (order.is_pending(), changes.quantity) {
            let check = order
                .legs()
                .iter()
                .try_for_each(|leg| self.check_leg_lots(leg, quantity));
            if let Err(reason) = check {
                let err = OrderError::InvalidParameters {
                    field: reason.code.to_lowercase(),
                    message: reason.message,
                };
                return Err(self.refuse(order_id, "modify", err, now));
            }
        }

        let Some(order) = self.orders.get_mut(order_id) else {
            return Err(EngineError::NotFound {
                order_id: order_id.clone(),
            });
        };
        let result = order.modify(changes, now);
        let events = order.drain_events();
        self.emit_order_events(events);

        match result {
            Ok(()) => {
                tracing::info!(order_id = %order_id, "Order modified");
                Ok(())
            }
            Err(err) => Err(self.refuse(order_id, "modify", err, now)),
        }
    }

    /// Process one tick.
    ///
    /// Order of work: stale check, expiry, mark positions, evaluate pending
    /// orders on the instrument in placement order, stop/target checks, then
    /// one portfolio update.
    pub fn on_tick(&mut self, tick: Tick) -> TickReport {
        let instrument = tick.instrument_token.clone();
        let at = tick.timestamp;

        if self
            .last_ticks
            .get(&instrument)
            .is_some_and(|last| last.timestamp > at)
        {
            tracing::debug!(instrument = %instrument, timestamp = %at, "Discarding stale tick");
            observability::record_stale_tick();
            return TickReport {
                stale: true,
                ..TickReport::default()
            };
        }

        self.advance_clock(at);
        let mark = self.ports.prices.mark_price(&tick);
        self.last_ticks.insert(instrument.clone(), tick);
        self.track_gap(&instrument, mark.is_some(), at);

        if let Some(price) = mark {
            for key in self.positions.mark(&instrument, price, at) {
                self.emit_position_updated(&key, at);
            }
        }

        let report = TickReport {
            stale: false,
            fills: self.evaluate_pending(&instrument, at),
            exits: self.enforce_levels(&instrument, at),
        };
        self.publish_totals(at);
        report
    }

    /// Run one session-clock cycle.
    ///
    /// Expires what is due and cancels every IOC order placed before `now`
    /// that is still pending, ticked or not. Returns the number of orders
    /// retired.
    pub fn on_clock(&mut self, now: Timestamp) -> usize {
        let expired = self.advance_clock(now);
        expired + self.cancel_unfilled_ioc(now)
    }

    /// Close one position at its latest mark.
    ///
    /// # Errors
    ///
    /// Returns `PositionNotFound` if the key has no open position and
    /// `StateCorruption` if the key is halted.
    pub fn square_off(&mut self, key: &PositionKey, now: Timestamp) -> Result<OrderId, EngineError> {
        self.advance_clock(now);
        let exit = self.square_off_key(key, now)?;
        self.publish_totals(now);
        Ok(exit)
    }

    /// Close every non-halted position. Returns the exit order ids.
    pub fn square_off_all(&mut self, now: Timestamp) -> Vec<OrderId> {
        self.advance_clock(now);
        let keys: Vec<PositionKey> = self
            .positions
            .positions()
            .map(|p| p.key().clone())
            .filter(|k| !self.positions.is_halted(k))
            .collect();

        let mut exits = Vec::with_capacity(keys.len());
        for key in keys {
            match self.square_off_key(&key, now) {
                Ok(order_id) => exits.push(order_id),
                Err(e) => tracing::warn!(key = %key, error = %e, "Square-off skipped"),
            }
        }
        tracing::info!(closed = exits.len(), "Square-off all complete");
        self.publish_totals(now);
        exits
    }

    /// Overwrite a position with reconciled values and lift its halt.
    ///
    /// # Errors
    ///
    /// Returns `StateCorruption` if the values break the lot or price rules.
    /// The key is halted in that case.
    pub fn reconcile(
        &mut self,
        command: &ReconcileCommand,
        now: Timestamp,
    ) -> Result<Option<Position>, EngineError> {
        self.advance_clock(now);
        let key = command.key();
        let lot_size = self.lot_size_of(&key);

        let position = match self
            .positions
            .reconcile(&key, command.net_quantity, command.avg_price, lot_size, now)
        {
            Ok(position) => position,
            Err(e) => {
                let detail = e.to_string();
                self.positions.halt(key.clone(), detail.clone());
                self.raise_corruption(&key, &detail, now);
                return Err(EngineError::StateCorruption { key, detail });
            }
        };

        if position.is_some() {
            if let Some(mark) = self.mark_of(&key.instrument) {
                self.positions.mark(&key.instrument, mark, now);
            }
            self.emit_position_updated(&key, now);
        }
        self.sync_guards();
        tracing::info!(
            key = %key,
            net_quantity = command.net_quantity,
            avg_price = %command.avg_price,
            "Position reconciled"
        );
        self.publish_totals(now);
        Ok(self.positions.get(&key).cloned())
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Capture everything needed to resume.
    #[must_use]
    pub fn snapshot(&self, now: Timestamp) -> EngineSnapshot {
        EngineSnapshot {
            version: SNAPSHOT_VERSION,
            saved_at: now,
            pending_orders: self.orders.pending_orders().cloned().collect(),
            positions: self.positions.positions().cloned().collect(),
            trades: self.positions.trades().to_vec(),
            guards: self.guards.values().cloned().collect(),
            realized_pnl: self.positions.realized_pnl(),
            total_fees: self.positions.total_fees(),
            order_counter: self.order_counter,
            closed_orders: self.closed_orders(),
            halted: self
                .positions
                .halted()
                .map(|(key, detail)| HaltedKey {
                    key: key.clone(),
                    detail: detail.clone(),
                })
                .collect(),
        }
    }

    /// Replace all state with a snapshot.
    ///
    /// Restored positions are re-checked; breaches halt their key and emit an
    /// alert.
    ///
    /// # Errors
    ///
    /// Returns `Store(UnsupportedVersion)` for snapshots from another format.
    pub fn restore(&mut self, snapshot: EngineSnapshot) -> Result<(), EngineError> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(StoreError::UnsupportedVersion {
                found: snapshot.version,
                expected: SNAPSHOT_VERSION,
            }
            .into());
        }

        let mut orders = OrderBook::new();
        for order in snapshot.pending_orders {
            orders.insert(order);
        }
        self.orders = orders;
        self.closed = snapshot
            .closed_orders
            .into_iter()
            .map(|c| (c.order_id, c.status))
            .collect();
        self.positions = PositionBook::from_parts(
            snapshot.positions,
            snapshot.trades,
            snapshot.realized_pnl,
            snapshot.total_fees,
            snapshot
                .halted
                .into_iter()
                .map(|h| (h.key, h.detail))
                .collect(),
        );
        self.guards = snapshot
            .guards
            .into_iter()
            .map(|g| (g.identity(), g))
            .collect();
        self.order_counter = snapshot.order_counter;
        self.clock = Some(snapshot.saved_at);
        self.last_ticks.clear();
        self.gap_cycles.clear();

        for (key, detail) in self.positions.verify_all() {
            self.raise_corruption(&key, &detail, snapshot.saved_at);
        }

        tracing::info!(
            pending = self.orders.pending_len(),
            positions = self.positions.open_count(),
            trades = self.positions.trades().len(),
            saved_at = %snapshot.saved_at,
            "Engine state restored"
        );
        Ok(())
    }

    // ========================================================================
    // Validation
    // ========================================================================

    fn validate(&self, command: &PlaceOrderCommand, now: Timestamp) -> Result<(), RejectReason> {
        if command.quantity.is_zero() {
            return Err(RejectReason::invalid_quantity("quantity must be positive"));
        }

        let instruments: Vec<Option<Instrument>> = command
            .legs
            .iter()
            .map(|leg| self.ports.instruments.resolve(&leg.instrument))
            .collect();

        for (leg, instrument) in command.legs.iter().zip(&instruments) {
            if let Some(instrument) = instrument {
                if leg.ratio > 0 {
                    self.check_lots(instrument, leg, command.quantity)?;
                }
            }
        }

        for (leg, instrument) in command.legs.iter().zip(&instruments) {
            match instrument {
                None => return Err(RejectReason::unknown_instrument(leg.instrument.as_str())),
                Some(i) if !i.is_tradable() => {
                    return Err(RejectReason::not_tradable(leg.instrument.as_str()));
                }
                Some(_) => {}
            }
        }

        command.validate()?;

        for leg in &command.legs {
            let key = PositionKey::new(leg.instrument.clone(), command.strategy_tag.clone());
            if self.positions.is_halted(&key) {
                return Err(RejectReason::key_halted(&key.to_string()));
            }
        }

        if self.settings.enforce_market_hours && !self.settings.session.is_open(now) {
            let amo_allowed = self.settings.allow_amo;
            if !(amo_allowed && command.validity.allows_after_market()) {
                return Err(RejectReason::market_closed(amo_allowed));
            }
        }

        Ok(())
    }

    fn check_leg_lots(&self, leg: &OrderLeg, quantity: Quantity) -> Result<(), RejectReason> {
        let instrument = self
            .ports
            .instruments
            .resolve(&leg.instrument)
            .ok_or_else(|| RejectReason::unknown_instrument(leg.instrument.as_str()))?;
        self.check_lots(&instrument, leg, quantity)
    }

    fn check_lots(
        &self,
        instrument: &Instrument,
        leg: &OrderLeg,
        quantity: Quantity,
    ) -> Result<(), RejectReason> {
        let contracts = quantity
            .times(leg.ratio)
            .ok_or_else(|| RejectReason::invalid_quantity("leg quantity overflows"))?;
        self.ports.lots.validate(instrument, contracts)
    }

    fn expiry_for(&self, validity: Validity, now: Timestamp) -> Option<Timestamp> {
        let session = &self.settings.session;
        match validity {
            Validity::Day | Validity::Ioc => session.expiry_for(now),
            Validity::Amo if session.is_open(now) => session
                .next_open(now)
                .and_then(|open| session.next_close(open)),
            Validity::Amo => session.expiry_for(now),
        }
    }

    // ========================================================================
    // Tick Processing
    // ========================================================================

    fn evaluate_pending(&mut self, instrument: &InstrumentToken, at: Timestamp) -> usize {
        let mut fills = 0;

        for id in self.orders.pending_ids_for(instrument) {
            let Some(order) = self.orders.get(&id) else {
                continue;
            };
            if order.validity() == Validity::Amo && !self.settings.session.is_open(at) {
                continue;
            }

            let halted_key = order
                .instruments()
                .map(|t| PositionKey::new(t.clone(), order.strategy_tag().clone()))
                .find(|k| self.positions.is_halted(k));
            if let Some(key) = halted_key {
                let reason = CancelReason::new(
                    "KEY_HALTED",
                    format!("Position {key} is halted pending manual reconciliation"),
                );
                self.cancel_internal(&id, reason, at);
                continue;
            }

            let Some(references) = self.references(order) else {
                tracing::debug!(order_id = %id, "Missing reference price, order stays pending");
                continue;
            };
            let validity = order.validity();
            let quote = match FillSimulator::quote(order, &references, &self.settings.slippage) {
                Ok(quote) => quote,
                Err(e) => {
                    tracing::warn!(order_id = %id, error = %e, "Fill simulation failed");
                    continue;
                }
            };

            if quote.crosses_limit {
                match self.fill_order(&id, &quote.leg_prices, quote.net_price, at) {
                    Ok(_) => fills += 1,
                    Err(e) => tracing::warn!(order_id = %id, error = %e, "Fill failed"),
                }
                continue;
            }

            if let Some(order) = self.orders.get_mut(&id) {
                order.record_unfilled_evaluation();
            }
            if validity.is_immediate() {
                self.cancel_internal(&id, CancelReason::ioc_unfilled(), at);
            }
        }

        fills
    }

    fn enforce_levels(&mut self, instrument: &InstrumentToken, at: Timestamp) -> usize {
        let candidates: Vec<(PositionKey, PositionDirection, StopTargetLevels, Decimal)> = self
            .positions
            .positions_on(instrument)
            .filter(|p| !p.levels().is_empty() && !self.positions.is_halted(p.key()))
            .filter_map(|p| Some((p.key().clone(), p.direction()?, *p.levels(), p.mark_price()?)))
            .collect();

        let mut exits = 0;
        for (key, direction, levels, mark) in candidates {
            let trigger = self.monitor.check(direction, &levels, mark);
            if self.exit_position(&key, direction, trigger, at) {
                exits += 1;
            }
        }

        let watching: Vec<String> = self
            .guards
            .iter()
            .filter(|(_, g)| g.watches(instrument))
            .map(|(identity, _)| identity.clone())
            .collect();
        for identity in watching {
            if self.enforce_guard(&identity, at) {
                exits += 1;
            }
        }

        exits
    }

    fn exit_position(
        &mut self,
        key: &PositionKey,
        direction: PositionDirection,
        trigger: TriggerResult,
        at: Timestamp,
    ) -> bool {
        let (origin, level, price) = match trigger {
            TriggerResult::None => return false,
            TriggerResult::StopLoss { level, price } => (OrderOrigin::StopLoss, level, price),
            TriggerResult::Target { level, price } => (OrderOrigin::Target, level, price),
        };
        let Some(quantity) = self.positions.get(key).map(Position::open_quantity) else {
            return false;
        };

        let side = direction.exit_side();
        let legs = vec![OrderLeg::new(key.instrument.clone(), side, 1)];
        let exit = match self.execute_exit(
            key.strategy.clone(),
            StrategyShape::Single,
            side,
            quantity,
            legs,
            &[price],
            origin,
            at,
        ) {
            Ok(exit) => exit,
            Err(e) => {
                tracing::error!(key = %key, error = %e, "Exit order failed");
                return false;
            }
        };

        self.emit_trigger(
            origin,
            ExitTriggered {
                order_id: exit.order_id,
                strategy_tag: key.strategy.clone(),
                instruments: vec![key.instrument.clone()],
                level,
                trigger_price: price,
                exit_price: exit.net_price,
                quantity,
                net_pnl: exit.trades.iter().map(|t| t.net_pnl).sum(),
                occurred_at: at,
            },
        );
        true
    }

    fn enforce_guard(&mut self, identity: &str, at: Timestamp) -> bool {
        let Some(guard) = self.guards.get(identity) else {
            return false;
        };
        let Some(marks) = guard
            .legs()
            .iter()
            .map(|l| self.mark_of(&l.instrument))
            .collect::<Option<Vec<Decimal>>>()
        else {
            return false;
        };
        let Some(net) = guard.net_mark(|t| self.mark_of(t)) else {
            return false;
        };

        let (origin, level) = match self.monitor.check(guard.direction(), guard.levels(), net) {
            TriggerResult::None => return false,
            TriggerResult::StopLoss { level, .. } => (OrderOrigin::StopLoss, level),
            TriggerResult::Target { level, .. } => (OrderOrigin::Target, level),
        };
        if guard.position_keys().any(|k| self.positions.is_halted(&k)) {
            tracing::warn!(guard = %identity, "Guard triggered on a halted leg, exit skipped");
            return false;
        }

        let guard = guard.clone();
        let exit = match self.execute_exit(
            guard.strategy().clone(),
            guard.shape(),
            guard.side().opposite(),
            guard.quantity(),
            guard.exit_legs(),
            &marks,
            origin,
            at,
        ) {
            Ok(exit) => exit,
            Err(e) => {
                tracing::error!(guard = %identity, error = %e, "Strategy exit failed");
                return false;
            }
        };
        self.guards.remove(identity);

        self.emit_trigger(
            origin,
            ExitTriggered {
                order_id: exit.order_id,
                strategy_tag: guard.strategy().clone(),
                instruments: guard.legs().iter().map(|l| l.instrument.clone()).collect(),
                level,
                trigger_price: net,
                exit_price: exit.net_price,
                quantity: guard.quantity(),
                net_pnl: exit.trades.iter().map(|t| t.net_pnl).sum(),
                occurred_at: at,
            },
        );
        true
    }

    fn track_gap(&mut self, instrument: &InstrumentToken, has_price: bool, at: Timestamp) {
        if has_price {
            self.gap_cycles.remove(instrument);
            return;
        }

        let cycles = self.gap_cycles.entry(instrument.clone()).or_default();
        *cycles = cycles.saturating_add(1);
        let cycles = *cycles;

        let gap = EngineError::DataGap {
            instrument: instrument.clone(),
            cycles,
        };
        tracing::debug!(error = %gap, "Tick without usable price");

        if cycles == self.settings.data_gap_alert_cycles {
            tracing::warn!(instrument = %instrument, cycles, "Sustained data gap");
            observability::record_data_gap(instrument.as_str());
            self.emit(AlertEvent::DataGap(DataGap {
                instrument: instrument.clone(),
                cycles,
                occurred_at: at,
            }));
        }
    }

    // ========================================================================
    // Fills
    // ========================================================================

    /// Fill a pending order and book every leg.
    fn fill_order(
        &mut self,
        id: &OrderId,
        leg_prices: &[Decimal],
        net_price: Decimal,
        at: Timestamp,
    ) -> Result<Vec<TradeRecord>, EngineError> {
        let Some(order) = self.orders.get(id) else {
            return Err(EngineError::NotFound {
                order_id: id.clone(),
            });
        };

        let quantity = order.quantity();
        let legs: Vec<LegFill> = order
            .legs()
            .iter()
            .zip(leg_prices)
            .map(|(leg, price)| {
                let contracts = leg.quantity(quantity);
                LegFill {
                    instrument: leg.instrument.clone(),
                    side: leg.side,
                    quantity: contracts,
                    price: *price,
                    fees: self.ports.fees.fees(leg.side, contracts, *price).total,
                }
            })
            .collect();

        let Some(order) = self.orders.get_mut(id) else {
            return Err(EngineError::NotFound {
                order_id: id.clone(),
            });
        };
        if let Err(e) = order.fill(OrderFill {
            legs: legs.clone(),
            net_price,
            at,
        }) {
            tracing::warn!(order_id = %id, error = %e, "Order could not be filled");
            return Err(EngineError::InvalidState {
                order_id: id.clone(),
                status: order.status(),
            });
        }
        let events = order.drain_events();
        let order = order.clone();
        self.orders.release(id);
        self.emit_order_events(events);

        tracing::info!(
            order_id = %id,
            origin = %order.origin(),
            net_price = %net_price,
            fees = %order.fees(),
            "Order filled"
        );
        observability::record_order_filled(&order.origin().to_string());

        let levels = if order.shape().is_multi_leg() {
            StopTargetLevels::none()
        } else {
            StopTargetLevels::new(order.stop_loss(), order.target())
        };
        let exit_reason = ExitReason::from(order.origin());

        let mut trades = Vec::new();
        for leg in legs {
            let key = PositionKey::new(leg.instrument, order.strategy_tag().clone());
            let fill = PositionFill {
                order_id: id.clone(),
                key: key.clone(),
                side: leg.side,
                quantity: leg.quantity,
                price: leg.price,
                fees: leg.fees,
                levels,
                exit_reason,
                lot_size: self.lot_size_of(&key),
                at,
            };
            match self.positions.apply_fill(fill) {
                Ok(outcome) => {
                    if let Some(mark) = self.mark_of(&key.instrument) {
                        self.positions.mark(&key.instrument, mark, at);
                    }
                    if let Some(trade) = self.record_outcome(&key, outcome, at) {
                        trades.push(trade);
                    }
                }
                Err(e) => tracing::error!(order_id = %id, key = %key, error = %e, "Fill not booked"),
            }
        }

        if order.origin() == OrderOrigin::Request && order.shape().is_multi_leg() {
            self.track_guard(&order);
        }
        self.sync_guards();
        Ok(trades)
    }

    /// Create and immediately fill an engine-generated exit at the given marks.
    #[allow(clippy::too_many_arguments)]
    fn execute_exit(
        &mut self,
        strategy: StrategyTag,
        shape: StrategyShape,
        side: OrderSide,
        quantity: Quantity,
        legs: Vec<OrderLeg>,
        marks: &[Decimal],
        origin: OrderOrigin,
        at: Timestamp,
    ) -> Result<ExitFill, EngineError> {
        let limit_price = legs
            .iter()
            .zip(marks)
            .map(|(leg, mark)| StrategyShape::leg_contribution(side, leg.side, leg.ratio, *mark))
            .sum();
        let order_id = self.next_order_id();
        let order = Order::place(
            PlaceOrderCommand {
                id: order_id.clone(),
                strategy_tag: strategy,
                shape,
                side,
                order_type: OrderType::Limit,
                quantity,
                limit_price,
                validity: Validity::Ioc,
                stop_loss: None,
                target: None,
                legs,
                origin,
            },
            at,
            None,
        );

        let quote = FillSimulator::price_legs(&order, marks, &self.settings.slippage).map_err(
            |e| {
                tracing::error!(order_id = %order_id, error = %e, "Exit pricing failed");
                EngineError::InvalidState {
                    order_id: order_id.clone(),
                    status: OrderStatus::Pending,
                }
            },
        )?;
        self.store(order);

        let trades = self.fill_order(&order_id, &quote.leg_prices, quote.net_price, at)?;
        Ok(ExitFill {
            order_id,
            net_price: quote.net_price,
            trades,
        })
    }

    fn square_off_key(&mut self, key: &PositionKey, now: Timestamp) -> Result<OrderId, EngineError> {
        if let Some((_, detail)) = self.positions.halted().find(|(k, _)| *k == key) {
            return Err(EngineError::StateCorruption {
                key: key.clone(),
                detail: detail.clone(),
            });
        }
        let Some((direction, quantity, reference)) = self.positions.get(key).and_then(|p| {
            Some((p.direction()?, p.open_quantity(), p.exit_reference()))
        }) else {
            return Err(EngineError::PositionNotFound { key: key.clone() });
        };

        let side = direction.exit_side();
        let exit = self.execute_exit(
            key.strategy.clone(),
            StrategyShape::Single,
            side,
            quantity,
            vec![OrderLeg::new(key.instrument.clone(), side, 1)],
            &[reference],
            OrderOrigin::SquareOff,
            now,
        )?;
        tracing::info!(
            key = %key,
            order_id = %exit.order_id,
            exit_price = %exit.net_price,
            "Position squared off"
        );
        Ok(exit.order_id)
    }

    fn record_outcome(
        &mut self,
        key: &PositionKey,
        outcome: FillOutcome,
        at: Timestamp,
    ) -> Option<TradeRecord> {
        if outcome.position.is_some() {
            self.emit_position_updated(key, at);
        }
        if let (true, Some(trade)) = (outcome.closed(), &outcome.trade) {
            tracing::info!(
                key = %key,
                net_pnl = %trade.net_pnl,
                exit_reason = %trade.exit_reason,
                "Position closed"
            );
            self.emit(PositionEvent::Closed(PositionClosed {
                key: key.clone(),
                trade: trade.clone(),
                occurred_at: at,
            }));
        }
        if let Some(detail) = &outcome.corruption {
            self.raise_corruption(key, detail, at);
        }
        outcome.trade
    }

    // ========================================================================
    // Strategy Guards
    // ========================================================================

    fn track_guard(&mut self, order: &Order) {
        let levels = StopTargetLevels::new(order.stop_loss(), order.target());
        let existing = self.guards.iter_mut().find(|(_, g)| {
            g.strategy() == order.strategy_tag()
                && order.instruments().all(|t| g.watches(t))
        });

        if let Some((identity, guard)) = existing {
            if !guard.absorb(order.side(), order.quantity(), levels) {
                let identity = identity.clone();
                self.guards.remove(&identity);
                tracing::info!(guard = %identity, "Strategy guard closed by opposite order");
            }
            return;
        }

        if let Some(guard) = StrategyGuard::from_order(order) {
            tracing::info!(
                guard = %guard.identity(),
                stop_loss = ?guard.levels().stop_loss,
                target = ?guard.levels().target,
                "Strategy guard armed"
            );
            self.guards.insert(guard.identity(), guard);
        }
    }

    /// Clamp guard quantities to what the leg positions still hold.
    fn sync_guards(&mut self) {
        let positions = &self.positions;
        self.guards.retain(|identity, guard| {
            let open = guard
                .legs()
                .iter()
                .map(|leg| {
                    let key = PositionKey::new(leg.instrument.clone(), guard.strategy().clone());
                    positions
                        .get(&key)
                        .filter(|p| p.direction() == Some(PositionDirection::from(leg.side)))
                        .map_or(0, |p| p.open_quantity().units() / leg.ratio.max(1))
                })
                .min()
                .unwrap_or(0);
            guard.clamp_quantity(Quantity::new(open));
            if guard.quantity().is_zero() {
                tracing::info!(guard = %identity, "Strategy guard released");
                false
            } else {
                true
            }
        });
    }

    // ========================================================================
    // Private Helpers
    // ========================================================================

    fn next_order_id(&mut self) -> OrderId {
        self.order_counter += 1;
        OrderId::sequential(self.order_counter)
    }

    /// Move the clock forward and expire what is due. Returns the expiry count.
    fn advance_clock(&mut self, now: Timestamp) -> usize {
        let now = self.clock.map_or(now, |clock| clock.max(now));
        self.clock = Some(now);
        self.expire_due(now)
    }

    fn expire_due(&mut self, now: Timestamp) -> usize {
        let due: Vec<(OrderId, bool)> = self
            .orders
            .pending_orders()
            .filter(|o| o.is_expired_at(now))
            .map(|o| (o.id().clone(), o.validity().is_immediate()))
            .collect();

        let mut expired = 0;
        for (id, immediate) in due {
            // IOC orders end cancelled, never expired.
            if immediate {
                if self.cancel_internal(&id, CancelReason::ioc_unfilled(), now) {
                    expired += 1;
                }
                continue;
            }
            let Some(order) = self.orders.get_mut(&id) else {
                continue;
            };
            if let Err(e) = order.expire(now) {
                tracing::warn!(order_id = %id, error = %e, "Expiry failed");
                continue;
            }
            let events = order.drain_events();
            self.orders.release(&id);
            self.emit_order_events(events);
            observability::record_order_expired();
            tracing::info!(order_id = %id, "Order expired");
            expired += 1;
        }
        expired
    }

    fn cancel_unfilled_ioc(&mut self, now: Timestamp) -> usize {
        let due: Vec<OrderId> = self
            .orders
            .pending_orders()
            .filter(|o| o.validity().is_immediate() && o.created_at() < now)
            .map(|o| o.id().clone())
            .collect();

        let mut cancelled = 0;
        for id in due {
            if self.cancel_internal(&id, CancelReason::ioc_unfilled(), now) {
                cancelled += 1;
            }
        }
        cancelled
    }

    /// Cancel a pending order on the engine's behalf. Returns false if the
    /// order was not pending.
    fn cancel_internal(&mut self, id: &OrderId, reason: CancelReason, at: Timestamp) -> bool {
        let Some(order) = self.orders.get_mut(id) else {
            return false;
        };
        let code = reason.code.clone();
        if let Err(e) = order.cancel(reason, at) {
            tracing::warn!(order_id = %id, error = %e, "Internal cancel failed");
            return false;
        }
        let events = order.drain_events();
        self.orders.release(id);
        self.emit_order_events(events);
        observability::record_order_cancelled(&code);
        tracing::info!(order_id = %id, code = %code, "Order cancelled by engine");
        true
    }

    /// Refuse a cancel/modify for an id not in the book. Orders closed before
    /// a restore still get `RaceRejection` or `InvalidState`.
    fn refuse_unknown(
        &mut self,
        order_id: &OrderId,
        action: &'static str,
        now: Timestamp,
    ) -> EngineError {
        let err = match self.closed.get(order_id).copied() {
            Some(OrderStatus::Filled) => OrderError::AlreadyFilled {
                order_id: order_id.to_string(),
            },
            Some(status) => OrderError::NotPending {
                order_id: order_id.to_string(),
                status,
            },
            None => {
                return EngineError::NotFound {
                    order_id: order_id.clone(),
                };
            }
        };
        self.refuse(order_id, action, err, now)
    }

    fn closed_orders(&self) -> Vec<ClosedOrder> {
        let mut closed: Vec<ClosedOrder> = self
            .orders
            .closed_orders()
            .map(|o| ClosedOrder {
                order_id: o.id().clone(),
                status: o.status(),
            })
            .chain(self.closed.iter().map(|(id, status)| ClosedOrder {
                order_id: id.clone(),
                status: *status,
            }))
            .collect();
        closed.sort_by(|a, b| a.order_id.cmp(&b.order_id));
        closed
    }

    /// Turn a refused cancel/modify into an error and a `CANCEL_REJECTED` event.
    fn refuse(
        &mut self,
        order_id: &OrderId,
        action: &'static str,
        err: OrderError,
        now: Timestamp,
    ) -> EngineError {
        let error = match err {
            OrderError::AlreadyFilled { .. } => EngineError::RaceRejection {
                order_id: order_id.clone(),
                action,
            },
            OrderError::NotPending { status, .. }
            | OrderError::InvalidStateTransition { from: status, .. } => {
                EngineError::InvalidState {
                    order_id: order_id.clone(),
                    status,
                }
            }
            OrderError::InvalidParameters { field, message } => EngineError::Validation {
                order_id: order_id.clone(),
                reason: RejectReason::new(field.to_uppercase(), message),
            },
            OrderError::NotFound { .. } => EngineError::NotFound {
                order_id: order_id.clone(),
            },
        };

        let too_late = matches!(error, EngineError::RaceRejection { .. });
        tracing::warn!(order_id = %order_id, action, error = %error, "Request refused");
        observability::record_cancel_rejected(too_late);
        self.emit(OrderEvent::CancelRejected(CancelRejected {
            order_id: order_id.clone(),
            too_late,
            message: error.to_string(),
            occurred_at: now,
        }));
        error
    }

    fn references(&self, order: &Order) -> Option<Vec<Decimal>> {
        order
            .legs()
            .iter()
            .map(|leg| {
                self.last_ticks
                    .get(&leg.instrument)
                    .and_then(|tick| self.ports.prices.reference_price(tick, leg.side))
            })
            .collect()
    }

    fn mark_of(&self, instrument: &InstrumentToken) -> Option<Decimal> {
        self.last_ticks
            .get(instrument)
            .and_then(|tick| self.ports.prices.mark_price(tick))
    }

    fn lot_size_of(&self, key: &PositionKey) -> u32 {
        self.ports
            .instruments
            .resolve(&key.instrument)
            .map(|i| self.ports.lots.lot_size_for(&i))
            .or_else(|| self.positions.get(key).map(Position::lot_size))
            .unwrap_or(1)
    }

    fn store(&mut self, mut order: Order) {
        let events = order.drain_events();
        self.orders.insert(order);
        self.emit_order_events(events);
    }

    fn raise_corruption(&mut self, key: &PositionKey, detail: &str, at: Timestamp) {
        let error = EngineError::StateCorruption {
            key: key.clone(),
            detail: detail.to_string(),
        };
        tracing::error!(error = %error, "Position halted");
        observability::record_state_corruption();
        self.emit(AlertEvent::StateCorruption(StateCorruption {
            key: key.clone(),
            detail: detail.to_string(),
            occurred_at: at,
        }));
    }

    fn emit_trigger(&mut self, origin: OrderOrigin, exit: ExitTriggered) {
        tracing::info!(
            order_id = %exit.order_id,
            strategy = %exit.strategy_tag,
            origin = %origin,
            level = %exit.level,
            trigger_price = %exit.trigger_price,
            exit_price = %exit.exit_price,
            net_pnl = %exit.net_pnl,
            "Exit triggered"
        );
        let event = if origin == OrderOrigin::Target {
            observability::record_exit_trigger("target");
            PositionEvent::TargetTriggered(exit)
        } else {
            observability::record_exit_trigger("stop_loss");
            PositionEvent::SlTriggered(exit)
        };
        self.emit(event);
    }

    fn emit_position_updated(&mut self, key: &PositionKey, at: Timestamp) {
        let Some(position) = self.positions.get(key) else {
            return;
        };
        let event = PositionEvent::Updated(PositionUpdated {
            key: key.clone(),
            net_quantity: position.net_quantity(),
            avg_price: position.avg_price(),
            mark_price: position.mark_price(),
            unrealized_pnl: position.unrealized_pnl(),
            realized_pnl: position.realized_pnl(),
            stop_loss: position.levels().stop_loss,
            target: position.levels().target,
            occurred_at: at,
        });
        self.emit(event);
    }

    fn publish_totals(&mut self, at: Timestamp) {
        let totals = self.positions.totals(at);
        observability::update_portfolio(
            totals.open_positions,
            self.orders.pending_len(),
            totals.total_pnl.amount().to_f64().unwrap_or_default(),
        );
        self.emit(PositionEvent::PortfolioPnlUpdated(totals));
    }

    fn emit(&mut self, event: impl Into<EngineEvent>) {
        self.events.push(event.into());
    }

    fn emit_order_events(&mut self, events: Vec<OrderEvent>) {
        self.events.extend(events.into_iter().map(EngineEvent::from));
    }
}
