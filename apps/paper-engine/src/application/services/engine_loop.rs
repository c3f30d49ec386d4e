//! Engine Event Loop
//!
//! Runs the [`ExecutionEngine`] on one task. Every producer (ticks, trade
//! requests, cancels, the session clock) goes through the same command
//! channel, so the engine sees one totally ordered stream of mutations.
//!
//! Events are fanned out on a broadcast channel. Snapshots are handed to a
//! writer task through a watch channel, so a slow store never blocks the loop
//! and only the latest state is written. With a snapshot interval, state
//! changes only mark the engine dirty and one snapshot is taken per period.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::execution_engine::{ExecutionEngine, TickReport};
use crate::application::dto::{
    EngineEvent, EngineInput, EngineSnapshot, PortfolioSummary, ReconcileCommand, Tick,
    TradeRequest,
};
use crate::application::ports::{EventPublisherPort, StateStore};
use crate::domain::instrument::Instrument;
use crate::domain::order_execution::{Order, OrderChanges};
use crate::domain::position::{Position, TradeRecord};
use crate::domain::shared::{InstrumentToken, OrderId, PositionKey, Timestamp};
use crate::error::EngineError;

/// Event loop configuration.
#[derive(Debug, Clone)]
pub struct EngineLoopConfig {
    /// Command channel capacity.
    pub command_buffer: usize,
    /// Broadcast capacity per subscriber.
    pub event_buffer: usize,
    /// Wall-clock expiry check period. `None` leaves the clock to `Clock` inputs.
    pub clock_interval: Option<Duration>,
    /// Minimum period between snapshots. `None` snapshots every state change.
    pub snapshot_interval: Option<Duration>,
}

impl Default for EngineLoopConfig {
    fn default() -> Self {
        Self {
            command_buffer: 1024,
            event_buffer: 1024,
            clock_interval: Some(Duration::from_secs(60)),
            snapshot_interval: Some(Duration::from_secs(1)),
        }
    }
}

/// Event loop errors.
#[derive(Debug, Error)]
pub enum EngineLoopError {
    /// Restoring the persisted snapshot failed.
    #[error("Failed to restore engine state: {0}")]
    Restore(#[from] EngineError),

    /// The loop task panicked or was aborted.
    #[error("Engine loop task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

type Reply<T> = oneshot::Sender<T>;

enum Command {
    Place(TradeRequest, Timestamp, Reply<Result<OrderId, EngineError>>),
    Cancel(OrderId, Timestamp, Reply<Result<(), EngineError>>),
    Modify(OrderId, OrderChanges, Timestamp, Reply<Result<(), EngineError>>),
    Tick(Tick, Reply<TickReport>),
    Clock(Timestamp, Reply<usize>),
    SquareOff(PositionKey, Timestamp, Reply<Result<OrderId, EngineError>>),
    SquareOffAll(Timestamp, Reply<Vec<OrderId>>),
    Reconcile(
        ReconcileCommand,
        Timestamp,
        Reply<Result<Option<Position>, EngineError>>,
    ),
    RegisterInstrument(Instrument, Reply<()>),
    Summary(Reply<PortfolioSummary>),
    Snapshot(Reply<EngineSnapshot>),
    Order(OrderId, Reply<Option<Order>>),
    Positions(Reply<Vec<Position>>),
    Trades(Reply<Vec<TradeRecord>>),
    Subscriptions(Reply<Vec<InstrumentToken>>),
}

impl Command {
    /// Queries leave engine state untouched and skip the snapshot write.
    const fn mutates(&self) -> bool {
        !matches!(
            self,
            Self::Summary(_)
                | Self::Snapshot(_)
                | Self::Order(..)
                | Self::Positions(_)
                | Self::Trades(_)
                | Self::Subscriptions(_)
        )
    }
}

// ============================================================================
// Event Loop
// ============================================================================

/// Owns the engine and its collaborators until [`spawn`](Self::spawn).
pub struct EngineLoop {
    engine: ExecutionEngine,
    config: EngineLoopConfig,
    store: Option<Arc<dyn StateStore>>,
    publisher: Option<Arc<dyn EventPublisherPort>>,
    shutdown: CancellationToken,
}

impl EngineLoop {
    /// Create a loop around an engine.
    #[must_use]
    pub fn new(engine: ExecutionEngine, config: EngineLoopConfig, shutdown: CancellationToken) -> Self {
        Self {
            engine,
            config,
            store: None,
            publisher: None,
            shutdown,
        }
    }

    /// Persist snapshots on the configured cadence and on shutdown.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn StateStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Relay every event to a publisher.
    #[must_use]
    pub fn with_publisher(mut self, publisher: Arc<dyn EventPublisherPort>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    /// Load the latest snapshot from the store, if any.
    ///
    /// Returns true if state was restored.
    ///
    /// # Errors
    ///
    /// Returns error if the snapshot cannot be read or has another version.
    pub async fn restore(&mut self) -> Result<bool, EngineLoopError> {
        let Some(store) = &self.store else {
            return Ok(false);
        };
        let Some(snapshot) = store.load().await.map_err(EngineError::from)? else {
            tracing::info!("No persisted state, starting fresh");
            return Ok(false);
        };
        self.engine.restore(snapshot)?;
        Ok(true)
    }

    /// Start the loop and its helper tasks.
    ///
    /// The returned task completes after shutdown, once the final snapshot
    /// has been written and every event relayed.
    #[must_use]
    pub fn spawn(self) -> (EngineHandle, JoinHandle<()>) {
        let (command_tx, command_rx) = mpsc::channel(self.config.command_buffer.max(1));
        let (event_tx, _) = broadcast::channel(self.config.event_buffer.max(1));

        let handle = EngineHandle {
            commands: command_tx,
            events: event_tx.clone(),
        };

        let relay_stop = CancellationToken::new();
        let relay = self
            .publisher
            .clone()
            .map(|publisher| spawn_relay(publisher, event_tx.subscribe(), relay_stop.clone()));

        let (snapshot_tx, snapshot_rx) = watch::channel(None);
        let writer = self
            .store
            .clone()
            .map(|store| spawn_snapshot_writer(store, snapshot_rx));

        let task = tokio::spawn(async move {
            let persist = writer.is_some();
            self.run(command_rx, &event_tx, &snapshot_tx, persist).await;

            drop(snapshot_tx);
            if let Some(writer) = writer {
                if let Err(e) = writer.await {
                    tracing::error!(error = %e, "Snapshot writer failed");
                }
            }
            relay_stop.cancel();
            if let Some(relay) = relay {
                if let Err(e) = relay.await {
                    tracing::error!(error = %e, "Event relay failed");
                }
            }
            tracing::info!("Engine loop stopped");
        });

        (handle, task)
    }

    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        events: &broadcast::Sender<EngineEvent>,
        snapshots: &watch::Sender<Option<EngineSnapshot>>,
        persist: bool,
    ) {
        let mut clock = self.config.clock_interval.map(tokio::time::interval);
        let mut snapshot_timer = self.config.snapshot_interval.map(delayed_interval);
        let deferred = snapshot_timer.is_some();
        let mut dirty = false;
        let shutdown = self.shutdown.clone();
        tracing::info!(
            clock_interval = ?self.config.clock_interval,
            snapshot_interval = ?self.config.snapshot_interval,
            persist,
            "Engine loop started"
        );
        // Alerts raised while restoring.
        self.flush(events);

        loop {
            tokio::select! {
                command = commands.recv() => {
                    let Some(command) = command else {
                        tracing::info!("All engine handles dropped");
                        break;
                    };
                    let mutates = command.mutates();
                    self.handle(command);
                    self.flush(events);
                    if persist && mutates {
                        dirty = self.mark_dirty(snapshots, deferred);
                    }
                }
                () = next_tick(&mut clock) => {
                    let retired = self.engine.on_clock(Timestamp::now());
                    if retired > 0 {
                        tracing::info!(retired, "Session clock retired orders");
                        self.flush(events);
                        if persist {
                            dirty = self.mark_dirty(snapshots, deferred);
                        }
                    }
                }
                () = next_tick(&mut snapshot_timer), if dirty => {
                    self.publish_snapshot(snapshots);
                    dirty = false;
                }
                () = shutdown.cancelled() => {
                    tracing::info!("Engine loop shutting down");
                    break;
                }
            }
        }

        self.flush(events);
        if persist {
            self.publish_snapshot(snapshots);
        }
    }

    fn handle(&mut self, command: Command) {
        let engine = &mut self.engine;
        // A dropped reply receiver means the caller stopped waiting.
        match command {
            Command::Place(request, now, reply) => {
                let _ = reply.send(engine.place(&request, now));
            }
            Command::Cancel(id, now, reply) => {
                let _ = reply.send(engine.cancel(&id, now));
            }
            Command::Modify(id, changes, now, reply) => {
                let _ = reply.send(engine.modify(&id, changes, now));
            }
            Command::Tick(tick, reply) => {
                let _ = reply.send(engine.on_tick(tick));
            }
            Command::Clock(now, reply) => {
                let _ = reply.send(engine.on_clock(now));
            }
            Command::SquareOff(key, now, reply) => {
                let _ = reply.send(engine.square_off(&key, now));
            }
            Command::SquareOffAll(now, reply) => {
                let _ = reply.send(engine.square_off_all(now));
            }
            Command::Reconcile(command, now, reply) => {
                let _ = reply.send(engine.reconcile(&command, now));
            }
            Command::RegisterInstrument(instrument, reply) => {
                engine.register_instrument(instrument);
                let _ = reply.send(());
            }
            Command::Summary(reply) => {
                let _ = reply.send(engine.portfolio_summary());
            }
            Command::Snapshot(reply) => {
                let now = engine.clock().unwrap_or_else(Timestamp::now);
                let _ = reply.send(engine.snapshot(now));
            }
            Command::Order(id, reply) => {
                let _ = reply.send(engine.order(&id).cloned());
            }
            Command::Positions(reply) => {
                let _ = reply.send(engine.positions().cloned().collect());
            }
            Command::Trades(reply) => {
                let _ = reply.send(engine.trades().to_vec());
            }
            Command::Subscriptions(reply) => {
                let _ = reply.send(engine.subscribed_instruments());
            }
        }
    }

    /// Snapshot now when there is no cadence, otherwise defer to the timer.
    /// Returns whether a snapshot is still owed.
    fn mark_dirty(
        &self,
        snapshots: &watch::Sender<Option<EngineSnapshot>>,
        deferred: bool,
    ) -> bool {
        if deferred {
            return true;
        }
        self.publish_snapshot(snapshots);
        false
    }

    fn flush(&mut self, events: &broadcast::Sender<EngineEvent>) {
        for event in self.engine.drain_events() {
            // No subscribers is fine.
            let _ = events.send(event);
        }
    }

    fn publish_snapshot(&self, snapshots: &watch::Sender<Option<EngineSnapshot>>) {
        let now = self.engine.clock().unwrap_or_else(Timestamp::now);
        snapshots.send_replace(Some(self.engine.snapshot(now)));
    }
}

/// Interval whose first tick is one full period away.
fn delayed_interval(period: Duration) -> Interval {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

async fn next_tick(clock: &mut Option<Interval>) {
    match clock {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

fn spawn_snapshot_writer(
    store: Arc<dyn StateStore>,
    mut snapshots: watch::Receiver<Option<EngineSnapshot>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while snapshots.changed().await.is_ok() {
            let snapshot = snapshots.borrow_and_update().clone();
            let Some(snapshot) = snapshot else {
                continue;
            };
            match store.save(&snapshot).await {
                Ok(()) => tracing::debug!(saved_at = %snapshot.saved_at, "Snapshot saved"),
                Err(e) => tracing::error!(error = %e, "Snapshot save failed"),
            }
        }
        tracing::debug!("Snapshot writer finished");
    })
}

fn spawn_relay(
    publisher: Arc<dyn EventPublisherPort>,
    mut events: broadcast::Receiver<EngineEvent>,
    stop: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                result = events.recv() => {
                    match result {
                        Ok(event) => {
                            if let Err(e) = publisher.publish_event(event).await {
                                tracing::warn!(error = %e, "Event publish failed");
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            tracing::warn!(skipped = n, "Event relay lagged, skipped {} events", n);
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            tracing::info!("Event channel closed");
                            break;
                        }
                    }
                }
                () = stop.cancelled() => {
                    let mut remaining = Vec::new();
                    while let Ok(event) = events.try_recv() {
                        remaining.push(event);
                    }
                    if !remaining.is_empty() {
                        if let Err(e) = publisher.publish_events(remaining).await {
                            tracing::warn!(error = %e, "Final event publish failed");
                        }
                    }
                    break;
                }
            }
        }
    })
}

// ============================================================================
// Handle
// ============================================================================

/// Cloneable client for a running engine loop.
#[derive(Clone)]
pub struct EngineHandle {
    commands: mpsc::Sender<Command>,
    events: broadcast::Sender<EngineEvent>,
}

impl EngineHandle {
    /// Receive every event emitted from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    /// Place a trade request.
    ///
    /// # Errors
    ///
    /// Returns the engine's rejection, or `Stopped` if the loop is gone.
    pub async fn place(&self, request: TradeRequest, now: Timestamp) -> Result<OrderId, EngineError> {
        self.call(|reply| Command::Place(request, now, reply)).await?
    }

    /// Cancel a pending order.
    ///
    /// # Errors
    ///
    /// Returns the engine's refusal, or `Stopped` if the loop is gone.
    pub async fn cancel(&self, order_id: OrderId, now: Timestamp) -> Result<(), EngineError> {
        self.call(|reply| Command::Cancel(order_id, now, reply)).await?
    }

    /// Amend a pending order.
    ///
    /// # Errors
    ///
    /// Returns the engine's refusal, or `Stopped` if the loop is gone.
    pub async fn modify(
        &self,
        order_id: OrderId,
        changes: OrderChanges,
        now: Timestamp,
    ) -> Result<(), EngineError> {
        self.call(|reply| Command::Modify(order_id, changes, now, reply)).await?
    }

    /// Feed a market tick.
    ///
    /// # Errors
    ///
    /// Returns `Stopped` if the loop is gone.
    pub async fn tick(&self, tick: Tick) -> Result<TickReport, EngineError> {
        self.call(|reply| Command::Tick(tick, reply)).await
    }

    /// Run one session-clock cycle. Returns the number of orders expired or
    /// cancelled.
    ///
    /// # Errors
    ///
    /// Returns `Stopped` if the loop is gone.
    pub async fn clock(&self, now: Timestamp) -> Result<usize, EngineError> {
        self.call(|reply| Command::Clock(now, reply)).await
    }

    /// Close one position.
    ///
    /// # Errors
    ///
    /// Returns the engine's refusal, or `Stopped` if the loop is gone.
    pub async fn square_off(&self, key: PositionKey, now: Timestamp) -> Result<OrderId, EngineError> {
        self.call(|reply| Command::SquareOff(key, now, reply)).await?
    }

    /// Close every position.
    ///
    /// # Errors
    ///
    /// Returns `Stopped` if the loop is gone.
    pub async fn square_off_all(&self, now: Timestamp) -> Result<Vec<OrderId>, EngineError> {
        self.call(|reply| Command::SquareOffAll(now, reply)).await
    }

    /// Reconcile a position.
    ///
    /// # Errors
    ///
    /// Returns the engine's refusal, or `Stopped` if the loop is gone.
    pub async fn reconcile(
        &self,
        command: ReconcileCommand,
        now: Timestamp,
    ) -> Result<Option<Position>, EngineError> {
        self.call(|reply| Command::Reconcile(command, now, reply)).await?
    }

    /// Register an instrument.
    ///
    /// # Errors
    ///
    /// Returns `Stopped` if the loop is gone.
    pub async fn register_instrument(&self, instrument: Instrument) -> Result<(), EngineError> {
        self.call(|reply| Command::RegisterInstrument(instrument, reply)).await
    }

    /// Current portfolio summary.
    ///
    /// # Errors
    ///
    /// Returns `Stopped` if the loop is gone.
    pub async fn summary(&self) -> Result<PortfolioSummary, EngineError> {
        self.call(Command::Summary).await
    }

    /// Capture the current state.
    ///
    /// # Errors
    ///
    /// Returns `Stopped` if the loop is gone.
    pub async fn snapshot(&self) -> Result<EngineSnapshot, EngineError> {
        self.call(Command::Snapshot).await
    }

    /// Look up an order.
    ///
    /// # Errors
    ///
    /// Returns `Stopped` if the loop is gone.
    pub async fn order(&self, order_id: OrderId) -> Result<Option<Order>, EngineError> {
        self.call(|reply| Command::Order(order_id, reply)).await
    }

    /// Open positions.
    ///
    /// # Errors
    ///
    /// Returns `Stopped` if the loop is gone.
    pub async fn positions(&self) -> Result<Vec<Position>, EngineError> {
        self.call(Command::Positions).await
    }

    /// Closed trade records.
    ///
    /// # Errors
    ///
    /// Returns `Stopped` if the loop is gone.
    pub async fn trades(&self) -> Result<Vec<TradeRecord>, EngineError> {
        self.call(Command::Trades).await
    }

    /// Instruments a tick source must stream for pending orders, open
    /// positions and strategy guards.
    ///
    /// # Errors
    ///
    /// Returns `Stopped` if the loop is gone.
    pub async fn subscribed_instruments(&self) -> Result<Vec<InstrumentToken>, EngineError> {
        self.call(Command::Subscriptions).await
    }

    /// Route one input record to the matching operation.
    ///
    /// `now` is used for inputs that carry no time of their own.
    ///
    /// # Errors
    ///
    /// Returns the engine's rejection or refusal for the input.
    pub async fn dispatch(&self, input: EngineInput, now: Timestamp) -> Result<(), EngineError> {
        match input {
            EngineInput::Instrument(instrument) => self.register_instrument(instrument).await,
            EngineInput::Tick(tick) => self.tick(tick).await.map(drop),
            EngineInput::Trade(request) => self.place(request, now).await.map(drop),
            EngineInput::Cancel(command) => self.cancel(command.order_id, now).await,
            EngineInput::Modify(command) => {
                self.modify(command.order_id, command.changes, now).await
            }
            EngineInput::SquareOff(command) => self.square_off(command.key(), now).await.map(drop),
            EngineInput::SquareOffAll => self.square_off_all(now).await.map(drop),
            EngineInput::Reconcile(command) => self.reconcile(command, now).await.map(drop),
            EngineInput::Clock { at } => self.clock(at).await.map(drop),
        }
    }

    async fn call<T>(&self, command: impl FnOnce(Reply<T>) -> Command) -> Result<T, EngineError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| EngineError::Stopped)?;
        response.await.map_err(|_| EngineError::Stopped)
    }
}
