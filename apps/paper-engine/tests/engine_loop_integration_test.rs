//! Integration tests for the engine loop wired through the container.
//!
//! Covers restart recovery through the JSON snapshot file and event fan-out
//! to subscribers.

use std::sync::Arc;

use paper_engine::application::dto::{
    EngineInput, EngineSnapshot, OrderTerms, SingleLegRequest, Tick, TradeRequest,
    SNAPSHOT_VERSION,
};
use paper_engine::application::ports::StateStore;
use paper_engine::application::services::EngineLoopConfig;
use paper_engine::config::Config;
use paper_engine::domain::instrument::{Instrument, InstrumentSpec, OptionKind};
use paper_engine::domain::order_execution::{OrderSide, OrderType, Validity};
use paper_engine::domain::shared::{InstrumentToken, Money, Quantity, StrategyTag, Timestamp};
use paper_engine::infrastructure::config::Container;
use paper_engine::infrastructure::events::RecordingEventPublisher;
use paper_engine::infrastructure::persistence::JsonFileStateStore;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio_util::sync::CancellationToken;

const CALL: &str = "NIFTY24DEC24000CE";

fn ts(s: &str) -> Timestamp {
    Timestamp::parse(s).unwrap()
}

fn call_instrument() -> Instrument {
    Instrument::new(InstrumentSpec {
        token: InstrumentToken::new(CALL),
        underlying: "NIFTY".to_string(),
        expiry: chrono::NaiveDate::from_ymd_opt(2024, 12, 26).unwrap(),
        strike: dec!(24000),
        second_strike: None,
        kind: OptionKind::Call,
        lot_size: 25,
        tradable: true,
    })
    .unwrap()
}

fn buy(limit: Decimal, stop_loss: Option<Decimal>) -> TradeRequest {
    TradeRequest::Single(SingleLegRequest {
        terms: OrderTerms {
            strategy_tag: StrategyTag::new("s1"),
            side: OrderSide::Buy,
            quantity: Quantity::new(25),
            order_type: OrderType::Limit,
            validity: Validity::Day,
            limit_price: limit,
            stop_loss,
            target: None,
        },
        instrument: InstrumentToken::new(CALL),
    })
}

fn container(state_path: &std::path::Path) -> Container {
    let mut config = Config::default();
    config.persistence.path = state_path.display().to_string();
    config.execution.slippage_percent = Decimal::ZERO;
    Container::from_config(&config)
        .unwrap()
        .with_loop_config(EngineLoopConfig {
            clock_interval: None,
            ..EngineLoopConfig::default()
        })
}

#[tokio::test]
async fn restart_resumes_from_json_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("engine.json");

    // First run: open a position with a stop and leave an order working.
    {
        let shutdown = CancellationToken::new();
        let (handle, task) = container(&state_path).engine_loop(shutdown.clone()).spawn();
        handle.register_instrument(call_instrument()).await.unwrap();
        handle.place(buy(dec!(100), Some(dec!(90))), ts("2024-12-02T05:00:00Z")).await.unwrap();
        handle.tick(Tick::last(CALL, dec!(100), ts("2024-12-02T05:00:01Z"))).await.unwrap();
        handle.place(buy(dec!(80), None), ts("2024-12-02T05:00:02Z")).await.unwrap();
        shutdown.cancel();
        task.await.unwrap();
    }
    assert!(state_path.exists());

    // Second run: state comes back and the stop is still enforced.
    let shutdown = CancellationToken::new();
    let mut engine_loop = container(&state_path).engine_loop(shutdown.clone());
    assert!(engine_loop.restore().await.unwrap());
    let (handle, task) = engine_loop.spawn();
    handle.register_instrument(call_instrument()).await.unwrap();

    let summary = handle.summary().await.unwrap();
    assert_eq!(summary.open_positions, 1);
    assert_eq!(summary.pending_orders, 1);

    let report = handle.tick(Tick::last(CALL, dec!(89), ts("2024-12-02T05:05:00Z"))).await.unwrap();
    assert_eq!(report.exits, 1);
    let trades = handle.trades().await.unwrap();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].exit_price, dec!(89));

    shutdown.cancel();
    task.await.unwrap();
}

#[tokio::test]
async fn subscribers_see_every_event_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let publisher = Arc::new(RecordingEventPublisher::new());
    let shutdown = CancellationToken::new();
    let (handle, task) = container(&dir.path().join("engine.json"))
        .with_publisher(publisher.clone())
        .engine_loop(shutdown.clone())
        .spawn();
    let mut first = handle.subscribe();
    let mut second = handle.subscribe();

    let now = ts("2024-12-02T05:00:00Z");
    handle.dispatch(EngineInput::Instrument(call_instrument()), now).await.unwrap();
    handle.dispatch(EngineInput::Trade(buy(dec!(100), None)), now).await.unwrap();
    handle
        .dispatch(
            EngineInput::Tick(Tick::last(CALL, dec!(99), ts("2024-12-02T05:00:01Z"))),
            now,
        )
        .await
        .unwrap();

    let mut seen = Vec::new();
    loop {
        let event = first.recv().await.unwrap();
        seen.push(event.event_type());
        if event.event_type() == "PORTFOLIO_PNL_UPDATED" && seen.contains(&"ORDER_FILLED") {
            break;
        }
    }
    assert_eq!(seen.first(), Some(&"ORDER_PLACED"));
    assert!(seen.contains(&"ORDER_FILLED"));

    let from_second: Vec<&str> = {
        let mut types = Vec::new();
        for _ in 0..seen.len() {
            types.push(second.recv().await.unwrap().event_type());
        }
        types
    };
    assert_eq!(from_second, seen);

    shutdown.cancel();
    task.await.unwrap();
    assert_eq!(&publisher.event_types()[..seen.len()], seen.as_slice());
}

#[test]
fn json_store_round_trips_a_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStateStore::new(dir.path().join("nested").join("state.json"));

    assert!(tokio_test::block_on(store.load()).unwrap().is_none());

    let snapshot = EngineSnapshot {
        version: SNAPSHOT_VERSION,
        saved_at: ts("2024-12-02T05:00:00Z"),
        pending_orders: Vec::new(),
        positions: Vec::new(),
        trades: Vec::new(),
        guards: Vec::new(),
        realized_pnl: Money::new(dec!(-12.5)),
        total_fees: Money::new(dec!(41.25)),
        order_counter: 7,
        halted: Vec::new(),
        closed_orders: Vec::new(),
    };
    tokio_test::assert_ok!(tokio_test::block_on(store.save(&snapshot)));

    let loaded = tokio_test::block_on(store.load()).unwrap().unwrap();
    assert_eq!(loaded.order_counter, 7);
    assert_eq!(loaded.realized_pnl, Money::new(dec!(-12.5)));
    assert_eq!(loaded.total_fees, Money::new(dec!(41.25)));
}
