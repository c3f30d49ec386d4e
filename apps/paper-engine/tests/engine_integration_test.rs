//! Integration tests for the execution engine.
//!
//! Scenarios drive the engine through its public API with the production
//! adapters: schedule fees, the static lot table and the quote-first price
//! policy.

use std::sync::Arc;

use paper_engine::application::dto::{
    LegRequest, MultiLegRequest, OrderTerms, ReconcileCommand, SingleLegRequest, Tick, TradeRequest,
};
use paper_engine::application::ports::{FeeModel, QuoteFirstPolicy};
use paper_engine::application::services::{EnginePorts, EngineSettings, ExecutionEngine};
use paper_engine::domain::instrument::{Instrument, InstrumentSpec, OptionKind};
use paper_engine::domain::order_execution::{OrderSide, OrderStatus, OrderType, Validity};
use paper_engine::domain::position::ExitReason;
use paper_engine::domain::shared::{InstrumentToken, Money, PositionKey, Quantity, StrategyTag, Timestamp};
use paper_engine::error::EngineError;
use paper_engine::infrastructure::fees::{FeeSchedule, ScheduleFeeModel};
use paper_engine::infrastructure::instruments::InMemoryInstrumentRegistry;
use paper_engine::infrastructure::lots::StaticLotTable;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use test_case::test_case;

const CALL: &str = "NIFTY24DEC24000CE";
const PUT: &str = "NIFTY24DEC24000PE";
const BANK_CALL: &str = "BANKNIFTY24DEC52000CE";

fn ts(s: &str) -> Timestamp {
    Timestamp::parse(s).unwrap()
}

/// Monday 10:30 IST.
fn open_time() -> Timestamp {
    ts("2024-12-02T05:00:00Z")
}

fn instrument(token: &str, underlying: &str, kind: OptionKind, lot_size: u32) -> Instrument {
    Instrument::new(InstrumentSpec {
        token: InstrumentToken::new(token),
        underlying: underlying.to_string(),
        expiry: chrono::NaiveDate::from_ymd_opt(2024, 12, 26).unwrap(),
        strike: dec!(24000),
        second_strike: None,
        kind,
        lot_size,
        tradable: true,
    })
    .unwrap()
}

fn engine(schedule: FeeSchedule) -> ExecutionEngine {
    let registry = InMemoryInstrumentRegistry::with_instruments([
        instrument(CALL, "NIFTY", OptionKind::Call, 25),
        instrument(PUT, "NIFTY", OptionKind::Put, 25),
        instrument(BANK_CALL, "BANKNIFTY", OptionKind::Call, 15),
    ]);
    ExecutionEngine::new(
        EngineSettings {
            slippage: paper_engine::domain::order_execution::SlippageModel::none(),
            ..EngineSettings::default()
        },
        EnginePorts {
            fees: Arc::new(ScheduleFeeModel::for_schedule(schedule)),
            lots: Arc::new(StaticLotTable::new()),
            instruments: Arc::new(registry),
            prices: Arc::new(QuoteFirstPolicy::default()),
        },
    )
}

fn terms(side: OrderSide, quantity: u32, limit: Decimal) -> OrderTerms {
    OrderTerms {
        strategy_tag: StrategyTag::new("momentum"),
        side,
        quantity: Quantity::new(quantity),
        order_type: OrderType::Limit,
        validity: Validity::Day,
        limit_price: limit,
        stop_loss: None,
        target: None,
    }
}

fn single(instrument: &str, terms: OrderTerms) -> TradeRequest {
    TradeRequest::Single(SingleLegRequest {
        terms,
        instrument: InstrumentToken::new(instrument),
    })
}

fn key(instrument: &str) -> PositionKey {
    PositionKey::new(instrument, "momentum")
}

#[test]
fn short_call_hits_target_with_zerodha_fees() {
    let fees = ScheduleFeeModel::for_schedule(FeeSchedule::Zerodha);
    let mut engine = engine(FeeSchedule::Zerodha);

    let mut t = terms(OrderSide::Sell, 25, dec!(50));
    t.stop_loss = Some(dec!(60));
    t.target = Some(dec!(40));
    engine.place(&single(CALL, t), open_time()).unwrap();

    let report = engine.on_tick(Tick::last(CALL, dec!(51), ts("2024-12-02T05:00:05Z")));
    assert_eq!(report.fills, 1);
    let position = engine.position(&key(CALL)).unwrap();
    assert_eq!(position.net_quantity(), -25);
    assert_eq!(position.avg_price(), dec!(51));

    // Between the levels: no exit.
    assert_eq!(engine.on_tick(Tick::last(CALL, dec!(45), ts("2024-12-02T05:10:00Z"))).exits, 0);

    let report = engine.on_tick(Tick::last(CALL, dec!(39), ts("2024-12-02T05:20:00Z")));
    assert_eq!(report.exits, 1);
    assert!(engine.position(&key(CALL)).is_none());

    let trade = &engine.trades()[0];
    assert_eq!(trade.exit_reason, ExitReason::Target);
    assert_eq!(trade.gross_pnl, Money::new(dec!(300)));

    let entry = fees.fees(OrderSide::Sell, Quantity::new(25), dec!(51)).total;
    let exit = fees.fees(OrderSide::Buy, Quantity::new(25), dec!(39)).total;
    assert_eq!(trade.fees, entry + exit);
    assert_eq!(trade.net_pnl, Money::new(dec!(300)) - entry - exit);
    assert_eq!(trade.holding_secs, 1195);
}

#[test]
fn oversized_sell_reverses_the_position() {
    let mut engine = engine(FeeSchedule::Custom);
    engine.place(&single(CALL, terms(OrderSide::Buy, 25, dec!(100))), open_time()).unwrap();
    engine.on_tick(Tick::last(CALL, dec!(100), ts("2024-12-02T05:00:01Z")));

    engine
        .place(&single(CALL, terms(OrderSide::Sell, 50, dec!(105))), ts("2024-12-02T05:00:02Z"))
        .unwrap();
    engine.on_tick(Tick::last(CALL, dec!(110), ts("2024-12-02T05:00:03Z")));

    let trade = &engine.trades()[0];
    assert_eq!(trade.exit_reason, ExitReason::Reversal);
    assert_eq!(trade.quantity, Quantity::new(25));
    assert_eq!(trade.exit_price, dec!(110));

    let position = engine.position(&key(CALL)).unwrap();
    assert_eq!(position.net_quantity(), -25);
    assert_eq!(position.avg_price(), dec!(110));
}

#[test]
fn partial_close_keeps_average_price() {
    let mut engine = engine(FeeSchedule::Custom);
    engine.place(&single(CALL, terms(OrderSide::Buy, 50, dec!(100))), open_time()).unwrap();
    engine.on_tick(Tick::last(CALL, dec!(100), ts("2024-12-02T05:00:01Z")));

    engine
        .place(&single(CALL, terms(OrderSide::Sell, 25, dec!(120))), ts("2024-12-02T05:00:02Z"))
        .unwrap();
    engine.on_tick(Tick::last(CALL, dec!(120), ts("2024-12-02T05:00:03Z")));

    let position = engine.position(&key(CALL)).unwrap();
    assert_eq!(position.net_quantity(), 25);
    assert_eq!(position.avg_price(), dec!(100));
    assert_eq!(engine.trades()[0].exit_reason, ExitReason::Manual);

    let summary = engine.portfolio_summary();
    assert_eq!(summary.open_positions, 1);
    assert_eq!(summary.closed_trades, 1);
    assert_eq!(summary.unrealized_pnl, Money::new(dec!(500)));
}

#[test]
fn quotes_drive_fills_and_marks() {
    let mut engine = engine(FeeSchedule::Custom);
    engine.place(&single(CALL, terms(OrderSide::Buy, 25, dec!(100))), open_time()).unwrap();

    // Last trade is below the limit but the ask is not.
    let tick = Tick::last(CALL, dec!(99), ts("2024-12-02T05:00:01Z")).with_quote(dec!(100.5), dec!(101));
    assert_eq!(engine.on_tick(tick).fills, 0);

    let tick = Tick::last(CALL, dec!(99), ts("2024-12-02T05:00:02Z")).with_quote(dec!(99.5), dec!(100));
    assert_eq!(engine.on_tick(tick).fills, 1);
    let position = engine.position(&key(CALL)).unwrap();
    assert_eq!(position.avg_price(), dec!(100));
    assert_eq!(position.mark_price(), Some(dec!(99)));
}

#[test_case(terms(OrderSide::Buy, 0, dec!(100)), CALL, "INVALID_QUANTITY" ; "zero quantity")]
#[test_case(terms(OrderSide::Buy, 20, dec!(100)), CALL, "LOT_SIZE_MISMATCH" ; "odd nifty lot")]
#[test_case(terms(OrderSide::Buy, 25, dec!(100)), BANK_CALL, "LOT_SIZE_MISMATCH" ; "nifty lot on banknifty")]
#[test_case(terms(OrderSide::Buy, 25, dec!(0)), CALL, "INVALID_PRICE" ; "zero limit")]
#[test_case(terms(OrderSide::Buy, 25, dec!(100)), "UNKNOWN24DEC100CE", "UNKNOWN_INSTRUMENT" ; "unknown instrument")]
fn placement_rejections(terms: OrderTerms, instrument: &str, code: &str) {
    let mut engine = engine(FeeSchedule::AliceBlue);
    let err = engine.place(&single(instrument, terms), open_time()).unwrap_err();
    assert_eq!(err.reject_reason().unwrap().code, code);
    assert_eq!(engine.pending_orders().count(), 0);
}

#[test]
fn stop_on_wrong_side_is_rejected() {
    let mut engine = engine(FeeSchedule::AliceBlue);
    let mut t = terms(OrderSide::Buy, 25, dec!(100));
    t.stop_loss = Some(dec!(110));
    let err = engine.place(&single(CALL, t), open_time()).unwrap_err();
    assert_eq!(err.reject_reason().unwrap().code, "INVALID_STOP_TARGET");
}

#[test]
fn volatility_legs_must_share_the_order_side() {
    let mut engine = engine(FeeSchedule::AliceBlue);
    let request = TradeRequest::Volatility(MultiLegRequest {
        terms: terms(OrderSide::Sell, 25, dec!(200)),
        legs: vec![
            LegRequest {
                instrument: InstrumentToken::new(CALL),
                side: OrderSide::Sell,
                ratio: 1,
            },
            LegRequest {
                instrument: InstrumentToken::new(PUT),
                side: OrderSide::Buy,
                ratio: 1,
            },
        ],
    });
    let err = engine.place(&request, open_time()).unwrap_err();
    assert_eq!(err.reject_reason().unwrap().code, "INVALID_LEGS");
}

#[test]
fn halted_key_rejects_orders_until_reconciled() {
    let mut engine = engine(FeeSchedule::Custom);
    engine.place(&single(CALL, terms(OrderSide::Buy, 25, dec!(100))), open_time()).unwrap();
    engine.on_tick(Tick::last(CALL, dec!(100), ts("2024-12-02T05:00:01Z")));

    let broken = ReconcileCommand {
        instrument: InstrumentToken::new(CALL),
        strategy_tag: StrategyTag::new("momentum"),
        net_quantity: 30,
        avg_price: dec!(100),
    };
    assert!(matches!(
        engine.reconcile(&broken, ts("2024-12-02T05:00:02Z")),
        Err(EngineError::StateCorruption { .. })
    ));
    assert!(engine.is_halted(&key(CALL)));

    let err = engine
        .place(&single(CALL, terms(OrderSide::Buy, 25, dec!(100))), ts("2024-12-02T05:00:03Z"))
        .unwrap_err();
    assert_eq!(err.reject_reason().unwrap().code, "KEY_HALTED");

    // Other keys keep trading.
    engine
        .place(&single(PUT, terms(OrderSide::Buy, 25, dec!(50))), ts("2024-12-02T05:00:04Z"))
        .unwrap();

    let fixed = ReconcileCommand {
        net_quantity: 50,
        ..broken
    };
    engine.reconcile(&fixed, ts("2024-12-02T05:00:05Z")).unwrap();
    assert!(!engine.is_halted(&key(CALL)));
    assert_eq!(engine.position(&key(CALL)).unwrap().net_quantity(), 50);
}

#[test]
fn pnl_event_follows_every_fill() {
    let mut engine = engine(FeeSchedule::AliceBlue);
    engine.place(&single(CALL, terms(OrderSide::Buy, 25, dec!(100))), open_time()).unwrap();
    engine.drain_events();

    engine.on_tick(Tick::last(CALL, dec!(100), ts("2024-12-02T05:00:01Z")));
    let types: Vec<&str> = engine.drain_events().iter().map(|e| e.event_type()).collect();
    let filled = types.iter().position(|t| *t == "ORDER_FILLED").unwrap();
    let pnl = types.iter().rposition(|t| *t == "PORTFOLIO_PNL_UPDATED").unwrap();
    assert!(filled < pnl);
    assert!(types.contains(&"POSITION_UPDATED"));
}

#[test]
fn square_off_uses_last_mark() {
    let mut engine = engine(FeeSchedule::Custom);
    engine.place(&single(CALL, terms(OrderSide::Buy, 25, dec!(100))), open_time()).unwrap();
    engine.on_tick(Tick::last(CALL, dec!(100), ts("2024-12-02T05:00:01Z")));
    engine.on_tick(Tick::last(CALL, dec!(104), ts("2024-12-02T05:05:00Z")));

    let exit_id = engine.square_off(&key(CALL), ts("2024-12-02T05:06:00Z")).unwrap();
    assert_eq!(engine.order(&exit_id).unwrap().status(), OrderStatus::Filled);

    let trade = &engine.trades()[0];
    assert_eq!(trade.exit_reason, ExitReason::SquareOff);
    assert_eq!(trade.exit_price, dec!(104));
    assert_eq!(trade.gross_pnl, Money::new(dec!(100)));
}
