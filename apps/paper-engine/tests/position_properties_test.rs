//! Property tests for position accounting.
//!
//! - Averaging into a position gives the quantity-weighted mean whatever the
//!   fill order.
//! - Realized plus net unrealized P&L always equals cash flow plus the marked
//!   value of the open quantity, minus every fee charged.

use paper_engine::domain::order_execution::OrderSide;
use paper_engine::domain::position::{ExitReason, PositionBook, PositionFill};
use paper_engine::domain::shared::{InstrumentToken, Money, OrderId, PositionKey, Quantity, Timestamp};
use paper_engine::domain::stop_enforcement::StopTargetLevels;
use proptest::prelude::*;
use rust_decimal::Decimal;

const LOT: u32 = 25;
const TOKEN: &str = "NIFTY24DEC24000CE";

fn tolerance() -> Decimal {
    Decimal::new(1, 12)
}

fn at(second: usize) -> Timestamp {
    let base = Timestamp::parse("2024-12-02T05:00:00Z").unwrap().as_datetime();
    Timestamp::new(base + chrono::Duration::seconds(second as i64))
}

fn fill(seq: usize, side: OrderSide, lots: u32, price: Decimal, fees: Decimal) -> PositionFill {
    PositionFill {
        order_id: OrderId::sequential(seq as u64 + 1),
        key: PositionKey::new(TOKEN, "prop"),
        side,
        quantity: Quantity::new(lots * LOT),
        price,
        fees: Money::new(fees),
        levels: StopTargetLevels::none(),
        exit_reason: ExitReason::Manual,
        lot_size: LOT,
        at: at(seq),
    }
}

fn price() -> impl Strategy<Value = Decimal> {
    (100i64..50_000).prop_map(|paise| Decimal::new(paise, 2))
}

fn fees() -> impl Strategy<Value = Decimal> {
    (0i64..5_000).prop_map(|paise| Decimal::new(paise, 2))
}

fn side() -> impl Strategy<Value = OrderSide> {
    prop_oneof![Just(OrderSide::Buy), Just(OrderSide::Sell)]
}

fn average_of(fills: &[(u32, Decimal)]) -> Decimal {
    let mut book = PositionBook::new();
    for (seq, (lots, price)) in fills.iter().enumerate() {
        book.apply_fill(fill(seq, OrderSide::Buy, *lots, *price, Decimal::ZERO))
            .unwrap();
    }
    book.get(&PositionKey::new(TOKEN, "prop")).unwrap().avg_price()
}

/// Cash received minus cash paid, before fees.
fn cash_flow(fills: &[PositionFill]) -> Decimal {
    fills
        .iter()
        .map(|f| -Decimal::from(f.signed_quantity()) * f.price)
        .sum()
}

proptest! {
    #[test]
    fn average_price_is_order_independent(
        fills in prop::collection::vec((1u32..5, price()), 1..8)
    ) {
        let forward = average_of(&fills);
        let reversed: Vec<_> = fills.iter().rev().copied().collect();
        let backward = average_of(&reversed);

        let total_qty: Decimal = fills.iter().map(|(lots, _)| Decimal::from(lots * LOT)).sum();
        let weighted: Decimal = fills
            .iter()
            .map(|(lots, price)| Decimal::from(lots * LOT) * price)
            .sum();
        let expected = weighted / total_qty;

        prop_assert!((forward - backward).abs() < tolerance());
        prop_assert!((forward - expected).abs() < tolerance());
    }

    #[test]
    fn pnl_is_conserved(
        steps in prop::collection::vec((side(), 1u32..4, price(), fees()), 1..12),
        mark in price(),
    ) {
        let mut book = PositionBook::new();
        let mut applied = Vec::new();
        let key = PositionKey::new(TOKEN, "prop");

        for (seq, (side, lots, price, fee)) in steps.into_iter().enumerate() {
            let f = fill(seq, side, lots, price, fee);
            let outcome = book.apply_fill(f.clone()).unwrap();
            prop_assert!(outcome.corruption.is_none());
            applied.push(f);
        }

        let net = book.get(&key).map_or(0, |p| p.net_quantity());
        prop_assert_eq!(net % i64::from(LOT), 0);

        book.mark(&InstrumentToken::new(TOKEN), mark, at(100));
        let lhs = book.realized_pnl().amount() + book.unrealized_net().amount();
        let rhs = cash_flow(&applied) + Decimal::from(net) * mark - book.total_fees().amount();
        prop_assert!((lhs - rhs).abs() < tolerance(), "lhs {} rhs {}", lhs, rhs);

        // Flatten at the mark: everything is realized.
        if net != 0 {
            let side = if net > 0 { OrderSide::Sell } else { OrderSide::Buy };
            let lots = (net.unsigned_abs() / u64::from(LOT)) as u32;
            let close = fill(applied.len(), side, lots, mark, Decimal::ZERO);
            let outcome = book.apply_fill(close.clone()).unwrap();
            prop_assert!(outcome.closed());
            applied.push(close);
        }

        prop_assert!(book.get(&key).is_none());
        let realized = book.realized_pnl().amount();
        let expected = cash_flow(&applied) - book.total_fees().amount();
        prop_assert!((realized - expected).abs() < tolerance(), "realized {} expected {}", realized, expected);
    }
}
