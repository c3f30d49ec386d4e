//! Position Book
//!
//! Open positions, trade history and portfolio totals. Every fill goes through
//! [`PositionBook::apply_fill`], which updates exactly one position, records at
//! most one trade and re-checks the book invariants for the touched key.

use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;

use super::aggregate::Position;
use super::errors::PositionError;
use super::events::PortfolioPnl;
use super::value_objects::{PositionFill, TradeRecord};
use crate::domain::shared::{InstrumentToken, Money, PositionKey, Timestamp};

/// Result of applying one fill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillOutcome {
    /// Position after the fill. `None` once closed.
    pub position: Option<Position>,
    /// Trade record when quantity was closed.
    pub trade: Option<TradeRecord>,
    /// Invariant breach detected after the fill. The key is now halted.
    pub corruption: Option<String>,
}

impl FillOutcome {
    /// Returns true if the fill closed the position.
    #[must_use]
    pub const fn closed(&self) -> bool {
        self.position.is_none()
    }
}

/// Positions, trades and totals owned by the engine.
#[derive(Debug, Default, Clone)]
pub struct PositionBook {
    positions: BTreeMap<PositionKey, Position>,
    trades: Vec<TradeRecord>,
    realized: Money,
    total_fees: Money,
    halted: BTreeMap<PositionKey, String>,
    fill_totals: HashMap<InstrumentToken, i64>,
}

impl PositionBook {
    /// Create an empty book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a book from persisted parts.
    ///
    /// Per-instrument fill totals restart from the restored positions.
    #[must_use]
    pub fn from_parts(
        positions: Vec<Position>,
        trades: Vec<TradeRecord>,
        realized: Money,
        total_fees: Money,
        halted: Vec<(PositionKey, String)>,
    ) -> Self {
        let mut fill_totals: HashMap<InstrumentToken, i64> = HashMap::new();
        for position in &positions {
            *fill_totals
                .entry(position.key().instrument.clone())
                .or_default() += position.net_quantity();
        }
        Self {
            positions: positions
                .into_iter()
                .map(|p| (p.key().clone(), p))
                .collect(),
            trades,
            realized,
            total_fees,
            halted: halted.into_iter().collect(),
            fill_totals,
        }
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Apply one fill.
    ///
    /// # Errors
    ///
    /// Returns `Halted` if the key is halted and `InvalidFill` for a zero
    /// quantity or non-positive price. Nothing is mutated in either case.
    pub fn apply_fill(&mut self, fill: PositionFill) -> Result<FillOutcome, PositionError> {
        if let Some(detail) = self.halted.get(&fill.key) {
            return Err(PositionError::Halted {
                key: fill.key.to_string(),
                detail: detail.clone(),
            });
        }
        if fill.quantity.is_zero() || fill.price <= Decimal::ZERO {
            return Err(PositionError::InvalidFill {
                key: fill.key.to_string(),
                message: format!("quantity {} at price {}", fill.quantity, fill.price),
            });
        }

        self.total_fees += fill.fees;
        *self
            .fill_totals
            .entry(fill.key.instrument.clone())
            .or_default() += fill.signed_quantity();

        let trade = match self.positions.get_mut(&fill.key) {
            Some(position) => position.apply(&fill),
            None => {
                self.positions
                    .insert(fill.key.clone(), Position::open(&fill));
                None
            }
        };

        if let Some(trade) = &trade {
            self.realized += trade.net_pnl;
            self.trades.push(trade.clone());
        }

        let position = match self.positions.get(&fill.key) {
            Some(p) if p.is_flat() => {
                self.positions.remove(&fill.key);
                None
            }
            other => other.cloned(),
        };

        let corruption = self.verify(&fill.key).err();
        if let Some(detail) = &corruption {
            self.halt(fill.key.clone(), detail.clone());
        }

        Ok(FillOutcome {
            position,
            trade,
            corruption,
        })
    }

    /// Update the mark of every position on `instrument`.
    ///
    /// Returns the keys that were re-marked.
    pub fn mark(&mut self, instrument: &InstrumentToken, price: Decimal, at: Timestamp) -> Vec<PositionKey> {
        self.positions
            .values_mut()
            .filter(|p| &p.key().instrument == instrument)
            .map(|p| {
                p.mark(price, at);
                p.key().clone()
            })
            .collect()
    }

    /// Halt mutation for a key.
    pub fn halt(&mut self, key: PositionKey, detail: String) {
        self.halted.insert(key, detail);
    }

    /// Overwrite a position with externally reconciled values and lift any halt.
    ///
    /// A zero quantity removes the position.
    ///
    /// # Errors
    ///
    /// Returns `InvalidFill` if the values would break the lot or price
    /// invariants. The key stays halted in that case.
    pub fn reconcile(
        &mut self,
        key: &PositionKey,
        net_quantity: i64,
        avg_price: Decimal,
        lot_size: u32,
        at: Timestamp,
    ) -> Result<Option<Position>, PositionError> {
        if lot_size == 0 || net_quantity.unsigned_abs() % u64::from(lot_size) != 0 {
            return Err(PositionError::InvalidFill {
                key: key.to_string(),
                message: format!("net quantity {net_quantity} is not a multiple of lot size {lot_size}"),
            });
        }
        if net_quantity != 0 && avg_price <= Decimal::ZERO {
            return Err(PositionError::InvalidFill {
                key: key.to_string(),
                message: format!("average price {avg_price} is not positive"),
            });
        }

        let previous = self.positions.get(key).map_or(0, Position::net_quantity);
        *self.fill_totals.entry(key.instrument.clone()).or_default() += net_quantity - previous;

        let position = if net_quantity == 0 {
            self.positions.remove(key);
            None
        } else {
            let position = self
                .positions
                .entry(key.clone())
                .and_modify(|p| p.reconcile(net_quantity, avg_price, at))
                .or_insert_with(|| {
                    Position::reconciled(key.clone(), net_quantity, avg_price, lot_size, at)
                });
            Some(position.clone())
        };

        self.halted.remove(key);
        Ok(position)
    }

    /// Check every position and halt keys that break an invariant.
    ///
    /// Returns the newly halted keys with their breach.
    pub fn verify_all(&mut self) -> Vec<(PositionKey, String)> {
        let keys: Vec<PositionKey> = self.positions.keys().cloned().collect();
        let mut breaches = Vec::new();
        for key in keys {
            if self.halted.contains_key(&key) {
                continue;
            }
            if let Err(detail) = self.verify(&key) {
                self.halt(key.clone(), detail.clone());
                breaches.push((key, detail));
            }
        }
        breaches
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Look up a position.
    #[must_use]
    pub fn get(&self, key: &PositionKey) -> Option<&Position> {
        self.positions.get(key)
    }

    /// Open positions in key order.
    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    /// Open positions on one instrument.
    pub fn positions_on<'a>(
        &'a self,
        instrument: &'a InstrumentToken,
    ) -> impl Iterator<Item = &'a Position> + 'a {
        self.positions
            .values()
            .filter(move |p| &p.key().instrument == instrument)
    }

    /// Last mark seen for an instrument on any open position.
    #[must_use]
    pub fn mark_for(&self, instrument: &InstrumentToken) -> Option<Decimal> {
        self.positions_on(instrument).find_map(Position::mark_price)
    }

    /// Closed trade records in close order.
    #[must_use]
    pub fn trades(&self) -> &[TradeRecord] {
        &self.trades
    }

    /// Realized P&L after fees.
    #[must_use]
    pub const fn realized_pnl(&self) -> Money {
        self.realized
    }

    /// All fees charged.
    #[must_use]
    pub const fn total_fees(&self) -> Money {
        self.total_fees
    }

    /// Gross unrealized P&L across open positions.
    #[must_use]
    pub fn unrealized_pnl(&self) -> Money {
        self.positions.values().map(Position::unrealized_pnl).sum()
    }

    /// Unrealized P&L after open entry fees.
    #[must_use]
    pub fn unrealized_net(&self) -> Money {
        self.positions.values().map(Position::unrealized_net).sum()
    }

    /// Number of open positions.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.positions.len()
    }

    /// Whether mutation is halted for a key.
    #[must_use]
    pub fn is_halted(&self, key: &PositionKey) -> bool {
        self.halted.contains_key(key)
    }

    /// Halted keys with the breach that halted them.
    pub fn halted(&self) -> impl Iterator<Item = (&PositionKey, &String)> {
        self.halted.iter()
    }

    /// Portfolio totals at `at`.
    #[must_use]
    pub fn totals(&self, at: Timestamp) -> PortfolioPnl {
        let unrealized_net = self.unrealized_net();
        PortfolioPnl {
            realized_pnl: self.realized.round(),
            unrealized_pnl: self.unrealized_pnl().round(),
            unrealized_net: unrealized_net.round(),
            total_pnl: (self.realized + unrealized_net).round(),
            total_fees: self.total_fees.round(),
            open_positions: self.positions.len(),
            occurred_at: at,
        }
    }

    fn verify(&self, key: &PositionKey) -> Result<(), String> {
        if let Some(position) = self.positions.get(key) {
            position.check_invariants()?;
        }
        let held: i64 = self
            .positions_on(&key.instrument)
            .map(Position::net_quantity)
            .sum();
        let filled = self
            .fill_totals
            .get(&key.instrument)
            .copied()
            .unwrap_or_default();
        if held != filled {
            return Err(format!(
                "positions on {} hold {held} but fills net to {filled}",
                key.instrument
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order_execution::value_objects::OrderSide;
    use crate::domain::position::value_objects::ExitReason;
    use crate::domain::shared::{OrderId, Quantity};
    use crate::domain::stop_enforcement::StopTargetLevels;
    use rust_decimal_macros::dec;

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse(s).unwrap()
    }

    fn fill(strategy: &str, side: OrderSide, qty: u32, price: Decimal) -> PositionFill {
        PositionFill {
            order_id: OrderId::new("ORD-000001"),
            key: PositionKey::new("NIFTY24DEC24000CE", strategy),
            side,
            quantity: Quantity::new(qty),
            price,
            fees: Money::new(dec!(20)),
            levels: StopTargetLevels::none(),
            exit_reason: ExitReason::Manual,
            lot_size: 25,
            at: ts("2024-12-02T05:00:00Z"),
        }
    }

    #[test]
    fn open_then_close_records_trade_and_removes_position() {
        let mut book = PositionBook::new();
        let opened = book.apply_fill(fill("s1", OrderSide::Buy, 25, dec!(100))).unwrap();
        assert!(opened.trade.is_none());
        assert_eq!(opened.position.unwrap().net_quantity(), 25);

        let closed = book.apply_fill(fill("s1", OrderSide::Sell, 25, dec!(110))).unwrap();
        assert!(closed.closed());
        let trade = closed.trade.unwrap();
        assert_eq!(trade.net_pnl, Money::new(dec!(210)));
        assert_eq!(book.open_count(), 0);
        assert_eq!(book.trades().len(), 1);
        assert_eq!(book.realized_pnl(), Money::new(dec!(210)));
        assert_eq!(book.total_fees(), Money::new(dec!(40)));
    }

    #[test]
    fn strategies_are_separate_keys() {
        let mut book = PositionBook::new();
        book.apply_fill(fill("s1", OrderSide::Buy, 25, dec!(100))).unwrap();
        book.apply_fill(fill("s2", OrderSide::Sell, 50, dec!(100))).unwrap();
        assert_eq!(book.open_count(), 2);
        let instrument = InstrumentToken::new("NIFTY24DEC24000CE");
        let net: i64 = book.positions_on(&instrument).map(Position::net_quantity).sum();
        assert_eq!(net, -25);
    }

    #[test]
    fn halted_key_rejects_fills() {
        let mut book = PositionBook::new();
        book.apply_fill(fill("s1", OrderSide::Buy, 25, dec!(100))).unwrap();
        let key = PositionKey::new("NIFTY24DEC24000CE", "s1");
        book.halt(key.clone(), "manual".to_string());
        let result = book.apply_fill(fill("s1", OrderSide::Buy, 25, dec!(100)));
        assert!(matches!(result, Err(PositionError::Halted { .. })));
        assert_eq!(book.get(&key).unwrap().net_quantity(), 25);
    }

    #[test]
    fn broken_lot_multiple_halts_key() {
        let mut book = PositionBook::new();
        let outcome = book.apply_fill(fill("s1", OrderSide::Buy, 30, dec!(100))).unwrap();
        assert!(outcome.corruption.is_some());
        assert!(book.is_halted(&PositionKey::new("NIFTY24DEC24000CE", "s1")));
    }

    #[test]
    fn reconcile_lifts_halt() {
        let mut book = PositionBook::new();
        book.apply_fill(fill("s1", OrderSide::Buy, 30, dec!(100))).unwrap();
        let key = PositionKey::new("NIFTY24DEC24000CE", "s1");
        assert!(book.reconcile(&key, 30, dec!(100), 25, ts("2024-12-02T06:00:00Z")).is_err());
        assert!(book.is_halted(&key));
        let position = book
            .reconcile(&key, 25, dec!(100), 25, ts("2024-12-02T06:00:00Z"))
            .unwrap();
        assert_eq!(position.unwrap().net_quantity(), 25);
        assert!(!book.is_halted(&key));
        assert!(book.apply_fill(fill("s1", OrderSide::Sell, 25, dec!(101))).is_ok());
    }

    #[test]
    fn mark_updates_unrealized() {
        let mut book = PositionBook::new();
        book.apply_fill(fill("s1", OrderSide::Buy, 25, dec!(100))).unwrap();
        let instrument = InstrumentToken::new("NIFTY24DEC24000CE");
        let keys = book.mark(&instrument, dec!(104), ts("2024-12-02T05:01:00Z"));
        assert_eq!(keys.len(), 1);
        assert_eq!(book.unrealized_pnl(), Money::new(dec!(100)));
        assert_eq!(book.unrealized_net(), Money::new(dec!(80)));
        let totals = book.totals(ts("2024-12-02T05:01:00Z"));
        assert_eq!(totals.total_pnl, Money::new(dec!(80)));
        assert_eq!(book.mark_for(&instrument), Some(dec!(104)));
    }

    #[test]
    fn from_parts_restores_totals() {
        let mut book = PositionBook::new();
        book.apply_fill(fill("s1", OrderSide::Buy, 25, dec!(100))).unwrap();
        let positions: Vec<Position> = book.positions().cloned().collect();
        let mut restored = PositionBook::from_parts(
            positions,
            Vec::new(),
            Money::ZERO,
            book.total_fees(),
            Vec::new(),
        );
        assert!(restored.verify_all().is_empty());
        assert!(restored.apply_fill(fill("s1", OrderSide::Sell, 25, dec!(100))).is_ok());
    }
}
