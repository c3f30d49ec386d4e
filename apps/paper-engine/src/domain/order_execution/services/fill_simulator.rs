//! Fill simulation: adverse slippage and limit crossing.
//!
//! Fills are simulated against an observed reference price per leg. There is
//! no matching against other participants.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::order_execution::aggregate::Order;
use crate::domain::order_execution::value_objects::{OrderSide, StrategyShape};
use crate::domain::shared::DomainError;

/// Percent divisor (1% = 0.01).
const PERCENT_DIVISOR: Decimal = Decimal::from_parts(100, 0, 0, false, 0);

/// Largest slippage accepted by [`SlippageModel::new`], in percent.
const MAX_SLIPPAGE_PERCENT: Decimal = Decimal::from_parts(5, 0, 0, false, 0);

/// Fixed-percentage slippage applied against the trader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlippageModel {
    percent: Decimal,
}

impl SlippageModel {
    /// Create a slippage model from a percentage (0.1 means 0.1%).
    ///
    /// # Errors
    ///
    /// Returns error if the percentage is negative or above 5%.
    pub fn new(percent: Decimal) -> Result<Self, DomainError> {
        if percent < Decimal::ZERO || percent > MAX_SLIPPAGE_PERCENT {
            return Err(DomainError::invalid(
                "slippage_percent",
                format!("must be between 0 and {MAX_SLIPPAGE_PERCENT}, got {percent}"),
            ));
        }
        Ok(Self { percent })
    }

    /// No slippage.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            percent: Decimal::ZERO,
        }
    }

    /// Configured percentage.
    #[must_use]
    pub const fn percent(&self) -> Decimal {
        self.percent
    }

    /// Apply slippage to a reference price.
    ///
    /// For buys: pay more. For sells: receive less.
    #[must_use]
    pub fn apply(&self, side: OrderSide, reference: Decimal) -> Decimal {
        let multiplier = self.percent / PERCENT_DIVISOR;
        match side {
            OrderSide::Buy => reference * (Decimal::ONE + multiplier),
            OrderSide::Sell => reference * (Decimal::ONE - multiplier),
        }
    }
}

impl Default for SlippageModel {
    fn default() -> Self {
        Self {
            percent: Decimal::new(1, 1),
        }
    }
}

/// Simulated execution prices for an order at one evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillQuote {
    /// Execution price per leg after slippage, in leg order.
    pub leg_prices: Vec<Decimal>,
    /// Net combined price.
    pub net_price: Decimal,
    /// Whether the net price crosses the order's limit.
    pub crosses_limit: bool,
}

/// Stateless fill simulator.
pub struct FillSimulator;

impl FillSimulator {
    /// Price every leg of `order` from its reference price and test the net
    /// against the limit.
    ///
    /// `references` must hold one reference price per leg, in leg order.
    ///
    /// # Errors
    ///
    /// Returns error if the reference count does not match the leg count.
    pub fn quote(
        order: &Order,
        references: &[Decimal],
        slippage: &SlippageModel,
    ) -> Result<FillQuote, DomainError> {
        let quote = Self::price_legs(order, references, slippage)?;
        Ok(FillQuote {
            crosses_limit: order.side().crosses(quote.net_price, order.limit_price()),
            ..quote
        })
    }

    /// Price every leg of `order` without a limit check.
    ///
    /// Used for internal exits, which execute at the mark regardless of limit.
    ///
    /// # Errors
    ///
    /// Returns error if the reference count does not match the leg count.
    pub fn price_legs(
        order: &Order,
        references: &[Decimal],
        slippage: &SlippageModel,
    ) -> Result<FillQuote, DomainError> {
        if references.len() != order.legs().len() {
            return Err(DomainError::invalid(
                "references",
                format!(
                    "expected {} reference prices, got {}",
                    order.legs().len(),
                    references.len()
                ),
            ));
        }

        let leg_prices: Vec<Decimal> = order
            .legs()
            .iter()
            .zip(references)
            .map(|(leg, reference)| slippage.apply(leg.side, *reference))
            .collect();

        let net_price = order
            .legs()
            .iter()
            .zip(&leg_prices)
            .map(|(leg, price)| {
                StrategyShape::leg_contribution(order.side(), leg.side, leg.ratio, *price)
            })
            .sum();

        Ok(FillQuote {
            leg_prices,
            net_price,
            crosses_limit: true,
        })
    }
}
