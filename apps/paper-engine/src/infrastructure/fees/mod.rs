//! Schedule-based fee model.
//!
//! Indian F&O charges for option premium turnover. Brokerage is charged per
//! leg fill, either flat or as a capped percentage. Percent rates are
//! expressed in percent (0.053 means 0.053%).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::application::ports::{FeeBreakdown, FeeModel};
use crate::domain::order_execution::value_objects::OrderSide;
use crate::domain::shared::{Money, Quantity};

/// Percent divisor (1% = 0.01).
const PERCENT_DIVISOR: Decimal = Decimal::from_parts(100, 0, 0, false, 0);

/// Named broker fee schedules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeeSchedule {
    /// ₹15 per order.
    #[default]
    AliceBlue,
    /// ₹20 per order.
    Zerodha,
    /// ₹20 per order with simplified STT and exchange rates.
    Flat,
    /// Rates supplied entirely by configuration.
    Custom,
}

/// How brokerage is charged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Brokerage {
    /// Fixed amount per order.
    PerOrder {
        /// Rupees per order.
        amount: Decimal,
    },
    /// Percentage of turnover with an optional cap.
    Percent {
        /// Percent of turnover.
        percent: Decimal,
        /// Maximum per order.
        #[serde(default)]
        cap: Option<Decimal>,
    },
}

impl Brokerage {
    fn charge(&self, turnover: Decimal) -> Decimal {
        match *self {
            Self::PerOrder { amount } => amount,
            Self::Percent { percent, cap } => {
                let raw = turnover * percent / PERCENT_DIVISOR;
                cap.map_or(raw, |cap| raw.min(cap))
            }
        }
    }
}

/// Statutory and broker rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeRates {
    /// Broker commission.
    pub brokerage: Brokerage,
    /// STT on sell-side premium.
    pub stt_sell_percent: Decimal,
    /// Exchange transaction charge.
    pub exchange_percent: Decimal,
    /// SEBI turnover fee.
    pub sebi_percent: Decimal,
    /// Stamp duty on buy-side premium.
    pub stamp_buy_percent: Decimal,
    /// GST on brokerage plus exchange charges.
    pub gst_percent: Decimal,
}

impl FeeRates {
    /// Rates for a named schedule. `Custom` starts from the statutory rates
    /// with zero brokerage.
    #[must_use]
    pub const fn preset(schedule: FeeSchedule) -> Self {
        let amount = match schedule {
            FeeSchedule::AliceBlue => Decimal::from_parts(15, 0, 0, false, 0),
            FeeSchedule::Zerodha | FeeSchedule::Flat => Decimal::from_parts(20, 0, 0, false, 0),
            FeeSchedule::Custom => Decimal::ZERO,
        };
        // FLAT uses simplified statutory rates.
        let (stt_sell_percent, exchange_percent) = match schedule {
            FeeSchedule::Flat => (
                Decimal::from_parts(5, 0, 0, false, 2),
                Decimal::from_parts(5, 0, 0, false, 2),
            ),
            _ => (
                Decimal::from_parts(625, 0, 0, false, 4),
                Decimal::from_parts(53, 0, 0, false, 3),
            ),
        };
        Self {
            brokerage: Brokerage::PerOrder { amount },
            stt_sell_percent,
            exchange_percent,
            sebi_percent: Decimal::from_parts(1, 0, 0, false, 4),
            stamp_buy_percent: Decimal::from_parts(3, 0, 0, false, 3),
            gst_percent: Decimal::from_parts(18, 0, 0, false, 0),
        }
    }
}

impl Default for FeeRates {
    fn default() -> Self {
        Self::preset(FeeSchedule::default())
    }
}

/// Fee model computing the itemized schedule per leg fill.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScheduleFeeModel {
    rates: FeeRates,
}

impl ScheduleFeeModel {
    /// Create a model from explicit rates.
    #[must_use]
    pub const fn new(rates: FeeRates) -> Self {
        Self { rates }
    }

    /// Create a model for a named schedule.
    #[must_use]
    pub const fn for_schedule(schedule: FeeSchedule) -> Self {
        Self::new(FeeRates::preset(schedule))
    }

    /// Active rates.
    #[must_use]
    pub const fn rates(&self) -> &FeeRates {
        &self.rates
    }
}

impl FeeModel for ScheduleFeeModel {
    fn fees(&self, side: OrderSide, quantity: Quantity, price: Decimal) -> FeeBreakdown {
        let turnover = price * Decimal::from(quantity.units());
        let percent_of = |rate: Decimal| turnover * rate / PERCENT_DIVISOR;

        let brokerage = self.rates.brokerage.charge(turnover);
        let stt = match side {
            OrderSide::Sell => percent_of(self.rates.stt_sell_percent),
            OrderSide::Buy => Decimal::ZERO,
        };
        let exchange = percent_of(self.rates.exchange_percent);
        let sebi = percent_of(self.rates.sebi_percent);
        let stamp = match side {
            OrderSide::Buy => percent_of(self.rates.stamp_buy_percent),
            OrderSide::Sell => Decimal::ZERO,
        };
        let gst = (brokerage + exchange) * self.rates.gst_percent / PERCENT_DIVISOR;

        FeeBreakdown::new(
            Money::new(brokerage),
            Money::new(stt),
            Money::new(exchange),
            Money::new(sebi),
            Money::new(stamp),
            Money::new(gst),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use test_case::test_case;

    #[test]
    fn alice_blue_buy_breakdown() {
        let model = ScheduleFeeModel::for_schedule(FeeSchedule::AliceBlue);
        let fees = model.fees(OrderSide::Buy, Quantity::new(25), dec!(100));
        assert_eq!(fees.brokerage, Money::new(dec!(15)));
        assert_eq!(fees.stt, Money::ZERO);
        assert_eq!(fees.exchange_charges, Money::new(dec!(1.325)));
        assert_eq!(fees.sebi_charges, Money::new(dec!(0.0025)));
        assert_eq!(fees.stamp_duty, Money::new(dec!(0.075)));
        assert_eq!(fees.gst, Money::new(dec!(2.9385)));
        assert_eq!(fees.total, Money::new(dec!(19.341)));
        assert_eq!(fees.rounded().total, Money::new(dec!(19.34)));
    }

    #[test]
    fn zerodha_sell_breakdown() {
        let model = ScheduleFeeModel::for_schedule(FeeSchedule::Zerodha);
        let fees = model.fees(OrderSide::Sell, Quantity::new(25), dec!(110));
        assert_eq!(fees.stt, Money::new(dec!(1.71875)));
        assert_eq!(fees.stamp_duty, Money::ZERO);
        assert_eq!(fees.exchange_charges, Money::new(dec!(1.4575)));
        assert_eq!(fees.gst, Money::new(dec!(3.86235)));
        assert_eq!(fees.total, Money::new(dec!(27.04135)));
    }

    #[test]
    fn flat_sell_uses_simplified_rates() {
        let model = ScheduleFeeModel::for_schedule(FeeSchedule::Flat);
        let fees = model.fees(OrderSide::Sell, Quantity::new(25), dec!(100));
        assert_eq!(fees.brokerage, Money::new(dec!(20)));
        assert_eq!(fees.stt, Money::new(dec!(1.25)));
        assert_eq!(fees.exchange_charges, Money::new(dec!(1.25)));
        assert_eq!(fees.gst, Money::new(dec!(3.825)));
        assert_eq!(fees.total, Money::new(dec!(26.3275)));
    }

    #[test_case(dec!(2500), dec!(0.75) ; "below cap")]
    #[test_case(dec!(1000000), dec!(20) ; "capped")]
    fn percent_brokerage(turnover: Decimal, expected: Decimal) {
        let brokerage = Brokerage::Percent {
            percent: dec!(0.03),
            cap: Some(dec!(20)),
        };
        assert_eq!(brokerage.charge(turnover), expected);
    }

    #[test]
    fn custom_schedule_has_no_brokerage() {
        let model = ScheduleFeeModel::for_schedule(FeeSchedule::Custom);
        let fees = model.fees(OrderSide::Buy, Quantity::new(25), dec!(100));
        assert_eq!(fees.brokerage, Money::ZERO);
        assert!(fees.total.is_positive());
    }

    #[test]
    fn brokerage_deserializes_tagged() {
        let brokerage: Brokerage =
            serde_json::from_str(r#"{"mode": "percent", "percent": "0.03", "cap": "20"}"#).unwrap();
        assert!(matches!(brokerage, Brokerage::Percent { cap: Some(_), .. }));
    }
}
