//! Fee Model Port (Driven Port)
//!
//! Pure function from a filled quantity, price and side to itemized
//! transaction costs.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::order_execution::value_objects::OrderSide;
use crate::domain::shared::{Money, Quantity};

/// Itemized transaction costs for one fill.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeBreakdown {
    /// Broker commission.
    pub brokerage: Money,
    /// Securities transaction tax.
    pub stt: Money,
    /// Exchange transaction charges.
    pub exchange_charges: Money,
    /// SEBI turnover fee.
    pub sebi_charges: Money,
    /// Stamp duty.
    pub stamp_duty: Money,
    /// GST.
    pub gst: Money,
    /// Sum of all components.
    pub total: Money,
}

impl FeeBreakdown {
    /// Build a breakdown and compute its total.
    #[must_use]
    pub fn new(
        brokerage: Money,
        stt: Money,
        exchange_charges: Money,
        sebi_charges: Money,
        stamp_duty: Money,
        gst: Money,
    ) -> Self {
        Self {
            brokerage,
            stt,
            exchange_charges,
            sebi_charges,
            stamp_duty,
            gst,
            total: brokerage + stt + exchange_charges + sebi_charges + stamp_duty + gst,
        }
    }

    /// Round every component to paise for reporting.
    #[must_use]
    pub fn rounded(&self) -> Self {
        Self {
            brokerage: self.brokerage.round(),
            stt: self.stt.round(),
            exchange_charges: self.exchange_charges.round(),
            sebi_charges: self.sebi_charges.round(),
            stamp_duty: self.stamp_duty.round(),
            gst: self.gst.round(),
            total: self.total.round(),
        }
    }
}

/// Port for computing fees.
pub trait FeeModel: Send + Sync {
    /// Fees for one fill.
    fn fees(&self, side: OrderSide, quantity: Quantity, price: Decimal) -> FeeBreakdown;
}

/// Fee model that charges nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroFeeModel;

impl FeeModel for ZeroFeeModel {
    fn fees(&self, _side: OrderSide, _quantity: Quantity, _price: Decimal) -> FeeBreakdown {
        FeeBreakdown::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn breakdown_total_sums_components() {
        let fees = FeeBreakdown::new(
            Money::new(dec!(20)),
            Money::new(dec!(1.5)),
            Money::new(dec!(1.3)),
            Money::new(dec!(0.01)),
            Money::ZERO,
            Money::new(dec!(3.83)),
        );
        assert_eq!(fees.total, Money::new(dec!(26.64)));
    }

    #[test]
    fn zero_fee_model() {
        let fees = ZeroFeeModel.fees(OrderSide::Buy, Quantity::new(25), dec!(100));
        assert!(fees.total.is_zero());
    }
}
