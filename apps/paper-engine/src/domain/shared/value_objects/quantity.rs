//! Quantity value object for contract counts.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::shared::DomainError;

/// A whole number of option contracts (units, not lots).
///
/// Exchange-listed options trade in lots; [`Quantity::validate_lots`] checks
/// that a quantity is a positive whole number of lots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(u32);

impl Quantity {
    /// Zero quantity.
    pub const ZERO: Self = Self(0);

    /// Create a new quantity.
    #[must_use]
    pub const fn new(units: u32) -> Self {
        Self(units)
    }

    /// Number of contracts.
    #[must_use]
    pub const fn units(&self) -> u32 {
        self.0
    }

    /// Returns true if this quantity is zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Multiply by a leg ratio, returning `None` on overflow.
    #[must_use]
    pub const fn times(&self, ratio: u32) -> Option<Self> {
        match self.0.checked_mul(ratio) {
            Some(units) => Some(Self(units)),
            None => None,
        }
    }

    /// Number of whole lots contained in this quantity.
    #[must_use]
    pub const fn lots(&self, lot_size: u32) -> u32 {
        if lot_size == 0 { 0 } else { self.0 / lot_size }
    }

    /// Validate that this quantity is a positive whole number of lots.
    ///
    /// # Errors
    ///
    /// Returns error if the quantity is zero or not a multiple of `lot_size`.
    pub fn validate_lots(&self, lot_size: u32) -> Result<(), DomainError> {
        if self.0 == 0 {
            return Err(DomainError::invalid("quantity", "Quantity must be positive"));
        }
        if lot_size == 0 || self.0 % lot_size != 0 {
            return Err(DomainError::NotLotMultiple {
                quantity: self.0,
                lot_size,
            });
        }
        Ok(())
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for Quantity {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(25, 25 => true ; "one lot")]
    #[test_case(75, 25 => true ; "three lots")]
    #[test_case(30, 25 => false ; "partial lot")]
    #[test_case(0, 25 => false ; "zero")]
    #[test_case(25, 0 => false ; "zero lot size")]
    fn validate_lots(units: u32, lot_size: u32) -> bool {
        Quantity::new(units).validate_lots(lot_size).is_ok()
    }

    #[test]
    fn lots_and_ratio() {
        let q = Quantity::new(50);
        assert_eq!(q.lots(25), 2);
        assert_eq!(q.times(2), Some(Quantity::new(100)));
        assert_eq!(Quantity::new(u32::MAX).times(2), None);
    }

    #[test]
    fn lot_mismatch_message_names_both_values() {
        let Err(err) = Quantity::new(30).validate_lots(25) else {
            panic!("expected lot size violation");
        };
        assert!(err.to_string().contains("30"));
        assert!(err.to_string().contains("25"));
    }
}
