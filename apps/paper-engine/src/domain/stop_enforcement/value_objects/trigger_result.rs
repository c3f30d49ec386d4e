//! Trigger Result Value Object

use rust_decimal::Decimal;

/// Result of checking a price against stop/target levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerResult {
    /// No trigger occurred.
    None,
    /// Stop-loss was triggered.
    StopLoss {
        /// Configured level.
        level: Decimal,
        /// Price that reached it.
        price: Decimal,
    },
    /// Target was triggered.
    Target {
        /// Configured level.
        level: Decimal,
        /// Price that reached it.
        price: Decimal,
    },
}

impl TriggerResult {
    /// Check if any trigger occurred.
    #[must_use]
    pub const fn is_triggered(&self) -> bool {
        !matches!(self, Self::None)
    }

    /// Check if stop-loss was triggered.
    #[must_use]
    pub const fn is_stop_loss(&self) -> bool {
        matches!(self, Self::StopLoss { .. })
    }

    /// Check if target was triggered.
    #[must_use]
    pub const fn is_target(&self) -> bool {
        matches!(self, Self::Target { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_result_none() {
        let result = TriggerResult::None;
        assert!(!result.is_triggered());
        assert!(!result.is_stop_loss());
        assert!(!result.is_target());
    }

    #[test]
    fn trigger_result_kinds() {
        let sl = TriggerResult::StopLoss {
            level: Decimal::new(90, 0),
            price: Decimal::new(89, 0),
        };
        assert!(sl.is_triggered());
        assert!(sl.is_stop_loss());
        let tp = TriggerResult::Target {
            level: Decimal::new(120, 0),
            price: Decimal::new(121, 0),
        };
        assert!(tp.is_target());
    }
}
