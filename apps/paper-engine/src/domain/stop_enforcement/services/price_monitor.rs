//! Price Monitor Domain Service

use rust_decimal::Decimal;

use crate::domain::stop_enforcement::value_objects::{
    PositionDirection, SameTickPriority, StopTargetLevels, TriggerResult,
};

/// Checks mark prices against stop/target levels.
///
/// Long positions stop out at or below the stop-loss and take profit at or
/// above the target. Short positions mirror that.
#[derive(Debug, Clone, Copy, Default)]
pub struct PriceMonitor {
    priority: SameTickPriority,
}

impl PriceMonitor {
    /// Create a monitor with the given same-tick rule.
    #[must_use]
    pub const fn new(priority: SameTickPriority) -> Self {
        Self { priority }
    }

    /// Same-tick rule.
    #[must_use]
    pub const fn priority(&self) -> SameTickPriority {
        self.priority
    }

    /// Check one price against a position's levels.
    #[must_use]
    pub fn check(
        &self,
        direction: PositionDirection,
        levels: &StopTargetLevels,
        price: Decimal,
    ) -> TriggerResult {
        let stop = levels
            .stop_loss
            .filter(|level| match direction {
                PositionDirection::Long => price <= *level,
                PositionDirection::Short => price >= *level,
            })
            .map(|level| TriggerResult::StopLoss { level, price });
        let target = levels
            .target
            .filter(|level| match direction {
                PositionDirection::Long => price >= *level,
                PositionDirection::Short => price <= *level,
            })
            .map(|level| TriggerResult::Target { level, price });

        let (first, second) = match self.priority {
            SameTickPriority::StopFirst => (stop, target),
            SameTickPriority::TargetFirst => (target, stop),
        };
        first.or(second).unwrap_or(TriggerResult::None)
    }
}
