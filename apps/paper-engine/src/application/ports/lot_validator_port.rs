//! Lot Validator Port (Driven Port)
//!
//! Exchange lot sizes by underlying symbol.

use crate::domain::instrument::Instrument;
use crate::domain::order_execution::value_objects::RejectReason;
use crate::domain::shared::Quantity;

/// Port for lot-size lookup and validation.
pub trait LotValidator: Send + Sync {
    /// Lot size for an underlying symbol, if known.
    fn lot_size(&self, symbol: &str) -> Option<u32>;

    /// Lot size for an instrument: the table entry for its underlying, or the
    /// instrument's own lot size when the table has none.
    fn lot_size_for(&self, instrument: &Instrument) -> u32 {
        self.lot_size(instrument.underlying())
            .unwrap_or_else(|| instrument.lot_size())
    }

    /// Check that `quantity` is a positive whole number of lots.
    ///
    /// # Errors
    ///
    /// Returns `LOT_SIZE_MISMATCH` otherwise.
    fn validate(&self, instrument: &Instrument, quantity: Quantity) -> Result<(), RejectReason> {
        let lot_size = self.lot_size_for(instrument);
        quantity.validate_lots(lot_size).map_err(|_| {
            RejectReason::lot_size_mismatch(instrument.underlying(), quantity.units(), lot_size)
        })
    }
}

/// Validator that trusts each instrument's own lot size.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstrumentLotValidator;

impl LotValidator for InstrumentLotValidator {
    fn lot_size(&self, _symbol: &str) -> Option<u32> {
        None
    }
}
