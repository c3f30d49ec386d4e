//! Static exchange lot table.

use std::collections::HashMap;

use crate::application::ports::LotValidator;

/// Index and stock F&O lot sizes.
const DEFAULT_LOTS: &[(&str, u32)] = &[
    ("NIFTY", 25),
    ("BANKNIFTY", 15),
    ("FINNIFTY", 25),
    ("MIDCPNIFTY", 50),
    ("NIFTYIT", 15),
    ("SENSEX", 10),
    ("BANKEX", 15),
    ("RELIANCE", 250),
    ("TCS", 150),
    ("HDFCBANK", 550),
    ("INFY", 300),
    ("ICICIBANK", 700),
    ("SBIN", 750),
];

/// Lot sizes keyed by upper-case underlying symbol.
#[derive(Debug, Clone)]
pub struct StaticLotTable {
    lots: HashMap<String, u32>,
}

impl StaticLotTable {
    /// Table with the built-in NSE/BSE lot sizes.
    #[must_use]
    pub fn new() -> Self {
        Self {
            lots: DEFAULT_LOTS
                .iter()
                .map(|(symbol, lot)| ((*symbol).to_string(), *lot))
                .collect(),
        }
    }

    /// Add or override entries. Zero lot sizes are ignored.
    #[must_use]
    pub fn with_overrides<'a, I>(mut self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a u32)>,
    {
        for (symbol, lot) in overrides {
            if *lot == 0 {
                tracing::warn!(symbol = %symbol, "Ignoring zero lot size override");
                continue;
            }
            self.lots.insert(symbol.to_uppercase(), *lot);
        }
        self
    }

    /// Number of symbols known.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lots.len()
    }

    /// Check if the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lots.is_empty()
    }
}

impl Default for StaticLotTable {
    fn default() -> Self {
        Self::new()
    }
}

impl LotValidator for StaticLotTable {
    fn lot_size(&self, symbol: &str) -> Option<u32> {
        self.lots.get(&symbol.to_uppercase()).copied()
    }
}
