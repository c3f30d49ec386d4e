//! Instrument Bounded Context
//!
//! Immutable descriptions of exchange-listed option contracts, looked up by the
//! stable token an external instrument mapper assigns.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::shared::{DomainError, InstrumentToken};

/// Option contract kind.
///
/// `Straddle`, `Strangle` and `Spread` describe synthetic leg-pair instruments
/// whose price is quoted as a single combined premium.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OptionKind {
    /// Call option.
    #[serde(alias = "CE")]
    Call,
    /// Put option.
    #[serde(alias = "PE")]
    Put,
    /// Call and put at the same strike.
    Straddle,
    /// Call and put at different strikes.
    Strangle,
    /// Two options of the same kind at different strikes.
    Spread,
}

impl OptionKind {
    /// Whether this kind needs a second strike.
    #[must_use]
    pub const fn needs_strike_pair(&self) -> bool {
        matches!(self, Self::Strangle | Self::Spread)
    }
}

impl fmt::Display for OptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Call => "CE",
            Self::Put => "PE",
            Self::Straddle => "STRADDLE",
            Self::Strangle => "STRANGLE",
            Self::Spread => "SPREAD",
        };
        write!(f, "{s}")
    }
}

/// Parameters for building an [`Instrument`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentSpec {
    /// Stable token.
    pub token: InstrumentToken,
    /// Underlying symbol (e.g. NIFTY).
    pub underlying: String,
    /// Expiry date.
    pub expiry: NaiveDate,
    /// Strike price.
    pub strike: Decimal,
    /// Second strike for strangles and spreads.
    #[serde(default)]
    pub second_strike: Option<Decimal>,
    /// Contract kind.
    pub kind: OptionKind,
    /// Exchange lot size.
    pub lot_size: u32,
    /// Whether new orders may be placed.
    #[serde(default = "default_tradable")]
    pub tradable: bool,
}

const fn default_tradable() -> bool {
    true
}

/// A tradeable option contract. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "InstrumentSpec", into = "InstrumentSpec")]
pub struct Instrument {
    spec: InstrumentSpec,
}

impl Instrument {
    /// Build an instrument after checking its fields.
    ///
    /// # Errors
    ///
    /// Returns error if the lot size or strikes are invalid.
    pub fn new(spec: InstrumentSpec) -> Result<Self, DomainError> {
        if spec.lot_size == 0 {
            return Err(DomainError::invalid("lot_size", "Lot size must be positive"));
        }
        if spec.strike <= Decimal::ZERO {
            return Err(DomainError::invalid(
                "strike",
                format!("Strike must be positive, got {}", spec.strike),
            ));
        }
        if spec.kind.needs_strike_pair() && spec.second_strike.is_none() {
            return Err(DomainError::invalid(
                "second_strike",
                format!("{} requires a strike pair", spec.kind),
            ));
        }
        if spec.underlying.trim().is_empty() {
            return Err(DomainError::invalid("underlying", "Underlying symbol cannot be empty"));
        }
        Ok(Self { spec })
    }

    /// Stable token.
    #[must_use]
    pub const fn token(&self) -> &InstrumentToken {
        &self.spec.token
    }

    /// Underlying symbol.
    #[must_use]
    pub fn underlying(&self) -> &str {
        &self.spec.underlying
    }

    /// Expiry date.
    #[must_use]
    pub const fn expiry(&self) -> NaiveDate {
        self.spec.expiry
    }

    /// Strike price.
    #[must_use]
    pub const fn strike(&self) -> Decimal {
        self.spec.strike
    }

    /// Second strike, if any.
    #[must_use]
    pub const fn second_strike(&self) -> Option<Decimal> {
        self.spec.second_strike
    }

    /// Contract kind.
    #[must_use]
    pub const fn kind(&self) -> OptionKind {
        self.spec.kind
    }

    /// Exchange lot size.
    #[must_use]
    pub const fn lot_size(&self) -> u32 {
        self.spec.lot_size
    }

    /// Whether new orders may be placed.
    #[must_use]
    pub const fn is_tradable(&self) -> bool {
        self.spec.tradable
    }
}

impl TryFrom<InstrumentSpec> for Instrument {
    type Error = DomainError;

    fn try_from(spec: InstrumentSpec) -> Result<Self, Self::Error> {
        Self::new(spec)
    }
}

impl From<Instrument> for InstrumentSpec {
    fn from(instrument: Instrument) -> Self {
        instrument.spec
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.spec.underlying,
            self.spec.expiry.format("%d%b%y"),
            self.spec.strike,
            self.spec.kind
        )
    }
}
