//! Order validity: how long an unfilled order remains eligible to fill.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Order validity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Validity {
    /// Valid until the session close.
    #[default]
    #[serde(alias = "day")]
    Day,
    /// Immediate-or-cancel: cancelled if the first evaluation does not fill it.
    #[serde(alias = "ioc")]
    Ioc,
    /// After-market order: queued outside hours, evaluated once the session opens.
    #[serde(alias = "amo")]
    Amo,
}

impl Validity {
    /// Returns true if this validity is cancelled after one unfilled evaluation.
    #[must_use]
    pub const fn is_immediate(&self) -> bool {
        matches!(self, Self::Ioc)
    }

    /// Returns true if the order may be accepted while the market is closed.
    #[must_use]
    pub const fn allows_after_market(&self) -> bool {
        matches!(self, Self::Amo)
    }
}

impl fmt::Display for Validity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Day => write!(f, "DAY"),
            Self::Ioc => write!(f, "IOC"),
            Self::Amo => write!(f, "AMO"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validity_flags() {
        assert!(Validity::Ioc.is_immediate());
        assert!(!Validity::Day.is_immediate());
        assert!(Validity::Amo.allows_after_market());
        assert!(!Validity::Ioc.allows_after_market());
    }

    #[test]
    fn validity_serde_accepts_lowercase() {
        let v: Validity = serde_json::from_str("\"ioc\"").unwrap();
        assert_eq!(v, Validity::Ioc);
        assert_eq!(serde_json::to_string(&Validity::Amo).unwrap(), "\"AMO\"");
        assert_eq!(Validity::default(), Validity::Day);
    }
}
