//! Strongly-typed identifiers for domain entities.
//!
//! These prevent mixing up order ids, instrument tokens and strategy tags.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new identifier from a string.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Get the inner string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

define_id!(OrderId, "Unique identifier for a simulated order.");
define_id!(
    InstrumentToken,
    "Stable instrument token supplied by the external instrument mapper."
);
define_id!(
    StrategyTag,
    "Strategy tag grouping the legs and fills of one trading idea."
);
define_id!(TradeId, "Unique identifier for a closed trade record.");

impl OrderId {
    /// Build the engine's sequential order id for the given counter value.
    #[must_use]
    pub fn sequential(counter: u64) -> Self {
        Self(format!("ORD-{counter:06}"))
    }
}

impl TradeId {
    /// Generate a new unique trade id using UUID v4.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}
