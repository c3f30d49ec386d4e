//! Stop Enforcement Domain Services

mod price_monitor;

pub use price_monitor::PriceMonitor;
