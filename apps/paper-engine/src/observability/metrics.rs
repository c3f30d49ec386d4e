//! Prometheus metrics for the paper engine.
//!
//! Counters and gauges for the order lifecycle, stop/target exits, data gaps
//! and portfolio state. Recording is a no-op until [`init_metrics`] installs
//! the exporter, so the engine records unconditionally.
//!
//! # Example
//!
//! ```ignore
//! use paper_engine::observability::{init_metrics, MetricsConfig};
//!
//! init_metrics(&MetricsConfig::default())?;
//! record_order_placed("single", "DAY");
//! ```

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Configuration for the metrics exporter.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Address to bind the metrics HTTP listener.
    pub listen_addr: SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 9090)),
        }
    }
}

impl MetricsConfig {
    /// Create a new metrics configuration with custom address.
    #[must_use]
    pub const fn with_addr(addr: SocketAddr) -> Self {
        Self { listen_addr: addr }
    }
}

/// Initialize the Prometheus metrics exporter.
///
/// This starts an HTTP server that exposes metrics at `/metrics`.
///
/// # Errors
///
/// Returns an error if the metrics exporter fails to start (e.g., port already in use).
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    PrometheusBuilder::new()
        .with_http_listener(config.listen_addr)
        .install()
        .map_err(|e| MetricsError::Installation(e.to_string()))?;

    tracing::info!(
        addr = %config.listen_addr,
        "Prometheus metrics exporter started"
    );

    Ok(())
}

/// Error type for metrics operations.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Failed to install metrics exporter.
    #[error("metrics installation error: {0}")]
    Installation(String),
}

// ============================================================================
// Order Lifecycle Metrics
// ============================================================================

/// Record an accepted order.
///
/// # Arguments
///
/// * `shape` - Strategy shape (e.g., "single", "spread")
/// * `validity` - Validity (e.g., "DAY", "IOC", "AMO")
pub fn record_order_placed(shape: &str, validity: &str) {
    counter!(
        "paper_orders_placed_total",
        "shape" => shape.to_string(),
        "validity" => validity.to_string()
    )
    .increment(1);
}

/// Record a rejected order by reason code.
pub fn record_order_rejected(code: &str) {
    counter!("paper_orders_rejected_total", "code" => code.to_string()).increment(1);
}

/// Record a filled order.
///
/// # Arguments
///
/// * `origin` - Who created the order (e.g., "REQUEST", "STOP_LOSS")
pub fn record_order_filled(origin: &str) {
    counter!("paper_orders_filled_total", "origin" => origin.to_string()).increment(1);
}

/// Record a cancelled order.
pub fn record_order_cancelled(code: &str) {
    counter!("paper_orders_cancelled_total", "code" => code.to_string()).increment(1);
}

/// Record an expired order.
pub fn record_order_expired() {
    counter!("paper_orders_expired_total").increment(1);
}

/// Record a refused cancel or modify.
pub fn record_cancel_rejected(too_late: bool) {
    counter!(
        "paper_cancel_rejected_total",
        "too_late" => too_late.to_string()
    )
    .increment(1);
}

// ============================================================================
// Monitoring Metrics
// ============================================================================

/// Record a stop-loss or target exit.
///
/// # Arguments
///
/// * `kind` - "stop_loss" or "target"
pub fn record_exit_trigger(kind: &str) {
    counter!("paper_exit_triggers_total", "kind" => kind.to_string()).increment(1);
}

/// Record a tick discarded as older than the last one seen.
pub fn record_stale_tick() {
    counter!("paper_stale_ticks_total").increment(1);
}

/// Record a data gap alert for an instrument.
pub fn record_data_gap(instrument: &str) {
    counter!("paper_data_gaps_total", "instrument" => instrument.to_string()).increment(1);
}

/// Record a position halted for an invariant breach.
pub fn record_state_corruption() {
    counter!("paper_state_corruptions_total").increment(1);
}

// ============================================================================
// Portfolio Metrics
// ============================================================================

/// Update portfolio gauges.
///
/// # Arguments
///
/// * `open_positions` - Open position count
/// * `pending_orders` - Pending order count
/// * `total_pnl` - Realized plus net unrealized P&L
pub fn update_portfolio(open_positions: usize, pending_orders: usize, total_pnl: f64) {
    #[allow(clippy::cast_precision_loss)]
    {
        gauge!("paper_open_positions").set(open_positions as f64);
        gauge!("paper_pending_orders").set(pending_orders as f64);
    }
    gauge!("paper_total_pnl").set(total_pnl);
}
