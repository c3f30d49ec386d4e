//! Observability module for metrics.
//!
//! Prometheus export for the engine's counters and gauges. Logging setup
//! lives in [`crate::telemetry`].

mod metrics;

pub use metrics::{
    MetricsConfig, MetricsError, init_metrics, record_cancel_rejected, record_data_gap,
    record_exit_trigger, record_order_cancelled, record_order_expired, record_order_filled,
    record_order_placed, record_order_rejected, record_stale_tick, record_state_corruption,
    update_portfolio,
};
