//! Prometheus metrics for the spreadbot agent.
//!
//! Covers:
//! - Quoting cycles by outcome and their duration
//! - Orders submitted, rejected, canceled and dropped by the budget
//! - Fills by side
//! - Recovered cycle errors by kind
//! - Scheduler ticks skipped because of an overrun
//!
//! # Panics
//!
//! Metric registration uses `unwrap()`. A registration failure means a
//! duplicate metric name, which should crash at startup. These panics only
//! occur during static initialization.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, register_int_counter, register_int_gauge_vec,
    CounterVec, Encoder, HistogramVec, IntCounter, IntGaugeVec, TextEncoder,
};

use crate::error::TelemetryResult;

/// Completed cycles.
/// Labels: pair, outcome (quoted/cancel_only)
pub static CYCLES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "spreadbot_cycles_total",
        "Completed quoting cycles by outcome",
        &["pair", "outcome"]
    )
    .unwrap()
});

/// Cycle wall time in milliseconds.
pub static CYCLE_DURATION_MS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "spreadbot_cycle_duration_ms",
        "Quoting cycle duration in milliseconds",
        &["pair"],
        vec![1.0, 5.0, 10.0, 50.0, 100.0, 500.0, 1000.0, 5000.0, 20000.0]
    )
    .unwrap()
});

/// Orders acknowledged by the venue.
pub static ORDERS_SUBMITTED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "spreadbot_orders_submitted_total",
        "Orders acknowledged by the venue",
        &["pair", "side"]
    )
    .unwrap()
});

/// Submissions refused by the venue.
pub static ORDERS_REJECTED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "spreadbot_orders_rejected_total",
        "Order submissions refused by the venue",
        &["pair", "side"]
    )
    .unwrap()
});

/// Orders removed by cancel-then-replace.
/// Labels: result (canceled/not_found)
pub static ORDERS_CANCELED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "spreadbot_orders_canceled_total",
        "Tracked orders removed by cancellation",
        &["pair", "result"]
    )
    .unwrap()
});

/// Candidates dropped by the budget adjuster.
pub static BUDGET_DROPS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "spreadbot_budget_drops_total",
        "Candidates dropped by the budget adjuster",
        &["pair", "side"]
    )
    .unwrap()
});

/// Applied fills.
pub static FILLS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "spreadbot_fills_total",
        "Fill deliveries applied",
        &["pair", "side"]
    )
    .unwrap()
});

/// Redelivered fills ignored by dedupe.
pub static DUPLICATE_FILLS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "spreadbot_duplicate_fills_total",
        "Fill deliveries ignored as duplicates"
    )
    .unwrap()
});

/// Recovered cycle errors.
/// Labels: kind (oracle_unavailable/budget_unavailable/gateway_timeout/...)
pub static CYCLE_ERRORS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "spreadbot_cycle_errors_total",
        "Errors recovered at the cycle boundary",
        &["pair", "kind"]
    )
    .unwrap()
});

/// Boundaries skipped because the previous cycle overran.
pub static SKIPPED_TICKS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "spreadbot_skipped_ticks_total",
        "Scheduler boundaries skipped due to cycle overrun"
    )
    .unwrap()
});

/// Orders currently tracked.
pub static TRACKED_ORDERS: Lazy<IntGaugeVec> = Lazy::new(|| {
    register_int_gauge_vec!(
        "spreadbot_tracked_orders",
        "Orders currently tracked by the lifecycle manager",
        &["pair"]
    )
    .unwrap()
});

/// Metrics helper.
pub struct Metrics;

impl Metrics {
    // =========================================================================
    // Cycle
    // =========================================================================

    /// Record a completed cycle.
    pub fn cycle_completed(pair: &str, outcome: &str, duration_ms: f64) {
        CYCLES_TOTAL.with_label_values(&[pair, outcome]).inc();
        CYCLE_DURATION_MS
            .with_label_values(&[pair])
            .observe(duration_ms);
    }

    /// Record an error recovered at the cycle boundary.
    pub fn cycle_error(pair: &str, kind: &str) {
        CYCLE_ERRORS_TOTAL.with_label_values(&[pair, kind]).inc();
    }

    /// Record boundaries skipped after an overrun.
    pub fn ticks_skipped(count: u64) {
        SKIPPED_TICKS_TOTAL.inc_by(count);
    }

    // =========================================================================
    // Orders
    // =========================================================================

    pub fn order_submitted(pair: &str, side: &str) {
        ORDERS_SUBMITTED_TOTAL.with_label_values(&[pair, side]).inc();
    }

    pub fn order_rejected(pair: &str, side: &str) {
        ORDERS_REJECTED_TOTAL.with_label_values(&[pair, side]).inc();
    }

    /// `result` is `canceled` or `not_found`.
    pub fn order_canceled(pair: &str, result: &str) {
        ORDERS_CANCELED_TOTAL.with_label_values(&[pair, result]).inc();
    }

    pub fn budget_dropped(pair: &str, side: &str) {
        BUDGET_DROPS_TOTAL.with_label_values(&[pair, side]).inc();
    }

    pub fn tracked_orders(pair: &str, count: usize) {
        TRACKED_ORDERS
            .with_label_values(&[pair])
            .set(count as i64);
    }

    // =========================================================================
    // Fills
    // =========================================================================

    pub fn fill_applied(pair: &str, side: &str) {
        FILLS_TOTAL.with_label_values(&[pair, side]).inc();
    }

    pub fn duplicate_fill() {
        DUPLICATE_FILLS_TOTAL.inc();
    }

    // =========================================================================
    // Exposition
    // =========================================================================

    /// Render every registered metric in the Prometheus text format.
    pub fn render() -> TelemetryResult<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&prometheus::gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
