//! Prometheus metrics collection for courierd.
//!
//! Exposed on an HTTP endpoint (see [`crate::http`]). Tracks session counts,
//! command throughput, and message routing outcomes.
//!
//! - `courier_command_total{command}` - Commands processed by type
//! - `courier_command_duration_seconds{command}` - Command latency histogram
//! - `courier_room_fanout` - Recipients per room broadcast (histogram)

use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};
use std::sync::OnceLock;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

// ========================================================================
// Counters (monotonic increasing)
// ========================================================================

/// Directed messages handed to a live connection.
pub static MESSAGES_FORWARDED: OnceLock<IntCounter> = OnceLock::new();

/// Directed messages stored for an offline recipient.
pub static OFFLINE_ENQUEUED: OnceLock<IntCounter> = OnceLock::new();

/// Forwards dropped because the target queue was full or closed.
pub static DELIVERY_FAILURES: OnceLock<IntCounter> = OnceLock::new();

// ========================================================================
// Gauges (can increase/decrease)
// ========================================================================

/// Currently registered sessions.
pub static CONNECTED_SESSIONS: OnceLock<IntGauge> = OnceLock::new();

/// Rooms with at least one member.
pub static ACTIVE_ROOMS: OnceLock<IntGauge> = OnceLock::new();

// ========================================================================
// Per-command metrics
// ========================================================================

/// Commands processed by type (REGISTER, DIRECT, JOIN, etc.).
pub static COMMAND_COUNTER: OnceLock<IntCounterVec> = OnceLock::new();

/// Command processing latency by command type.
pub static COMMAND_LATENCY: OnceLock<HistogramVec> = OnceLock::new();

/// Command errors by type and error kind.
pub static COMMAND_ERRORS: OnceLock<IntCounterVec> = OnceLock::new();

/// Message fan-out histogram: how many members received a room broadcast.
pub static ROOM_FANOUT: OnceLock<Histogram> = OnceLock::new();

/// Initialize the Prometheus metrics registry.
///
/// Must be called once at server startup before any metrics are recorded.
pub fn init() {
    let r = registry();

    // Helper macro to register metric
    macro_rules! register {
        ($metric:ident, $init:expr) => {
            let m = $init.expect(concat!(stringify!($metric), " creation failed"));
            if let Err(e) = r.register(Box::new(m.clone())) {
                tracing::warn!(error = %e, concat!("Failed to register metric ", stringify!($metric)));
            }
            let _ = $metric.set(m);
        };
    }

    register!(MESSAGES_FORWARDED, IntCounter::new("courier_messages_forwarded_total", "Directed messages delivered to a live connection"));
    register!(OFFLINE_ENQUEUED, IntCounter::new("courier_offline_enqueued_total", "Directed messages stored for offline recipients"));
    register!(DELIVERY_FAILURES, IntCounter::new("courier_delivery_failures_total", "Forwards dropped on a full or closed queue"));
    register!(CONNECTED_SESSIONS, IntGauge::new("courier_connected_sessions", "Currently registered sessions"));
    register!(ACTIVE_ROOMS, IntGauge::new("courier_active_rooms", "Rooms with at least one member"));

    register!(COMMAND_COUNTER, IntCounterVec::new(Opts::new("courier_command_total", "Commands processed by type"), &["command"]));
    register!(COMMAND_LATENCY, HistogramVec::new(
        HistogramOpts::new("courier_command_duration_seconds", "Command latency by type")
            .buckets(vec![0.00005, 0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5]),
        &["command"]));
    register!(COMMAND_ERRORS, IntCounterVec::new(Opts::new("courier_command_errors_total", "Command errors by type"), &["command", "error"]));
    register!(ROOM_FANOUT, Histogram::with_opts(
        HistogramOpts::new("courier_room_fanout", "Recipients per room broadcast")
            .buckets(vec![0.0, 1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0])));
}

/// Gather all metrics and encode them in Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode Prometheus metrics");
        return String::new();
    }
    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
            String::new()
        }
    }
}

// ============================================================================
// Helper functions for metric updates
// ============================================================================

#[inline]
fn inc(metric: &OnceLock<IntCounter>) {
    if let Some(c) = metric.get() {
        c.inc();
    }
}

#[inline]
fn set_gauge(metric: &OnceLock<IntGauge>, value: usize) {
    if let Some(g) = metric.get() {
        g.set(i64::try_from(value).unwrap_or(i64::MAX));
    }
}

/// Record a command execution with latency.
#[inline]
pub fn record_command(command: &str, duration_secs: f64) {
    if let Some(c) = COMMAND_COUNTER.get() {
        c.with_label_values(&[command]).inc();
    }
    if let Some(h) = COMMAND_LATENCY.get() {
        h.with_label_values(&[command]).observe(duration_secs);
    }
}

/// Record a command error.
#[inline]
pub fn record_command_error(command: &str, error: &str) {
    if let Some(c) = COMMAND_ERRORS.get() {
        c.with_label_values(&[command, error]).inc();
    }
}

#[inline]
pub fn record_forwarded() {
    inc(&MESSAGES_FORWARDED);
}

#[inline]
pub fn record_offline_enqueued() {
    inc(&OFFLINE_ENQUEUED);
}

#[inline]
pub fn record_delivery_failures(count: usize) {
    if let Some(c) = DELIVERY_FAILURES.get() {
        c.inc_by(count as u64);
    }
}

/// Record message fan-out (how many members received a room broadcast).
#[inline]
pub fn record_fanout(recipients: usize) {
    if let Some(h) = ROOM_FANOUT.get() {
        h.observe(recipients as f64);
    }
}

#[inline]
pub fn set_connected_sessions(count: usize) {
    set_gauge(&CONNECTED_SESSIONS, count);
}

#[inline]
pub fn set_active_rooms(count: usize) {
    set_gauge(&ACTIVE_ROOMS, count);
}
