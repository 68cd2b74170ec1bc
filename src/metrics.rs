//! Prometheus metrics collection for parleyd.
//!
//! Tracks event throughput, errors, presence and fan-out behaviour,
//! exposed on an HTTP endpoint for scraping.
//!
//! - `chat_events_total{event}` - inbound events processed by kind
//! - `chat_event_errors_total{event,error}` - handler errors by kind
//! - `chat_connected_users` - live connections (gauge)
//! - `chat_active_rooms` - materialized rooms (gauge)
//! - `chat_message_fanout` - recipients per broadcast (histogram)

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::OnceLock;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

/// Outbound events successfully queued to a connection.
pub static EVENTS_SENT: OnceLock<IntCounter> = OnceLock::new();

/// Outbound events dropped because a connection's queue was full.
pub static EVENTS_DROPPED: OnceLock<IntCounter> = OnceLock::new();

/// Inbound events rejected by per-connection flood protection.
pub static RATE_LIMITED: OnceLock<IntCounter> = OnceLock::new();

/// Inbound events processed, by event kind.
pub static EVENT_COUNTER: OnceLock<IntCounterVec> = OnceLock::new();

/// Handler errors, by event kind and error code.
pub static EVENT_ERRORS: OnceLock<IntCounterVec> = OnceLock::new();

/// Currently connected sessions.
pub static CONNECTED_USERS: OnceLock<IntGauge> = OnceLock::new();

/// Materialized rooms (public + channels + touched private pairs).
pub static ACTIVE_ROOMS: OnceLock<IntGauge> = OnceLock::new();

/// Recipients per broadcast.
pub static MESSAGE_FANOUT: OnceLock<Histogram> = OnceLock::new();

/// Initialize the Prometheus metrics registry.
///
/// Must be called once at startup before any metrics are recorded.
pub fn init() {
    let r = registry();

    macro_rules! register {
        ($metric:ident, $init:expr) => {
            let m = $init.expect(concat!(stringify!($metric), " creation failed"));
            if let Err(e) = r.register(Box::new(m.clone())) {
                tracing::warn!(error = %e, concat!("Failed to register metric ", stringify!($metric)));
            }
            let _ = $metric.set(m);
        };
    }

    register!(
        EVENTS_SENT,
        IntCounter::new("chat_events_sent_total", "Outbound events queued")
    );
    register!(
        EVENTS_DROPPED,
        IntCounter::new(
            "chat_events_dropped_total",
            "Outbound events dropped due to backpressure"
        )
    );
    register!(
        RATE_LIMITED,
        IntCounter::new("chat_rate_limited_total", "Flood protection hits")
    );
    register!(
        EVENT_COUNTER,
        IntCounterVec::new(
            Opts::new("chat_events_total", "Inbound events processed by kind"),
            &["event"]
        )
    );
    register!(
        EVENT_ERRORS,
        IntCounterVec::new(
            Opts::new("chat_event_errors_total", "Handler errors by kind"),
            &["event", "error"]
        )
    );
    register!(
        CONNECTED_USERS,
        IntGauge::new("chat_connected_users", "Currently connected sessions")
    );
    register!(
        ACTIVE_ROOMS,
        IntGauge::new("chat_active_rooms", "Materialized rooms")
    );
    register!(
        MESSAGE_FANOUT,
        Histogram::with_opts(
            HistogramOpts::new("chat_message_fanout", "Recipients per broadcast")
                .buckets(vec![1.0, 2.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0])
        )
    );
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
    String::from_utf8(buffer).unwrap_or_default()
}

#[inline]
pub fn record_event(event: &str) {
    if let Some(c) = EVENT_COUNTER.get() {
        c.with_label_values(&[event]).inc();
    }
}

#[inline]
pub fn record_event_error(event: &str, error: &str) {
    if let Some(c) = EVENT_ERRORS.get() {
        c.with_label_values(&[event, error]).inc();
    }
}

#[inline]
pub fn inc_events_sent() {
    if let Some(c) = EVENTS_SENT.get() {
        c.inc();
    }
}

#[inline]
pub fn inc_events_dropped() {
    if let Some(c) = EVENTS_DROPPED.get() {
        c.inc();
    }
}

#[inline]
pub fn inc_rate_limited() {
    if let Some(c) = RATE_LIMITED.get() {
        c.inc();
    }
}

#[inline]
pub fn set_connected(count: usize) {
    if let Some(g) = CONNECTED_USERS.get() {
        g.set(count as i64);
    }
}

#[inline]
pub fn set_active_rooms(count: usize) {
    if let Some(g) = ACTIVE_ROOMS.get() {
        g.set(count as i64);
    }
}

#[inline]
pub fn observe_fanout(recipients: usize) {
    if let Some(h) = MESSAGE_FANOUT.get() {
        h.observe(recipients as f64);
    }
}
