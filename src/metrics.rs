use std::sync::atomic::AtomicU64;

/// Process-wide protocol counters.
#[derive(Default)]
pub struct Metrics {
    pub active_connections: AtomicU64,
    pub connections_total: AtomicU64,
    pub messages_total: AtomicU64,
    pub engine_errors: AtomicU64,
    // Fail-closed connection drops
    pub unknown_closes: AtomicU64,
    pub overflow_closes: AtomicU64,
}

pub static METRICS: once_cell::sync::Lazy<&'static Metrics> =
    once_cell::sync::Lazy::new(|| Box::leak(Box::new(Metrics::default())));
