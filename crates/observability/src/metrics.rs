//! Broadcast metrics collection
//!
//! Feeds broadcaster events into the `metrics` facade so they show up on the
//! Prometheus endpoint.

use contracts::{BroadcastObserver, ContractError, EvictionReason, SinkId};
use metrics::{counter, gauge, histogram};

/// Record one finished broadcast
pub fn record_broadcast(bytes: usize, delivered: usize, evicted: usize) {
    counter!("fanout_broadcasts_total").increment(1);
    counter!("fanout_bytes_total").increment(bytes as u64);
    counter!("fanout_deliveries_total").increment(delivered as u64);
    histogram!("fanout_chunk_bytes").record(bytes as f64);

    if evicted > 0 {
        counter!("fanout_evictions_total").increment(evicted as u64);
    }
}

/// Record a sink joining the active set
pub fn record_sink_registered(sink_name: &str) {
    counter!(
        "fanout_sinks_registered_total",
        "sink" => sink_name.to_string()
    )
    .increment(1);
    gauge!("fanout_sinks_active").increment(1.0);
}

/// Record an eviction with its cause
pub fn record_sink_evicted(sink_name: &str, reason: &EvictionReason) {
    let cause = match reason {
        EvictionReason::Error(_) => "error",
        EvictionReason::ShortWrite { .. } => "short_write",
    };
    counter!(
        "fanout_sink_evictions_total",
        "sink" => sink_name.to_string(),
        "cause" => cause
    )
    .increment(1);
    gauge!("fanout_sinks_active").decrement(1.0);
}

/// Record a swallowed close failure
pub fn record_close_failure(sink_name: &str) {
    counter!(
        "fanout_close_failures_total",
        "sink" => sink_name.to_string()
    )
    .increment(1);
}

/// Record a shutdown
pub fn record_shutdown(closed: usize) {
    counter!("fanout_shutdowns_total").increment(1);
    counter!("fanout_sinks_closed_total").increment(closed as u64);
    gauge!("fanout_sinks_active").set(0.0);
}

/// Observer forwarding broadcaster events to the metrics recorder
#[derive(Debug, Default, Clone, Copy)]
pub struct MetricsObserver;

impl MetricsObserver {
    pub fn new() -> Self {
        Self
    }
}

impl BroadcastObserver for MetricsObserver {
    fn on_register(&self, _id: SinkId, name: &str) {
        record_sink_registered(name);
    }

    fn on_evict(&self, _id: SinkId, name: &str, reason: &EvictionReason) {
        record_sink_evicted(name, reason);
    }

    fn on_close_error(&self, _id: SinkId, name: &str, _error: &ContractError) {
        record_close_failure(name);
    }

    fn on_broadcast(&self, bytes: usize, delivered: usize, evicted: usize) {
        record_broadcast(bytes, delivered, evicted);
    }

    fn on_shutdown(&self, closed: usize) {
        record_shutdown(closed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Without an installed recorder the macros are no-ops; this only checks
    // the observer wiring does not panic.
    #[test]
    fn test_observer_without_recorder() {
        let observer = MetricsObserver::new();
        observer.on_register(SinkId::new(0), "a");
        observer.on_broadcast(10, 1, 0);
        observer.on_evict(
            SinkId::new(0),
            "a",
            &EvictionReason::ShortWrite {
                accepted: 1,
                expected: 10,
            },
        );
        observer.on_close_error(SinkId::new(0), "a", &ContractError::Other("x".into()));
        observer.on_shutdown(0);
    }
}
