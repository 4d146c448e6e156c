//! Broadcaster metrics for observability

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Counters for a single broadcaster
///
/// Updated outside of any lock; readers get a best-effort view.
#[derive(Debug, Default)]
pub struct BroadcastMetrics {
    /// Sinks currently in the active set
    active: AtomicUsize,
    /// Total sinks ever registered
    registered: AtomicU64,
    /// Total broadcast calls
    broadcasts: AtomicU64,
    /// Total bytes handed to `broadcast`
    bytes_broadcast: AtomicU64,
    /// Total successful per-sink deliveries
    deliveries: AtomicU64,
    /// Total sinks evicted after a failed write
    evictions: AtomicU64,
    /// Total close calls that returned an error
    close_failures: AtomicU64,
    /// Total shutdown calls
    shutdowns: AtomicU64,
}

impl BroadcastMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }

    pub fn set_active(&self, len: usize) {
        self.active.store(len, Ordering::Relaxed);
    }

    pub fn registered(&self) -> u64 {
        self.registered.load(Ordering::Relaxed)
    }

    pub fn inc_registered(&self) {
        self.registered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn broadcasts(&self) -> u64 {
        self.broadcasts.load(Ordering::Relaxed)
    }

    pub fn bytes_broadcast(&self) -> u64 {
        self.bytes_broadcast.load(Ordering::Relaxed)
    }

    /// Record one finished broadcast
    pub fn record_broadcast(&self, bytes: usize, delivered: usize, evicted: usize) {
        self.broadcasts.fetch_add(1, Ordering::Relaxed);
        self.bytes_broadcast
            .fetch_add(bytes as u64, Ordering::Relaxed);
        self.deliveries
            .fetch_add(delivered as u64, Ordering::Relaxed);
        self.evictions.fetch_add(evicted as u64, Ordering::Relaxed);
    }

    pub fn deliveries(&self) -> u64 {
        self.deliveries.load(Ordering::Relaxed)
    }

    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    pub fn close_failures(&self) -> u64 {
        self.close_failures.load(Ordering::Relaxed)
    }

    pub fn inc_close_failures(&self) {
        self.close_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn shutdowns(&self) -> u64 {
        self.shutdowns.load(Ordering::Relaxed)
    }

    pub fn inc_shutdowns(&self) {
        self.shutdowns.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            active: self.active(),
            registered: self.registered(),
            broadcasts: self.broadcasts(),
            bytes_broadcast: self.bytes_broadcast(),
            deliveries: self.deliveries(),
            evictions: self.evictions(),
            close_failures: self.close_failures(),
            shutdowns: self.shutdowns(),
        }
    }
}

/// Snapshot of broadcaster metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub active: usize,
    pub registered: u64,
    pub broadcasts: u64,
    pub bytes_broadcast: u64,
    pub deliveries: u64,
    pub evictions: u64,
    pub close_failures: u64,
    pub shutdowns: u64,
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Broadcast Summary ===")?;
        writeln!(f, "Active sinks: {}", self.active)?;
        writeln!(f, "Registered sinks: {}", self.registered)?;
        writeln!(
            f,
            "Broadcasts: {} ({} bytes)",
            self.broadcasts, self.bytes_broadcast
        )?;
        writeln!(f, "Deliveries: {}", self.deliveries)?;
        writeln!(f, "Evictions: {}", self.evictions)?;
        write!(f, "Close failures: {}", self.close_failures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_broadcast() {
        let metrics = BroadcastMetrics::new();
        metrics.record_broadcast(5, 2, 1);
        metrics.record_broadcast(3, 2, 0);

        let snap = metrics.snapshot();
        assert_eq!(snap.broadcasts, 2);
        assert_eq!(snap.bytes_broadcast, 8);
        assert_eq!(snap.deliveries, 4);
        assert_eq!(snap.evictions, 1);
    }

    #[test]
    fn test_snapshot_display() {
        let snap = MetricsSnapshot {
            active: 1,
            registered: 3,
            broadcasts: 10,
            bytes_broadcast: 640,
            deliveries: 25,
            evictions: 2,
            close_failures: 0,
            shutdowns: 0,
        };
        let output = snap.to_string();
        assert!(output.contains("Broadcasts: 10 (640 bytes)"));
        assert!(output.contains("Evictions: 2"));
    }
}
