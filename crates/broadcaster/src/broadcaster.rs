//! Broadcaster - fans one byte stream out to a changing set of sinks

use std::fmt;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, instrument, warn};

use contracts::{BroadcastObserver, ByteSink, EvictionPolicy, EvictionReason, SinkId};

use crate::builder::BroadcasterBuilder;
use crate::metrics::{BroadcastMetrics, MetricsSnapshot};

struct Registered {
    id: SinkId,
    sink: Box<dyn ByteSink>,
}

/// Lock-guarded state. Entries stay in registration order.
#[derive(Default)]
struct SinkSet {
    entries: Vec<Registered>,
    next_id: u64,
}

/// Thread-safe fan-out of byte buffers to registered sinks.
///
/// One mutex guards the active set and is held for the whole delivery loop
/// of [`broadcast`](Self::broadcast) and the close loop of
/// [`shutdown`](Self::shutdown). A sink that blocks in `write` or `close`
/// blocks every other caller.
///
/// A sink stays in the active set until it fails a write (error or short
/// write) or the broadcaster is shut down. Failures never reach the caller.
///
/// Shutdown is not terminal: sinks registered afterwards receive later
/// broadcasts as usual.
pub struct Broadcaster {
    sinks: Mutex<SinkSet>,
    eviction: EvictionPolicy,
    observer: Option<Arc<dyn BroadcastObserver>>,
    metrics: BroadcastMetrics,
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl Broadcaster {
    /// Create an empty broadcaster with the default eviction policy
    pub fn new() -> Self {
        Self::with_parts(EvictionPolicy::default(), None)
    }

    pub fn builder() -> BroadcasterBuilder {
        BroadcasterBuilder::new()
    }

    pub(crate) fn with_parts(
        eviction: EvictionPolicy,
        observer: Option<Arc<dyn BroadcastObserver>>,
    ) -> Self {
        Self {
            sinks: Mutex::new(SinkSet::default()),
            eviction,
            observer,
            metrics: BroadcastMetrics::new(),
        }
    }

    /// Eviction policy in effect
    pub fn eviction(&self) -> EvictionPolicy {
        self.eviction
    }

    /// Add a sink to the active set. Always succeeds.
    ///
    /// The sink receives every broadcast that acquires the lock after this
    /// call, until it is evicted or the broadcaster shuts down. Data written
    /// before registration is not replayed.
    pub fn register<S: ByteSink + 'static>(&self, sink: S) -> SinkId {
        self.register_boxed(Box::new(sink))
    }

    /// Same as [`register`](Self::register) for an already boxed sink
    pub fn register_boxed(&self, sink: Box<dyn ByteSink>) -> SinkId {
        let mut set = self.lock();
        let id = SinkId::new(set.next_id);
        set.next_id += 1;

        debug!(sink = %sink.name(), id = %id, "Sink registered");
        if let Some(observer) = &self.observer {
            observer.on_register(id, sink.name());
        }

        set.entries.push(Registered { id, sink });
        self.metrics.inc_registered();
        self.metrics.set_active(set.entries.len());
        id
    }

    /// Write `buf` to every sink in registration order.
    ///
    /// Each sink gets exactly one attempt. A sink that errors or accepts
    /// anything other than `buf.len()` bytes is evicted once the scan is
    /// complete. Always returns `buf.len()`.
    pub fn broadcast(&self, buf: &[u8]) -> usize {
        let mut set = self.lock();

        let mut failed: Vec<(usize, EvictionReason)> = Vec::new();
        for (idx, entry) in set.entries.iter_mut().enumerate() {
            match entry.sink.write(buf) {
                Ok(n) if n == buf.len() => {}
                Ok(n) => failed.push((
                    idx,
                    EvictionReason::ShortWrite {
                        accepted: n,
                        expected: buf.len(),
                    },
                )),
                Err(e) => failed.push((idx, EvictionReason::Error(e))),
            }
        }

        let evicted = failed.len();
        let delivered = set.entries.len() - evicted;
        if evicted > 0 {
            self.evict(&mut set.entries, failed);
        }

        self.metrics.record_broadcast(buf.len(), delivered, evicted);
        self.metrics.set_active(set.entries.len());
        if let Some(observer) = &self.observer {
            observer.on_broadcast(buf.len(), delivered, evicted);
        }

        buf.len()
    }

    /// Close and remove every sink. Close errors are logged and ignored.
    ///
    /// Returns how many sinks were closed. Whatever a sink still buffers is
    /// up to its own `close`.
    #[instrument(name = "broadcaster_shutdown", skip(self))]
    pub fn shutdown(&self) -> usize {
        let mut set = self.lock();

        let closed = set.entries.len();
        for entry in set.entries.iter_mut() {
            self.close_sink(entry);
        }
        set.entries.clear();

        self.metrics.inc_shutdowns();
        self.metrics.set_active(0);
        if let Some(observer) = &self.observer {
            observer.on_shutdown(closed);
        }

        info!(closed, "Broadcaster shut down");
        closed
    }

    /// Number of sinks in the active set
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Ids and names of the active set, in delivery order
    pub fn sinks(&self) -> Vec<(SinkId, String)> {
        self.lock()
            .entries
            .iter()
            .map(|e| (e.id, e.sink.name().to_string()))
            .collect()
    }

    /// Names of the active set, in delivery order
    pub fn sink_names(&self) -> Vec<String> {
        self.lock()
            .entries
            .iter()
            .map(|e| e.sink.name().to_string())
            .collect()
    }

    /// Get current metrics
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    // A sink that panicked mid-write poisons the mutex. The set is only
    // rebuilt after a completed scan, so the data is still consistent.
    fn lock(&self) -> MutexGuard<'_, SinkSet> {
        self.sinks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Rebuild `entries` without the failed indices.
    ///
    /// `failed` is sorted by index because the scan pushes in order.
    fn evict(&self, entries: &mut Vec<Registered>, failed: Vec<(usize, EvictionReason)>) {
        let mut failed = failed.into_iter().peekable();
        let previous = std::mem::take(entries);
        entries.reserve(previous.len());

        for (idx, mut entry) in previous.into_iter().enumerate() {
            let Some((_, reason)) = failed.next_if(|(f, _)| *f == idx) else {
                entries.push(entry);
                continue;
            };

            warn!(
                sink = %entry.sink.name(),
                id = %entry.id,
                reason = %reason,
                policy = ?self.eviction,
                "Sink evicted"
            );
            if let Some(observer) = &self.observer {
                observer.on_evict(entry.id, entry.sink.name(), &reason);
            }
            if self.eviction == EvictionPolicy::Close {
                self.close_sink(&mut entry);
            }
        }
    }

    fn close_sink(&self, entry: &mut Registered) {
        if let Err(e) = entry.sink.close() {
            self.metrics.inc_close_failures();
            warn!(
                sink = %entry.sink.name(),
                id = %entry.id,
                error = %e,
                "Close failed, ignoring"
            );
            if let Some(observer) = &self.observer {
                observer.on_close_error(entry.id, entry.sink.name(), &e);
            }
        }
    }
}

impl fmt::Debug for Broadcaster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Broadcaster")
            .field("eviction", &self.eviction)
            .field("has_observer", &self.observer.is_some())
            .field("metrics", &self.metrics.snapshot())
            .finish()
    }
}

/// Always reports the whole buffer as written.
impl io::Write for &Broadcaster {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.broadcast(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl io::Write for Broadcaster {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.broadcast(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
