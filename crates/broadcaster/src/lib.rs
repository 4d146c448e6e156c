//! # Broadcaster
//!
//! Byte stream fan-out.
//!
//! Responsibilities:
//! - Deliver every buffer to every registered sink
//! - Evict sinks that fail to accept a full write
//! - Close all sinks on shutdown
//!
//! Delivery is best-effort per sink: neither `broadcast` nor `shutdown`
//! ever fails. Failures are logged and reported to an optional
//! [`BroadcastObserver`].

pub mod broadcaster;
pub mod builder;
pub mod error;
pub mod metrics;
pub mod sinks;

pub use broadcaster::Broadcaster;
pub use builder::{create_broadcaster, create_sink, BroadcasterBuilder};
pub use contracts::{BroadcastObserver, ByteSink, EvictionPolicy, EvictionReason, SinkId};
pub use error::BroadcasterError;
pub use metrics::{BroadcastMetrics, MetricsSnapshot};
pub use sinks::{FileSink, LogSink, MemorySink, NetworkSink, WriterSink};
