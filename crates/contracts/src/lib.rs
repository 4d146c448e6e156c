//! # Contracts
//!
//! Frozen interface contracts shared by every fanout crate: the sink
//! capability, the error taxonomy, configuration types and the observer hook.
//! Business crates depend on this crate only, never the other way around.

mod config;
mod error;
mod observer;
mod sink;
mod sink_id;

pub use config::*;
pub use error::*;
pub use observer::{BroadcastObserver, EvictionReason};
pub use sink::ByteSink;
pub use sink_id::SinkId;
