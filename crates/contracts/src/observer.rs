//! BroadcastObserver - optional visibility into best-effort delivery
//!
//! `broadcast` and `shutdown` never return sink failures to their caller.
//! Failures are still reported: always through `tracing`, and additionally
//! to an observer when one is installed.

use std::fmt;

use crate::{ContractError, SinkId};

/// Why a sink was evicted from the active set
#[derive(Debug)]
pub enum EvictionReason {
    /// Sink returned an error
    Error(ContractError),
    /// Sink accepted fewer bytes than it was given
    ShortWrite { accepted: usize, expected: usize },
}

impl fmt::Display for EvictionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error(e) => write!(f, "{e}"),
            Self::ShortWrite { accepted, expected } => {
                write!(f, "short write: accepted {accepted} of {expected} bytes")
            }
        }
    }
}

/// Hook receiving broadcaster lifecycle events.
///
/// Called with the broadcaster lock held; implementations must be quick and
/// must not call back into the broadcaster.
pub trait BroadcastObserver: Send + Sync {
    /// A sink joined the active set
    fn on_register(&self, _id: SinkId, _name: &str) {}

    /// A sink failed a write and left the active set
    fn on_evict(&self, _id: SinkId, _name: &str, _reason: &EvictionReason) {}

    /// Closing a sink failed (error was swallowed)
    fn on_close_error(&self, _id: SinkId, _name: &str, _error: &ContractError) {}

    /// One broadcast finished
    fn on_broadcast(&self, _bytes: usize, _delivered: usize, _evicted: usize) {}

    /// Shutdown finished after closing `closed` sinks
    fn on_shutdown(&self, _closed: usize) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eviction_reason_display() {
        let short = EvictionReason::ShortWrite {
            accepted: 3,
            expected: 5,
        };
        assert_eq!(short.to_string(), "short write: accepted 3 of 5 bytes");

        let err = EvictionReason::Error(ContractError::sink_write("tcp", "broken pipe"));
        assert_eq!(err.to_string(), "sink 'tcp' write error: broken pipe");
    }
}
