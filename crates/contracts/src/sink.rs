//! ByteSink trait - Broadcaster output interface
//!
//! Defines the abstract interface for sinks.

use crate::ContractError;

/// Byte stream output trait
///
/// All sink implementations must implement this trait. The broadcaster
/// holds sinks as `Box<dyn ByteSink>` behind a mutex, so every sink must be
/// `Send`.
pub trait ByteSink: Send {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Write a buffer, returning how many bytes were accepted.
    ///
    /// The buffer must not be retained past the call. Accepting fewer bytes
    /// than `buf.len()` counts as a failure for the broadcaster.
    ///
    /// # Errors
    /// Returns write error (should include context)
    fn write(&mut self, buf: &[u8]) -> Result<usize, ContractError>;

    /// Close sink
    ///
    /// The broadcaster calls this at most once per registration.
    fn close(&mut self) -> Result<(), ContractError>;
}

impl<S: ByteSink + ?Sized> ByteSink for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, ContractError> {
        (**self).write(buf)
    }

    fn close(&mut self) -> Result<(), ContractError> {
        (**self).close()
    }
}
