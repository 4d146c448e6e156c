//! Broadcaster error types

use thiserror::Error;

/// Broadcaster construction errors
///
/// `broadcast` and `shutdown` are infallible; these only arise while
/// building sinks from configuration.
#[derive(Debug, Error)]
pub enum BroadcasterError {
    /// Sink creation error
    #[error("failed to create sink '{name}': {message}")]
    SinkCreation { name: String, message: String },
}

impl BroadcasterError {
    /// Create a sink creation error
    pub fn sink_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkCreation {
            name: name.into(),
            message: message.into(),
        }
    }
}
