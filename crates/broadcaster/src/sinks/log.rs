//! LogSink - logs chunk summaries via tracing

use contracts::{ByteSink, ContractError};
use tracing::{info, instrument};

/// Sink that logs chunk sizes for debugging
pub struct LogSink {
    name: String,
    chunks: u64,
    bytes: u64,
}

impl LogSink {
    /// Create a new LogSink with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            chunks: 0,
            bytes: 0,
        }
    }
}

impl ByteSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, ContractError> {
        self.chunks += 1;
        self.bytes += buf.len() as u64;
        info!(
            sink = %self.name,
            chunk = self.chunks,
            bytes = buf.len(),
            total_bytes = self.bytes,
            "Chunk received"
        );
        Ok(buf.len())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    fn close(&mut self) -> Result<(), ContractError> {
        info!(
            sink = %self.name,
            chunks = self.chunks,
            bytes = self.bytes,
            "LogSink closed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_sink_accepts_everything() {
        let mut sink = LogSink::new("test_log");
        assert_eq!(sink.write(b"hello").unwrap(), 5);
        assert_eq!(sink.write(b"").unwrap(), 0);
        assert!(sink.close().is_ok());
    }

    #[test]
    fn test_log_sink_name() {
        let sink = LogSink::new("my_logger");
        assert_eq!(sink.name(), "my_logger");
    }
}
