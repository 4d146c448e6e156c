//! WriterSink - adapts any `std::io::Write` into a sink

use std::io::Write;

use contracts::{ByteSink, ContractError};
use tracing::debug;

/// Sink wrapping an arbitrary writer (stdout, an accepted socket, a pipe).
///
/// Each broadcast is written with `write_all`, so the sink either takes the
/// whole buffer or reports an error. After `close` the writer is flushed and
/// dropped; later writes fail with [`ContractError::SinkClosed`].
pub struct WriterSink<W: Write + Send> {
    name: String,
    writer: Option<W>,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(name: impl Into<String>, writer: W) -> Self {
        Self {
            name: name.into(),
            writer: Some(writer),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.writer.is_none()
    }

    /// Take the writer back out, if not closed yet
    pub fn into_inner(self) -> Option<W> {
        self.writer
    }
}

impl<W: Write + Send> ByteSink for WriterSink<W> {
    fn name(&self) -> &str {
        &self.name
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, ContractError> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| ContractError::sink_closed(&self.name))?;
        writer
            .write_all(buf)
            .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))?;
        Ok(buf.len())
    }

    fn close(&mut self) -> Result<(), ContractError> {
        let mut writer = self
            .writer
            .take()
            .ok_or_else(|| ContractError::sink_closed(&self.name))?;
        writer.flush()?;
        debug!(sink = %self.name, "WriterSink closed");
        Ok(())
    }
}
