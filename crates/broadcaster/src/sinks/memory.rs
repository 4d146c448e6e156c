//! MemorySink - in-process capture of the broadcast stream

use std::sync::{Arc, Mutex, PoisonError};

use contracts::{ByteSink, ContractError};

#[derive(Debug, Default)]
struct Shared {
    data: Vec<u8>,
    closed: bool,
}

/// Sink appending everything to a shared buffer.
///
/// Clones share the same buffer: register one clone, keep another to read
/// back what was delivered. With a limit set, a write that does not fit is
/// accepted only up to the limit, which the broadcaster treats as a short
/// write.
#[derive(Debug, Clone)]
pub struct MemorySink {
    name: String,
    limit: Option<usize>,
    shared: Arc<Mutex<Shared>>,
}

impl MemorySink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            limit: None,
            shared: Arc::new(Mutex::new(Shared::default())),
        }
    }

    /// Cap the total number of bytes held
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Copy of everything accepted so far
    pub fn contents(&self) -> Vec<u8> {
        self.lock().data.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ByteSink for MemorySink {
    fn name(&self) -> &str {
        &self.name
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, ContractError> {
        let mut shared = self.lock();
        if shared.closed {
            return Err(ContractError::sink_closed(&self.name));
        }
        let room = match self.limit {
            Some(limit) => limit.saturating_sub(shared.data.len()),
            None => buf.len(),
        };
        let accepted = room.min(buf.len());
        shared.data.extend_from_slice(&buf[..accepted]);
        Ok(accepted)
    }

    fn close(&mut self) -> Result<(), ContractError> {
        self.lock().closed = true;
        Ok(())
    }
}
