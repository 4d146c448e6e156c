//! Sink implementations
//!
//! Contains LogSink, FileSink, NetworkSink, WriterSink and MemorySink.

mod file;
mod log;
mod memory;
mod network;
mod writer;

pub use self::file::{FileSink, FileSinkConfig};
pub use self::log::LogSink;
pub use self::memory::MemorySink;
pub use self::network::{NetworkSink, NetworkSinkConfig};
pub use self::writer::WriterSink;
