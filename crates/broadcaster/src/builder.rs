//! Broadcaster construction from code or configuration

use std::sync::Arc;

use tracing::{info, instrument};

use contracts::{BroadcastObserver, ByteSink, EvictionPolicy, FanoutConfig, SinkConfig, SinkType};

use crate::broadcaster::Broadcaster;
use crate::error::BroadcasterError;
use crate::sinks::{FileSink, LogSink, NetworkSink, WriterSink};

/// Builder for creating a Broadcaster
#[derive(Default)]
pub struct BroadcasterBuilder {
    eviction: EvictionPolicy,
    observer: Option<Arc<dyn BroadcastObserver>>,
    sinks: Vec<Box<dyn ByteSink>>,
}

impl BroadcasterBuilder {
    /// Create a new BroadcasterBuilder
    pub fn new() -> Self {
        Self::default()
    }

    /// What to do with sinks that fail a write
    pub fn eviction(mut self, policy: EvictionPolicy) -> Self {
        self.eviction = policy;
        self
    }

    /// Install an observer for evictions and close failures
    pub fn observer(mut self, observer: Arc<dyn BroadcastObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Add an initial sink
    pub fn sink<S: ByteSink + 'static>(mut self, sink: S) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    /// Open every configured sink, in order
    ///
    /// # Errors
    /// Fails on the first sink that cannot be opened.
    #[instrument(
        name = "broadcaster_builder_sinks_from_config",
        skip(self, configs),
        fields(sink_count = configs.len())
    )]
    pub fn sinks_from_config(mut self, configs: &[SinkConfig]) -> Result<Self, BroadcasterError> {
        self.sinks.reserve(configs.len());
        for config in configs {
            self.sinks.push(create_sink(config)?);
        }
        Ok(self)
    }

    /// Build the broadcaster and register the initial sinks in order
    pub fn build(self) -> Broadcaster {
        let broadcaster = Broadcaster::with_parts(self.eviction, self.observer);
        for sink in self.sinks {
            broadcaster.register_boxed(sink);
        }
        broadcaster
    }
}

/// Open a sink from configuration
#[instrument(
    name = "broadcaster_create_sink",
    skip(config),
    fields(sink = %config.name, sink_type = ?config.sink_type)
)]
pub fn create_sink(config: &SinkConfig) -> Result<Box<dyn ByteSink>, BroadcasterError> {
    match config.sink_type {
        SinkType::Log => Ok(Box::new(LogSink::new(&config.name))),
        SinkType::Stdout => Ok(Box::new(WriterSink::new(&config.name, std::io::stdout()))),
        SinkType::File => {
            let sink = FileSink::from_params(&config.name, &config.params)
                .map_err(|e| BroadcasterError::sink_creation(&config.name, e.to_string()))?;
            Ok(Box::new(sink))
        }
        SinkType::Network => {
            let sink = NetworkSink::from_params(&config.name, &config.params)
                .map_err(|e| BroadcasterError::sink_creation(&config.name, e.to_string()))?;
            Ok(Box::new(sink))
        }
    }
}

/// Convenience function to create a broadcaster from a loaded config
#[instrument(name = "broadcaster_create", skip(config))]
pub fn create_broadcaster(config: &FanoutConfig) -> Result<Broadcaster, BroadcasterError> {
    let broadcaster = BroadcasterBuilder::new()
        .eviction(config.eviction)
        .sinks_from_config(&config.sinks)?
        .build();

    info!(
        sinks = broadcaster.len(),
        eviction = ?config.eviction,
        "Broadcaster created"
    );
    Ok(broadcaster)
}
