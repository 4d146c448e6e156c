//! Config validation
//!
//! Rules:
//! - sink names are non-empty and unique
//! - type-specific required params are present and non-empty
//! - `append`/`nodelay` parse as booleans, `*_timeout_ms` as positive integers

use std::collections::HashSet;

use contracts::{ContractError, FanoutConfig, SinkConfig};

/// Validate a FanoutConfig
///
/// Returns the first error found, or Ok(()).
pub fn validate(config: &FanoutConfig) -> Result<(), ContractError> {
    validate_sink_names(config)?;
    for (idx, sink) in config.sinks.iter().enumerate() {
        validate_sink_params(idx, sink)?;
    }
    Ok(())
}

/// Sink names: non-empty and unique
fn validate_sink_names(config: &FanoutConfig) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, sink) in config.sinks.iter().enumerate() {
        if sink.name.trim().is_empty() {
            return Err(ContractError::config_validation(
                format!("sinks[{}].name", idx),
                "sink name cannot be empty",
            ));
        }
        if !seen.insert(sink.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("sinks[name={}]", sink.name),
                "duplicate sink name",
            ));
        }
    }
    Ok(())
}

fn validate_sink_params(idx: usize, sink: &SinkConfig) -> Result<(), ContractError> {
    for key in sink.sink_type.required_params() {
        let present = sink
            .params
            .get(*key)
            .is_some_and(|value| !value.trim().is_empty());
        if !present {
            return Err(ContractError::config_validation(
                format!("sinks[{}].params.{}", idx, key),
                format!("'{}' is required for {:?} sinks", key, sink.sink_type),
            ));
        }
    }

    if let Some(append) = sink.params.get("append") {
        validate_bool(idx, "append", append)?;
    }

    if let Some(nodelay) = sink.params.get("nodelay") {
        validate_bool(idx, "nodelay", nodelay)?;
    }

    if let Some(addr) = sink.params.get("addr") {
        if addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(ContractError::config_validation(
                format!("sinks[{}].params.addr", idx),
                format!("invalid socket address '{}'", addr),
            ));
        }
    }

    for key in ["write_timeout_ms", "connect_timeout_ms"] {
        if let Some(timeout) = sink.params.get(key) {
            match timeout.parse::<u64>() {
                Ok(ms) if ms > 0 => {}
                _ => {
                    return Err(ContractError::config_validation(
                        format!("sinks[{}].params.{}", idx, key),
                        format!("{} must be a positive integer, got '{}'", key, timeout),
                    ));
                }
            }
        }
    }

    Ok(())
}

fn validate_bool(idx: usize, key: &str, value: &str) -> Result<(), ContractError> {
    if value.parse::<bool>().is_err() {
        return Err(ContractError::config_validation(
            format!("sinks[{}].params.{}", idx, key),
            format!("expected true or false, got '{}'", value),
        ));
    }
    Ok(())
}
