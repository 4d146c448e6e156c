//! NetworkSink - streams the broadcast over a TCP connection

use contracts::{ByteSink, ContractError};
use std::collections::HashMap;
use std::io::Write;
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::Duration;
use tracing::{debug, instrument};

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for NetworkSink
#[derive(Debug, Clone)]
pub struct NetworkSinkConfig {
    /// Target address
    pub addr: SocketAddr,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Per-write timeout; a peer that stops reading gets evicted instead of
    /// hanging the broadcaster forever
    pub write_timeout: Option<Duration>,
    /// Disable Nagle's algorithm
    pub nodelay: bool,
}

impl NetworkSinkConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, String> {
        let addr_str = params
            .get("addr")
            .ok_or_else(|| "missing 'addr' parameter".to_string())?;

        let addr: SocketAddr = addr_str
            .parse()
            .map_err(|e| format!("invalid address '{}': {}", addr_str, e))?;

        let connect_timeout = parse_millis(params, "connect_timeout_ms")?
            .unwrap_or(DEFAULT_CONNECT_TIMEOUT);
        let write_timeout = parse_millis(params, "write_timeout_ms")?;

        let nodelay = match params.get("nodelay") {
            Some(s) => s
                .parse()
                .map_err(|_| format!("invalid nodelay '{}': expected true or false", s))?,
            None => true,
        };

        Ok(Self {
            addr,
            connect_timeout,
            write_timeout,
            nodelay,
        })
    }
}

/// Positive millisecond duration, if the key is present
fn parse_millis(params: &HashMap<String, String>, key: &str) -> Result<Option<Duration>, String> {
    let Some(raw) = params.get(key) else {
        return Ok(None);
    };
    match raw.parse::<u64>() {
        Ok(ms) if ms > 0 => Ok(Some(Duration::from_millis(ms))),
        _ => Err(format!("invalid {} '{}': expected a positive integer", key, raw)),
    }
}

/// Sink that sends the stream to a TCP peer
pub struct NetworkSink {
    name: String,
    config: NetworkSinkConfig,
    stream: Option<TcpStream>,
}

impl NetworkSink {
    /// Connect to the configured peer
    #[instrument(name = "network_sink_new", skip(name, config), fields(target = %config.addr))]
    pub fn new(name: impl Into<String>, config: NetworkSinkConfig) -> std::io::Result<Self> {
        let name = name.into();
        let stream = TcpStream::connect_timeout(&config.addr, config.connect_timeout)?;
        stream.set_write_timeout(config.write_timeout)?;
        stream.set_nodelay(config.nodelay)?;

        debug!(
            sink = %name,
            target = %config.addr,
            "NetworkSink connected"
        );

        Ok(Self {
            name,
            config,
            stream: Some(stream),
        })
    }

    /// Create from params (for factory)
    #[instrument(name = "network_sink_from_params", skip(name, params))]
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, ContractError> {
        let name = name.into();
        let config = NetworkSinkConfig::from_params(params)
            .map_err(|e| {
                ContractError::config_validation(format!("sinks[name={}].params", name), e)
            })?;

        Self::new(name.clone(), config)
            .map_err(|e| ContractError::sink_connection(name, e.to_string()))
    }

    pub fn peer(&self) -> SocketAddr {
        self.config.addr
    }
}

impl ByteSink for NetworkSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, ContractError> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| ContractError::sink_closed(&self.name))?;
        stream
            .write_all(buf)
            .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))?;
        Ok(buf.len())
    }

    #[instrument(name = "network_sink_close", skip(self), fields(sink = %self.name))]
    fn close(&mut self) -> Result<(), ContractError> {
        let stream = self
            .stream
            .take()
            .ok_or_else(|| ContractError::sink_closed(&self.name))?;
        stream.shutdown(Shutdown::Both)?;
        debug!(sink = %self.name, "NetworkSink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::net::TcpListener;

    #[test]
    fn test_network_sink_config_parsing() {
        let mut params = HashMap::new();
        params.insert("addr".to_string(), "127.0.0.1:9999".to_string());
        params.insert("write_timeout_ms".to_string(), "250".to_string());

        let config = NetworkSinkConfig::from_params(&params).unwrap();
        assert_eq!(config.addr.port(), 9999);
        assert_eq!(config.write_timeout, Some(Duration::from_millis(250)));
        assert_eq!(config.connect_timeout, DEFAULT_CONNECT_TIMEOUT);
        assert!(config.nodelay);
    }

    #[test]
    fn test_network_sink_config_missing_addr() {
        let result = NetworkSinkConfig::from_params(&HashMap::new());
        assert!(result.is_err());
    }

    #[test]
    fn test_network_sink_config_rejects_bad_values() {
        for (key, value) in [
            ("connect_timeout_ms", "abc"),
            ("write_timeout_ms", "0"),
            ("write_timeout_ms", "-5"),
            ("nodelay", "yes"),
        ] {
            let mut params = HashMap::new();
            params.insert("addr".to_string(), "127.0.0.1:9999".to_string());
            params.insert(key.to_string(), value.to_string());

            let err = NetworkSinkConfig::from_params(&params).unwrap_err();
            assert!(err.contains(key), "{key}={value}: {err}");
        }
    }

    #[test]
    fn test_network_sink_config_explicit_values() {
        let mut params = HashMap::new();
        params.insert("addr".to_string(), "127.0.0.1:9999".to_string());
        params.insert("connect_timeout_ms".to_string(), "1500".to_string());
        params.insert("nodelay".to_string(), "false".to_string());

        let config = NetworkSinkConfig::from_params(&params).unwrap();
        assert_eq!(config.connect_timeout, Duration::from_millis(1500));
        assert_eq!(config.write_timeout, None);
        assert!(!config.nodelay);
    }

    #[test]
    fn test_network_sink_delivers_bytes() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let mut params = HashMap::new();
        params.insert("addr".to_string(), addr.to_string());
        let mut sink = NetworkSink::from_params("tcp", &params).unwrap();
        assert_eq!(sink.peer(), addr);

        let (mut peer, _) = listener.accept().unwrap();
        assert_eq!(sink.write(b"hello").unwrap(), 5);
        sink.close().unwrap();

        let mut received = Vec::new();
        peer.read_to_end(&mut received).unwrap();
        assert_eq!(received, b"hello");
    }

    #[test]
    fn test_network_sink_bad_params_is_config_error() {
        let mut params = HashMap::new();
        params.insert("addr".to_string(), "127.0.0.1:9999".to_string());
        params.insert("nodelay".to_string(), "yes".to_string());

        let result = NetworkSink::from_params("tcp", &params);
        assert!(matches!(result, Err(ContractError::ConfigValidation { .. })));
    }

    #[test]
    fn test_network_sink_connection_refused() {
        // Bind then drop to get a port nobody listens on
        let addr = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();

        let mut params = HashMap::new();
        params.insert("addr".to_string(), addr.to_string());
        let result = NetworkSink::from_params("tcp", &params);
        assert!(matches!(result, Err(ContractError::SinkConnection { .. })));
    }
}
