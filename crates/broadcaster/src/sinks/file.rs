//! FileSink - appends the broadcast stream to a file on disk

use contracts::{ByteSink, ContractError};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, instrument};

/// Configuration for FileSink
#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    /// Output file
    pub path: PathBuf,
    /// Append to an existing file instead of truncating it
    pub append: bool,
}

impl FileSinkConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, String> {
        let path = params
            .get("path")
            .map(PathBuf::from)
            .ok_or_else(|| "missing 'path' parameter".to_string())?;

        let append = match params.get("append") {
            Some(value) => value
                .parse()
                .map_err(|_| format!("invalid 'append' value '{}'", value))?,
            None => false,
        };

        Ok(Self { path, append })
    }
}

/// Sink that writes the stream to a file
pub struct FileSink {
    name: String,
    config: FileSinkConfig,
    file: Option<File>,
}

impl FileSink {
    /// Open (or create) the target file
    #[instrument(name = "file_sink_new", skip(name, config), fields(path = %config.path.display()))]
    pub fn new(name: impl Into<String>, config: FileSinkConfig) -> std::io::Result<Self> {
        if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(config.append)
            .truncate(!config.append)
            .open(&config.path)?;

        let name = name.into();
        debug!(sink = %name, append = config.append, "FileSink opened");

        Ok(Self {
            name,
            config,
            file: Some(file),
        })
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, ContractError> {
        let name = name.into();
        let config = FileSinkConfig::from_params(params)
            .map_err(|e| {
                ContractError::config_validation(format!("sinks[name={}].params", name), e)
            })?;
        Ok(Self::new(name, config)?)
    }

    pub fn path(&self) -> &std::path::Path {
        &self.config.path
    }
}

impl ByteSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, ContractError> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| ContractError::sink_closed(&self.name))?;
        file.write_all(buf)
            .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))?;
        Ok(buf.len())
    }

    #[instrument(name = "file_sink_close", skip(self), fields(sink = %self.name))]
    fn close(&mut self) -> Result<(), ContractError> {
        let file = self
            .file
            .take()
            .ok_or_else(|| ContractError::sink_closed(&self.name))?;
        file.sync_all()?;
        debug!(sink = %self.name, path = %self.config.path.display(), "FileSink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn params(path: &std::path::Path, append: Option<&str>) -> HashMap<String, String> {
        let mut params = HashMap::new();
        params.insert("path".to_string(), path.to_string_lossy().into_owned());
        if let Some(append) = append {
            params.insert("append".to_string(), append.to_string());
        }
        params
    }

    #[test]
    fn test_file_sink_writes_and_closes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/out.bin");

        let mut sink = FileSink::from_params("file", &params(&path, None)).unwrap();
        assert_eq!(sink.write(b"abc").unwrap(), 3);
        assert_eq!(sink.write(b"def").unwrap(), 3);
        sink.close().unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"abcdef");
        assert!(matches!(
            sink.write(b"late"),
            Err(ContractError::SinkClosed { .. })
        ));
    }

    #[test]
    fn test_file_sink_truncate_vs_append() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.log");
        fs::write(&path, b"old\n").unwrap();

        let mut sink = FileSink::from_params("file", &params(&path, Some("true"))).unwrap();
        sink.write(b"new\n").unwrap();
        sink.close().unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"old\nnew\n");

        let mut sink = FileSink::from_params("file", &params(&path, None)).unwrap();
        sink.write(b"fresh\n").unwrap();
        sink.close().unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"fresh\n");
    }

    #[test]
    fn test_file_sink_config_errors() {
        assert!(FileSinkConfig::from_params(&HashMap::new()).is_err());

        let dir = tempdir().unwrap();
        let bad = params(&dir.path().join("x"), Some("maybe"));
        assert!(FileSinkConfig::from_params(&bad).is_err());
    }

    #[test]
    fn test_file_sink_bad_params_is_config_error() {
        let result = FileSink::from_params("file", &HashMap::new());
        match result {
            Err(ContractError::ConfigValidation { field, message }) => {
                assert_eq!(field, "sinks[name=file].params");
                assert!(message.contains("'path'"));
            }
            Err(other) => panic!("unexpected error: {other:?}"),
            Ok(_) => panic!("expected a config error"),
        }
    }
}
