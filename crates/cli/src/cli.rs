//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Fanout - copy one byte stream to many sinks, dropping the ones that fail
#[derive(Parser, Debug)]
#[command(
    name = "fanout",
    author,
    version,
    about = "Fan a byte stream out to files, sockets and TCP peers",
    long_about = "Reads a byte stream (stdin by default) and writes every chunk to all \n\
                  configured sinks. A sink that fails a write is dropped; the stream \n\
                  keeps flowing to the others. With --listen, every TCP client that \n\
                  connects becomes a sink from that point on."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "FANOUT_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "FANOUT_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Broadcast the input to every sink
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, env = "FANOUT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Input file ("-" or unset reads stdin)
    #[arg(short, long, env = "FANOUT_INPUT")]
    pub input: Option<PathBuf>,

    /// Accept TCP clients on this address and register each as a sink
    #[arg(long, env = "FANOUT_LISTEN")]
    pub listen: Option<SocketAddr>,

    /// Write timeout for accepted clients in milliseconds (0 = none)
    #[arg(long, default_value = "5000", env = "FANOUT_PEER_WRITE_TIMEOUT_MS")]
    pub peer_write_timeout_ms: u64,

    /// Override the eviction policy from configuration
    #[arg(long, value_enum, env = "FANOUT_EVICTION")]
    pub eviction: Option<EvictionArg>,

    /// Read buffer size in bytes
    #[arg(long, default_value = "8192", env = "FANOUT_CHUNK_SIZE")]
    pub chunk_size: usize,

    /// Validate configuration and exit without broadcasting
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "FANOUT_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "fanout.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format options
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// Human-readable format with colors
    #[default]
    Pretty,
    /// JSON format for log aggregation
    Json,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Json => Self::Json,
            LogFormat::Compact => Self::Compact,
        }
    }
}

/// Eviction policy options
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum EvictionArg {
    /// Drop failed sinks without closing them
    Detach,
    /// Close failed sinks when dropping them
    Close,
}

impl From<EvictionArg> for contracts::EvictionPolicy {
    fn from(arg: EvictionArg) -> Self {
        match arg {
            EvictionArg::Detach => Self::Detach,
            EvictionArg::Close => Self::Close,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from(["fanout", "run", "--config", "test.toml"]).unwrap();
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.config, Some(PathBuf::from("test.toml")));
                assert_eq!(args.chunk_size, 8192);
                assert!(args.listen.is_none());
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_run_with_listen_and_eviction() {
        let cli = Cli::try_parse_from([
            "fanout",
            "run",
            "--listen",
            "127.0.0.1:7000",
            "--eviction",
            "close",
        ])
        .unwrap();
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.listen, Some("127.0.0.1:7000".parse().unwrap()));
                assert!(matches!(args.eviction, Some(EvictionArg::Close)));
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_verbose_flag() {
        let cli = Cli::try_parse_from(["fanout", "-vv", "validate"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["fanout", "-q", "-v", "validate"]).is_err());
    }
}
