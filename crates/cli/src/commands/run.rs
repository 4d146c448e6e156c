//! `run` command implementation.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use broadcaster::BroadcasterBuilder;
use contracts::FanoutConfig;
use observability::MetricsObserver;
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::pump::{open_input, pump, spawn_listener, PumpStats};

/// Execute the `run` command
pub async fn run_broadcast(args: &RunArgs) -> Result<()> {
    let mut config = load_config(args)?;

    // Apply CLI overrides
    if let Some(eviction) = args.eviction {
        info!(eviction = ?eviction, "Overriding eviction policy from CLI");
        config.eviction = eviction.into();
    }

    if config.sinks.is_empty() && args.listen.is_none() {
        anyhow::bail!("No sinks configured and no --listen address given; nothing to write to");
    }

    info!(
        sinks = config.sinks.len(),
        eviction = ?config.eviction,
        listen = ?args.listen,
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&config, args);
        return Ok(());
    }

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
    }

    let broadcaster = Arc::new(
        BroadcasterBuilder::new()
            .eviction(config.eviction)
            .observer(Arc::new(MetricsObserver::new()))
            .sinks_from_config(&config.sinks)
            .context("Failed to open configured sinks")?
            .build(),
    );

    let listener = match args.listen {
        Some(addr) => {
            let timeout = (args.peer_write_timeout_ms > 0)
                .then(|| Duration::from_millis(args.peer_write_timeout_ms));
            let handle = spawn_listener(addr, Arc::clone(&broadcaster), timeout)
                .await
                .with_context(|| format!("Failed to listen on {addr}"))?;
            Some(handle)
        }
        None => None,
    };

    let input = open_input(args.input.as_deref()).context("Failed to open input")?;

    // A plain thread rather than spawn_blocking: a read blocked on stdin must
    // not keep the runtime alive after a shutdown signal.
    let (done_tx, done_rx) = oneshot::channel();
    let pump_broadcaster = Arc::clone(&broadcaster);
    let chunk_size = args.chunk_size;
    std::thread::Builder::new()
        .name("fanout-pump".to_string())
        .spawn(move || {
            let result = pump(input, &pump_broadcaster, chunk_size);
            let _ = done_tx.send(result);
        })
        .context("Failed to spawn input thread")?;

    info!("Broadcasting...");

    let outcome: Result<Option<PumpStats>> = tokio::select! {
        result = done_rx => match result {
            Ok(Ok(stats)) => Ok(Some(stats)),
            Ok(Err(e)) => Err(e).context("Reading input failed"),
            Err(_) => Err(anyhow::anyhow!("Input thread exited without a result")),
        },
        _ = shutdown_signal() => {
            warn!("Received shutdown signal, stopping broadcast...");
            Ok(None)
        }
    };

    // Join the accept loop first so no peer is registered after shutdown
    if let Some(handle) = listener {
        handle.stop().await;
    }

    let b = Arc::clone(&broadcaster);
    let closed = tokio::task::spawn_blocking(move || b.shutdown())
        .await
        .context("Shutdown task panicked")?;

    let stats = outcome?;
    if let Some(ref stats) = stats {
        info!(
            chunks = stats.chunks,
            bytes = stats.bytes,
            duration_secs = stats.duration.as_secs_f64(),
            throughput_bps = stats.throughput(),
            "Input exhausted"
        );
    }
    info!(closed, "Fanout finished");

    print_summary(&broadcaster.metrics().to_string());
    Ok(())
}

fn load_config(args: &RunArgs) -> Result<FanoutConfig> {
    let Some(ref path) = args.config else {
        return Ok(FanoutConfig::default());
    };

    info!(config = %path.display(), "Loading configuration");

    if !path.exists() {
        anyhow::bail!("Configuration file not found: {}", path.display());
    }

    config_loader::ConfigLoader::load_from_path(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}

// stdout may itself be a sink, so the summary goes to stderr
fn print_summary(summary: &str) {
    eprintln!("\n{summary}");
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(config: &FanoutConfig, args: &RunArgs) {
    println!("\n=== Configuration Summary ===\n");
    println!("Eviction: {:?}", config.eviction);
    println!("Chunk size: {} bytes", args.chunk_size);
    match args.listen {
        Some(addr) => println!("Listening for peers on: {addr}"),
        None => println!("Listening for peers: disabled"),
    }
    println!("\nSinks ({}):", config.sinks.len());
    for sink in &config.sinks {
        let mut params: Vec<_> = sink
            .params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        params.sort();
        println!("  - {} [{:?}] {}", sink.name, sink.sink_type, params.join(" "));
    }
}
