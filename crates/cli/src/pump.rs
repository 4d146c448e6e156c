//! Input pump and TCP listener feeding the broadcaster.

use std::fs::File;
use std::io::{self, Read};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use broadcaster::{Broadcaster, WriterSink};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Statistics from one pump run
#[derive(Debug, Clone, Default)]
pub struct PumpStats {
    /// Chunks read from the input and broadcast
    pub chunks: u64,
    /// Bytes read from the input
    pub bytes: u64,
    /// Wall time until EOF
    pub duration: Duration,
}

impl PumpStats {
    /// Input throughput in bytes per second
    pub fn throughput(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.bytes as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }
}

/// Open the input: a file, or stdin for `None` / `-`
pub fn open_input(path: Option<&Path>) -> io::Result<Box<dyn Read + Send>> {
    match path {
        Some(p) if p != Path::new("-") => Ok(Box::new(File::open(p)?)),
        _ => Ok(Box::new(io::stdin())),
    }
}

/// Read `input` in chunks of at most `chunk_size` bytes and broadcast each
/// chunk until EOF.
pub fn pump<R: Read>(
    mut input: R,
    broadcaster: &Broadcaster,
    chunk_size: usize,
) -> io::Result<PumpStats> {
    let mut buf = vec![0u8; chunk_size.max(1)];
    let mut stats = PumpStats::default();
    let started = Instant::now();

    loop {
        let n = match input.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        broadcaster.broadcast(&buf[..n]);
        stats.chunks += 1;
        stats.bytes += n as u64;

        if stats.chunks.is_multiple_of(1000) {
            debug!(chunks = stats.chunks, bytes = stats.bytes, "Pump progress");
        }
    }

    stats.duration = started.elapsed();
    Ok(stats)
}

const ACCEPT_BACKOFF_BASE: Duration = Duration::from_millis(10);
const ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// Delay after `failures` consecutive accept errors, doubling up to a cap.
///
/// Accept keeps failing immediately while the fd table is full, so the loop
/// must not retry in a tight spin.
pub fn accept_backoff(failures: u32) -> Duration {
    let exp = failures.saturating_sub(1).min(16);
    ACCEPT_BACKOFF_BASE
        .saturating_mul(1u32 << exp)
        .min(ACCEPT_BACKOFF_MAX)
}

/// Running accept loop
pub struct ListenerHandle {
    local_addr: SocketAddr,
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl ListenerHandle {
    /// Address actually bound
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting and wait for the loop to exit.
    ///
    /// A peer whose registration is in flight finishes registering first, so
    /// a `shutdown` issued after this returns closes every accepted peer.
    pub async fn stop(self) {
        let _ = self.stop.send(());
        if let Err(e) = self.task.await {
            warn!(error = %e, "Listener task ended abnormally");
        }
    }
}

/// Bind `addr` and register every accepted client as a sink.
///
/// Clients only see data broadcast after they connect.
pub async fn spawn_listener(
    addr: SocketAddr,
    broadcaster: Arc<Broadcaster>,
    write_timeout: Option<Duration>,
) -> io::Result<ListenerHandle> {
    let listener = TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    info!(addr = %local_addr, "Accepting sink connections");

    let (stop, mut stop_rx) = oneshot::channel::<()>();
    let task = tokio::spawn(async move {
        let mut failures = 0u32;
        loop {
            let accepted = tokio::select! {
                _ = &mut stop_rx => break,
                accepted = listener.accept() => accepted,
            };
            match accepted {
                Ok((stream, peer)) => {
                    failures = 0;
                    // Not raced against stop: a started registration completes
                    if let Err(e) = register_peer(stream, peer, &broadcaster, write_timeout).await {
                        warn!(peer = %peer, error = %e, "Failed to register peer");
                    }
                }
                Err(e) => {
                    failures = failures.saturating_add(1);
                    let delay = accept_backoff(failures);
                    warn!(
                        error = %e,
                        failures,
                        delay_ms = delay.as_millis() as u64,
                        "Accept failed"
                    );
                    tokio::select! {
                        _ = &mut stop_rx => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
        debug!("Listener stopped");
    });

    Ok(ListenerHandle {
        local_addr,
        stop,
        task,
    })
}

async fn register_peer(
    stream: tokio::net::TcpStream,
    peer: SocketAddr,
    broadcaster: &Arc<Broadcaster>,
    write_timeout: Option<Duration>,
) -> io::Result<()> {
    // Sinks write synchronously under the broadcaster lock
    let stream = stream.into_std()?;
    stream.set_nonblocking(false)?;
    stream.set_write_timeout(write_timeout)?;
    stream.set_nodelay(true)?;

    let sink = WriterSink::new(format!("peer:{peer}"), stream);
    let b = Arc::clone(broadcaster);
    // register may wait behind a broadcast holding the lock
    let id = tokio::task::spawn_blocking(move || b.register(sink))
        .await
        .map_err(io::Error::other)?;

    info!(peer = %peer, id = %id, "Peer registered");
    Ok(())
}
