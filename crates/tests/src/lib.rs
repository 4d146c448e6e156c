//! # Integration Tests
//!
//! Cross-crate and concurrency tests.
//!
//! Covers:
//! - Contract snapshot checks
//! - Config file -> broadcaster -> file sinks, end to end
//! - Concurrent register / broadcast / shutdown stress

#[cfg(test)]
mod contract_tests {
    #[test]
    fn test_contracts_compile() {
        let _ = contracts::ConfigVersion::V1;
        let _ = contracts::EvictionPolicy::default();
    }
}

#[cfg(test)]
mod e2e_tests {
    use broadcaster::create_broadcaster;
    use config_loader::{ConfigFormat, ConfigLoader};
    use std::fs;

    /// Config file -> ConfigLoader -> Broadcaster -> FileSinks
    #[test]
    fn test_e2e_config_to_files() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.log");
        let b = dir.path().join("b.log");

        let content = format!(
            r#"
eviction = "close"

[[sinks]]
name = "a"
sink_type = "file"
params = {{ path = {a:?} }}

[[sinks]]
name = "b"
sink_type = "file"
params = {{ path = {b:?}, append = "true" }}

[[sinks]]
name = "trace"
sink_type = "log"
"#,
            a = a.to_string_lossy(),
            b = b.to_string_lossy(),
        );

        let config = ConfigLoader::load_from_str(&content, ConfigFormat::Toml).unwrap();
        let broadcaster = create_broadcaster(&config).unwrap();
        assert_eq!(broadcaster.sink_names(), vec!["a", "b", "trace"]);

        for line in ["first\n", "second\n", "third"] {
            assert_eq!(broadcaster.broadcast(line.as_bytes()), line.len());
        }
        assert_eq!(broadcaster.shutdown(), 3);

        // The trailing fragment without a newline is kept by the file sinks
        assert_eq!(fs::read(&a).unwrap(), b"first\nsecond\nthird");
        assert_eq!(fs::read(&b).unwrap(), b"first\nsecond\nthird");
    }
}

#[cfg(test)]
mod scenario_tests {
    use broadcaster::{Broadcaster, ByteSink, EvictionPolicy, MemorySink};
    use contracts::ContractError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Sink that always fails and counts calls
    struct Broken {
        writes: Arc<AtomicUsize>,
        closes: Arc<AtomicUsize>,
    }

    impl ByteSink for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn write(&mut self, _buf: &[u8]) -> Result<usize, ContractError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Err(ContractError::sink_write("broken", "disconnected"))
        }

        fn close(&mut self) -> Result<(), ContractError> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_two_healthy_sinks_receive_hello() {
        let broadcaster = Broadcaster::new();
        let a = MemorySink::new("a");
        let b = MemorySink::new("b");
        broadcaster.register(a.clone());
        broadcaster.register(b.clone());

        assert_eq!(broadcaster.broadcast(b"hello"), 5);
        assert_eq!(a.contents(), b"hello");
        assert_eq!(b.contents(), b"hello");
    }

    #[test]
    fn test_failing_sink_attempted_once_then_evicted() {
        let writes = Arc::new(AtomicUsize::new(0));
        let closes = Arc::new(AtomicUsize::new(0));
        let broadcaster = Broadcaster::new();
        let a = MemorySink::new("a");
        broadcaster.register(a.clone());
        broadcaster.register(Broken {
            writes: writes.clone(),
            closes: closes.clone(),
        });

        assert_eq!(broadcaster.broadcast(b"x"), 1);
        assert_eq!(a.contents(), b"x");
        assert_eq!(writes.load(Ordering::SeqCst), 1);
        assert_eq!(closes.load(Ordering::SeqCst), 0);
        assert_eq!(broadcaster.sink_names(), vec!["a"]);
    }

    #[test]
    fn test_metrics_observer_wiring() {
        let broadcaster = Broadcaster::builder()
            .eviction(EvictionPolicy::Close)
            .observer(Arc::new(observability::MetricsObserver::new()))
            .build();
        let closes = Arc::new(AtomicUsize::new(0));
        broadcaster.register(MemorySink::new("ok"));
        broadcaster.register(Broken {
            writes: Arc::new(AtomicUsize::new(0)),
            closes: closes.clone(),
        });

        broadcaster.broadcast(b"z");
        assert_eq!(closes.load(Ordering::SeqCst), 1);
        assert_eq!(broadcaster.metrics().evictions, 1);
    }

    #[test]
    fn test_write_after_shutdown_touches_nothing() {
        let broadcaster = Broadcaster::builder()
            .eviction(EvictionPolicy::Detach)
            .build();
        let a = MemorySink::new("a");
        broadcaster.register(a.clone());

        broadcaster.shutdown();
        assert!(a.is_closed());
        assert_eq!(broadcaster.broadcast(b"y"), 1);
        assert!(a.contents().is_empty());
        assert_eq!(broadcaster.metrics().deliveries, 0);
    }
}

#[cfg(test)]
mod stress_tests {
    use broadcaster::{Broadcaster, ByteSink, MemorySink};
    use contracts::ContractError;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Barrier};
    use std::thread;

    const CHUNK: &[u8] = b"0123456789abcdef";

    /// Fails once its flag is flipped
    struct Flaky {
        name: String,
        fail: Arc<AtomicBool>,
    }

    impl ByteSink for Flaky {
        fn name(&self) -> &str {
            &self.name
        }

        fn write(&mut self, buf: &[u8]) -> Result<usize, ContractError> {
            if self.fail.load(Ordering::SeqCst) {
                Err(ContractError::sink_write(&self.name, "flaky"))
            } else {
                Ok(buf.len())
            }
        }

        fn close(&mut self) -> Result<(), ContractError> {
            Ok(())
        }
    }

    #[test]
    fn test_concurrent_registers_never_lost_or_duplicated() {
        const REGISTRARS: usize = 8;
        const PER_THREAD: usize = 50;

        let broadcaster = Arc::new(Broadcaster::new());
        let stop = Arc::new(AtomicBool::new(false));
        let barrier = Arc::new(Barrier::new(REGISTRARS + 1));

        let writer = {
            let b = Arc::clone(&broadcaster);
            let stop = Arc::clone(&stop);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let mut writes = 0u64;
                while !stop.load(Ordering::SeqCst) {
                    assert_eq!(b.broadcast(CHUNK), CHUNK.len());
                    writes += 1;
                }
                writes
            })
        };

        let registrars: Vec<_> = (0..REGISTRARS)
            .map(|t| {
                let b = Arc::clone(&broadcaster);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    let mut taps = Vec::with_capacity(PER_THREAD);
                    for i in 0..PER_THREAD {
                        if i == 0 {
                            barrier.wait();
                        }
                        let tap = MemorySink::new(format!("t{t}-{i}"));
                        b.register(tap.clone());
                        taps.push(tap);
                    }
                    taps
                })
            })
            .collect();

        let taps: Vec<MemorySink> = registrars
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();

        // One more write that every registered sink is guaranteed to see
        broadcaster.broadcast(CHUNK);
        stop.store(true, Ordering::SeqCst);
        writer.join().unwrap();

        let names = broadcaster.sink_names();
        assert_eq!(names.len(), REGISTRARS * PER_THREAD);
        let unique: HashSet<_> = names.iter().collect();
        assert_eq!(unique.len(), names.len());

        // Every sink holds a whole number of chunks, never a torn write
        for tap in &taps {
            let data = tap.contents();
            assert!(!data.is_empty());
            assert_eq!(data.len() % CHUNK.len(), 0);
            assert!(data.chunks(CHUNK.len()).all(|c| c == CHUNK));
        }
    }

    #[test]
    fn test_concurrent_evictions_and_shutdowns() {
        let broadcaster = Arc::new(Broadcaster::new());
        let fail = Arc::new(AtomicBool::new(false));

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let b = Arc::clone(&broadcaster);
                let fail = Arc::clone(&fail);
                thread::spawn(move || {
                    for i in 0..200 {
                        b.register(Flaky {
                            name: format!("f{t}-{i}"),
                            fail: Arc::clone(&fail),
                        });
                        b.broadcast(CHUNK);
                        if i % 50 == 49 {
                            b.shutdown();
                        }
                    }
                })
            })
            .collect();

        thread::sleep(std::time::Duration::from_millis(5));
        fail.store(true, Ordering::SeqCst);

        for handle in handles {
            handle.join().unwrap();
        }

        // Everything is flaky by now, one more write clears the set
        broadcaster.broadcast(CHUNK);
        assert!(broadcaster.is_empty());

        let snap = broadcaster.metrics();
        assert_eq!(snap.registered, 800);
        assert_eq!(snap.active, 0);
        assert!(snap.shutdowns >= 4);
    }
}
