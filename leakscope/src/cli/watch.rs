//! Watch mode: poll a directory for freshly captured dump files
//!
//! Capture (directory polling) and analysis run on separate threads joined
//! by a bounded channel; the engine's internal mutex makes the handoff safe.
//! The polling thread honors a shared stop flag, so the loop terminates at
//! the duration limit even when no new dump ever appears after the deadline.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossbeam_channel::{bounded, RecvTimeoutError};
use log::{info, warn};

use crate::domain::Timestamp;
use crate::engine::LeakDetector;
use crate::report::{render_text, Finding};

/// How a watch run is driven.
#[derive(Debug, Clone)]
pub struct WatchOptions {
    /// Directory poll interval
    pub poll_interval: Duration,
    /// Stop after this long; `None` watches until the process is killed
    pub duration: Option<Duration>,
    /// Print per-cycle ingest stats and findings
    pub echo_cycles: bool,
}

/// What a watch run produced.
#[derive(Debug)]
pub struct WatchOutcome {
    /// Findings from the last scan
    pub findings: Vec<Finding>,
    /// Dump files handed to the engine before the loop stopped
    pub cycles: usize,
}

/// Poll `dir` and feed new dump files to the engine until the duration limit
/// fires.
///
/// # Errors
///
/// Fails when `dir` is not a directory. Per-file problems (unreadable dump,
/// unusable capture) are logged and skipped, never fatal.
pub fn watch_directory(
    detector: &LeakDetector,
    dir: &Path,
    options: &WatchOptions,
) -> Result<WatchOutcome> {
    anyhow::ensure!(dir.is_dir(), "--watch target {} is not a directory", dir.display());

    let (tx, rx) = bounded::<(PathBuf, Timestamp)>(64);
    let stop = Arc::new(AtomicBool::new(false));
    let poll = options.poll_interval.max(Duration::from_millis(10));
    let watch_dir = dir.to_path_buf();

    let capture = std::thread::spawn({
        let stop = Arc::clone(&stop);
        move || {
            let mut seen: HashSet<PathBuf> = HashSet::new();
            while !stop.load(Ordering::Relaxed) {
                match discover_dumps(&watch_dir, &seen) {
                    Ok(new_dumps) => {
                        for (path, ts) in new_dumps {
                            seen.insert(path.clone());
                            if tx.send((path, ts)).is_err() {
                                return; // analysis side is done
                            }
                        }
                    }
                    Err(e) => warn!("failed to scan {}: {e:#}", watch_dir.display()),
                }
                sleep_until_stopped(poll, &stop);
            }
        }
    });

    let deadline = options.duration.map(|d| Instant::now() + d);
    let mut findings = Vec::new();
    let mut cycles = 0usize;

    loop {
        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                info!("duration limit reached");
                break;
            }
        }
        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok((path, timestamp)) => {
                ingest_file(detector, &path, timestamp, options.echo_cycles);
                findings = detector.scan();
                cycles += 1;
                if options.echo_cycles {
                    println!("--- after {} ---", path.display());
                    print!("{}", render_text(&findings));
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    // The stop flag, not the dropped receiver, is what guarantees the
    // capture thread comes back: send is only attempted when a new file
    // shows up, and after the deadline one may never appear.
    stop.store(true, Ordering::Relaxed);
    drop(rx);
    if capture.join().is_err() {
        warn!("capture thread panicked");
    }
    Ok(WatchOutcome { findings, cycles })
}

/// Sleep for `total` in short slices, bailing out once `stop` is set.
fn sleep_until_stopped(total: Duration, stop: &AtomicBool) {
    let mut slept = Duration::ZERO;
    while slept < total && !stop.load(Ordering::Relaxed) {
        let step = (total - slept).min(Duration::from_millis(50));
        std::thread::sleep(step);
        slept += step;
    }
}

/// Read and ingest one dump file. Per-cycle failures (unreadable file,
/// unusable dump) are logged and skipped; the series simply miss one
/// sample, exactly as if the capture had been abandoned.
pub fn ingest_file(detector: &LeakDetector, path: &Path, timestamp: Timestamp, echo: bool) {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("skipping {}: {e}", path.display());
            return;
        }
    };
    match detector.ingest(&raw, timestamp) {
        Ok(stats) => {
            if echo {
                eprintln!(
                    "{}: {} records, {} sites (send={} recv={} skipped={})",
                    path.display(),
                    stats.records,
                    stats.sites,
                    stats.blocked_on_send,
                    stats.blocked_on_receive,
                    stats.skipped_records,
                );
            }
        }
        Err(e) => warn!("skipping {}: {e}", path.display()),
    }
}

/// List not-yet-seen dump files, oldest mtime first (name as tie-break).
fn discover_dumps(
    dir: &Path,
    seen: &HashSet<PathBuf>,
) -> Result<Vec<(PathBuf, Timestamp)>> {
    let mut dumps = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() || seen.contains(&path) {
            continue;
        }
        let mtime = entry.metadata()?.modified()?;
        dumps.push((path, Timestamp::from_system_time(mtime)));
    }
    dumps.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
    Ok(dumps)
}
