//! CLI argument definitions

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::DetectorConfig;

#[derive(Parser)]
#[command(
    name = "leakscope",
    about = "Detect goroutine leaks from periodic runtime stack dumps",
    after_help = "\
EXAMPLES:
    leakscope dump-1.txt dump-2.txt dump-3.txt   Analyze dumps in capture order
    leakscope --watch ./dumps --poll-secs 30     Analyze dumps as they appear
    leakscope --watch ./dumps --fail-on-leak     Nonzero exit when a leak is found"
)]
pub struct Args {
    /// Goroutine dump files, oldest first (timestamps taken from file mtime)
    #[arg(value_name = "DUMP", conflicts_with = "watch")]
    pub dumps: Vec<PathBuf>,

    /// Directory to poll for newly captured dump files
    #[arg(long, value_name = "DIR")]
    pub watch: Option<PathBuf>,

    /// Poll interval in watch mode, seconds
    #[arg(long, default_value = "10")]
    pub poll_secs: u64,

    /// Stop watching after N seconds (0 = unlimited)
    #[arg(long, default_value = "0")]
    pub duration: u64,

    /// Assume this many seconds between dumps instead of using file mtimes
    #[arg(long, value_name = "SECS")]
    pub interval_secs: Option<u64>,

    /// Stack frames participating in a site fingerprint
    #[arg(long, default_value = "5")]
    pub depth: usize,

    /// Minimum samples before any verdict
    #[arg(long, default_value = "3")]
    pub min_samples: usize,

    /// Blocked-count floor below which a site never alerts
    #[arg(long, default_value = "10")]
    pub min_count: u64,

    /// Growth threshold, counts per sampling interval
    #[arg(long, default_value = "1.0")]
    pub grow_threshold: f64,

    /// Seconds a formerly-growing site must stay at zero before it counts
    /// as resolved
    #[arg(long, default_value = "60")]
    pub grace_secs: u64,

    /// Sample retention window, seconds
    #[arg(long, default_value = "3600")]
    pub window_secs: u64,

    /// Include stable sites in reports
    #[arg(long)]
    pub include_stable: bool,

    /// Export the final findings report as JSON
    #[arg(long, value_name = "FILE")]
    pub export: Option<PathBuf>,

    /// Exit nonzero when any growing site is found (for CI gates)
    #[arg(long)]
    pub fail_on_leak: bool,

    /// Suppress non-essential output
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Detector configuration implied by the flags. Validation happens at
    /// engine construction.
    #[must_use]
    pub fn detector_config(&self) -> DetectorConfig {
        DetectorConfig {
            fingerprint_depth: self.depth,
            min_samples: self.min_samples,
            min_count: self.min_count,
            grow_threshold: self.grow_threshold,
            grace_period: Duration::from_secs(self.grace_secs),
            retention_window: Duration::from_secs(self.window_secs),
            include_stable: self.include_stable,
            ..DetectorConfig::default()
        }
    }
}
