//! # leakscope - Main Entry Point
//!
//! Two operational modes:
//! - **Batch** (`leakscope dump-1.txt dump-2.txt ...`): analyze an ordered
//!   series of already-captured goroutine dumps
//! - **Watch** (`--watch <DIR>`): poll a directory and analyze new dumps as
//!   the capture mechanism drops them in
//!
//! The binary never touches the observed process; capturing dumps is the
//! host's job. With `--fail-on-leak` the exit code doubles as a CI gate.

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use leakscope::analysis::Classification;
use leakscope::cli::watch::{ingest_file, watch_directory, WatchOptions};
use leakscope::cli::{Args, UsageError};
use leakscope::domain::Timestamp;
use leakscope::engine::LeakDetector;
use leakscope::export::write_findings;
use leakscope::report::{render_text, Finding};

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_USAGE: i32 = 2;
const EXIT_LEAKS: i32 = 3;

fn main() {
    env_logger::init();
    let args = Args::parse();
    std::process::exit(match run(&args) {
        Ok(leaks_found) => {
            if leaks_found && args.fail_on_leak {
                EXIT_LEAKS
            } else {
                EXIT_SUCCESS
            }
        }
        Err(e) => {
            eprintln!("error: {e:#}");
            exit_code_for(&e)
        }
    });
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    if err.downcast_ref::<UsageError>().is_some() {
        EXIT_USAGE
    } else {
        EXIT_ERROR
    }
}

/// Returns whether any growing site was found.
fn run(args: &Args) -> Result<bool> {
    let detector = LeakDetector::new(args.detector_config())?;

    let (findings, already_rendered) = if let Some(dir) = &args.watch {
        let options = WatchOptions {
            poll_interval: Duration::from_secs(args.poll_secs.max(1)),
            duration: (args.duration > 0).then(|| Duration::from_secs(args.duration)),
            echo_cycles: !args.quiet,
        };
        let outcome = watch_directory(&detector, dir, &options)?;
        // Every cycle already printed the current findings
        let rendered = !args.quiet && outcome.cycles > 0;
        (outcome.findings, rendered)
    } else if args.dumps.is_empty() {
        return Err(UsageError(
            "missing required argument: DUMP files or --watch\n\n\
             Usage:\n  \
             leakscope dump-1.txt dump-2.txt     Analyze dumps in capture order\n  \
             leakscope --watch ./dumps           Analyze dumps as they appear\n\n\
             Run 'leakscope --help' for more options"
                .to_string(),
        )
        .into());
    } else {
        (analyze_batch(args, &detector)?, false)
    };

    if !already_rendered {
        print!("{}", render_text(&findings));
    }

    if let Some(export_path) = &args.export {
        let file = File::create(export_path)
            .with_context(|| format!("failed to create {}", export_path.display()))?;
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0);
        write_findings(&findings, now, BufWriter::new(file))
            .context("failed to export findings")?;
        if !args.quiet {
            eprintln!("saved: {}", export_path.display());
        }
    }

    Ok(findings.iter().any(|f| f.classification == Classification::Growing))
}

/// Analyze an explicit, ordered list of dump files.
fn analyze_batch(args: &Args, detector: &LeakDetector) -> Result<Vec<Finding>> {
    for (index, path) in args.dumps.iter().enumerate() {
        let timestamp = dump_timestamp(path, index, args.interval_secs)?;
        ingest_file(detector, path, timestamp, !args.quiet);
    }
    Ok(detector.scan())
}

/// Timestamp for the `index`-th dump in batch mode: synthetic spacing if
/// `--interval-secs` was given, file mtime otherwise.
fn dump_timestamp(path: &Path, index: usize, interval_secs: Option<u64>) -> Result<Timestamp> {
    if let Some(secs) = interval_secs {
        return Ok(Timestamp(index as u64 * secs * 1_000));
    }
    let mtime = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .with_context(|| format!("failed to read mtime of {}", path.display()))?;
    Ok(Timestamp::from_system_time(mtime))
}
