//! Go runtime goroutine dump parser
//!
//! Grammar (one block per goroutine, blocks separated by blank lines):
//!
//! ```text
//! goroutine 18 [chan send, 2 minutes]:
//! main.leakyFetch.func1(0x14000110000, 0x5)
//!         /app/main.go:53 +0x34
//! main.worker()
//!         /app/main.go:40 +0x20
//! created by main.leakyFetch in goroutine 1
//!         /app/main.go:50 +0x8c
//! ```
//!
//! The header carries the runtime-assigned ID and a state annotation,
//! optionally qualified (`, 2 minutes`, `, locked to thread`). Each frame is
//! a symbol line followed by a tab-indented `file:line +0xoff` location
//! line. A trailing `created by` pair names the spawn site.
//!
//! A malformed block (unterminated frame pair, unparseable header, blocked
//! state with no frames) is skipped and counted; the parse as a whole fails
//! only when no block survived.

use log::debug;

use crate::domain::{GoroutineId, ParseError, Timestamp};
use crate::snapshot::{BlockState, BlockedRecord, Frame, Snapshot};

/// Result of parsing one dump blob.
#[derive(Debug)]
pub struct ParsedDump {
    pub snapshot: Snapshot,
    /// Malformed blocks dropped during this parse
    pub skipped_records: usize,
}

/// Parse a goroutine dump captured at `timestamp`.
///
/// # Errors
///
/// Returns [`ParseError::EmptyInput`] for a blank blob and
/// [`ParseError::NoValidRecords`] when every block was malformed — both mean
/// the whole capture cycle is unusable and the driver should skip it.
pub fn parse(raw: &str, timestamp: Timestamp) -> Result<ParsedDump, ParseError> {
    if raw.trim().is_empty() {
        return Err(ParseError::EmptyInput);
    }

    let mut records = Vec::new();
    let mut skipped = 0usize;

    for block in raw.split("\n\n") {
        let lines: Vec<&str> = block.lines().filter(|l| !l.trim().is_empty()).collect();
        let Some(first) = lines.first() else { continue };

        // pprof debug=2 emits a "goroutine profile: total N" preamble;
        // not a record, not an error.
        if first.starts_with("goroutine profile:") {
            continue;
        }
        if !first.starts_with("goroutine ") {
            continue;
        }

        match parse_block(&lines) {
            Some(record) => records.push(record),
            None => {
                debug!("skipping malformed goroutine block: {first}");
                skipped += 1;
            }
        }
    }

    if records.is_empty() {
        return Err(ParseError::NoValidRecords { skipped });
    }

    Ok(ParsedDump { snapshot: Snapshot { timestamp, records }, skipped_records: skipped })
}

/// Parse one goroutine block. Returns `None` if the block is malformed.
fn parse_block(lines: &[&str]) -> Option<BlockedRecord> {
    let (id, state, wait_minutes) = parse_header(lines[0])?;

    let mut stack = Vec::new();
    let mut created_at = None;

    let mut rest = lines[1..].iter();
    while let Some(line) = rest.next() {
        if let Some(spawner) = line.strip_prefix("created by ") {
            // "created by main.leakyFetch in goroutine 1" — the spawning
            // goroutine's ID is as volatile as any other ID, drop it.
            let symbol = match spawner.find(" in goroutine ") {
                Some(pos) => &spawner[..pos],
                None => spawner,
            };
            let location = rest.next()?;
            let (file, line_no) = parse_location(location)?;
            created_at = Some(Frame { symbol: symbol.trim().to_string(), file, line: line_no });
            break;
        }

        // Regular frame: symbol line, then its location line
        if line.starts_with('\t') {
            return None; // location without a preceding symbol
        }
        let location = rest.next()?;
        let (file, line_no) = parse_location(location)?;
        stack.push(Frame { symbol: line.trim().to_string(), file, line: line_no });
    }

    // A blocked record without frames is useless to the classifier
    if state.is_blocked() && stack.is_empty() {
        return None;
    }

    Some(BlockedRecord { id, state, wait_minutes, stack, created_at })
}

/// Parse `goroutine <id> [<state>(, <qualifier>)*]:`.
fn parse_header(line: &str) -> Option<(GoroutineId, BlockState, Option<u64>)> {
    let rest = line.strip_prefix("goroutine ")?;
    let (id_str, rest) = rest.split_once(" [")?;
    let id = id_str.trim().parse::<u64>().ok()?;
    let annotation = rest.strip_suffix("]:")?;

    // First comma-part is the state; later parts are qualifiers such as
    // "2 minutes" or "locked to thread".
    let mut parts = annotation.split(", ");
    let state = BlockState::from_annotation(parts.next()?);
    let wait_minutes = parts.find_map(|q| {
        q.strip_suffix(" minutes")
            .or_else(|| q.strip_suffix(" minute"))
            .and_then(|n| n.trim().parse::<u64>().ok())
    });

    Some((GoroutineId(id), state, wait_minutes))
}

/// Parse a tab-indented location line: `\t/app/main.go:53 +0x34`.
///
/// The `+0x` frame offset varies per build and is discarded here; it must
/// never reach the fingerprinter.
fn parse_location(line: &str) -> Option<(String, u32)> {
    if !line.starts_with('\t') && !line.starts_with("        ") {
        return None;
    }
    let loc = line.trim().split_whitespace().next()?;
    let (file, line_no) = loc.rsplit_once(':')?;
    let line_no = line_no.parse::<u32>().ok()?;
    if file.is_empty() {
        return None;
    }
    Some((file.to_string(), line_no))
}

#[cfg(test)]
mod tests {
    use super::*;

    const WELL_FORMED: &str = "\
goroutine 18 [chan send, 2 minutes]:
main.leakyFetch.func1(0x14000110000, 0x5)
\t/app/main.go:53 +0x34
main.worker()
\t/app/main.go:40 +0x20
created by main.leakyFetch in goroutine 1
\t/app/main.go:50 +0x8c

goroutine 21 [chan receive]:
main.consume()
\t/app/consume.go:12 +0x1c
";

    #[test]
    fn test_parse_well_formed_dump() {
        let parsed = parse(WELL_FORMED, Timestamp(1_000)).unwrap();
        assert_eq!(parsed.skipped_records, 0);
        assert_eq!(parsed.snapshot.records.len(), 2);

        let first = &parsed.snapshot.records[0];
        assert_eq!(first.id, GoroutineId(18));
        assert_eq!(first.state, BlockState::BlockedOnSend);
        assert_eq!(first.wait_minutes, Some(2));
        assert_eq!(first.stack.len(), 2);
        assert_eq!(first.stack[0].symbol, "main.leakyFetch.func1(0x14000110000, 0x5)");
        assert_eq!(first.stack[0].file, "/app/main.go");
        assert_eq!(first.stack[0].line, 53);

        let created = first.created_at.as_ref().unwrap();
        assert_eq!(created.symbol, "main.leakyFetch");
        assert_eq!(created.line, 50);

        let second = &parsed.snapshot.records[1];
        assert_eq!(second.state, BlockState::BlockedOnReceive);
        assert_eq!(second.wait_minutes, None);
        assert!(second.created_at.is_none());
    }

    #[test]
    fn test_truncated_block_is_skipped_not_fatal() {
        let dump = "\
goroutine 5 [chan receive]:
main.consume()
\t/app/consume.go:12 +0x1c

goroutine 6 [chan send]:
main.produce()
";
        let parsed = parse(dump, Timestamp(0)).unwrap();
        assert_eq!(parsed.snapshot.records.len(), 1);
        assert_eq!(parsed.skipped_records, 1);
    }

    #[test]
    fn test_unknown_state_maps_to_other() {
        let dump = "\
goroutine 9 [GC assist wait]:
runtime.gopark()
\t/usr/local/go/src/runtime/proc.go:382 +0xc6
";
        let parsed = parse(dump, Timestamp(0)).unwrap();
        assert_eq!(parsed.snapshot.records[0].state, BlockState::Other);
    }

    #[test]
    fn test_pprof_preamble_is_not_a_record() {
        let dump = "\
goroutine profile: total 1

goroutine 7 [select]:
main.eventLoop()
\t/app/loop.go:30 +0x44
";
        let parsed = parse(dump, Timestamp(0)).unwrap();
        assert_eq!(parsed.skipped_records, 0);
        assert_eq!(parsed.snapshot.records.len(), 1);
        assert_eq!(parsed.snapshot.records[0].state, BlockState::BlockedOnSelect);
    }

    #[test]
    fn test_all_blocks_malformed_is_parse_error() {
        let dump = "\
goroutine 5 [chan receive]:
main.consume()
";
        let err = parse(dump, Timestamp(0)).unwrap_err();
        assert!(matches!(err, ParseError::NoValidRecords { skipped: 1 }));
    }

    #[test]
    fn test_empty_input_is_parse_error() {
        assert!(matches!(parse("  \n ", Timestamp(0)), Err(ParseError::EmptyInput)));
    }

    #[test]
    fn test_blocked_record_requires_stack() {
        // Header claims chan send but no frames follow
        let dump = "\
goroutine 4 [chan send]:

goroutine 5 [chan receive]:
main.consume()
\t/app/consume.go:12 +0x1c
";
        let parsed = parse(dump, Timestamp(0)).unwrap();
        assert_eq!(parsed.snapshot.records.len(), 1);
        assert_eq!(parsed.skipped_records, 1);
    }

    #[test]
    fn test_locked_to_thread_qualifier() {
        let dump = "\
goroutine 3 [chan receive, 5 minutes, locked to thread]:
main.pump()
\t/app/pump.go:9 +0x11
";
        let parsed = parse(dump, Timestamp(0)).unwrap();
        let rec = &parsed.snapshot.records[0];
        assert_eq!(rec.state, BlockState::BlockedOnReceive);
        assert_eq!(rec.wait_minutes, Some(5));
    }
}
