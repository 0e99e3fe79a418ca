//! Snapshot data model
//!
//! Structured form of one goroutine stack dump: the records the parser
//! extracts and the downstream pipeline (fingerprinter, tracker) consumes.
//! A `Snapshot` is short-lived: it is fingerprinted and counted immediately
//! after parsing, then dropped. Only per-site counts persist.

use std::fmt;

use crate::domain::{GoroutineId, Timestamp};

/// Blocking state of one execution context, as annotated in the dump header.
///
/// The state participates in fingerprinting: records blocked on send and
/// records blocked on receive never share a call site, even with identical
/// stacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockState {
    /// Blocked sending on a channel (`[chan send]`)
    BlockedOnSend,
    /// Blocked receiving from a channel (`[chan receive]`)
    BlockedOnReceive,
    /// Blocked in a select with no ready case (`[select]`)
    BlockedOnSelect,
    /// Blocked acquiring a mutex/semaphore (`[semacquire]`, `[sync.Mutex.Lock]`)
    BlockedOnLock,
    /// Blocked in a wait call (`[sync.WaitGroup.Wait]`, `[sync.Cond.Wait]`)
    BlockedOnWait,
    /// Scheduled or schedulable (`[running]`, `[runnable]`)
    Runnable,
    /// Any state annotation we do not specifically recognize
    Other,
}

/// Known dump annotations, checked in order. First match wins.
///
/// `semacquire` covers both `sync.Mutex.Lock` and weighted semaphores; the
/// runtime prints the same annotation for both.
const STATE_ANNOTATIONS: &[(&str, BlockState)] = &[
    ("chan send", BlockState::BlockedOnSend),
    ("chan receive", BlockState::BlockedOnReceive),
    ("select", BlockState::BlockedOnSelect),
    ("semacquire", BlockState::BlockedOnLock),
    ("sync.Mutex.Lock", BlockState::BlockedOnLock),
    ("sync.RWMutex", BlockState::BlockedOnLock),
    ("sync.WaitGroup.Wait", BlockState::BlockedOnWait),
    ("sync.Cond.Wait", BlockState::BlockedOnWait),
    ("running", BlockState::Runnable),
    ("runnable", BlockState::Runnable),
];

impl BlockState {
    /// Map a dump header annotation (the text inside `[...]`, wait duration
    /// already stripped) to a state.
    #[must_use]
    pub fn from_annotation(annotation: &str) -> Self {
        STATE_ANNOTATIONS
            .iter()
            .find(|(prefix, _)| annotation.starts_with(prefix))
            .map_or(BlockState::Other, |(_, state)| *state)
    }

    /// Short stable token used as the leading fingerprint segment.
    #[must_use]
    pub fn token(self) -> &'static str {
        match self {
            BlockState::BlockedOnSend => "send",
            BlockState::BlockedOnReceive => "recv",
            BlockState::BlockedOnSelect => "select",
            BlockState::BlockedOnLock => "lock",
            BlockState::BlockedOnWait => "wait",
            BlockState::Runnable => "runnable",
            BlockState::Other => "other",
        }
    }

    /// True for states a classifier may act on.
    ///
    /// Runnable and unrecognized states are tracked for visibility but are
    /// never leak candidates.
    #[must_use]
    pub fn is_blocked(self) -> bool {
        !matches!(self, BlockState::Runnable | BlockState::Other)
    }
}

impl fmt::Display for BlockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

/// One stack frame: resolved symbol plus source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Symbol as printed in the dump, argument list included
    pub symbol: String,
    /// Source file path
    pub file: String,
    /// Line number within `file`
    pub line: u32,
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}:{})", self.symbol, self.file, self.line)
    }
}

/// One execution context captured in a snapshot.
#[derive(Debug, Clone)]
pub struct BlockedRecord {
    /// Runtime-assigned ID, not stable across snapshots
    pub id: GoroutineId,
    /// Blocking state from the header annotation
    pub state: BlockState,
    /// How long the context has been blocked, if the dump says
    /// (`[chan receive, 2 minutes]`)
    pub wait_minutes: Option<u64>,
    /// Call stack, innermost frame first. Non-empty for blocked states;
    /// the parser rejects blocked records without frames.
    pub stack: Vec<Frame>,
    /// Where this context was spawned (`created by ...`), if present
    pub created_at: Option<Frame>,
}

/// One capture event: all records extracted from a single dump.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub timestamp: Timestamp,
    pub records: Vec<BlockedRecord>,
}

impl Snapshot {
    /// Records in a state the classifier may act on.
    pub fn blocked_records(&self) -> impl Iterator<Item = &BlockedRecord> {
        self.records.iter().filter(|r| r.state.is_blocked())
    }

    /// Count records in a given state.
    #[must_use]
    pub fn count_in_state(&self, state: BlockState) -> usize {
        self.records.iter().filter(|r| r.state == state).count()
    }
}
