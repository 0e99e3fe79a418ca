//! Call-site fingerprinting
//!
//! Derives a stable identity for a blocked record from its stack, so that
//! thousands of structurally-identical blocked goroutines collapse into one
//! tracked call site. The fingerprint is built from a bounded, symbol-only
//! prefix of the stack:
//!
//! 1. Take the top `D` frames (default 5)
//! 2. Normalize each symbol — drop argument lists, hex addresses and
//!    per-instance numeric suffixes of generated worker names
//! 3. Join as `state|sym1|sym2|...`
//!
//! The state leads the key: records blocked on send and records blocked on
//! receive never share a site, even with identical stacks. Stacks shorter
//! than `D` use all available frames and are never padded, so a short stack
//! and a deeper stack sharing its prefix fingerprint differently —
//! specificity wins over recall.
//!
//! Keys are kept as readable interned strings rather than hashes: they show
//! up verbatim in findings and diffable alert output.

use crate::domain::SiteKey;
use crate::snapshot::BlockedRecord;

/// Default number of stack frames participating in a fingerprint.
///
/// Shallow enough to merge call sites across data-dependent deep stacks,
/// deep enough to keep a generic helper from absorbing every caller.
pub const DEFAULT_DEPTH: usize = 5;

/// Derives [`SiteKey`]s from blocked records.
#[derive(Debug, Clone, Copy)]
pub struct Fingerprinter {
    depth: usize,
}

impl Fingerprinter {
    /// Create a fingerprinter taking the top `depth` frames.
    #[must_use]
    pub fn new(depth: usize) -> Self {
        Self { depth }
    }

    /// Fingerprint one record. Deterministic: identical normalized symbol
    /// prefixes plus identical state always produce the same key.
    #[must_use]
    pub fn fingerprint(&self, record: &BlockedRecord) -> SiteKey {
        let mut key = String::from(record.state.token());
        for frame in record.stack.iter().take(self.depth) {
            key.push('|');
            key.push_str(&normalize_symbol(&frame.symbol));
        }
        SiteKey::new(key)
    }
}

impl Default for Fingerprinter {
    fn default() -> Self {
        Self::new(DEFAULT_DEPTH)
    }
}

/// Strip per-instance variability from a dump symbol.
///
/// - `main.fetch.func1(0x14000110000, 0x5)` → `main.fetch.func1`
/// - `sync.(*WaitGroup).Wait(0xc00009e010)` → `sync.(*WaitGroup).Wait`
/// - `pool.worker-17` → `pool.worker` (runtime-numbered worker instances)
///
/// Closure ordinals (`.func1`, `.func2`) are deliberately kept: they are
/// assigned per source location, not per instance, and distinguish sibling
/// closures spawned from the same function.
#[must_use]
pub fn normalize_symbol(raw: &str) -> String {
    let mut sym = raw.trim();

    // Argument list: everything from the last '(' when the symbol ends with
    // ')'. rfind keeps method receivers like "(*WaitGroup)" intact.
    if sym.ends_with(')') {
        if let Some(pos) = sym.rfind('(') {
            sym = sym[..pos].trim_end();
        }
    }

    // Instance-numbered suffix: "worker-17", "conn·3"
    for sep in ['-', '\u{b7}'] {
        if let Some((head, tail)) = sym.rsplit_once(sep) {
            if !head.is_empty() && !tail.is_empty() && tail.bytes().all(|b| b.is_ascii_digit()) {
                sym = head;
            }
        }
    }

    sym.to_string()
}
