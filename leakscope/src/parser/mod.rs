//! Stack snapshot parsing
//!
//! Turns one opaque dump blob into a structured
//! [`Snapshot`](crate::snapshot::Snapshot). The only grammar currently
//! supported is the Go runtime goroutine dump (`runtime.Stack` / pprof
//! `debug=2`); see [`goroutine_dump`].
//!
//! Parsing is a pure transform: no I/O, no shared state. Malformed blocks
//! within an otherwise-valid dump are skipped and counted, never fatal.

pub mod goroutine_dump;

pub use goroutine_dump::{parse, ParsedDump};
