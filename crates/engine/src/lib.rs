#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `engine` replays a line-oriented btrfs dump stream onto an ordinary
//! directory tree. The stream is the output of `btrfs receive --dump`: one
//! record per line, each naming a command, a snapshot-relative path, and a
//! set of `name=value` arguments, all rendered with the btrfs-progs
//! backslash-escape convention.
//!
//! The crate is split along the stages a record passes through:
//!
//! - [`escape`] reverses the backslash-escape convention into raw bytes.
//! - [`record`] splits a line into a [`Record`](record::Record) with a closed
//!   [`Command`](record::Command) enumeration.
//! - [`resolve`] maps stream-relative paths onto a destination root while
//!   rejecting absolute paths and `..` traversal.
//! - [`apply`] executes the filesystem mutation each record implies, in
//!   strict stream order.
//!
//! # Design
//!
//! Only the namespace tree is reconstructed: names, directories, symlinks and
//! hardlinks. Content and metadata records (`write`, `chown`, `utimes`, ...)
//! are deliberate no-ops, and record kinds that have been observed in the
//! dump format but never exercised by real snapshots fail fatally rather
//! than silently producing an incorrect replica.
//!
//! # Invariants
//!
//! - Records are applied one at a time, in input order. Later records assume
//!   earlier ones succeeded, so any failure aborts the whole replay.
//! - Every path that reaches the filesystem has passed through
//!   [`resolve::Resolver`]; no record can write outside the destination root.
//! - A [`Record`](record::Record) is built fresh per line and discarded after
//!   dispatch; the engine keeps no cross-record state beyond a progress
//!   counter.

pub mod apply;
pub mod error;
pub mod escape;
pub mod record;
pub mod resolve;

pub use apply::Replayer;
pub use error::{ParseError, PathError, ReplayError};
pub use record::{Command, Record};
pub use resolve::Resolver;
