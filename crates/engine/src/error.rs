//! Error taxonomy for the replay engine.
//!
//! Every variant is fatal for the current run. The stream is ordered and
//! positionally dependent (a `rename` presumes the earlier `mkfile`
//! succeeded), so the engine never retries or skips a record; any violation
//! invalidates everything after it. Diagnostics name the offending record so
//! a failed run can be traced back to the exact input line.

use std::io;

use thiserror::Error;

/// A line that does not match the dump-stream record grammar.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The line does not decompose into `<command> <path> [<name>=<value>]*`.
    #[error("malformed record line: {line:?}")]
    Malformed {
        /// The rejected input line, escaping intact.
        line: String,
    },
    /// The command word is not part of the known dump-format vocabulary.
    #[error("unknown record command {command:?}")]
    UnknownCommand {
        /// The unrecognised command word.
        command: String,
    },
}

/// A stream path that cannot be safely mapped into the destination root.
#[derive(Debug, Error)]
pub enum PathError {
    /// The path is filesystem-absolute; stream paths must be relative.
    #[error("absolute path in stream: {}", String::from_utf8_lossy(.path))]
    Absolute {
        /// The offending path bytes.
        path: Vec<u8>,
    },
    /// The path contains a `..` segment.
    #[error("path traversal in stream: {}", String::from_utf8_lossy(.path))]
    Traversal {
        /// The offending path bytes.
        path: Vec<u8>,
    },
    /// The path does not start with the expected `./<snapshot>/` prefix.
    #[error(
        "path {} lacks the snapshot prefix {}",
        String::from_utf8_lossy(.path),
        String::from_utf8_lossy(.prefix)
    )]
    WrongPrefix {
        /// The offending path bytes.
        path: Vec<u8>,
        /// The prefix the resolver expected.
        prefix: Vec<u8>,
    },
    /// The path is empty after prefix stripping; resolving it would yield
    /// the destination root itself.
    #[error("empty path resolves to the destination root")]
    Empty,
}

/// Fatal replay failure, carrying the position of the offending record.
#[derive(Debug, Error)]
pub enum ReplayError {
    /// A line failed the record grammar.
    #[error("line {line}: {source}")]
    Parse {
        /// One-based input line number.
        line: u64,
        /// The underlying grammar failure.
        source: ParseError,
    },
    /// A record path failed resolution against the destination root.
    #[error("line {line} ({command}): {source}")]
    Path {
        /// One-based input line number.
        line: u64,
        /// The record command being applied.
        command: &'static str,
        /// The underlying path failure.
        source: PathError,
    },
    /// A record kind the engine knows of but deliberately does not replay.
    /// Silent mis-replay is worse than stopping.
    #[error("line {line}: unsupported record command {command:?}")]
    Unsupported {
        /// One-based input line number.
        line: u64,
        /// The unsupported command word.
        command: &'static str,
    },
    /// A record is missing an argument its command requires.
    #[error("line {line} ({command}): missing required argument {name:?}")]
    MissingArg {
        /// One-based input line number.
        line: u64,
        /// The record command being applied.
        command: &'static str,
        /// The absent argument name.
        name: &'static str,
    },
    /// The underlying filesystem mutation failed.
    #[error("line {line} ({command}): {source}")]
    Io {
        /// One-based input line number.
        line: u64,
        /// The record command being applied.
        command: &'static str,
        /// The delegated OS failure.
        source: io::Error,
    },
    /// Reading the next input line failed.
    #[error("reading dump stream at line {line}: {source}")]
    Read {
        /// One-based input line number.
        line: u64,
        /// The delegated OS failure.
        source: io::Error,
    },
}
