//! Re-rooting of stream-relative paths onto the destination tree.
//!
//! Every path a record supplies is relative to the snapshot being streamed
//! and arrives prefixed with `./<snapshot-name>/`. The resolver maps those
//! paths onto a fixed destination root. It is the single choke point
//! enforcing that no record, regardless of command kind, can write outside
//! the destination: the stream is trusted for correctness but never for
//! safety.
//!
//! Paths are handled as raw bytes end to end so filenames in non-standard
//! encodings survive the round trip.

use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use crate::error::PathError;

/// Maps stream-relative paths into a destination root.
///
/// Immutable for one replay run; owns no mutable state.
#[derive(Clone, Debug)]
pub struct Resolver {
    root: PathBuf,
    prefix: Vec<u8>,
}

impl Resolver {
    /// Creates a resolver for the given destination root and snapshot name.
    ///
    /// The expected stream prefix is the literal bytes `./<snapshot-name>/`.
    pub fn new(root: impl Into<PathBuf>, snapshot_name: &str) -> Self {
        let mut prefix = Vec::with_capacity(snapshot_name.len() + 3);
        prefix.extend_from_slice(b"./");
        prefix.extend_from_slice(snapshot_name.as_bytes());
        prefix.push(b'/');
        Self {
            root: root.into(),
            prefix,
        }
    }

    /// Returns the destination root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Joins a destination-relative path onto the root.
    ///
    /// Fails if the input is absolute, contains a `..` segment, or is empty
    /// (which would resolve to the root itself). The result is always a
    /// strict descendant of the root.
    pub fn reroot(&self, path: &[u8]) -> Result<PathBuf, PathError> {
        if path.first() == Some(&b'/') {
            return Err(PathError::Absolute {
                path: path.to_owned(),
            });
        }
        if path.split(|&b| b == b'/').any(|segment| segment == b"..") {
            return Err(PathError::Traversal {
                path: path.to_owned(),
            });
        }
        if path
            .split(|&b| b == b'/')
            .all(|segment| segment.is_empty() || segment == b".")
        {
            // Catches "", ".", "./" and friends, which would land on the
            // root itself rather than inside it.
            return Err(PathError::Empty);
        }
        Ok(self.root.join(OsStr::from_bytes(path)))
    }

    /// Strips the `./<snapshot-name>/` prefix and re-roots the remainder.
    ///
    /// Every primary record path is encoded under this prefix; its absence
    /// means the stream and the replay run disagree about which snapshot is
    /// being replayed.
    pub fn strip_snapshot_prefix(&self, path: &[u8]) -> Result<PathBuf, PathError> {
        let Some(rest) = path.strip_prefix(self.prefix.as_slice()) else {
            return Err(PathError::WrongPrefix {
                path: path.to_owned(),
                prefix: self.prefix.clone(),
            });
        };
        self.reroot(rest)
    }
}
