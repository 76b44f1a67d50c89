//! Errors raised while planning a transfer.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure to build a usable transfer plan.
#[derive(Debug, Error)]
pub enum PlanError {
    /// An external inventory command failed.
    #[error(transparent)]
    Command(#[from] pipeline::PipelineError),
    /// Listing a snapshot directory failed.
    #[error("listing {}: {source}", .path.display())]
    ListDir {
        /// The directory being listed.
        path: PathBuf,
        /// The underlying OS failure.
        source: io::Error,
    },
    /// `btrfs subvolume show` emitted a line that is not `Key: value`.
    #[error("unparseable subvolume show line for {}: {line:?}", .path.display())]
    ShowLine {
        /// The subvolume being shown.
        path: PathBuf,
        /// The rejected line.
        line: String,
    },
    /// `btrfs subvolume show` output lacked a field the check needs.
    #[error("subvolume show for {} lacks field {field:?}", .path.display())]
    ShowField {
        /// The subvolume being shown.
        path: PathBuf,
        /// The absent field name.
        field: &'static str,
    },
    /// The remote copy of the parent snapshot is not a finished receive.
    #[error("parent {} on the remote is not finished: {reason}", .path.display())]
    ParentUnfinished {
        /// The remote parent path.
        path: PathBuf,
        /// Human-readable mismatch description.
        reason: String,
    },
    /// Zero or several candidate remote directories exist.
    #[error("could not determine remote: {existing} of {candidates} candidates exist")]
    AmbiguousRemote {
        /// How many candidates were found mounted.
        existing: usize,
        /// How many candidates were configured.
        candidates: usize,
    },
    /// The remote holds no snapshots to anchor an incremental send on.
    #[error("remote {} holds no snapshots", .path.display())]
    EmptyRemote {
        /// The remote root.
        path: PathBuf,
    },
    /// Local and remote snapshot inventories disagree in a way that breaks
    /// the incremental chain.
    #[error("snapshot inventories out of order: {reason}")]
    InventoryMismatch {
        /// Human-readable mismatch description.
        reason: String,
    },
    /// `zfs list` reported a pool the configuration does not expect.
    #[error("unexpected ZFS pools: {pools:?}")]
    UnexpectedPools {
        /// The surplus pool names.
        pools: Vec<String>,
    },
    /// A `zfs` output line did not have the expected shape.
    #[error("unparseable zfs output line: {line:?}")]
    ZfsLine {
        /// The rejected line.
        line: String,
    },
}
