//! Ordering of btrfs snapshots still missing from the remote.
//!
//! Snapshot names sort chronologically (they start with an ISO date), so
//! the incremental chain is just the sorted order. The plan insists the two
//! inventories form a clean prefix relationship: everything up to and
//! including the newest remote snapshot must exist on both sides, and
//! everything after it only locally. Any other shape means a transfer was
//! interrupted or a snapshot was deleted out from under the chain, and
//! incremental sends would quietly anchor on the wrong parent.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::error::PlanError;
use crate::remote::read_names;

/// An ordered incremental transfer plan.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SendPlan {
    /// The shared parent the first send anchors on.
    pub parent: String,
    /// Snapshot names to send, oldest first. Each becomes the parent of the
    /// next.
    pub to_send: Vec<String>,
}

/// Maps every snapshot under the local source directories to its full path.
///
/// Later directories win on duplicate names; in practice names are unique
/// because they embed the snapshot timestamp.
pub fn local_snapshot_paths(
    sources: &[PathBuf],
) -> Result<BTreeMap<String, PathBuf>, PlanError> {
    let mut paths = BTreeMap::new();
    for dir in sources {
        for name in read_names(dir)? {
            paths.insert(name.clone(), dir.join(name));
        }
    }
    Ok(paths)
}

/// Computes which snapshots to send, and from which parent to start.
pub fn snaps_to_send(
    local_snaps: &BTreeSet<String>,
    remote_snaps: &BTreeSet<String>,
    remote: &Path,
) -> Result<SendPlan, PlanError> {
    let Some(last_remote) = remote_snaps.iter().next_back() else {
        return Err(PlanError::EmptyRemote {
            path: remote.to_owned(),
        });
    };
    if !local_snaps.contains(last_remote) {
        return Err(PlanError::InventoryMismatch {
            reason: format!("newest remote snapshot {last_remote} does not exist locally"),
        });
    }

    let mut to_send = Vec::new();
    for snap in local_snaps {
        if snap <= last_remote {
            if !remote_snaps.contains(snap) {
                return Err(PlanError::InventoryMismatch {
                    reason: format!("local snapshot {snap} predates {last_remote} but is missing from the remote"),
                });
            }
        } else {
            if remote_snaps.contains(snap) {
                return Err(PlanError::InventoryMismatch {
                    reason: format!("snapshot {snap} is newer than {last_remote} yet already on the remote"),
                });
            }
            to_send.push(snap.clone());
        }
    }

    tracing::info!(parent = %last_remote, count = to_send.len(), "computed send plan");
    Ok(SendPlan {
        parent: last_remote.clone(),
        to_send,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn tail_after_newest_remote_is_sent() {
        let plan = snaps_to_send(
            &set(&["2024-01", "2024-02", "2024-03", "2024-04"]),
            &set(&["2024-01", "2024-02"]),
            Path::new("/remote"),
        )
        .expect("plan");
        assert_eq!(plan.parent, "2024-02");
        assert_eq!(plan.to_send, ["2024-03", "2024-04"]);
    }

    #[test]
    fn up_to_date_sides_yield_empty_plan() {
        let plan = snaps_to_send(
            &set(&["2024-01", "2024-02"]),
            &set(&["2024-01", "2024-02"]),
            Path::new("/remote"),
        )
        .expect("plan");
        assert_eq!(plan.parent, "2024-02");
        assert!(plan.to_send.is_empty());
    }

    #[test]
    fn empty_remote_is_an_error() {
        assert!(matches!(
            snaps_to_send(&set(&["2024-01"]), &set(&[]), Path::new("/remote")),
            Err(PlanError::EmptyRemote { .. })
        ));
    }

    #[test]
    fn remote_head_missing_locally_is_an_error() {
        assert!(matches!(
            snaps_to_send(
                &set(&["2024-01"]),
                &set(&["2024-02"]),
                Path::new("/remote")
            ),
            Err(PlanError::InventoryMismatch { .. })
        ));
    }

    #[test]
    fn gap_below_remote_head_is_an_error() {
        // 2024-02 is on the remote head but 2024-01 never made it across.
        assert!(matches!(
            snaps_to_send(
                &set(&["2024-01", "2024-02", "2024-03"]),
                &set(&["2024-02"]),
                Path::new("/remote")
            ),
            Err(PlanError::InventoryMismatch { .. })
        ));
    }
}
