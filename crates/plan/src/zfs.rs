//! ZFS snapshot inventory.
//!
//! The mirror flow tracks which year-months have already been captured as
//! ZFS snapshots named `<pool>/<fs>@<YYYY-MM>`. Inventory comes from
//! `zfs list -H`, whose tab-separated, header-free output is stable enough
//! to parse directly.

use std::collections::{BTreeMap, BTreeSet};
use std::process::Command;

use pipeline::run;

use crate::error::PlanError;

/// Snapshot names per filesystem, per pool.
pub type PoolInventory = BTreeMap<String, BTreeMap<String, BTreeSet<String>>>;

/// Lists every ZFS snapshot, grouped by pool and filesystem.
///
/// Pools outside `expected_pools` abort the run: an unexpected pool means
/// the inventory (and everything planned from it) describes a machine this
/// configuration was not written for.
pub fn snapshots_by_pool(expected_pools: &BTreeSet<String>) -> Result<PoolInventory, PlanError> {
    let mut command = Command::new("zfs");
    command.args(["list", "-H", "-r", "-t", "snapshot", "-o", "name"]);
    let lines = run::checked_lines(&mut command)?;
    parse_snapshot_names(lines.iter().map(String::as_str), expected_pools)
}

/// Parses `zfs list -H -o name` snapshot lines (`pool/fs@snap`).
fn parse_snapshot_names<'a>(
    lines: impl Iterator<Item = &'a str>,
    expected_pools: &BTreeSet<String>,
) -> Result<PoolInventory, PlanError> {
    let mut inventory: PoolInventory = BTreeMap::new();
    for line in lines {
        // `zfs list -H` separates any further columns with tabs.
        let name = line.split('\t').next().unwrap_or(line);
        let parsed = name.split_once('@').and_then(|(dataset, snap)| {
            dataset
                .split_once('/')
                .map(|(pool, fs)| (pool, fs, snap))
        });
        let Some((pool, fs, snap)) = parsed else {
            return Err(PlanError::ZfsLine {
                line: line.to_owned(),
            });
        };
        inventory
            .entry(pool.to_owned())
            .or_default()
            .entry(fs.to_owned())
            .or_default()
            .insert(snap.to_owned());
    }

    let unexpected: Vec<String> = inventory
        .keys()
        .filter(|pool| !expected_pools.contains(*pool))
        .cloned()
        .collect();
    if !unexpected.is_empty() {
        return Err(PlanError::UnexpectedPools { pools: unexpected });
    }
    Ok(inventory)
}

/// Reads the mountpoint of one ZFS filesystem.
pub fn mountpoint(pool: &str, fs: &str) -> Result<String, PlanError> {
    let mut command = Command::new("zfs");
    command.args(["get", "-H", "mountpoint"]).arg(format!("{pool}/{fs}"));
    let lines = run::checked_lines(&mut command)?;
    let line = lines.first().ok_or_else(|| PlanError::ZfsLine {
        line: String::new(),
    })?;
    // Columns: name, property, value, source.
    line.split('\t')
        .nth(2)
        .map(str::to_owned)
        .ok_or_else(|| PlanError::ZfsLine { line: line.clone() })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pools(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn snapshots_group_by_pool_and_filesystem() {
        let lines = [
            "tank/root@2024-01",
            "tank/root@2024-02",
            "tank/media@2024-01",
            "backup/root@2023-12",
        ];
        let inventory =
            parse_snapshot_names(lines.into_iter(), &pools(&["tank", "backup"])).expect("parse");
        assert_eq!(inventory["tank"]["root"].len(), 2);
        assert!(inventory["tank"]["media"].contains("2024-01"));
        assert!(inventory["backup"]["root"].contains("2023-12"));
    }

    #[test]
    fn nested_filesystems_keep_their_full_name() {
        let inventory = parse_snapshot_names(
            ["tank/data/photos@2024-01"].into_iter(),
            &pools(&["tank"]),
        )
        .expect("parse");
        assert!(inventory["tank"]["data/photos"].contains("2024-01"));
    }

    #[test]
    fn unexpected_pool_aborts() {
        let err = parse_snapshot_names(["rogue/fs@2024-01"].into_iter(), &pools(&["tank"]))
            .expect_err("unexpected pool");
        assert!(matches!(err, PlanError::UnexpectedPools { pools } if pools == ["rogue"]));
    }

    #[test]
    fn malformed_snapshot_line_aborts() {
        assert!(matches!(
            parse_snapshot_names(["tank-no-at-sign"].into_iter(), &pools(&["tank"])),
            Err(PlanError::ZfsLine { .. })
        ));
    }
}
