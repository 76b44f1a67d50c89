//! `btrfs subvolume show` parsing and parent verification.
//!
//! An incremental send is only valid against a parent snapshot that fully
//! arrived on the remote. A finished receive is recognisable from
//! `btrfs subvolume show`: the remote copy is read-only and records the
//! local parent's UUID as its `Received UUID`. An interrupted receive
//! leaves `Received UUID` unset (`-`), and sending against it would build
//! the new snapshot on a silently incomplete base.

use std::collections::BTreeMap;
use std::path::Path;
use std::process::Command;

use pipeline::run;

use crate::error::PlanError;

/// Runs `btrfs subvolume show` and parses its `Key: value` body.
pub fn show(subvolume: &Path) -> Result<BTreeMap<String, String>, PlanError> {
    let mut command = Command::new("btrfs");
    command.arg("subvolume").arg("show").arg(subvolume);
    let lines = run::checked_lines(&mut command)?;
    parse_show(subvolume, lines.iter().map(String::as_str))
}

/// Parses the body of `btrfs subvolume show` output.
///
/// The first line names the subvolume path and is skipped; every following
/// line must split on the first `:`.
fn parse_show<'a>(
    subvolume: &Path,
    lines: impl Iterator<Item = &'a str>,
) -> Result<BTreeMap<String, String>, PlanError> {
    let mut fields = BTreeMap::new();
    for line in lines.skip(1) {
        let Some((key, value)) = line.split_once(':') else {
            return Err(PlanError::ShowLine {
                path: subvolume.to_owned(),
                line: line.to_owned(),
            });
        };
        fields.insert(key.trim_start().to_owned(), value.trim_start().to_owned());
    }
    Ok(fields)
}

/// Verifies that `remote_parent` is a finished, read-only receive of
/// `local_parent`.
pub fn check_parent_finished(local_parent: &Path, remote_parent: &Path) -> Result<(), PlanError> {
    let local = show(local_parent)?;
    let remote = show(remote_parent)?;

    let local_uuid = field(&local, local_parent, "UUID")?;
    let received_uuid = field(&remote, remote_parent, "Received UUID")?;
    let flags = field(&remote, remote_parent, "Flags")?;

    if received_uuid == "-" {
        return Err(PlanError::ParentUnfinished {
            path: remote_parent.to_owned(),
            reason: "no Received UUID".to_owned(),
        });
    }
    if !flags.split_whitespace().any(|flag| flag == "readonly") {
        return Err(PlanError::ParentUnfinished {
            path: remote_parent.to_owned(),
            reason: format!("not read-only (flags: {flags})"),
        });
    }
    if received_uuid != local_uuid {
        return Err(PlanError::ParentUnfinished {
            path: remote_parent.to_owned(),
            reason: format!(
                "Received UUID {received_uuid} does not match local UUID {local_uuid} of {}",
                local_parent.display()
            ),
        });
    }
    tracing::debug!(parent = %local_parent.display(), "parent verified on remote");
    Ok(())
}

fn field<'a>(
    fields: &'a BTreeMap<String, String>,
    subvolume: &Path,
    name: &'static str,
) -> Result<&'a str, PlanError> {
    fields
        .get(name)
        .map(String::as_str)
        .ok_or_else(|| PlanError::ShowField {
            path: subvolume.to_owned(),
            field: name,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn show_output_splits_on_first_colon() {
        let lines = [
            "pool/2024/2024-06-01",
            "\tName: \t\t2024-06-01",
            "\tUUID: \t\taaaa-bbbb",
            "\tReceived UUID: \tcccc-dddd",
            "\tFlags: \t\treadonly",
            "\tSnapshot(s):",
        ];
        let fields = parse_show(Path::new("pool/2024/2024-06-01"), lines.into_iter())
            .expect("parse");
        assert_eq!(fields.get("UUID").map(String::as_str), Some("aaaa-bbbb"));
        assert_eq!(
            fields.get("Received UUID").map(String::as_str),
            Some("cccc-dddd")
        );
        assert_eq!(fields.get("Snapshot(s)").map(String::as_str), Some(""));
    }

    #[test]
    fn line_without_colon_is_rejected() {
        let lines = ["path", "\tName: x", "\tgarbage line"];
        assert!(matches!(
            parse_show(Path::new("path"), lines.into_iter()),
            Err(PlanError::ShowLine { .. })
        ));
    }
}
