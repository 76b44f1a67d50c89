//! Remote destination selection.
//!
//! The backup drives are rotated, so the configuration lists every
//! candidate mount point. Exactly one of them is expected to be present at
//! a time; anything else (none plugged in, or two at once) is a setup
//! problem the user has to resolve before a transfer can start.

use std::path::{Path, PathBuf};

use crate::error::PlanError;

/// Picks the single existing remote directory out of the candidates.
pub fn choose_remote(candidates: &[PathBuf]) -> Result<PathBuf, PlanError> {
    let existing: Vec<&PathBuf> = candidates.iter().filter(|path| path.is_dir()).collect();
    match existing.as_slice() {
        [only] => {
            tracing::info!(remote = %only.display(), "selected remote");
            Ok((*only).clone())
        }
        _ => Err(PlanError::AmbiguousRemote {
            existing: existing.len(),
            candidates: candidates.len(),
        }),
    }
}

/// Lists the snapshot names under a remote root.
///
/// The remote lays snapshots out as `<root>/<year>/<name>`; this flattens
/// the year level into one sorted name set.
pub fn remote_snapshots(
    remote: &Path,
) -> Result<std::collections::BTreeSet<String>, PlanError> {
    let mut names = std::collections::BTreeSet::new();
    for year in read_names(remote)? {
        for snap in read_names(&remote.join(&year))? {
            names.insert(snap);
        }
    }
    Ok(names)
}

/// Lists the entry names of one directory.
pub(crate) fn read_names(dir: &Path) -> Result<Vec<String>, PlanError> {
    let list_err = |source| PlanError::ListDir {
        path: dir.to_owned(),
        source,
    };
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(list_err)? {
        let entry = entry.map_err(list_err)?;
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn exactly_one_existing_candidate_wins() {
        let present = tempdir().expect("tempdir");
        let candidates = vec![
            PathBuf::from("/nonexistent/backup-a"),
            present.path().to_owned(),
        ];
        assert_eq!(choose_remote(&candidates).expect("choice"), present.path());
    }

    #[test]
    fn zero_or_two_candidates_fail() {
        assert!(matches!(
            choose_remote(&[PathBuf::from("/nonexistent/backup-a")]),
            Err(PlanError::AmbiguousRemote { existing: 0, .. })
        ));

        let a = tempdir().expect("tempdir");
        let b = tempdir().expect("tempdir");
        assert!(matches!(
            choose_remote(&[a.path().to_owned(), b.path().to_owned()]),
            Err(PlanError::AmbiguousRemote { existing: 2, candidates: 2 })
        ));
    }

    #[test]
    fn remote_snapshots_flatten_year_directories() {
        let remote = tempdir().expect("tempdir");
        for (year, snap) in [
            ("2023", "2023-12-30_daily"),
            ("2024", "2024-01-06_daily"),
            ("2024", "2024-02-03_daily"),
        ] {
            std::fs::create_dir_all(remote.path().join(year).join(snap)).expect("mkdir");
        }
        let names = remote_snapshots(remote.path()).expect("list");
        assert_eq!(
            names.into_iter().collect::<Vec<_>>(),
            ["2023-12-30_daily", "2024-01-06_daily", "2024-02-03_daily"]
        );
    }
}
