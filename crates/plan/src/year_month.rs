//! Year-month source selection for the mirror flow.
//!
//! The destination keeps one mirrored state per calendar month, while the
//! sources hold many snapshots per month (dailies, weeklies). For each
//! `YYYY-MM` the flow mirrors a single representative: the snapshot whose
//! full path sorts first. Using the full path, source directory included,
//! keeps the choice stable when the same month appears in more than one
//! source directory.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::PlanError;
use crate::remote::read_names;

/// Length of a `YYYY-MM` key.
const YM_LEN: usize = "YYYY-MM".len();

/// Picks, per unique `YYYY-MM`, the lexically smallest full snapshot path.
///
/// Snapshot names are assumed to start with `YYYY-MM`; shorter names are
/// skipped as non-snapshot clutter.
pub fn sources_by_ym(src_dirs: &[PathBuf]) -> Result<BTreeMap<String, PathBuf>, PlanError> {
    let mut chosen: BTreeMap<String, PathBuf> = BTreeMap::new();
    for dir in src_dirs {
        for name in read_names(dir)? {
            let Some(ym) = name.get(..YM_LEN) else {
                tracing::debug!(name = %name, "skipping entry without a year-month prefix");
                continue;
            };
            let ym = ym.to_owned();
            let full = dir.join(&name);
            match chosen.get(&ym) {
                Some(existing) if *existing <= full => {}
                _ => {
                    chosen.insert(ym, full);
                }
            }
        }
    }
    Ok(chosen)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn smallest_full_path_wins_per_month() {
        let a = tempdir().expect("tempdir");
        let b = tempdir().expect("tempdir");
        for (dir, name) in [
            (&a, "2024-01-15_daily"),
            (&a, "2024-01-02_daily"),
            (&a, "2024-02-01_daily"),
            (&b, "2024-02-20_daily"),
        ] {
            std::fs::create_dir(dir.path().join(name)).expect("mkdir");
        }

        let sources =
            sources_by_ym(&[a.path().to_owned(), b.path().to_owned()]).expect("sources");
        assert_eq!(sources.len(), 2);
        assert_eq!(sources["2024-01"], a.path().join("2024-01-02_daily"));
        // Between 2024-02 candidates the full path decides, not just the name.
        let feb = &sources["2024-02"];
        let expected = std::cmp::min(
            a.path().join("2024-02-01_daily"),
            b.path().join("2024-02-20_daily"),
        );
        assert_eq!(*feb, expected);
    }

    #[test]
    fn short_names_are_skipped() {
        let dir = tempdir().expect("tempdir");
        std::fs::create_dir(dir.path().join("tmp")).expect("mkdir");
        let sources = sources_by_ym(&[dir.path().to_owned()]).expect("sources");
        assert!(sources.is_empty());
    }
}
