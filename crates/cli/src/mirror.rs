//! The `mirror` subcommand: monthly btrfs-to-ZFS mirroring.
//!
//! For every configured ZFS filesystem, each calendar month not yet
//! captured as a `@YYYY-MM` snapshot is mirrored: the chosen btrfs source
//! snapshot is rsynced onto the filesystem's mountpoint and the result is
//! frozen with `zfs snapshot`. Optionally a replay pass runs first, feeding
//! the btrfs change stream through the replay engine so renames and
//! hardlinks arrive as cheap namespace operations instead of full
//! re-copies by rsync.
//!
//! rsync deliberately runs with `--whole-file`: delta transfer against a
//! local destination costs more in reads than it saves, and in-place
//! rewriting would bloat the ZFS snapshot chain.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use pipeline::run;
use plan::{year_month, zfs};

use crate::config::Config;
use crate::error::CliError;
use crate::replay::replay_live;

/// Options for one mirror run.
#[derive(Clone, Copy, Debug, Default)]
pub struct MirrorOptions {
    /// Print the commands without executing anything.
    pub dry_run: bool,
    /// Run the replay pass before rsync to carry rename information.
    pub detect_renames: bool,
}

/// Runs the mirror flow across every configured pool and filesystem.
pub fn run(config: &Config, options: MirrorOptions) -> Result<(), CliError> {
    let mut available = BTreeMap::new();
    for (fs, dirs) in &config.zfs_filesystems {
        available.insert(fs.clone(), year_month::sources_by_ym(dirs)?);
    }

    for (pool, existing_by_fs) in zfs::snapshots_by_pool(&config.zfs_pools)? {
        for (fs, available_yms) in &available {
            let existing = existing_by_fs.get(fs).cloned().unwrap_or_default();
            mirror_filesystem(&pool, fs, available_yms, &existing, options)?;
        }
    }
    Ok(())
}

fn mirror_filesystem(
    pool: &str,
    fs: &str,
    available_yms: &BTreeMap<String, PathBuf>,
    existing: &std::collections::BTreeSet<String>,
    options: MirrorOptions,
) -> Result<(), CliError> {
    let mountpoint = zfs::mountpoint(pool, fs)?;

    let todo: Vec<&String> = available_yms
        .keys()
        .filter(|ym| !existing.contains(*ym))
        .collect();
    tracing::info!(pool = %pool, fs = %fs, ?todo, "months to mirror");

    // The replay pass streams each snapshot against the previously
    // mirrored one, so it needs the newest already-mirrored month as its
    // first parent.
    let mut parent: Option<&PathBuf> = if options.detect_renames {
        let newest = existing.iter().next_back().ok_or_else(|| {
            CliError::Usage(format!(
                "--detect-renames needs at least one mirrored month for {pool}/{fs}"
            ))
        })?;
        Some(available_yms.get(newest).ok_or_else(|| {
            CliError::Usage(format!(
                "--detect-renames: no source snapshot for mirrored month {newest}"
            ))
        })?)
    } else {
        None
    };

    for ym in todo {
        let from_snap = &available_yms[ym];

        if let Some(parent_snap) = parent {
            if options.dry_run {
                println!(
                    "would replay {} -> {} onto {mountpoint}",
                    parent_snap.display(),
                    from_snap.display()
                );
            } else {
                replay_live(parent_snap, from_snap, Path::new(&mountpoint))?;
            }
        }

        let mut rsync = Command::new("rsync");
        rsync
            .arg("--archive")
            .arg("--delete")
            .arg("--hard-links")
            .arg("--whole-file")
            .arg(format!("{}/", from_snap.display()))
            .arg(&mountpoint);
        run_or_print(options.dry_run, &mut rsync)?;

        let mut snapshot = Command::new("zfs");
        snapshot.arg("snapshot").arg(format!("{pool}/{fs}@{ym}"));
        run_or_print(options.dry_run, &mut snapshot)?;

        let mut df = Command::new("df");
        df.arg("-h").arg(&mountpoint);
        run_or_print(options.dry_run, &mut df)?;

        if options.detect_renames {
            parent = Some(from_snap);
        }
        if !options.dry_run {
            record_state(pool, fs, ym)?;
        }
    }
    Ok(())
}

fn run_or_print(dry_run: bool, command: &mut Command) -> Result<(), CliError> {
    if dry_run {
        let mut rendered = command.get_program().to_string_lossy().into_owned();
        for arg in command.get_args() {
            rendered.push(' ');
            rendered.push_str(&arg.to_string_lossy());
        }
        println!("would run: {rendered}");
        Ok(())
    } else {
        run::checked(command)?;
        Ok(())
    }
}

/// Records the newest mirrored month, one state file per pool/filesystem.
fn record_state(pool: &str, fs: &str, ym: &str) -> Result<(), CliError> {
    // Nested filesystem names contain slashes; flatten for the file name.
    let fs_flat = fs.replace('/', "-");
    let path = PathBuf::from(format!("last-ym-mirrored-{pool}-{fs_flat}"));
    std::fs::write(&path, format!("{ym}\n")).map_err(|source| CliError::State { path, source })
}
