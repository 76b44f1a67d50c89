//! The `replay` subcommand: apply a dump stream onto a plain directory.
//!
//! Two ways in: pipe a previously captured dump via stdin, or name a
//! parent/snapshot pair and let the pipeline crate produce the stream live
//! from `btrfs send | btrfs receive --dump`. The live form is what the
//! mirror flow uses to carry btrfs rename information onto a destination
//! that cannot consume a send stream natively.

use std::io;
use std::path::Path;

use engine::Replayer;
use pipeline::{ReceiveMode, SendPipeline};

use crate::error::CliError;

/// Replays a live dump stream of `snap` (incremental against `parent`)
/// onto `dest`.
///
/// The snapshot-name prefix of the stream is the final component of the
/// snapshot path, exactly as `btrfs send` encodes it.
pub fn replay_live(parent: &Path, snap: &Path, dest: &Path) -> Result<u64, CliError> {
    let snapshot_name = snapshot_name(snap)?;
    let mut pipe = SendPipeline::btrfs_send(parent, snap, &ReceiveMode::Dump)?;
    let stream = pipe.dump_stream()?;

    let mut replayer = Replayer::new(dest, &snapshot_name);
    let applied = replayer.replay(stream)?;

    pipe.wait()?.ensure_success()?;
    tracing::info!(applied, snapshot = %snapshot_name, "replay complete");
    Ok(applied)
}

/// Replays an already-captured dump stream from stdin onto `dest`.
pub fn replay_stdin(snapshot_name: &str, dest: &Path) -> Result<u64, CliError> {
    let stdin = io::stdin();
    let mut replayer = Replayer::new(dest, snapshot_name);
    let applied = replayer.replay(stdin.lock())?;
    tracing::info!(applied, snapshot = %snapshot_name, "replay complete");
    Ok(applied)
}

/// Extracts the snapshot name a stream will be prefixed with.
pub fn snapshot_name(snap: &Path) -> Result<String, CliError> {
    snap.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| {
            CliError::Usage(format!(
                "snapshot path {} has no final component",
                snap.display()
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_name_is_the_final_component() {
        assert_eq!(
            snapshot_name(Path::new("/tank/snaps/2024-05-01_daily")).expect("name"),
            "2024-05-01_daily"
        );
    }

    #[test]
    fn rootless_snapshot_path_is_a_usage_error() {
        assert!(matches!(
            snapshot_name(Path::new("/")),
            Err(CliError::Usage(_))
        ));
    }
}
