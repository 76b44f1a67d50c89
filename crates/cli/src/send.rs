//! The `send` subcommand: push pending btrfs snapshots to the remote.
//!
//! Each snapshot is sent incrementally against the previous one, so the
//! loop is strictly ordered and each success advances the parent. Between
//! snapshots the loop reports elapsed time, two remaining-time estimates,
//! and offers the polite interrupt; within a snapshot there is no safe
//! stopping point.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use pipeline::{ReceiveMode, SendPipeline};
use plan::sendplan::{self, SendPlan};
use plan::{remote, subvolume};

use crate::config::Config;
use crate::error::CliError;
use crate::interrupt::polite_interrupt;

/// How many recent sends feed the averaged estimate.
const ETA_SAMPLE: usize = 5;

/// Runs the send loop to completion or polite interruption.
pub fn run(config: &Config) -> Result<(), CliError> {
    let remote_root = remote::choose_remote(&config.btrfs_remotes)?;
    let local_paths = sendplan::local_snapshot_paths(&config.btrfs_sources)?;
    let local_names: BTreeSet<String> = local_paths.keys().cloned().collect();
    let remote_names = remote::remote_snapshots(&remote_root)?;

    let SendPlan { parent, to_send } =
        sendplan::snaps_to_send(&local_names, &remote_names, &remote_root)?;
    if to_send.is_empty() {
        println!("remote is up to date");
        return Ok(());
    }

    subvolume::check_parent_finished(
        &local_paths[&parent],
        &remote_root.join(year_of(&parent)).join(&parent),
    )?;

    let mut parent = parent;
    let mut recent: Vec<Duration> = Vec::new();
    let total = to_send.len();

    for (index, snap) in to_send.iter().enumerate() {
        let remaining = total - index;
        println!("{remaining} more to send");

        let parent_path = &local_paths[&parent];
        let snap_path = &local_paths[snap];
        let receive_dir = remote_root.join(year_of(snap));

        let started = Instant::now();
        let pipe = SendPipeline::btrfs_send(parent_path, snap_path, &ReceiveMode::Native(receive_dir))?;
        pipe.wait()?.ensure_success()?;
        let elapsed = started.elapsed();
        println!("snapshot took {}", format_duration(elapsed));

        let left = remaining - 1;
        if left == 0 {
            break;
        }

        recent.push(elapsed);
        if recent.len() > ETA_SAMPLE {
            recent.remove(0);
        }
        println!("estimated remaining time:");
        println!(
            "  {} (based on this send)",
            format_duration(elapsed * u32::try_from(left).unwrap_or(u32::MAX))
        );
        if recent.len() > 1 {
            let avg = average(&recent);
            println!(
                "  {} (based on average of the last {})",
                format_duration(avg * u32::try_from(left).unwrap_or(u32::MAX)),
                recent.len()
            );
        }

        if polite_interrupt().map_err(CliError::Prompt)? {
            println!("stopping after {snap}");
            break;
        }
        parent = snap.clone();
    }
    Ok(())
}

/// The year directory a snapshot lives under on the remote.
fn year_of(snapshot: &str) -> &str {
    snapshot.get(..4).unwrap_or(snapshot)
}

fn average(durations: &[Duration]) -> Duration {
    let total: Duration = durations.iter().sum();
    total / u32::try_from(durations.len().max(1)).unwrap_or(1)
}

/// Renders a duration as `H:MM:SS`.
fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_render_as_h_mm_ss() {
        assert_eq!(format_duration(Duration::from_secs(0)), "0:00:00");
        assert_eq!(format_duration(Duration::from_secs(61)), "0:01:01");
        assert_eq!(format_duration(Duration::from_secs(3723)), "1:02:03");
        assert_eq!(format_duration(Duration::from_secs(90000)), "25:00:00");
    }

    #[test]
    fn average_is_arithmetic_mean() {
        let avg = average(&[Duration::from_secs(10), Duration::from_secs(20)]);
        assert_eq!(avg, Duration::from_secs(15));
    }

    #[test]
    fn year_is_the_leading_four_characters() {
        assert_eq!(year_of("2024-05-01_daily"), "2024");
        assert_eq!(year_of("abc"), "abc");
    }
}
