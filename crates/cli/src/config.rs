//! TOML configuration for the toolkit.
//!
//! The configuration names machine-specific facts that never belong on the
//! command line: where local btrfs snapshots live, which rotating backup
//! drives may be mounted, and which ZFS pools the mirror flow is allowed to
//! see.
//!
//! ```toml
//! btrfs_sources = ["/tank/snaps/daily", "/tank/snaps/manual"]
//! btrfs_remotes = ["/mnt/backup-a", "/mnt/backup-b"]
//! zfs_pools = ["vault"]
//!
//! [zfs_filesystems]
//! root = ["/tank/snaps/daily"]
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_PATH: &str = "snapfall.toml";

/// Machine-specific toolkit configuration.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Directories holding local btrfs snapshots, for the send flow.
    #[serde(default)]
    pub btrfs_sources: Vec<PathBuf>,
    /// Candidate mount points of the rotating remote drives.
    #[serde(default)]
    pub btrfs_remotes: Vec<PathBuf>,
    /// ZFS pools the mirror flow may operate on; any other pool aborts.
    #[serde(default)]
    pub zfs_pools: BTreeSet<String>,
    /// Mirror targets: ZFS filesystem name to btrfs snapshot source
    /// directories.
    #[serde(default)]
    pub zfs_filesystems: BTreeMap<String, Vec<PathBuf>>,
}

/// Failure to load the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("reading config {}: {source}", .path.display())]
    Read {
        /// The configuration path.
        path: PathBuf,
        /// The underlying OS failure.
        source: io::Error,
    },
    /// The file is not valid TOML for [`Config`].
    #[error("parsing config {}: {source}", .path.display())]
    Parse {
        /// The configuration path.
        path: PathBuf,
        /// The underlying TOML failure.
        source: toml::de::Error,
    },
}

impl Config {
    /// Loads the configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })
    }
}
