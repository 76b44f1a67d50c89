#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `cli` wires the snapfall toolkit into a binary with three subcommands:
//!
//! - `replay` - apply a dump stream (live or from stdin) onto a directory.
//! - `send` - push pending btrfs snapshots to the rotating remote drive.
//! - `mirror` - keep monthly ZFS snapshots in step with btrfs sources.
//!
//! The crate owns everything user-facing: argument parsing, configuration
//! loading, tracing initialisation, exit codes, and the interactive pieces
//! of the send loop (progress, ETA estimates, the polite interrupt).
//!
//! # Errors
//!
//! [`run`] never panics; every failure is rendered to stderr with its full
//! source chain and mapped to a stable [`ExitCode`](error::ExitCode).

mod interrupt;
mod mirror;
mod replay;
mod send;

pub mod config;
pub mod error;

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::error::{CliError, ExitCode};
use crate::mirror::MirrorOptions;

/// Environment variable controlling log verbosity.
const LOG_ENV: &str = "SNAPFALL_LOG";

#[derive(Debug, Parser)]
#[command(
    name = "snapfall",
    version,
    about = "Personal btrfs/ZFS snapshot replication toolkit"
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true, default_value = config::DEFAULT_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: CommandLine,
}

#[derive(Debug, Subcommand)]
enum CommandLine {
    /// Replay a btrfs dump stream onto a destination directory.
    Replay {
        /// Destination directory to mutate.
        #[arg(long)]
        dest: PathBuf,
        /// Snapshot name prefixing the stream paths; required when reading
        /// from stdin, derived from --snap otherwise.
        #[arg(long)]
        snapshot: Option<String>,
        /// Parent snapshot for a live incremental stream.
        #[arg(long, requires = "snap")]
        parent: Option<PathBuf>,
        /// Snapshot to stream live; requires --parent.
        #[arg(long, requires = "parent")]
        snap: Option<PathBuf>,
    },
    /// Send pending btrfs snapshots to the remote drive.
    Send,
    /// Mirror monthly btrfs snapshots onto ZFS filesystems.
    Mirror {
        /// Print the commands without executing anything.
        #[arg(long)]
        dry_run: bool,
        /// Replay the btrfs change stream first so renames arrive as
        /// renames.
        #[arg(long)]
        detect_renames: bool,
    },
}

/// Parses arguments, dispatches, and maps failures to exit codes.
pub fn run<I, T>(args: I) -> std::process::ExitCode
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    init_tracing();

    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) => {
            // clap renders help/version through the same error path.
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::Usage.into()
            } else {
                ExitCode::Ok.into()
            };
        }
    };

    match dispatch(cli) {
        Ok(()) => ExitCode::Ok.into(),
        Err(err) => {
            report(&err);
            err.exit_code().into()
        }
    }
}

fn dispatch(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        CommandLine::Replay {
            dest,
            snapshot,
            parent,
            snap,
        } => {
            match (parent, snap) {
                (Some(parent), Some(snap)) => {
                    replay::replay_live(&parent, &snap, &dest)?;
                }
                (None, None) => {
                    let name = snapshot.ok_or_else(|| {
                        CliError::Usage(
                            "--snapshot is required when replaying from stdin".to_owned(),
                        )
                    })?;
                    replay::replay_stdin(&name, &dest)?;
                }
                // clap's `requires` links rule these out, but keep run()
                // panic-free regardless.
                _ => {
                    return Err(CliError::Usage(
                        "--parent and --snap must be given together".to_owned(),
                    ));
                }
            }
            Ok(())
        }
        CommandLine::Send => {
            let config = Config::load(&cli.config)?;
            send::run(&config)
        }
        CommandLine::Mirror {
            dry_run,
            detect_renames,
        } => {
            let config = Config::load(&cli.config)?;
            mirror::run(
                &config,
                MirrorOptions {
                    dry_run,
                    detect_renames,
                },
            )
        }
    }
}

/// Prints an error with its full source chain.
fn report(err: &CliError) {
    eprintln!("snapfall: {err}");
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        eprintln!("  caused by: {cause}");
        source = cause.source();
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    // A second init (e.g. in tests) is fine to ignore.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
