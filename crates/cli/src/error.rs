//! Front-end error type and exit codes.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;

/// Exit codes reported by the `snapfall` binary.
///
/// Each failure class gets its own code so wrapper scripts can tell a
/// planning refusal (fix the setup, retry) from a replay failure (recreate
/// the destination).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum ExitCode {
    /// Successful completion, including a polite interrupt.
    Ok = 0,
    /// Command-line usage error.
    Usage = 1,
    /// Configuration file missing or invalid.
    Config = 2,
    /// Transfer planning refused to proceed.
    Plan = 3,
    /// An external process pipeline failed.
    Pipeline = 4,
    /// The replay engine aborted.
    Replay = 5,
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        Self::from(code as u8)
    }
}

/// Any failure a subcommand can surface.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid flag combination or missing required value.
    #[error("{0}")]
    Usage(String),
    /// Configuration loading failed.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Transfer planning failed.
    #[error(transparent)]
    Plan(#[from] plan::PlanError),
    /// Pipeline supervision failed.
    #[error(transparent)]
    Pipeline(#[from] pipeline::PipelineError),
    /// The replay engine aborted.
    #[error(transparent)]
    Replay(#[from] engine::ReplayError),
    /// Reading the interrupt prompt failed.
    #[error("reading interrupt prompt: {0}")]
    Prompt(#[source] io::Error),
    /// Recording the mirror state file failed.
    #[error("writing state file {}: {source}", .path.display())]
    State {
        /// The state file path.
        path: PathBuf,
        /// The underlying OS failure.
        source: io::Error,
    },
}

impl CliError {
    /// Maps the failure class to its process exit code.
    #[must_use]
    pub const fn exit_code(&self) -> ExitCode {
        match self {
            Self::Usage(_) => ExitCode::Usage,
            Self::Config(_) => ExitCode::Config,
            Self::Plan(_) => ExitCode::Plan,
            Self::Pipeline(_) | Self::Prompt(_) | Self::State { .. } => ExitCode::Pipeline,
            Self::Replay(_) => ExitCode::Replay,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_stable() {
        assert_eq!(ExitCode::Ok as u8, 0);
        assert_eq!(
            CliError::Usage(String::new()).exit_code(),
            ExitCode::Usage
        );
        assert_eq!(
            CliError::Plan(plan::PlanError::EmptyRemote {
                path: PathBuf::from("/r"),
            })
            .exit_code(),
            ExitCode::Plan
        );
    }
}
