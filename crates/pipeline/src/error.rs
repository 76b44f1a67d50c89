//! Errors surfaced while spawning and supervising external processes.

use std::io;
use std::process::ExitStatus;

use thiserror::Error;

/// Failure to drive an external process pipeline to a clean exit.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A child process could not be spawned.
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        /// The program that failed to start.
        program: String,
        /// The underlying OS failure.
        source: io::Error,
    },
    /// Waiting on a child process failed.
    #[error("failed to wait for {program}: {source}")]
    Wait {
        /// The program being waited on.
        program: String,
        /// The underlying OS failure.
        source: io::Error,
    },
    /// A child did not expose the expected stdio handle.
    #[error("{program} did not expose a {stream} handle")]
    MissingStream {
        /// The program missing the handle.
        program: String,
        /// Which stdio stream was absent.
        stream: &'static str,
    },
    /// The pipeline completed, but not successfully.
    #[error("pipeline failed: producer {producer}, consumer {consumer}")]
    Failed {
        /// Producer exit status, rendered for diagnostics.
        producer: ExitStatus,
        /// Consumer exit status, rendered for diagnostics.
        consumer: ExitStatus,
    },
    /// A standalone command exited with a nonzero status.
    #[error("{program} exited with {status}")]
    CommandFailed {
        /// The program that failed.
        program: String,
        /// Its exit status.
        status: ExitStatus,
    },
    /// A standalone command produced undecodable output.
    #[error("{program} produced non-UTF-8 output")]
    BadOutput {
        /// The program at fault.
        program: String,
    },
}
