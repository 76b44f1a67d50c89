//! Logged execution of standalone external commands.
//!
//! The planning and mirroring layers shell out to `btrfs`, `zfs`, `rsync`
//! and `df`. Every invocation is logged with its full argv before running,
//! so a failed run can be reproduced by hand.

use std::process::{Command, Stdio};

use crate::error::PipelineError;

/// Runs a command to completion, failing on a nonzero exit status.
pub fn checked(command: &mut Command) -> Result<(), PipelineError> {
    let program = program_name(command);
    tracing::info!(command = %render(command), "running");
    let status = command.status().map_err(|source| PipelineError::Spawn {
        program: program.clone(),
        source,
    })?;
    if status.success() {
        Ok(())
    } else {
        Err(PipelineError::CommandFailed { program, status })
    }
}

/// Runs a command and returns its stdout as trimmed lines, failing on a
/// nonzero exit status or undecodable output.
pub fn checked_lines(command: &mut Command) -> Result<Vec<String>, PipelineError> {
    let program = program_name(command);
    tracing::info!(command = %render(command), "running");
    let output = command
        .stderr(Stdio::inherit())
        .output()
        .map_err(|source| PipelineError::Spawn {
            program: program.clone(),
            source,
        })?;
    if !output.status.success() {
        return Err(PipelineError::CommandFailed {
            program,
            status: output.status,
        });
    }
    let stdout = String::from_utf8(output.stdout)
        .map_err(|_| PipelineError::BadOutput { program })?;
    Ok(stdout
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect())
}

fn program_name(command: &Command) -> String {
    command.get_program().to_string_lossy().into_owned()
}

/// Renders a full argv for logging.
pub(crate) fn render(command: &Command) -> String {
    let mut out = program_name(command);
    for arg in command.get_args() {
        out.push(' ');
        out.push_str(&arg.to_string_lossy());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checked_lines_captures_stdout() {
        let mut command = Command::new("sh");
        command.arg("-c").arg("printf 'a\\n\\nb\\n'");
        let lines = checked_lines(&mut command).expect("command succeeds");
        // Blank lines are dropped; callers only ever want records.
        assert_eq!(lines, ["a", "b"]);
    }

    #[test]
    fn nonzero_status_is_an_error() {
        let mut command = Command::new("false");
        assert!(matches!(
            checked(&mut command),
            Err(PipelineError::CommandFailed { .. })
        ));
    }

    #[test]
    fn missing_binary_reports_spawn_failure() {
        let mut command = Command::new("/nonexistent/snapfall-helper");
        assert!(matches!(
            checked(&mut command),
            Err(PipelineError::Spawn { .. })
        ));
    }
}
