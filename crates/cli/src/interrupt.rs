//! Polite interruption between snapshots.
//!
//! A multi-snapshot send can run for hours. Killing it mid-snapshot leaves
//! a half-received subvolume on the remote (see the parent-finished check),
//! so instead the send loop offers a safe stopping point between
//! snapshots: if anything is waiting on stdin, the user is prompted and the
//! loop stops only on the exact keyword `stop`. Anything else - including
//! stray input from a scrollback paste - continues the run.

use std::io::{self, BufRead, Write};

/// The keyword that confirms an interrupt.
const KEYWORD: &str = "stop";

/// Checks stdin for a pending interrupt request.
///
/// Returns `true` when the user confirmed with the keyword. Never blocks
/// unless input is already pending.
pub fn polite_interrupt() -> io::Result<bool> {
    if !stdin_ready()? {
        return Ok(false);
    }

    print!("'{KEYWORD}' to interrupt: ");
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    let answer = answer.trim_end_matches('\n');
    if answer == KEYWORD {
        Ok(true)
    } else {
        println!("{answer:?} != {KEYWORD:?}, continuing");
        Ok(false)
    }
}

/// Non-blocking readability check on stdin.
#[cfg(unix)]
#[allow(unsafe_code)]
fn stdin_ready() -> io::Result<bool> {
    let mut fds = libc::pollfd {
        fd: libc::STDIN_FILENO,
        events: libc::POLLIN,
        revents: 0,
    };
    // SAFETY: `fds` is a valid pollfd array of length 1 and a zero timeout
    // cannot block.
    let rc = unsafe { libc::poll(&mut fds, 1, 0) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(rc > 0 && (fds.revents & libc::POLLIN) != 0)
}

#[cfg(not(unix))]
fn stdin_ready() -> io::Result<bool> {
    Ok(false)
}
