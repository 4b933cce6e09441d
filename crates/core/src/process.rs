//! Subprocess spawning with interrupt forwarding.
//!
//! Delegated commands (package manager installs, scripts, test runners) run
//! with inherited stdio. While the parent waits, Ctrl-C is forwarded to the
//! child and the parent keeps waiting, so the child's own exit status decides
//! the outcome.

use crate::error::{Error, Result};
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use tokio::process::Command;
use tracing::debug;

/// How a child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessOutcome {
    /// Exit code, when the process exited normally.
    pub code: Option<i32>,
    /// Terminating signal, when the process was killed.
    pub signal: Option<i32>,
}

impl ProcessOutcome {
    fn from_status(status: ExitStatus) -> Self {
        #[cfg(unix)]
        let signal = {
            use std::os::unix::process::ExitStatusExt;
            status.signal()
        };
        #[cfg(not(unix))]
        let signal = None;
        Self {
            code: status.code(),
            signal,
        }
    }

    /// Whether the process exited with code zero.
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.code, Some(0))
    }

    /// The exit code to propagate: the child's code, or `128 + signal`.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match (self.code, self.signal) {
            (Some(code), _) => code,
            (None, Some(signal)) => 128 + signal,
            (None, None) => 1,
        }
    }
}

/// Output of a captured process.
#[derive(Debug, Clone)]
pub struct CapturedOutput {
    /// How the process ended.
    pub outcome: ProcessOutcome,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

fn command_for(args: &[String], cwd: &Path) -> Result<Command> {
    let (program, rest) = args
        .split_first()
        .ok_or_else(|| Error::validation("Missing command"))?;
    let mut command = Command::new(program);
    command.args(rest).current_dir(cwd);
    Ok(command)
}

/// Run `args` in `cwd` with inherited stdio and wait for it to exit.
///
/// # Errors
///
/// Fails when `args` is empty or the program cannot be started.
pub async fn spawn(args: &[String], cwd: &Path) -> Result<ProcessOutcome> {
    let mut command = command_for(args, cwd)?;
    command
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());

    debug!(command = %args.join(" "), cwd = %cwd.display(), "Spawning process");
    let mut child = command
        .spawn()
        .map_err(|e| Error::io(e, format!("spawning {}", args.join(" "))))?;

    let status = loop {
        tokio::select! {
            status = child.wait() => {
                break status.map_err(|e| Error::io(e, "waiting for child process"))?;
            }
            interrupt = tokio::signal::ctrl_c() => {
                if interrupt.is_ok() {
                    forward_interrupt(&mut child);
                }
            }
        }
    };

    let outcome = ProcessOutcome::from_status(status);
    debug!(command = %args.join(" "), code = outcome.exit_code(), "Process exited");
    Ok(outcome)
}

/// Run `args` and fail with [`Error::ProcessExit`] on a non-zero exit.
///
/// # Errors
///
/// Fails when the process cannot start or does not succeed.
pub async fn run_checked(args: &[String], cwd: &Path) -> Result<()> {
    let outcome = spawn(args, cwd).await?;
    if outcome.success() {
        Ok(())
    } else {
        Err(Error::ProcessExit {
            command: args.join(" "),
            code: outcome.exit_code(),
        })
    }
}

/// Run `args` with captured output.
///
/// # Errors
///
/// Fails when `args` is empty or the program cannot be started.
pub async fn capture(args: &[String], cwd: &Path) -> Result<CapturedOutput> {
    let mut command = command_for(args, cwd)?;
    command.stdin(Stdio::null());
    let output = command
        .output()
        .await
        .map_err(|e| Error::io(e, format!("running {}", args.join(" "))))?;
    Ok(CapturedOutput {
        outcome: ProcessOutcome::from_status(output.status),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

#[cfg(unix)]
fn forward_interrupt(child: &mut tokio::process::Child) {
    let Some(pid) = child.id().and_then(|pid| libc::pid_t::try_from(pid).ok()) else {
        return;
    };

    // SAFETY: both calls only read process-group ids.
    #[expect(unsafe_code, reason = "Required to compare process groups")]
    let (child_group, own_group) = unsafe { (libc::getpgid(pid), libc::getpgrp()) };
    if !needs_forwarding(child_group, own_group) {
        debug!("Child shares our process group and already received the interrupt");
        return;
    }

    debug!("Forwarding interrupt to child process");
    // SAFETY: the pid belongs to a child we spawned and have not reaped.
    #[expect(unsafe_code, reason = "Required for POSIX signal forwarding")]
    unsafe {
        libc::kill(pid, libc::SIGINT);
    }
}

/// A terminal Ctrl-C reaches the whole foreground process group, so a
/// child in our group already has it. Children in another group, or whose
/// group cannot be read (`-1`), get it from us.
#[cfg(unix)]
const fn needs_forwarding(child_group: libc::pid_t, own_group: libc::pid_t) -> bool {
    child_group < 0 || child_group != own_group
}

#[cfg(not(unix))]
fn forward_interrupt(child: &mut tokio::process::Child) {
    debug!("Stopping child process after interrupt");
    let _ = child.start_kill();
}
