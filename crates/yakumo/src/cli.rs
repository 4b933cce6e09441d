//! Process-boundary concerns: argument splitting, exit codes and error
//! rendering.

use crate::style;
use miette::Report;
use std::io::{self, Write};
use yakumo_core::Error;

/// Exit code for a successful run
pub const EXIT_OK: i32 = 0;
/// Exit code for every failure that is not a delegated process exit
pub const EXIT_FAILURE: i32 = 1;

/// The command name and the arguments following it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// The command name.
    pub command: String,
    /// Everything after the command name.
    pub args: Vec<String>,
}

/// Split the process arguments (without the binary name).
///
/// Returns `None` when no command was given.
#[must_use]
pub fn parse<I>(args: I) -> Option<Invocation>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let command = args.next()?;
    Some(Invocation {
        command,
        args: args.collect(),
    })
}

/// Map an error to the process exit code.
#[must_use]
pub const fn exit_code_for(err: &Error) -> i32 {
    match err.exit_code() {
        0 => EXIT_FAILURE,
        code => code,
    }
}

/// Render an error to stderr.
///
/// Unknown commands are a single red line; everything else goes through
/// miette.
pub fn render_error(err: Error) {
    match err {
        Error::UnknownCommand { name } => {
            eprintln!("{}", style::red(&format!("unknown command: {name}")));
        }
        // The child already reported its own failure.
        Error::ProcessExit { command, code } => {
            tracing::debug!(command = %command, code, "Delegated process failed");
        }
        other => {
            let report = Report::new(other);
            eprintln!("{report:?}");
        }
    }
    let _ = io::stderr().flush();
}
