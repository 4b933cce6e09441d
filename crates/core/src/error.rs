//! Error types for command execution.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while loading configuration or executing commands.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// No command is registered under this name.
    #[error("unknown command: {name}")]
    #[diagnostic(code(yakumo::unknown_command))]
    UnknownCommand {
        /// The requested command name.
        name: String,
    },

    /// Command line arguments did not match the command's options.
    #[error("Invalid arguments for {command}: {message}")]
    #[diagnostic(
        code(yakumo::arguments),
        help("Run the command without extra flags to see which options it accepts")
    )]
    Arguments {
        /// The command being parsed.
        command: String,
        /// The parser message.
        message: String,
    },

    /// Configuration could not be loaded.
    #[error("Configuration error: {message}")]
    #[diagnostic(
        code(yakumo::config),
        help("Check the `yakumo` field of package.json and yakumo.yml")
    )]
    Configuration {
        /// What went wrong.
        message: String,
        /// The file being read, when known.
        path: Option<PathBuf>,
    },

    /// Input was rejected before anything was changed.
    #[error("{message}")]
    #[diagnostic(code(yakumo::validation))]
    Validation {
        /// What was rejected.
        message: String,
    },

    /// A delegated subprocess failed.
    #[error("Command `{command}` exited with code {code}")]
    #[diagnostic(code(yakumo::process_exit))]
    ProcessExit {
        /// The command line that was run.
        command: String,
        /// Exit code, or `128 + signal` when killed by a signal.
        code: i32,
    },

    /// A hook at an extension point failed.
    #[error("Hook {point} failed: {message}")]
    #[diagnostic(code(yakumo::hook))]
    Hook {
        /// The extension point.
        point: String,
        /// What went wrong.
        message: String,
    },

    /// A command finished with failures it already reported.
    #[error("{message}")]
    #[diagnostic(code(yakumo::command_failed))]
    CommandFailed {
        /// Summary of the failure.
        message: String,
    },

    /// Workspace discovery, resolution or persistence failed.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Workspace(#[from] yakumo_workspaces::Error),

    /// A version bump was rejected or could not be applied.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Release(#[from] yakumo_release::Error),

    /// I/O error occurred.
    #[error("I/O error during {operation}: {source}")]
    #[diagnostic(code(yakumo::io_error))]
    Io {
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
        /// Description of the operation being performed.
        operation: String,
    },
}

impl Error {
    /// Create a configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            path: None,
        }
    }

    /// Create a validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create an I/O error.
    #[must_use]
    pub fn io(source: std::io::Error, operation: impl Into<String>) -> Self {
        Self::Io {
            source,
            operation: operation.into(),
        }
    }

    /// The process exit code this error maps to.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::ProcessExit { code, .. } => *code,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_command_message() {
        let err = Error::UnknownCommand {
            name: "foo".to_string(),
        };
        assert_eq!(err.to_string(), "unknown command: foo");
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_process_exit_propagates_code() {
        let err = Error::ProcessExit {
            command: "npm install".to_string(),
            code: 130,
        };
        assert_eq!(err.exit_code(), 130);
    }

    #[test]
    fn test_constructors() {
        assert_eq!(
            Error::configuration("bad").to_string(),
            "Configuration error: bad"
        );
        assert_eq!(Error::validation("Missing command").to_string(), "Missing command");
    }

    #[test]
    fn test_layer_conversions() {
        let err: Error = yakumo_workspaces::Error::WorkspaceNotFound {
            name: "x".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "cannot find workspace \"x\"");

        let err: Error = yakumo_release::Error::invalid_version("1.x").into();
        assert_eq!(err.to_string(), "Invalid version: 1.x");
    }
}
