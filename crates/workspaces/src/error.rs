//! Error types for workspace operations.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for workspace operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during workspace operations.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// The root manifest could not be read.
    #[error("Manifest file not found at path: {}", path.display())]
    #[diagnostic(
        code(yakumo::workspaces::manifest_not_found),
        help("Run yakumo from the workspace root, next to its package.json")
    )]
    ManifestNotFound {
        /// The path where the manifest was expected.
        path: PathBuf,
    },

    /// A manifest was readable but does not have the expected shape.
    #[error("Invalid manifest at {}: {message}", path.display())]
    #[diagnostic(
        code(yakumo::workspaces::invalid_manifest),
        help("A package.json must be a JSON object with a string `name` field")
    )]
    InvalidManifest {
        /// Path to the invalid manifest.
        path: PathBuf,
        /// Description of what is invalid.
        message: String,
    },

    /// No workspace matched a requested name.
    #[error("cannot find workspace \"{name}\"")]
    #[diagnostic(
        code(yakumo::workspaces::not_found),
        help("Workspaces are matched by the last segment of their directory, e.g. `core` for packages/core")
    )]
    WorkspaceNotFound {
        /// The requested name.
        name: String,
    },

    /// More than one workspace matched a requested name.
    #[error("ambiguous workspace \"{name}\": {}", paths.join(", "))]
    #[diagnostic(
        code(yakumo::workspaces::ambiguous),
        help("Declare an alias in the yakumo configuration to pick one of them")
    )]
    AmbiguousWorkspace {
        /// The requested name.
        name: String,
        /// Every path that matched.
        paths: Vec<String>,
    },

    /// An alias points at a path that is not a discovered workspace.
    #[error("cannot find workspace {path} resolved by {alias}")]
    #[diagnostic(
        code(yakumo::workspaces::alias_target_missing),
        help("Check the `alias` section of the yakumo configuration")
    )]
    AliasTargetMissing {
        /// The missing workspace path.
        path: String,
        /// The alias that referenced it.
        alias: String,
    },

    /// A glob pattern could not be compiled.
    #[error("Invalid pattern '{pattern}': {message}")]
    #[diagnostic(code(yakumo::workspaces::invalid_pattern))]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// Parser message.
        message: String,
    },

    /// I/O error occurred.
    #[error("I/O error during {operation}{}: {source}", path.as_ref().map(|p| format!(" at {}", p.display())).unwrap_or_default())]
    #[diagnostic(
        code(yakumo::workspaces::io_error),
        help("Check that the referenced paths exist and that you have permission to read or write them")
    )]
    Io {
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
        /// Optional path where the error occurred.
        path: Option<PathBuf>,
        /// Description of the operation being performed.
        operation: String,
    },

    /// JSON parsing or serialization error.
    #[error("JSON error{}: {source}", path.as_ref().map(|p| format!(" in {}", p.display())).unwrap_or_default())]
    #[diagnostic(
        code(yakumo::workspaces::json_error),
        help("Ensure the file contains valid JSON")
    )]
    Json {
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
        /// Optional path to the file being parsed.
        path: Option<PathBuf>,
    },
}

impl Error {
    /// Create an I/O error bound to a path.
    #[must_use]
    pub fn io(source: std::io::Error, path: impl Into<PathBuf>, operation: impl Into<String>) -> Self {
        Self::Io {
            source,
            path: Some(path.into()),
            operation: operation.into(),
        }
    }

    /// Whether this error comes from resolving a user-supplied name.
    #[must_use]
    pub const fn is_resolution(&self) -> bool {
        matches!(
            self,
            Self::WorkspaceNotFound { .. }
                | Self::AmbiguousWorkspace { .. }
                | Self::AliasTargetMissing { .. }
        )
    }
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            source,
            path: None,
            operation: "file operation".to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(source: serde_json::Error) -> Self {
        Self::Json { source, path: None }
    }
}
