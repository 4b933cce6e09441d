//! Error types for version bumping.

use miette::Diagnostic;
use thiserror::Error;

/// Result type alias for release operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while computing or applying version bumps.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// A version string is not valid semver.
    #[error("Invalid version: {version}")]
    #[diagnostic(
        code(yakumo::release::invalid_version),
        help("Version must follow semantic versioning (e.g., 1.0.0, 2.1.0-beta.1)")
    )]
    InvalidVersion {
        /// The invalid version string
        version: String,
    },

    /// More than one bump kind was requested.
    #[error("You can only specify one bump type.")]
    #[diagnostic(
        code(yakumo::release::conflicting_bumps),
        help("Pick one of: {}", flags.join(", "))
    )]
    ConflictingBumps {
        /// The flags that were passed together
        flags: Vec<String>,
    },

    /// A package that must be bumped declares no version.
    #[error("Package {name} has no version")]
    #[diagnostic(
        code(yakumo::release::missing_version),
        help("Add a `version` field or mark the package `private`")
    )]
    MissingVersion {
        /// The package name
        name: String,
    },

    /// The prerelease channel cannot advance further.
    #[error("Cannot advance prerelease channel of {version}")]
    #[diagnostic(
        code(yakumo::release::prerelease_exhausted),
        help("Prereleases advance alpha -> beta -> rc; use --stable to leave the channel")
    )]
    PrereleaseExhausted {
        /// The current version
        version: String,
    },

    /// A reset would move a component below zero.
    #[error("Cannot reset {version} below zero")]
    #[diagnostic(code(yakumo::release::reset_below_zero))]
    ResetBelowZero {
        /// The current version
        version: String,
    },

    /// Workspace lookup or persistence failed.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Workspace(#[from] yakumo_workspaces::Error),
}

impl Error {
    /// Create an invalid version error.
    #[must_use]
    pub fn invalid_version(version: impl Into<String>) -> Self {
        Self::InvalidVersion {
            version: version.into(),
        }
    }
}
