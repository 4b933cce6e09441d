//! Workspace discovery and name resolution for yakumo.
//!
//! A yakumo project is a directory whose `package.json` lists workspace
//! globs. This crate turns that root into a [`WorkspaceRegistry`], resolves
//! user-supplied names against it, and writes mutated manifests back with the
//! indentation the project already uses.
//!
//! ```rust,ignore
//! use yakumo_workspaces::{discover, locate, LocateOptions, ResolutionConfig};
//!
//! let registry = discover::<&str>(root, &[]).await?;
//! let targets = locate(&registry, &ResolutionConfig::default(), &["core"], &LocateOptions::default())?;
//! ```

pub mod detection;
pub mod discovery;
pub mod error;
pub mod locate;
pub mod manifest;
pub mod pattern;
pub mod persist;
pub mod registry;

pub use detection::PackageManager;
pub use discovery::discover;
pub use error::{Error, Result};
pub use locate::{AliasTarget, LocateOptions, ResolutionConfig, WorkspaceFilter, locate};
pub use manifest::{DependencyKind, PackageManifest};
pub use pattern::{PathPattern, PatternSet};
pub use persist::Indent;
pub use registry::WorkspaceRegistry;
