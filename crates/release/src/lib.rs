//! Version bumping for yakumo workspaces.
//!
//! Bumps are computed per package and then propagated through the workspace
//! dependency graph: every dependent range that references a bumped package
//! is rewritten, keeping its `^`/`~` modifier and any `npm:<name>@` alias
//! prefix.
//!
//! # Modules
//!
//! - [`bump`] - Single-package version arithmetic and flag validation
//! - [`graph`] - Dependency graph, range rewriting and persistence
//!
//! # Example
//!
//! ```rust,ignore
//! use yakumo_release::{BumpFlags, BumpOptions, VersionGraph};
//!
//! let options = BumpOptions::from_flags(&BumpFlags { major: true, ..Default::default() })?;
//! let mut graph = VersionGraph::from_registry(&registry);
//! graph.bump("/packages/core", &options)?;
//! for change in graph.save().await? {
//!     println!("{change:?}");
//! }
//! ```

pub mod bump;
pub mod error;
pub mod graph;

pub use bump::{BumpFlags, BumpKind, BumpOptions, Step, next_version};
pub use error::{Error, Result};
pub use graph::{DependencyEdge, VersionChange, VersionGraph, VersionNode, rewrite_range};
