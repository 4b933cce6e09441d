//! The per-execution registry of discovered workspaces.

use crate::error::{Error, Result};
use crate::manifest::PackageManifest;
use crate::persist::{Indent, write_manifest};
use indexmap::IndexMap;
use std::path::{Path, PathBuf};

/// Every workspace discovered under a root, keyed by relative path.
///
/// Keys are `""` for the root and `/`-prefixed directories otherwise, in
/// discovery order.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkspaceRegistry {
    root: PathBuf,
    indent: Indent,
    entries: IndexMap<String, PackageManifest>,
}

impl WorkspaceRegistry {
    /// Create an empty registry rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, indent: Indent) -> Self {
        Self {
            root: root.into(),
            indent,
            entries: IndexMap::new(),
        }
    }

    /// The workspace root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The indentation detected from the root manifest.
    #[must_use]
    pub const fn indent(&self) -> &Indent {
        &self.indent
    }

    /// Add or replace a workspace.
    pub fn insert(&mut self, path: impl Into<String>, manifest: PackageManifest) {
        self.entries.insert(path.into(), manifest);
    }

    /// Look up a workspace manifest.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&PackageManifest> {
        self.entries.get(path)
    }

    /// Mutable access to a workspace manifest.
    pub fn get_mut(&mut self, path: &str) -> Option<&mut PackageManifest> {
        self.entries.get_mut(path)
    }

    /// The root manifest, when it was readable.
    #[must_use]
    pub fn root_manifest(&self) -> Option<&PackageManifest> {
        self.entries.get("")
    }

    /// Whether `path` was discovered.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    /// Paths in discovery order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// `(path, manifest)` pairs in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PackageManifest)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of workspaces, root included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was discovered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The directory of a workspace on disk.
    #[must_use]
    pub fn dir(&self, path: &str) -> PathBuf {
        let relative = path.trim_start_matches('/');
        if relative.is_empty() {
            self.root.clone()
        } else {
            self.root.join(relative)
        }
    }

    /// Write the in-memory manifest of `path` back to disk.
    ///
    /// # Errors
    ///
    /// Fails when `path` is unknown or the file cannot be written.
    pub async fn save(&self, path: &str) -> Result<()> {
        let manifest = self.get(path).ok_or_else(|| Error::WorkspaceNotFound {
            name: path.to_string(),
        })?;
        write_manifest(&self.dir(path), manifest, &self.indent).await
    }
}
