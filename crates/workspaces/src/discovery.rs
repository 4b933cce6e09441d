//! Workspace discovery from the root manifest's `workspaces` globs.

use crate::error::{Error, Result};
use crate::manifest::PackageManifest;
use crate::pattern::{PathPattern, PatternSet};
use crate::persist::Indent;
use crate::registry::WorkspaceRegistry;
use futures::future::join_all;
use glob::{MatchOptions, Pattern};
use indexmap::IndexSet;
use std::path::{Component, Path};

const GLOB_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: true,
};

/// Build a fresh registry for the workspace rooted at `root`.
///
/// The root manifest is mandatory. Members whose manifest cannot be read or
/// parsed are skipped. Candidates matching `ignore` are dropped before any
/// manifest is read.
///
/// # Errors
///
/// Fails when the root manifest is missing or invalid, or when a workspace
/// glob or ignore pattern is malformed.
pub async fn discover<S: AsRef<str>>(root: &Path, ignore: &[S]) -> Result<WorkspaceRegistry> {
    let manifest_path = root.join("package.json");
    let content = tokio::fs::read_to_string(&manifest_path)
        .await
        .map_err(|_| Error::ManifestNotFound {
            path: manifest_path.clone(),
        })?;
    let indent = Indent::detect(&content);
    let root_manifest = PackageManifest::parse(&content, &manifest_path)?;

    let globs: Vec<String> = root_manifest
        .workspaces()
        .into_iter()
        .map(str::to_string)
        .collect();
    let ignore = PatternSet::new(ignore)?;

    let candidates: Vec<String> = expand_workspace_globs(root, &globs)?
        .into_iter()
        .filter(|path| {
            let ignored = ignore.matches(path);
            if ignored {
                tracing::debug!(path, "Workspace ignored by configuration");
            }
            !ignored
        })
        .collect();

    let mut registry = WorkspaceRegistry::new(root, indent);
    registry.insert("", root_manifest);

    let reads = candidates.iter().map(|path| read_member(root, path));
    for (path, manifest) in candidates.iter().zip(join_all(reads).await) {
        match manifest {
            Ok(manifest) => registry.insert(path.clone(), manifest),
            Err(e) => tracing::debug!(path, error = %e, "Skipping workspace without a valid manifest"),
        }
    }

    tracing::debug!(count = registry.len(), root = %root.display(), "Workspaces discovered");
    Ok(registry)
}

async fn read_member(root: &Path, path: &str) -> Result<PackageManifest> {
    let manifest_path = root.join(path.trim_start_matches('/')).join("package.json");
    let content = tokio::fs::read_to_string(&manifest_path)
        .await
        .map_err(|e| Error::io(e, &manifest_path, "reading manifest"))?;
    PackageManifest::parse(&content, &manifest_path)
}

/// Expand workspace globs into `/`-prefixed relative directories.
///
/// Positive patterns are expanded in order, each in lexical order; patterns
/// starting with `!` remove matching directories from the result.
///
/// # Errors
///
/// Fails when a pattern is not a valid glob.
pub fn expand_workspace_globs(root: &Path, globs: &[String]) -> Result<Vec<String>> {
    let mut matched = IndexSet::new();
    let mut negations = Vec::new();
    let escaped_root = Pattern::escape(&root.to_string_lossy());

    for glob in globs {
        if let Some(negated) = glob.strip_prefix('!') {
            negations.push(PathPattern::new(negated)?);
            continue;
        }

        let full = format!("{escaped_root}/{}", glob.trim_start_matches("./"));
        let entries = glob::glob_with(&full, GLOB_OPTIONS).map_err(|e| Error::InvalidPattern {
            pattern: glob.clone(),
            message: e.msg.to_string(),
        })?;

        let mut found: Vec<String> = entries
            .filter_map(std::result::Result::ok)
            .filter(|p| p.is_dir())
            .filter_map(|p| relative_key(root, &p))
            .collect();
        found.sort();
        matched.extend(found);
    }

    Ok(matched
        .into_iter()
        .filter(|path| !negations.iter().any(|n| n.matches(path)))
        .collect())
}

fn relative_key(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let segments: Vec<_> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    if segments.is_empty() {
        return None;
    }
    Some(format!("/{}", segments.join("/")))
}
