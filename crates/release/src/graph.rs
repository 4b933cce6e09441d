//! The workspace dependency graph used to propagate version bumps.
//!
//! Edges run from a dependency to its dependent and remember which
//! dependency map and key of the dependent reference it, so a bump can
//! rewrite exactly those ranges.

use crate::bump::{BumpKind, BumpOptions, Step, next_version};
use crate::error::{Error, Result};
use futures::future::join_all;
use indexmap::{IndexMap, IndexSet};
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use semver::Version;
use std::collections::HashMap;
use std::path::PathBuf;
use yakumo_workspaces::persist::write_manifest;
use yakumo_workspaces::{DependencyKind, Indent, PackageManifest, WorkspaceRegistry};

/// One workspace in the version graph.
#[derive(Debug, Clone)]
pub struct VersionNode {
    /// Registry path of the workspace.
    pub path: String,
    /// Manifest being mutated; its `version` field keeps the on-disk value
    /// until the graph is saved.
    pub manifest: PackageManifest,
    /// Current, possibly bumped, version.
    pub version: Option<String>,
    /// Whether the manifest must be written back.
    pub dirty: bool,
}

/// A reference from a dependent's dependency map to a workspace package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyEdge {
    /// Which map holds the reference.
    pub kind: DependencyKind,
    /// The key inside that map.
    pub key: String,
    /// `""` for a direct reference, `npm:<name>@` for an aliased one.
    pub prefix: String,
}

/// A manifest change reported after saving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionChange {
    /// The package's own version changed.
    Bumped {
        /// Package name
        name: String,
        /// Version on disk before the run
        from: String,
        /// Written version
        to: String,
    },
    /// Only dependency ranges changed.
    DependencyUpdated {
        /// Package name
        name: String,
    },
}

/// Dependency graph over every discovered workspace.
#[derive(Debug)]
pub struct VersionGraph {
    graph: DiGraph<VersionNode, DependencyEdge>,
    paths: IndexMap<String, NodeIndex>,
    root: PathBuf,
    indent: Indent,
}

impl VersionGraph {
    /// Build the graph from a freshly discovered registry.
    #[must_use]
    pub fn from_registry(registry: &WorkspaceRegistry) -> Self {
        let mut graph = DiGraph::new();
        let mut paths = IndexMap::new();
        let mut names: HashMap<String, NodeIndex> = HashMap::new();

        for (path, manifest) in registry.iter() {
            let idx = graph.add_node(VersionNode {
                path: path.to_string(),
                manifest: manifest.clone(),
                version: manifest.version().map(str::to_string),
                dirty: false,
            });
            paths.insert(path.to_string(), idx);
            names.entry(manifest.name().to_string()).or_insert(idx);
        }

        let mut edges = Vec::new();
        for &dependent in paths.values() {
            let manifest = &graph[dependent].manifest;
            for kind in DependencyKind::ALL {
                for (key, range) in manifest.dependencies(kind) {
                    let reference = if let Some(&dependency) = names.get(key) {
                        Some((dependency, String::new()))
                    } else {
                        npm_alias_target(range)
                            .and_then(|name| names.get(name).map(|&idx| (idx, format!("npm:{name}@"))))
                    };
                    if let Some((dependency, prefix)) = reference
                        && dependency != dependent
                    {
                        edges.push((
                            dependency,
                            dependent,
                            DependencyEdge {
                                kind,
                                key: key.to_string(),
                                prefix,
                            },
                        ));
                    }
                }
            }
        }
        for (from, to, edge) in edges {
            graph.add_edge(from, to, edge);
        }

        tracing::debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "Version graph built"
        );

        Self {
            graph,
            paths,
            root: registry.root().to_path_buf(),
            indent: registry.indent().clone(),
        }
    }

    /// Look up a node by registry path.
    #[must_use]
    pub fn node(&self, path: &str) -> Option<&VersionNode> {
        self.paths.get(path).map(|&idx| &self.graph[idx])
    }

    /// Registry paths of the workspaces that depend on `path`.
    #[must_use]
    pub fn dependents(&self, path: &str) -> Vec<&str> {
        let Some(&idx) = self.paths.get(path) else {
            return Vec::new();
        };
        let unique: IndexSet<NodeIndex> = self
            .dependent_edges(idx)
            .into_iter()
            .map(|(target, _)| target)
            .collect();
        unique.into_iter().map(|n| self.graph[n].path.as_str()).collect()
    }

    /// Outgoing edges of `idx` in insertion order, which follows discovery
    /// order of the dependents. petgraph walks them newest first.
    fn dependent_edges(&self, idx: NodeIndex) -> Vec<(NodeIndex, DependencyEdge)> {
        let mut edges: Vec<_> = self.graph.edges_directed(idx, Direction::Outgoing).collect();
        edges.sort_by_key(|e| e.id());
        edges
            .into_iter()
            .map(|e| (e.target(), e.weight().clone()))
            .collect()
    }

    /// Bump the workspace at `path` and rewrite the ranges that reference it.
    ///
    /// # Errors
    ///
    /// Fails when `path` is unknown or its version cannot be bumped.
    pub fn bump(&mut self, path: &str, options: &BumpOptions) -> Result<()> {
        let idx = *self
            .paths
            .get(path)
            .ok_or_else(|| yakumo_workspaces::Error::WorkspaceNotFound {
                name: path.to_string(),
            })?;
        self.bump_node(idx, options)
    }

    fn bump_node(&mut self, idx: NodeIndex, options: &BumpOptions) -> Result<()> {
        let Some(version) = self.bump_version(idx, options)? else {
            return Ok(());
        };

        let edges = self.dependent_edges(idx);

        let mut dependents = IndexSet::new();
        for (target, edge) in edges {
            let node = &mut self.graph[target];
            let Some(current) = node.manifest.dependency(edge.kind, &edge.key) else {
                continue;
            };
            let Some(next) = rewrite_range(current, &edge.prefix, &version) else {
                continue;
            };
            node.manifest.set_dependency(edge.kind, &edge.key, &next);
            node.dirty = true;
            tracing::debug!(
                dependent = %node.path,
                kind = %edge.kind,
                key = %edge.key,
                range = %next,
                "Dependency range rewritten"
            );
            if edge.kind.cascades() {
                dependents.insert(target);
            }
        }

        if options.recursive {
            for dependent in dependents {
                self.bump_node(dependent, options)?;
            }
        }
        Ok(())
    }

    /// Compute and record the new version of one node.
    ///
    /// Returns the version to propagate, or `None` when nothing changed.
    fn bump_version(&mut self, idx: NodeIndex, options: &BumpOptions) -> Result<Option<String>> {
        let node = &mut self.graph[idx];
        if node.manifest.is_private() {
            return Ok(None);
        }
        if matches!(options.kind, Some(BumpKind::Local)) {
            return Ok(node.manifest.version().map(str::to_string));
        }

        let missing = || Error::MissingVersion {
            name: node.manifest.name().to_string(),
        };
        let on_disk = parse_version(node.manifest.version().ok_or_else(missing)?)?;
        let step = next_version(&on_disk, options)?;
        let formatted = step.version().to_string();

        match step {
            Step::Forced(_) => {
                node.dirty = true;
            }
            Step::Explicit(_) => {
                if node.version.as_deref() != Some(formatted.as_str()) {
                    node.dirty = true;
                }
            }
            Step::Candidate(candidate) => {
                let current = node.version.as_deref().map(parse_version).transpose()?;
                if current.is_some_and(|current| candidate <= current) {
                    return Ok(None);
                }
                node.dirty = true;
            }
        }

        tracing::debug!(path = %node.path, version = %formatted, "Version bumped");
        node.version = Some(formatted.clone());
        Ok(Some(formatted))
    }

    /// Write every dirty manifest and report what changed.
    ///
    /// # Errors
    ///
    /// Fails when a manifest cannot be written.
    pub async fn save(&mut self) -> Result<Vec<VersionChange>> {
        let mut changes = Vec::new();
        let mut writes = Vec::new();

        for &idx in self.paths.values() {
            let node = &mut self.graph[idx];
            if !node.dirty {
                continue;
            }
            let name = node.manifest.name().to_string();
            let from = node.manifest.version().map(str::to_string);
            match (&node.version, from) {
                (Some(to), Some(from)) if *to != from => {
                    changes.push(VersionChange::Bumped {
                        name,
                        from,
                        to: to.clone(),
                    });
                }
                (Some(to), None) => {
                    changes.push(VersionChange::Bumped {
                        name,
                        from: String::new(),
                        to: to.clone(),
                    });
                }
                _ => changes.push(VersionChange::DependencyUpdated { name }),
            }
            if let Some(version) = &node.version {
                node.manifest.set_version(version);
            }
            let dir = if node.path.is_empty() {
                self.root.clone()
            } else {
                self.root.join(node.path.trim_start_matches('/'))
            };
            writes.push((dir, idx));
        }

        let graph = &self.graph;
        let indent = &self.indent;
        let results = join_all(
            writes
                .iter()
                .map(|(dir, idx)| write_manifest(dir, &graph[*idx].manifest, indent)),
        )
        .await;
        for result in results {
            result?;
        }

        for (_, idx) in writes {
            self.graph[idx].dirty = false;
        }
        Ok(changes)
    }
}

/// The target package of an `npm:<name>@<range>` alias value.
fn npm_alias_target(range: &str) -> Option<&str> {
    let rest = range.strip_prefix("npm:")?;
    // Scoped names start with `@`; the version separator is the last one.
    let at = rest.get(1..)?.rfind('@')? + 1;
    let name = &rest[..at];
    (!name.is_empty()).then_some(name)
}

/// Rewrite `current` to point at `version`, keeping its prefix and `^`/`~`
/// modifier. Returns `None` when the range must be left alone.
#[must_use]
pub fn rewrite_range(current: &str, prefix: &str, version: &str) -> Option<String> {
    let range = current.strip_prefix(prefix)?;
    if range.contains(':') {
        return None;
    }
    let modifier = match range.chars().next() {
        Some(c @ ('^' | '~')) => c.to_string(),
        _ => String::new(),
    };
    let next = format!("{prefix}{modifier}{version}");
    (next != current).then_some(next)
}

fn parse_version(version: &str) -> Result<Version> {
    Version::parse(version.trim()).map_err(|_| Error::invalid_version(version))
}
