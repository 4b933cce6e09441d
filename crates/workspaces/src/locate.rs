//! Resolution of user-supplied workspace names into registry paths.
//!
//! A name is tried against the alias table first (exact keys, then `prefix*`
//! keys), and otherwise matched structurally against the last segments of
//! every discovered path.

use crate::error::{Error, Result};
use crate::manifest::PackageManifest;
use crate::pattern::PatternSet;
use crate::registry::WorkspaceRegistry;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One alias target: a single path or a list of paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AliasTarget {
    /// `alias: { a: /packages/a }`
    One(String),
    /// `alias: { all: [/packages/a, /packages/b] }`
    Many(Vec<String>),
}

impl AliasTarget {
    /// The mapped paths.
    #[must_use]
    pub fn paths(&self) -> &[String] {
        match self {
            Self::One(path) => std::slice::from_ref(path),
            Self::Many(paths) => paths,
        }
    }
}

/// Alias and exclusion settings that shape resolution.
#[derive(Debug, Clone, Default)]
pub struct ResolutionConfig {
    /// Alias table, in configuration order.
    pub alias: IndexMap<String, AliasTarget>,
    /// Paths removed from the default filter.
    pub exclude: PatternSet,
}

/// Predicate replacing the default workspace filter.
pub type WorkspaceFilter = Box<dyn Fn(&PackageManifest, &str) -> bool + Send + Sync>;

/// Options for [`locate`].
#[derive(Default)]
pub struct LocateOptions {
    /// Keep workspace roots in the default filter.
    pub include_root: bool,
    /// Custom predicate; when set it replaces the default filter entirely.
    pub filter: Option<WorkspaceFilter>,
}

impl fmt::Debug for LocateOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocateOptions")
            .field("include_root", &self.include_root)
            .field("filter", &self.filter.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

impl LocateOptions {
    /// Default filter, workspace roots included.
    #[must_use]
    pub fn include_root() -> Self {
        Self {
            include_root: true,
            filter: None,
        }
    }

    /// Use a custom predicate.
    #[must_use]
    pub fn with_filter<F>(filter: F) -> Self
    where
        F: Fn(&PackageManifest, &str) -> bool + Send + Sync + 'static,
    {
        Self {
            include_root: false,
            filter: Some(Box::new(filter)),
        }
    }

    /// Accept every workspace, root included.
    #[must_use]
    pub fn accept_all() -> Self {
        Self::with_filter(|_, _| true)
    }

    fn accepts(&self, config: &ResolutionConfig, manifest: &PackageManifest, path: &str) -> bool {
        match &self.filter {
            Some(filter) => filter(manifest, path),
            None => {
                (self.include_root || !manifest.is_workspace_root())
                    && !config.exclude.matches(path)
            }
        }
    }
}

/// Resolve `selector` into workspace paths.
///
/// An empty selector yields every path accepted by the active filter.
/// Otherwise each name resolves on its own and the results are concatenated
/// without duplicates.
///
/// # Errors
///
/// Fails when a name matches nothing, matches more than one workspace, or
/// is an alias pointing at an undiscovered path.
pub fn locate<S: AsRef<str>>(
    registry: &WorkspaceRegistry,
    config: &ResolutionConfig,
    selector: &[S],
    options: &LocateOptions,
) -> Result<Vec<String>> {
    if selector.is_empty() {
        return Ok(registry
            .iter()
            .filter(|(path, manifest)| options.accepts(config, manifest, path))
            .map(|(path, _)| path.to_string())
            .collect());
    }

    let mut resolved = IndexSet::new();
    for name in selector {
        resolved.extend(locate_one(registry, config, name.as_ref(), options)?);
    }
    Ok(resolved.into_iter().collect())
}

fn locate_one(
    registry: &WorkspaceRegistry,
    config: &ResolutionConfig,
    name: &str,
    options: &LocateOptions,
) -> Result<Vec<String>> {
    if let Some(target) = config.alias.get(name) {
        tracing::debug!(name, "Resolved through alias");
        return target
            .paths()
            .iter()
            .map(|path| {
                if registry.contains(path) {
                    Ok(path.clone())
                } else {
                    Err(Error::AliasTargetMissing {
                        path: path.clone(),
                        alias: name.to_string(),
                    })
                }
            })
            .collect();
    }

    for (key, target) in &config.alias {
        let Some(prefix) = key.strip_suffix('*') else {
            continue;
        };
        let Some(suffix) = name.strip_prefix(prefix) else {
            continue;
        };
        let paths: Vec<String> = target
            .paths()
            .iter()
            .map(|path| match path.strip_suffix('*') {
                Some(head) => format!("{head}{suffix}"),
                None => path.clone(),
            })
            .filter(|path| registry.contains(path))
            .collect();
        if !paths.is_empty() {
            tracing::debug!(name, alias = %key, "Resolved through wildcard alias");
            return Ok(paths);
        }
    }

    let needle = format!("/{name}");
    let matches: Vec<String> = registry
        .iter()
        .filter(|(path, manifest)| options.accepts(config, manifest, path))
        .filter(|(path, _)| path.ends_with(&needle))
        .map(|(path, _)| path.to_string())
        .collect();

    match matches.len() {
        0 => Err(Error::WorkspaceNotFound {
            name: name.to_string(),
        }),
        1 => Ok(matches),
        _ => Err(Error::AmbiguousWorkspace {
            name: name.to_string(),
            paths: matches,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::Indent;
    use proptest::prelude::*;
    use serde_json::json;
    use std::path::Path;

    fn registry() -> WorkspaceRegistry {
        let mut registry = WorkspaceRegistry::new("/repo", Indent::default());
        let entries = [
            ("", json!({"name": "root", "workspaces": ["packages/*", "plugins/*"]})),
            ("/packages/core", json!({"name": "@x/core"})),
            ("/packages/cli", json!({"name": "@x/cli"})),
            ("/plugins/core", json!({"name": "plugin-core"})),
            ("/plugins/http", json!({"name": "plugin-http"})),
            ("/plugins/nested", json!({"name": "nested", "workspaces": ["a/*"]})),
        ];
        for (path, value) in entries {
            registry.insert(path, PackageManifest::from_value(value, Path::new(path)).unwrap());
        }
        registry
    }

    fn config(alias: serde_json::Value, exclude: &[&str]) -> ResolutionConfig {
        ResolutionConfig {
            alias: serde_json::from_value(alias).unwrap(),
            exclude: PatternSet::new(exclude).unwrap(),
        }
    }

    #[test]
    fn test_empty_selector_default_filter() {
        let paths = locate::<&str>(&registry(), &ResolutionConfig::default(), &[], &LocateOptions::default()).unwrap();
        assert_eq!(
            paths,
            ["/packages/core", "/packages/cli", "/plugins/core", "/plugins/http"]
        );
    }

    #[test]
    fn test_empty_selector_include_root() {
        let paths = locate::<&str>(&registry(), &ResolutionConfig::default(), &[], &LocateOptions::include_root()).unwrap();
        assert_eq!(paths.len(), 6);
        assert_eq!(paths[0], "");
    }

    #[test]
    fn test_exclude_applies_to_default_filter_only() {
        let cfg = config(json!({}), &["/plugins/*"]);
        let paths = locate::<&str>(&registry(), &cfg, &[], &LocateOptions::default()).unwrap();
        assert_eq!(paths, ["/packages/core", "/packages/cli"]);

        let paths = locate::<&str>(&registry(), &cfg, &[], &LocateOptions::accept_all()).unwrap();
        assert_eq!(paths.len(), 6);
    }

    #[test]
    fn test_structural_match() {
        let cfg = ResolutionConfig::default();
        let paths = locate(&registry(), &cfg, &["cli"], &LocateOptions::default()).unwrap();
        assert_eq!(paths, ["/packages/cli"]);
        let paths = locate(&registry(), &cfg, &["plugins/core"], &LocateOptions::default()).unwrap();
        assert_eq!(paths, ["/plugins/core"]);
    }

    #[test]
    fn test_not_found_and_ambiguous() {
        let cfg = ResolutionConfig::default();
        let err = locate(&registry(), &cfg, &["nope"], &LocateOptions::default()).unwrap_err();
        assert_eq!(err.to_string(), "cannot find workspace \"nope\"");

        let err = locate(&registry(), &cfg, &["core"], &LocateOptions::default()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "ambiguous workspace \"core\": /packages/core, /plugins/core"
        );
    }

    #[test]
    fn test_workspace_root_filtered_unless_included() {
        let cfg = ResolutionConfig::default();
        assert!(locate(&registry(), &cfg, &["nested"], &LocateOptions::default()).is_err());
        let paths = locate(&registry(), &cfg, &["nested"], &LocateOptions::include_root()).unwrap();
        assert_eq!(paths, ["/plugins/nested"]);
    }

    #[test]
    fn test_exact_alias_is_verbatim() {
        let cfg = config(json!({"core": "/packages/core", "both": ["/plugins/http", "/packages/cli"]}), &[]);
        let paths = locate(&registry(), &cfg, &["core"], &LocateOptions::default()).unwrap();
        assert_eq!(paths, ["/packages/core"]);
        let paths = locate(&registry(), &cfg, &["both"], &LocateOptions::default()).unwrap();
        assert_eq!(paths, ["/plugins/http", "/packages/cli"]);
    }

    #[test]
    fn test_alias_bypasses_filter() {
        let cfg = config(json!({"n": "/plugins/nested"}), &["/plugins/*"]);
        let paths = locate(&registry(), &cfg, &["n"], &LocateOptions::default()).unwrap();
        assert_eq!(paths, ["/plugins/nested"]);
    }

    #[test]
    fn test_alias_to_missing_path_fails() {
        let cfg = config(json!({"gone": "/packages/gone"}), &[]);
        let err = locate(&registry(), &cfg, &["gone"], &LocateOptions::default()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "cannot find workspace /packages/gone resolved by gone"
        );
    }

    #[test]
    fn test_wildcard_alias() {
        let cfg = config(json!({"p-*": "/plugins/*"}), &[]);
        let paths = locate(&registry(), &cfg, &["p-http"], &LocateOptions::default()).unwrap();
        assert_eq!(paths, ["/plugins/http"]);
    }

    #[test]
    fn test_wildcard_alias_falls_through_when_empty() {
        let cfg = config(json!({"c*": "/plugins/*"}), &[]);
        // `cli` would map to /plugins/li which does not exist.
        let paths = locate(&registry(), &cfg, &["cli"], &LocateOptions::default()).unwrap();
        assert_eq!(paths, ["/packages/cli"]);
    }

    #[test]
    fn test_first_wildcard_key_wins() {
        let cfg = config(json!({"x-*": "/packages/*", "x*": "/plugins/*"}), &[]);
        let paths = locate(&registry(), &cfg, &["x-core"], &LocateOptions::default()).unwrap();
        assert_eq!(paths, ["/packages/core"]);
    }

    #[test]
    fn test_multi_selector_dedupes() {
        let cfg = config(json!({"c": "/packages/cli"}), &[]);
        let paths = locate(&registry(), &cfg, &["cli", "http", "c"], &LocateOptions::default()).unwrap();
        assert_eq!(paths, ["/packages/cli", "/plugins/http"]);
    }

    #[test]
    fn test_custom_filter_replaces_default() {
        let cfg = config(json!({}), &["/packages/*"]);
        let opts = LocateOptions::with_filter(|manifest, _| manifest.name().starts_with("@x/"));
        let paths = locate::<&str>(&registry(), &cfg, &[], &opts).unwrap();
        assert_eq!(paths, ["/packages/core", "/packages/cli"]);
    }

    proptest! {
        #[test]
        fn prop_locate_is_deterministic(picks in proptest::collection::vec(0usize..4, 0..6)) {
            let names = ["cli", "http", "packages/core", "plugins/core"];
            let selector: Vec<&str> = picks.iter().map(|i| names[*i]).collect();
            let reg = registry();
            let cfg = ResolutionConfig::default();
            let first = locate(&reg, &cfg, &selector, &LocateOptions::default()).unwrap();
            let second = locate(&reg, &cfg, &selector, &LocateOptions::default()).unwrap();
            prop_assert_eq!(&first, &second);
            let unique: IndexSet<_> = first.iter().collect();
            prop_assert_eq!(unique.len(), first.len());
        }
    }
}
