//! Project configuration for yakumo.
//!
//! Configuration is read from two layers at the workspace root, in order:
//! the `yakumo` field of `package.json`, then `yakumo.yml`. Later layers
//! extend lists and override map entries and scalars of earlier ones.

use crate::error::{Error, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use yakumo_workspaces::{AliasTarget, PatternSet, ResolutionConfig};

/// Name of the YAML configuration file at the workspace root.
pub const CONFIG_FILE: &str = "yakumo.yml";

/// Concurrency used by network-bound commands when nothing is configured.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Main configuration structure for a yakumo project
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    /// Short names for workspaces, `prefix*` keys allowed
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub alias: IndexMap<String, AliasTarget>,

    /// Workspaces left out when no target is named
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,

    /// Workspaces never discovered at all
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignore: Vec<String>,

    /// Named command sequences
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub pipeline: IndexMap<String, Vec<String>>,

    /// Builtin plugins loaded before any command runs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plugins: Vec<String>,

    /// Command-specific configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commands: Option<CommandsConfig>,

    /// Package registry base URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry: Option<String>,
}

/// Command-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CommandsConfig {
    /// `upgrade` command configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upgrade: Option<UpgradeConfig>,

    /// `publish` command configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish: Option<PublishConfig>,
}

/// `upgrade` command configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeConfig {
    /// Maximum concurrent registry lookups
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,
}

/// `publish` command configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PublishConfig {
    /// Maximum concurrent registry lookups
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,
}

impl ProjectConfig {
    /// Load and merge every configuration layer under `root`.
    ///
    /// Missing layers are skipped. A root `package.json` that cannot be
    /// parsed contributes nothing here; discovery reports it later.
    ///
    /// # Errors
    ///
    /// Fails when a present layer has the wrong shape.
    pub fn load(root: &Path) -> Result<Self> {
        let mut config = Self::default();

        let manifest_path = root.join("package.json");
        if let Ok(content) = std::fs::read_to_string(&manifest_path)
            && let Ok(serde_json::Value::Object(mut manifest)) = serde_json::from_str(&content)
            && let Some(field) = manifest.remove("yakumo")
        {
            let layer: Self = serde_json::from_value(field).map_err(|e| Error::Configuration {
                message: format!("invalid `yakumo` field: {e}"),
                path: Some(manifest_path.clone()),
            })?;
            config = config.merge(layer);
            tracing::debug!(path = %manifest_path.display(), "Loaded configuration layer");
        }

        let yaml_path = root.join(CONFIG_FILE);
        match std::fs::read_to_string(&yaml_path) {
            Ok(content) => {
                let layer = Self::from_yaml(&content).map_err(|e| match e {
                    Error::Configuration { message, .. } => Error::Configuration {
                        message,
                        path: Some(yaml_path.clone()),
                    },
                    other => other,
                })?;
                config = config.merge(layer);
                tracing::debug!(path = %yaml_path.display(), "Loaded configuration layer");
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(Error::io(e, format!("reading {}", yaml_path.display()))),
        }

        Ok(config)
    }

    /// Parse a YAML layer. An empty document yields the default.
    ///
    /// # Errors
    ///
    /// Fails on invalid YAML or a wrong shape.
    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str::<Option<Self>>(content)
            .map(Option::unwrap_or_default)
            .map_err(|e| Error::configuration(e.to_string()))
    }

    /// Merge `other` on top of `self`.
    #[must_use]
    pub fn merge(mut self, other: Self) -> Self {
        self.alias.extend(other.alias);
        self.exclude.extend(other.exclude);
        self.ignore.extend(other.ignore);
        self.pipeline.extend(other.pipeline);
        for plugin in other.plugins {
            if !self.plugins.contains(&plugin) {
                self.plugins.push(plugin);
            }
        }
        self.commands = match (self.commands.take(), other.commands) {
            (Some(base), Some(over)) => Some(CommandsConfig {
                upgrade: over.upgrade.or(base.upgrade),
                publish: over.publish.or(base.publish),
            }),
            (base, over) => over.or(base),
        };
        if other.registry.is_some() {
            self.registry = other.registry;
        }
        self
    }

    /// Alias and exclusion settings for name resolution.
    ///
    /// # Errors
    ///
    /// Fails when an exclusion pattern is malformed.
    pub fn resolution(&self) -> Result<ResolutionConfig> {
        Ok(ResolutionConfig {
            alias: self.alias.clone(),
            exclude: PatternSet::new(&self.exclude)?,
        })
    }

    /// Concurrency for `upgrade` registry lookups.
    ///
    /// Accesses `config.commands.upgrade.concurrency` with safe navigation.
    #[must_use]
    pub fn upgrade_concurrency(&self) -> usize {
        self.commands
            .as_ref()
            .and_then(|c| c.upgrade.as_ref())
            .and_then(|u| u.concurrency)
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_CONCURRENCY)
    }

    /// Concurrency for `publish` registry lookups.
    #[must_use]
    pub fn publish_concurrency(&self) -> usize {
        self.commands
            .as_ref()
            .and_then(|c| c.publish.as_ref())
            .and_then(|p| p.concurrency)
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_CONCURRENCY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_default_concurrency() {
        let config = ProjectConfig::default();
        assert_eq!(config.upgrade_concurrency(), 10);
        assert_eq!(config.publish_concurrency(), 10);
    }

    #[test]
    fn test_from_yaml() {
        let config = ProjectConfig::from_yaml(
            "alias:\n  core: /packages/core\n  all: [/packages/a, /packages/b]\npipeline:\n  ci: [version --patch, publish]\ncommands:\n  upgrade:\n    concurrency: 4\n",
        )
        .unwrap();
        assert_eq!(
            config.alias.get("core"),
            Some(&AliasTarget::One("/packages/core".to_string()))
        );
        assert_eq!(config.alias.get("all").map(AliasTarget::paths).map(<[String]>::len), Some(2));
        assert_eq!(config.pipeline["ci"], ["version --patch", "publish"]);
        assert_eq!(config.upgrade_concurrency(), 4);
        assert_eq!(config.publish_concurrency(), 10);
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(ProjectConfig::from_yaml("").unwrap(), ProjectConfig::default());
        assert_eq!(ProjectConfig::from_yaml("~\n").unwrap(), ProjectConfig::default());
    }

    #[test]
    fn test_invalid_yaml_shape() {
        assert!(ProjectConfig::from_yaml("alias: [1, 2]").is_err());
    }

    #[test]
    fn test_merge_lists_concat_maps_override() {
        let base = ProjectConfig::from_yaml("exclude: [/a]\nalias:\n  x: /a\n  y: /b\nregistry: https://one\n").unwrap();
        let over = ProjectConfig::from_yaml("exclude: [/b]\nalias:\n  y: /c\n").unwrap();
        let merged = base.merge(over);
        assert_eq!(merged.exclude, ["/a", "/b"]);
        assert_eq!(merged.alias["x"], AliasTarget::One("/a".to_string()));
        assert_eq!(merged.alias["y"], AliasTarget::One("/c".to_string()));
        assert_eq!(merged.registry.as_deref(), Some("https://one"));
    }

    #[test]
    fn test_load_layers() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("package.json"),
            r#"{"name": "root", "yakumo": {"exclude": ["/packages/x"], "pipeline": {"build": ["run -- build"]}}}"#,
        )
        .unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            "exclude: [/packages/y]\npipeline:\n  build: [run -- compile]\n",
        )
        .unwrap();
        let config = ProjectConfig::load(dir.path()).unwrap();
        assert_eq!(config.exclude, ["/packages/x", "/packages/y"]);
        assert_eq!(config.pipeline["build"], ["run -- compile"]);
    }

    #[test]
    fn test_load_without_layers() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(ProjectConfig::load(dir.path()).unwrap(), ProjectConfig::default());
    }

    #[test]
    fn test_invalid_manifest_field_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("package.json"), r#"{"name": "r", "yakumo": {"exclude": 3}}"#).unwrap();
        let err = ProjectConfig::load(dir.path()).unwrap_err();
        assert!(matches!(err, Error::Configuration { path: Some(_), .. }));
    }
}
