//! Builder for configuring yakumo.
//!
//! The [`YakumoBuilder`] collects the plugins a binary ships with before the
//! execution context is created.
//!
//! # Example
//!
//! ```no_run
//! use yakumo::YakumoBuilder;
//!
//! # async fn demo() -> yakumo::Result<()> {
//! let yakumo = YakumoBuilder::new(std::env::current_dir().unwrap_or_default())
//!     .with_defaults()
//!     .build()?;
//! yakumo.execute("list", Vec::new()).await
//! # }
//! ```

use crate::plugins;
use std::path::PathBuf;
use std::sync::Arc;
use yakumo_core::{Plugin, ProjectConfig, Result, Yakumo};
use yakumo_workspaces::detection;

/// Builder for configuring and creating a [`Yakumo`] context.
pub struct YakumoBuilder {
    cwd: PathBuf,
    builtins: Vec<Arc<dyn Plugin>>,
    plugins: Vec<Arc<dyn Plugin>>,
    args: Vec<String>,
}

impl std::fmt::Debug for YakumoBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YakumoBuilder")
            .field("cwd", &self.cwd)
            .field("builtins", &self.builtins.iter().map(|p| p.name()).collect::<Vec<_>>())
            .field("plugins", &self.plugins.iter().map(|p| p.name()).collect::<Vec<_>>())
            .field("args", &self.args)
            .finish()
    }
}

impl YakumoBuilder {
    /// Create a builder for the workspace rooted at `cwd`.
    #[must_use]
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            builtins: Vec::new(),
            plugins: Vec::new(),
            args: Vec::new(),
        }
    }

    /// Make a plugin available for lazy loading by name.
    #[must_use]
    pub fn with_builtin<P>(mut self, plugin: P) -> Self
    where
        P: Plugin + 'static,
    {
        self.builtins.push(Arc::new(plugin));
        self
    }

    /// Apply a plugin as soon as the context is built.
    #[must_use]
    pub fn with_plugin<P>(mut self, plugin: P) -> Self
    where
        P: Plugin + 'static,
    {
        self.plugins.push(Arc::new(plugin));
        self
    }

    /// Add every builtin plugin to the lazy catalog.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        self.builtins.extend(plugins::builtins());
        self
    }

    /// Arguments following the command name on the process command line.
    #[must_use]
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Load configuration, detect the package manager and build the
    /// context.
    ///
    /// # Errors
    ///
    /// Fails when a configuration layer is malformed.
    pub fn build(self) -> Result<Yakumo> {
        let config = ProjectConfig::load(&self.cwd)?;
        let hint = package_manager_hint(&self.cwd);
        let manager = detection::detect(&self.cwd, hint.as_deref());
        tracing::debug!(cwd = %self.cwd.display(), %manager, "Building context");

        let mut yakumo = Yakumo::new(self.cwd, config, manager)?.with_residual_args(self.args);
        for plugin in self.builtins {
            yakumo.add_builtin(plugin);
        }
        for plugin in &self.plugins {
            yakumo.plugin(plugin.as_ref());
        }
        yakumo.load_configured();
        Ok(yakumo)
    }
}

/// The root manifest's `packageManager` field, if readable.
fn package_manager_hint(root: &std::path::Path) -> Option<String> {
    let content = std::fs::read_to_string(root.join("package.json")).ok()?;
    let manifest: serde_json::Value = serde_json::from_str(&content).ok()?;
    manifest
        .get("packageManager")?
        .as_str()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn workspace(manifest: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("package.json"), manifest).unwrap();
        dir
    }

    #[test]
    fn test_builder_new_has_no_commands() {
        let dir = workspace(r#"{"name": "root"}"#);
        let yakumo = YakumoBuilder::new(dir.path()).build().unwrap();
        assert!(yakumo.command_names().is_empty());
        assert!(yakumo.command("list").is_err());
    }

    #[test]
    fn test_builtins_load_on_demand() {
        let dir = workspace(r#"{"name": "root"}"#);
        let yakumo = YakumoBuilder::new(dir.path()).with_defaults().build().unwrap();
        assert!(yakumo.command_names().is_empty());
        assert!(yakumo.command("list").is_ok());
        assert_eq!(yakumo.command_names(), ["list"]);
    }

    #[test]
    fn test_configured_plugins_load_eagerly() {
        let dir = workspace(r#"{"name": "root", "yakumo": {"plugins": ["version", "missing"]}}"#);
        let yakumo = YakumoBuilder::new(dir.path()).with_defaults().build().unwrap();
        assert_eq!(yakumo.command_names(), ["version"]);
    }

    #[test]
    fn test_with_plugin_applies_immediately() {
        let dir = workspace(r#"{"name": "root"}"#);
        let yakumo = YakumoBuilder::new(dir.path())
            .with_plugin(plugins::RunPlugin)
            .build()
            .unwrap();
        assert_eq!(yakumo.command_names(), ["run"]);
    }

    #[test]
    fn test_pipelines_are_registered() {
        let dir = workspace(r#"{"name": "root", "yakumo": {"pipeline": {"ci": ["list"]}}}"#);
        let yakumo = YakumoBuilder::new(dir.path()).build().unwrap();
        assert_eq!(yakumo.command_names(), ["ci"]);
    }

    #[test]
    fn test_package_manager_hint() {
        let dir = workspace(r#"{"name": "root", "packageManager": "pnpm@9.1.0"}"#);
        assert_eq!(package_manager_hint(dir.path()).as_deref(), Some("pnpm@9.1.0"));
        let bare = workspace(r#"{"name": "root"}"#);
        assert_eq!(package_manager_hint(bare.path()), None);
    }
}
