//! The execution context: command lookup, argument parsing, discovery and
//! lifecycle dispatch.

use crate::command::{Arguments, CommandHandler};
use crate::config::ProjectConfig;
use crate::error::{Error, Result};
use crate::hooks::Hook;
use crate::pipeline::Pipeline;
use crate::plugin::{Extensions, Plugin};
use crate::session::Session;
use async_recursion::async_recursion;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};
use yakumo_workspaces::{LocateOptions, PackageManager, ResolutionConfig, discover};

/// Commands that never trigger `before:`/`after:` scripts.
const NO_LIFECYCLE: &[&str] = &["run"];

/// Whether `name` is a `before:*` or `after:*` pseudo-command.
#[must_use]
pub fn is_lifecycle(name: &str) -> bool {
    name.starts_with("before:") || name.starts_with("after:")
}

/// Shared state for every command executed in one process.
pub struct Yakumo {
    cwd: PathBuf,
    config: ProjectConfig,
    resolution: ResolutionConfig,
    manager: PackageManager,
    extensions: RwLock<Extensions>,
    catalog: IndexMap<&'static str, Arc<dyn Plugin>>,
    residual: Vec<String>,
}

impl std::fmt::Debug for Yakumo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Yakumo")
            .field("cwd", &self.cwd)
            .field("manager", &self.manager)
            .field("catalog", &self.catalog.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Yakumo {
    /// Create a context and register the configured pipelines.
    ///
    /// # Errors
    ///
    /// Fails when the resolution settings are malformed.
    pub fn new(cwd: impl Into<PathBuf>, config: ProjectConfig, manager: PackageManager) -> Result<Self> {
        let resolution = config.resolution()?;
        let mut extensions = Extensions::new();
        for (name, steps) in &config.pipeline {
            extensions.register(Pipeline::new(name.clone(), steps.clone()));
        }
        Ok(Self {
            cwd: cwd.into(),
            config,
            resolution,
            manager,
            extensions: RwLock::new(extensions),
            catalog: IndexMap::new(),
            residual: Vec::new(),
        })
    }

    /// Arguments following the command name on the process command line.
    #[must_use]
    pub fn with_residual_args(mut self, args: Vec<String>) -> Self {
        self.residual = args;
        self
    }

    /// Make a builtin plugin available for lazy loading by name.
    pub fn add_builtin(&mut self, plugin: Arc<dyn Plugin>) {
        self.catalog.insert(plugin.name(), plugin);
    }

    /// Apply a plugin now.
    pub fn plugin(&self, plugin: &dyn Plugin) {
        self.extensions_mut().apply(plugin);
    }

    /// Attach a hook to an extension point.
    pub fn hook<H: Hook + 'static>(&self, point: &str, hook: H) {
        self.extensions_mut().hook(point, hook);
    }

    /// Apply a builtin plugin by name. Returns whether it exists.
    pub fn load(&self, name: &str) -> bool {
        let Some(plugin) = self.catalog.get(name).cloned() else {
            return false;
        };
        self.plugin(plugin.as_ref());
        true
    }

    /// Apply every builtin plugin listed in the configuration.
    pub fn load_configured(&self) {
        for name in &self.config.plugins {
            if !self.load(name) {
                tracing::warn!(plugin = %name, "Unknown plugin in configuration");
            }
        }
    }

    /// The workspace root.
    #[must_use]
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// The merged project configuration.
    #[must_use]
    pub const fn config(&self) -> &ProjectConfig {
        &self.config
    }

    /// Alias and exclusion settings.
    #[must_use]
    pub const fn resolution(&self) -> &ResolutionConfig {
        &self.resolution
    }

    /// The detected package manager.
    #[must_use]
    pub const fn manager(&self) -> &PackageManager {
        &self.manager
    }

    /// Names of every registered command.
    #[must_use]
    pub fn command_names(&self) -> Vec<String> {
        self.extensions()
            .command_names()
            .map(str::to_string)
            .collect()
    }

    pub(crate) fn hooks(&self, point: &str) -> Vec<Arc<dyn Hook>> {
        self.extensions().hooks().hooks(point)
    }

    fn extensions(&self) -> std::sync::RwLockReadGuard<'_, Extensions> {
        self.extensions.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn extensions_mut(&self) -> std::sync::RwLockWriteGuard<'_, Extensions> {
        self.extensions.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up a command, loading the builtin plugin of the same name once
    /// when it is not registered yet.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownCommand`] when nothing provides `name`.
    pub fn command(&self, name: &str) -> Result<Arc<dyn CommandHandler>> {
        if let Some(handler) = self.extensions().command(name) {
            return Ok(handler);
        }
        if self.load(name)
            && let Some(handler) = self.extensions().command(name)
        {
            return Ok(handler);
        }
        Err(Error::UnknownCommand {
            name: name.to_string(),
        })
    }

    /// Run the top-level command with the process's residual arguments.
    ///
    /// # Errors
    ///
    /// Propagates the command's failure.
    pub async fn start(&self, name: &str) -> Result<()> {
        self.dispatch(name, self.residual.clone()).await
    }

    /// Run a command with explicit arguments.
    ///
    /// # Errors
    ///
    /// Propagates the command's failure.
    pub async fn execute(&self, name: &str, args: Vec<String>) -> Result<()> {
        self.dispatch(name, args).await
    }

    #[async_recursion]
    async fn dispatch(&self, name: &str, tokens: Vec<String>) -> Result<()> {
        let handler = self.command(name)?;
        let argv = if handler.forwards_options() {
            Arguments::forwarding(name, tokens)
        } else {
            Arguments::parse(name, handler.args(), tokens)?
        };
        let workspaces = discover(&self.cwd, &self.config.ignore).await?;
        let mut session = Session::new(self, workspaces, argv);

        let lifecycle = !is_lifecycle(name) && !NO_LIFECYCLE.contains(&name);
        if lifecycle {
            self.lifecycle("before", &session, handler.manual()).await?;
        }

        info!(command = name, "Running command");
        handler.run(&mut session).await?;
        debug!(command = name, "Command finished");

        if lifecycle {
            self.lifecycle("after", &session, handler.manual()).await?;
        }
        Ok(())
    }

    /// Run `<phase>:<command>` for the targets of `session`.
    ///
    /// A registered command of that name takes precedence. Otherwise the
    /// package script of that exact name runs in every target defining it.
    async fn lifecycle(&self, phase: &str, session: &Session<'_>, manual: bool) -> Result<()> {
        let script = format!("{phase}:{}", session.argv.command);

        let registered = self.extensions().command(&script).is_some();
        if registered {
            return self.dispatch(&script, session.argv.targets.clone()).await;
        }

        let defined = session
            .workspaces
            .iter()
            .any(|(_, manifest)| manifest.script(&script).is_some());
        if !defined {
            return Ok(());
        }

        let selector: &[String] = if manual { &[] } else { &session.argv.targets };
        let paths: Vec<String> = session
            .locate(selector, &LocateOptions::accept_all())?
            .into_iter()
            .filter(|path| {
                session
                    .workspaces
                    .get(path)
                    .is_some_and(|m| m.script(&script).is_some())
            })
            .collect();

        debug!(script = %script, count = paths.len(), "Running lifecycle scripts");
        session.run_script(&paths, &script, &[]).await
    }
}
