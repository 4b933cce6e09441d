//! The per-invocation view a command handler works with.

use crate::command::Arguments;
use crate::config::ProjectConfig;
use crate::context::Yakumo;
use crate::error::Result;
use crate::hooks::{HookContext, run_hooks};
use crate::process::{self, ProcessOutcome};
use std::path::Path;
use yakumo_workspaces::{LocateOptions, PackageManager, WorkspaceRegistry, locate};

/// State of one command execution: a freshly discovered registry, the
/// parsed arguments and access to the shared execution context.
pub struct Session<'a> {
    ctx: &'a Yakumo,
    /// Workspaces discovered for this execution.
    pub workspaces: WorkspaceRegistry,
    /// Parsed command line.
    pub argv: Arguments,
}

impl std::fmt::Debug for Session<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("command", &self.argv.command)
            .field("workspaces", &self.workspaces.len())
            .finish_non_exhaustive()
    }
}

impl<'a> Session<'a> {
    pub(crate) const fn new(ctx: &'a Yakumo, workspaces: WorkspaceRegistry, argv: Arguments) -> Self {
        Self {
            ctx,
            workspaces,
            argv,
        }
    }

    /// The workspace root.
    #[must_use]
    pub fn cwd(&self) -> &Path {
        self.ctx.cwd()
    }

    /// The detected package manager.
    #[must_use]
    pub fn manager(&self) -> &PackageManager {
        self.ctx.manager()
    }

    /// The merged project configuration.
    #[must_use]
    pub fn config(&self) -> &ProjectConfig {
        self.ctx.config()
    }

    /// Resolve workspace names against this session's registry.
    ///
    /// # Errors
    ///
    /// Fails when a name cannot be resolved to exactly one workspace.
    pub fn locate<S: AsRef<str>>(&self, selector: &[S], options: &LocateOptions) -> Result<Vec<String>> {
        Ok(locate(&self.workspaces, self.ctx.resolution(), selector, options)?)
    }

    /// Resolve the positional targets of the current command.
    ///
    /// # Errors
    ///
    /// Fails when a target cannot be resolved to exactly one workspace.
    pub fn targets(&self, options: &LocateOptions) -> Result<Vec<String>> {
        self.locate(&self.argv.targets, options)
    }

    /// Write a workspace manifest back to disk.
    ///
    /// # Errors
    ///
    /// Fails when the path is unknown or the write fails.
    pub async fn save(&self, path: &str) -> Result<()> {
        Ok(self.workspaces.save(path).await?)
    }

    /// Run another command with its own fresh session.
    ///
    /// # Errors
    ///
    /// Propagates the nested command's failure.
    pub async fn execute(&self, name: &str, args: Vec<String>) -> Result<()> {
        self.ctx.execute(name, args).await
    }

    /// Run `<agent> install` at the workspace root.
    ///
    /// # Errors
    ///
    /// Fails with the child's exit code when the install fails.
    pub async fn install(&self) -> Result<()> {
        let args = vec![self.manager().name.clone(), "install".to_string()];
        process::run_checked(&args, self.cwd()).await
    }

    /// Run a binary from the workspace's dependencies through the agent.
    ///
    /// # Errors
    ///
    /// Fails when the process cannot be started.
    pub async fn exec(&self, args: &[String]) -> Result<ProcessOutcome> {
        let mut command = self.manager().exec_prefix();
        command.extend_from_slice(args);
        process::spawn(&command, self.cwd()).await
    }

    /// Run a package script in each of `paths`, in order, stopping at the
    /// first failure.
    ///
    /// # Errors
    ///
    /// Fails with the child's exit code when a script fails.
    pub async fn run_script(&self, paths: &[String], script: &str, args: &[String]) -> Result<()> {
        for path in paths {
            let mut command = vec![
                self.manager().name.clone(),
                "run".to_string(),
                script.to_string(),
            ];
            command.extend_from_slice(args);
            tracing::info!(path = %path, script, "Running script");
            process::run_checked(&command, &self.workspaces.dir(path)).await?;
        }
        Ok(())
    }

    /// Emit an extension point for one workspace.
    ///
    /// # Errors
    ///
    /// Returns the first hook failure.
    pub async fn emit(&self, point: &str, path: &str) -> Result<()> {
        let hooks = self.ctx.hooks(point);
        let Some(manifest) = self.workspaces.get(path) else {
            return Ok(());
        };
        let context = HookContext {
            point,
            root: self.cwd(),
            path,
            manifest,
        };
        run_hooks(&hooks, context).await
    }
}
