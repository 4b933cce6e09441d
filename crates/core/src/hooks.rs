//! Ordered hook lists attached to named extension points.
//!
//! Builtin commands emit fixed points through `Session::emit` (for example
//! `publish/before`) and every hook registered there runs in registration
//! order. The first failing hook stops the chain.

use crate::error::Result;
use async_trait::async_trait;
use indexmap::IndexMap;
use std::path::Path;
use std::sync::Arc;
use yakumo_workspaces::PackageManifest;

/// Runs before a package is published.
pub const PUBLISH_BEFORE: &str = "publish/before";

/// Runs after a package is published.
pub const PUBLISH_AFTER: &str = "publish/after";

/// Input passed to every hook at an extension point.
#[derive(Debug, Clone, Copy)]
pub struct HookContext<'a> {
    /// The extension point being emitted.
    pub point: &'a str,
    /// Workspace root directory.
    pub root: &'a Path,
    /// Registry path of the package concerned.
    pub path: &'a str,
    /// Manifest of the package concerned.
    pub manifest: &'a PackageManifest,
}

/// A callback attached to an extension point.
#[async_trait]
pub trait Hook: Send + Sync {
    /// Run the hook. Returning an error stops the remaining hooks.
    async fn call(&self, context: HookContext<'_>) -> Result<()>;
}

/// Hook lists keyed by extension point.
#[derive(Default, Clone)]
pub struct HookRegistry {
    points: IndexMap<String, Vec<Arc<dyn Hook>>>,
}

impl std::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.points.iter().map(|(k, v)| (k, v.len())))
            .finish()
    }
}

impl HookRegistry {
    /// Append a hook to `point`.
    pub fn register(&mut self, point: impl Into<String>, hook: Arc<dyn Hook>) {
        self.points.entry(point.into()).or_default().push(hook);
    }

    /// Number of hooks at `point`.
    #[must_use]
    pub fn count(&self, point: &str) -> usize {
        self.points.get(point).map_or(0, Vec::len)
    }

    /// The hooks at `point`, in registration order.
    #[must_use]
    pub fn hooks(&self, point: &str) -> Vec<Arc<dyn Hook>> {
        self.points.get(point).cloned().unwrap_or_default()
    }
}

/// Run `hooks` in order against `context`, stopping at the first failure.
///
/// # Errors
///
/// Returns the first hook error.
pub async fn run_hooks(hooks: &[Arc<dyn Hook>], context: HookContext<'_>) -> Result<()> {
    for hook in hooks {
        hook.call(context).await?;
    }
    if !hooks.is_empty() {
        tracing::debug!(point = context.point, path = context.path, count = hooks.len(), "Hooks emitted");
    }
    Ok(())
}
