//! The plugin contract and the registry plugins extend.
//!
//! A [`Plugin`] contributes commands and hooks by mutating [`Extensions`].
//! Builtin plugins go through exactly the same interface as third-party
//! ones.

use crate::command::CommandHandler;
use crate::hooks::{Hook, HookRegistry};
use indexmap::IndexMap;
use std::sync::Arc;

/// A unit of functionality that registers commands and hooks.
pub trait Plugin: Send + Sync {
    /// Unique plugin name; builtin plugins are loaded lazily by this name.
    fn name(&self) -> &'static str;

    /// Register this plugin's commands and hooks.
    fn apply(&self, extensions: &mut Extensions);
}

/// Registered commands and hook lists.
#[derive(Default)]
pub struct Extensions {
    commands: IndexMap<String, Arc<dyn CommandHandler>>,
    hooks: HookRegistry,
    applied: Vec<&'static str>,
}

impl std::fmt::Debug for Extensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extensions")
            .field("commands", &self.commands.keys().collect::<Vec<_>>())
            .field("hooks", &self.hooks)
            .field("applied", &self.applied)
            .finish()
    }
}

impl Extensions {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command. A later registration under the same name wins.
    pub fn register<H>(&mut self, handler: H)
    where
        H: CommandHandler + 'static,
    {
        let name = handler.name().to_string();
        if self.commands.insert(name.clone(), Arc::new(handler)).is_some() {
            tracing::debug!(command = %name, "Command replaced");
        }
    }

    /// Attach a hook to an extension point.
    pub fn hook<H>(&mut self, point: impl Into<String>, hook: H)
    where
        H: Hook + 'static,
    {
        self.hooks.register(point, Arc::new(hook));
    }

    /// Apply a plugin once; repeated applications are ignored.
    pub fn apply(&mut self, plugin: &dyn Plugin) {
        let name = plugin.name();
        if self.applied.contains(&name) {
            return;
        }
        self.applied.push(name);
        plugin.apply(self);
        tracing::debug!(plugin = name, "Plugin applied");
    }

    /// Whether a plugin has been applied.
    #[must_use]
    pub fn is_applied(&self, name: &str) -> bool {
        self.applied.contains(&name)
    }

    /// Look up a command.
    #[must_use]
    pub fn command(&self, name: &str) -> Option<Arc<dyn CommandHandler>> {
        self.commands.get(name).cloned()
    }

    /// Registered command names, in registration order.
    pub fn command_names(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }

    /// The hook lists.
    #[must_use]
    pub const fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }
}
