//! Execution engine for yakumo.
//!
//! A [`Yakumo`] context owns the project configuration and the registered
//! commands. Each command execution discovers the workspace afresh, parses
//! its arguments, runs `before:`/`after:` lifecycle scripts around the
//! handler and hands the handler a [`Session`].

pub mod command;
pub mod config;
pub mod context;
pub mod error;
pub mod hooks;
pub mod pipeline;
pub mod plugin;
pub mod process;
pub mod session;

pub use command::{
    Arguments, CommandHandler, TARGETS, flag, join_passthrough, option, split_passthrough,
};
pub use config::{CONFIG_FILE, CommandsConfig, DEFAULT_CONCURRENCY, ProjectConfig, PublishConfig, UpgradeConfig};
pub use context::{Yakumo, is_lifecycle};
pub use error::{Error, Result};
pub use hooks::{Hook, HookContext, HookRegistry, PUBLISH_AFTER, PUBLISH_BEFORE, run_hooks};
pub use pipeline::Pipeline;
pub use plugin::{Extensions, Plugin};
pub use process::{CapturedOutput, ProcessOutcome};
pub use session::Session;
