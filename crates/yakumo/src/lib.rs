//! yakumo - monorepo task orchestrator for `package.json` workspaces.
//!
//! This crate is the command-line front end. It wires the builtin plugins
//! into a [`yakumo_core::Yakumo`] context and owns everything that talks to
//! the terminal or the network.
//!
//! # Example: custom binary with an extra plugin
//!
//! ```ignore
//! use yakumo::YakumoBuilder;
//!
//! let yakumo = YakumoBuilder::new(cwd)
//!     .with_defaults()
//!     .with_plugin(my_plugin::Changelog)
//!     .build()?;
//! yakumo.start("changelog").await?;
//! ```

// The CLI writes command output to stdout and prompts to the terminal.
#![allow(clippy::print_stdout, clippy::print_stderr)]

mod builder;
/// Argument splitting, exit codes and error rendering.
pub mod cli;
/// Builtin command plugins.
pub mod plugins;
/// Terminal confirmation prompts.
pub mod prompt;
/// npm registry client.
pub mod registry;
mod style;
/// Tracing and logging configuration.
pub mod tracing;

pub use builder::YakumoBuilder;
pub use yakumo_core::{Error, Plugin, Result, Yakumo};
