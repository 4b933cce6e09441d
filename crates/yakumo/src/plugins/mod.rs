//! Builtin plugins.
//!
//! Each builtin registers one command through the same [`Plugin`] contract
//! third-party plugins use. They are loaded lazily the first time their
//! command is requested, or eagerly when listed under `plugins` in the
//! project configuration.

pub mod list;
pub mod prepare;
pub mod publish;
pub mod run;
pub mod upgrade;
pub mod version;

pub use list::ListPlugin;
pub use prepare::PreparePlugin;
pub use publish::PublishPlugin;
pub use run::RunPlugin;
pub use test::TestPlugin;
pub use upgrade::UpgradePlugin;
pub use version::VersionPlugin;

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use yakumo_core::Plugin;

/// Every builtin plugin, in catalog order.
#[must_use]
pub fn builtins() -> Vec<Arc<dyn Plugin>> {
    vec![
        Arc::new(RunPlugin),
        Arc::new(ListPlugin),
        Arc::new(VersionPlugin),
        Arc::new(PreparePlugin),
        Arc::new(TestPlugin),
        Arc::new(PublishPlugin),
        Arc::new(UpgradePlugin),
    ]
}

/// A stderr spinner with a `(pos/len)` counter. Hidden when stderr is not
/// a terminal.
pub(crate) fn progress(message: &'static str, len: usize) -> ProgressBar {
    let bar = ProgressBar::new(u64::try_from(len).unwrap_or(u64::MAX));
    let style = ProgressStyle::with_template("{spinner} {msg} ({pos}/{len})")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    bar.set_style(style);
    bar.set_message(message);
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}
