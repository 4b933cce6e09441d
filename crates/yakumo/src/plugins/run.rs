//! `run`: run a package script in every target that defines it.

use async_trait::async_trait;
use yakumo_core::{CommandHandler, Error, Extensions, Plugin, Result, Session};
use yakumo_workspaces::LocateOptions;

/// Registers the `run` command.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunPlugin;

impl Plugin for RunPlugin {
    fn name(&self) -> &'static str {
        "run"
    }

    fn apply(&self, extensions: &mut Extensions) {
        extensions.register(RunCommand);
    }
}

/// `yakumo run [targets] -- <script> [args]`
#[derive(Debug)]
struct RunCommand;

#[async_trait]
impl CommandHandler for RunCommand {
    fn name(&self) -> &str {
        "run"
    }

    async fn run(&self, session: &mut Session<'_>) -> Result<()> {
        let (script, rest) = session
            .argv
            .passthrough
            .split_first()
            .ok_or_else(|| Error::validation("Missing command"))?;

        let paths: Vec<String> = session
            .targets(&LocateOptions::accept_all())?
            .into_iter()
            .filter(|path| {
                session
                    .workspaces
                    .get(path)
                    .is_some_and(|manifest| manifest.script(script).is_some())
            })
            .collect();

        if paths.is_empty() {
            tracing::info!(script = %script, "No workspace defines the script");
        }
        session.run_script(&paths, script, rest).await
    }
}
