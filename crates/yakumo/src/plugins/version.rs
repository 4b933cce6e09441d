//! `version`: bump package versions and propagate them to dependents.

use crate::prompt::confirm;
use crate::style;
use async_trait::async_trait;
use clap::Arg;
use yakumo_core::{CommandHandler, Extensions, Plugin, Result, Session, flag, option};
use yakumo_release::{BumpFlags, BumpOptions, VersionChange, VersionGraph};
use yakumo_workspaces::LocateOptions;

const CONFIRM_ALL: &str =
    "You did not specify any packages to bump. Do you want to bump all the packages?";

/// Registers the `version` command.
#[derive(Debug, Clone, Copy, Default)]
pub struct VersionPlugin;

impl Plugin for VersionPlugin {
    fn name(&self) -> &'static str {
        "version"
    }

    fn apply(&self, extensions: &mut Extensions) {
        extensions.register(VersionCommand);
    }
}

#[derive(Debug)]
struct VersionCommand;

#[async_trait]
impl CommandHandler for VersionCommand {
    fn name(&self) -> &str {
        "version"
    }

    fn args(&self) -> Vec<Arg> {
        vec![
            flag("major", Some('1')),
            flag("minor", Some('2')),
            flag("patch", Some('3')),
            flag("reset", Some('0')),
            flag("prerelease", Some('p')),
            flag("stable", Some('P')),
            option("version", Some('v')),
            flag("recursive", Some('r')),
            flag("local", Some('l')),
            flag("yes", Some('y')),
        ]
    }

    async fn run(&self, session: &mut Session<'_>) -> Result<()> {
        let argv = &session.argv;
        let options = BumpOptions::from_flags(&BumpFlags {
            major: argv.flag("major"),
            minor: argv.flag("minor"),
            patch: argv.flag("patch"),
            reset: argv.flag("reset"),
            local: argv.flag("local"),
            version: argv.value("version").map(str::to_string),
            prerelease: argv.flag("prerelease"),
            stable: argv.flag("stable"),
            recursive: argv.flag("recursive"),
        })?;

        if argv.targets.is_empty() && !confirm(CONFIRM_ALL, argv.flag("yes")).await? {
            return Ok(());
        }

        let paths = session.targets(&LocateOptions::default())?;
        let mut graph = VersionGraph::from_registry(&session.workspaces);
        for path in &paths {
            graph.bump(path, &options)?;
        }

        let changes = graph.save().await?;
        for line in describe(&changes) {
            println!("{line}");
        }
        Ok(())
    }
}

/// One output line per saved manifest.
fn describe(changes: &[VersionChange]) -> Vec<String> {
    if changes.is_empty() {
        return vec!["Everything is up-to-date.".to_string()];
    }
    changes
        .iter()
        .map(|change| match change {
            VersionChange::Bumped { name, from, to } => {
                format!("- {name}: {} => {}", style::cyan(from), style::green(to))
            }
            VersionChange::DependencyUpdated { name } => format!("- {name}: dependency updated"),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_changes() {
        assert_eq!(describe(&[]), ["Everything is up-to-date."]);

        let lines = describe(&[
            VersionChange::DependencyUpdated {
                name: "app".to_string(),
            },
        ]);
        assert_eq!(lines, ["- app: dependency updated"]);
    }
}
