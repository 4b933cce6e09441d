//! `prepare`: lift nested workspace globs into the root manifest.

use async_trait::async_trait;
use clap::Arg;
use indexmap::IndexSet;
use yakumo_core::{CommandHandler, Extensions, Plugin, Result, Session, flag};
use yakumo_workspaces::PatternSet;

/// Registers the `prepare` command.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreparePlugin;

impl Plugin for PreparePlugin {
    fn name(&self) -> &'static str {
        "prepare"
    }

    fn apply(&self, extensions: &mut Extensions) {
        extensions.register(PrepareCommand);
    }
}

#[derive(Debug)]
struct PrepareCommand;

#[async_trait]
impl CommandHandler for PrepareCommand {
    fn name(&self) -> &str {
        "prepare"
    }

    fn args(&self) -> Vec<Arg> {
        vec![flag("clean", Some('c'))]
    }

    async fn run(&self, session: &mut Session<'_>) -> Result<()> {
        let Some(root) = session.workspaces.root_manifest() else {
            return Ok(());
        };
        let globs: Vec<String> = root.workspaces().into_iter().map(str::to_string).collect();
        let nested: Vec<(String, Vec<String>)> = session
            .workspaces
            .iter()
            .filter(|(path, _)| !path.is_empty())
            .map(|(path, manifest)| {
                let globs = manifest.workspaces().into_iter().map(str::to_string).collect();
                (path.to_string(), globs)
            })
            .collect();

        let outcome = reconcile(&globs, &nested, session.argv.flag("clean"))?;
        for message in &outcome.messages {
            println!("{message}");
        }
        if !outcome.changed {
            return Ok(());
        }

        if let Some(root) = session.workspaces.get_mut("") {
            root.set_workspaces(outcome.globs);
        }
        session.save("").await?;
        session.install().await
    }
}

/// Result of comparing the root globs with nested workspace roots.
#[derive(Debug, Default, PartialEq, Eq)]
struct Reconciled {
    /// The new root glob list, sorted.
    globs: Vec<String>,
    /// `[I]`/`[W]` report lines.
    messages: Vec<String>,
    changed: bool,
}

fn reconcile(root: &[String], nested: &[(String, Vec<String>)], clean: bool) -> Result<Reconciled> {
    let mut outcome = Reconciled::default();
    if root.is_empty() {
        return Ok(outcome);
    }

    let positive: Vec<&str> = root
        .iter()
        .map(String::as_str)
        .filter(|glob| !glob.starts_with('!'))
        .collect();
    let matcher = PatternSet::new(&positive)?;
    let mut current: IndexSet<String> = root.iter().cloned().collect();

    for (prefix, declared) in nested {
        let base = prefix.trim_start_matches('/');
        for glob in declared {
            let lifted = format!("{base}/{glob}");
            if matcher.matches(&lifted) || current.contains(&lifted) {
                continue;
            }
            outcome.messages.push(format!("[I] workspace added: {lifted}"));
            current.insert(lifted);
            outcome.changed = true;
        }

        let owned: Vec<String> = current
            .iter()
            .filter(|glob| {
                glob.strip_prefix(base)
                    .and_then(|rest| rest.strip_prefix('/'))
                    .is_some_and(|rest| !declared.iter().any(|d| d == rest))
            })
            .cloned()
            .collect();
        for glob in owned {
            if clean {
                outcome.messages.push(format!("[W] workspace removed: {glob}"));
                current.shift_remove(&glob);
                outcome.changed = true;
            } else {
                outcome.messages.push(format!("[W] workspace mismatch: {glob}"));
            }
        }
    }

    let mut globs: Vec<String> = current.into_iter().collect();
    globs.sort();
    outcome.globs = globs;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_nested_globs_are_lifted() {
        let nested = vec![
            ("/packages/a".to_string(), Vec::new()),
            ("/external/kit".to_string(), strings(&["plugins/*"])),
        ];
        let outcome = reconcile(&strings(&["packages/*", "external/*"]), &nested, false).unwrap();
        assert!(outcome.changed);
        assert_eq!(outcome.messages, ["[I] workspace added: external/kit/plugins/*"]);
        assert_eq!(outcome.globs, ["external/*", "external/kit/plugins/*", "packages/*"]);
    }

    #[test]
    fn test_already_matched_globs_are_kept() {
        let nested = vec![("/packages/kit".to_string(), strings(&["plugins/*"]))];
        let root = strings(&["packages/*", "packages/kit/plugins/*"]);
        let outcome = reconcile(&root, &nested, false).unwrap();
        assert!(!outcome.changed);
        assert!(outcome.messages.is_empty());
    }

    #[test]
    fn test_stale_globs_are_reported_or_removed() {
        let nested = vec![("/external/kit".to_string(), strings(&["plugins/*"]))];
        let root = strings(&["external/*", "external/kit/plugins/*", "external/kit/old/*"]);

        let report = reconcile(&root, &nested, false).unwrap();
        assert!(!report.changed);
        assert_eq!(report.messages, ["[W] workspace mismatch: external/kit/old/*"]);

        let cleaned = reconcile(&root, &nested, true).unwrap();
        assert!(cleaned.changed);
        assert_eq!(cleaned.messages, ["[W] workspace removed: external/kit/old/*"]);
        assert_eq!(cleaned.globs, ["external/*", "external/kit/plugins/*"]);
    }

    #[test]
    fn test_no_root_globs_is_a_no_op() {
        let nested = vec![("/x".to_string(), strings(&["y/*"]))];
        assert_eq!(reconcile(&[], &nested, true).unwrap(), Reconciled::default());
    }
}
