//! `upgrade`: bump external dependency ranges to the newest matching
//! release.

use crate::plugins::progress;
use crate::registry::{NpmRegistry, Packument, resolve_registry};
use crate::style;
use async_trait::async_trait;
use indexmap::{IndexMap, IndexSet};
use semver::Version;
use std::collections::HashSet;
use yakumo_core::{CommandHandler, Extensions, Plugin, Result, Session};
use yakumo_workspaces::{DependencyKind, LocateOptions, WorkspaceRegistry};

/// Registers the `upgrade` command.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpgradePlugin;

impl Plugin for UpgradePlugin {
    fn name(&self) -> &'static str {
        "upgrade"
    }

    fn apply(&self, extensions: &mut Extensions) {
        extensions.register(UpgradeCommand);
    }
}

#[derive(Debug)]
struct UpgradeCommand;

/// A `(package, range)` pair shared by one or more manifest entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Request {
    dependency: String,
    range: String,
}

/// One manifest entry using a request.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Usage {
    path: String,
    kind: DependencyKind,
    key: String,
}

#[derive(Debug, PartialEq, Eq)]
enum Plan {
    Skip,
    Keep,
    Upgrade { version: Version, latest: Option<String> },
}

#[async_trait]
impl CommandHandler for UpgradeCommand {
    fn name(&self) -> &str {
        "upgrade"
    }

    async fn run(&self, session: &mut Session<'_>) -> Result<()> {
        let paths = session.targets(&LocateOptions::default())?;
        let requests = collect_requests(&session.workspaces, &paths);

        let names: Vec<String> = requests
            .keys()
            .map(|r| r.dependency.clone())
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect();
        let registry = NpmRegistry::new(resolve_registry(None, session.config().registry.as_deref()));
        let bar = progress("Fetching versions", names.len());
        let documents = registry
            .fetch_many(&names, session.config().upgrade_concurrency(), &bar)
            .await;
        bar.finish_and_clear();

        let mut output = Vec::new();
        let mut dirty: IndexSet<String> = IndexSet::new();
        for (request, usages) in &requests {
            let document = match documents.get(&request.dependency) {
                Some(Ok(Some(document))) => Some(document),
                Some(Err(e)) => {
                    tracing::warn!(dependency = %request.dependency, error = %e, "Registry lookup failed");
                    None
                }
                _ => None,
            };
            match plan(&request.range, document) {
                Plan::Keep => {}
                Plan::Skip => output.push(format!("- {}: skipped", style::red(&request.dependency))),
                Plan::Upgrade { version, latest } => {
                    let old = &request.range[1..];
                    let new = version.to_string();
                    let suffix = match latest {
                        Some(latest) if latest != new => format!(" (latest: {latest})"),
                        _ => String::new(),
                    };
                    output.push(format!(
                        "- {}: {} -> {}{suffix}",
                        style::yellow(&request.dependency),
                        style::cyan(old),
                        style::green(&new)
                    ));

                    let new_range = format!("{}{new}", &request.range[..1]);
                    for usage in usages {
                        let Some(manifest) = session.workspaces.get_mut(&usage.path) else {
                            continue;
                        };
                        let Some(current) = manifest.dependency(usage.kind, &usage.key) else {
                            continue;
                        };
                        let Some(head) = current.strip_suffix(request.range.as_str()) else {
                            continue;
                        };
                        let updated = format!("{head}{new_range}");
                        if manifest.set_dependency(usage.kind, &usage.key, &updated) {
                            dirty.insert(usage.path.clone());
                        }
                    }
                }
            }
        }

        for path in &dirty {
            session.save(path).await?;
        }

        output.sort();
        for line in &output {
            println!("{line}");
        }

        session.install().await
    }
}

/// Group the external `^`/`~` ranges of `paths` by package and range.
///
/// Workspace packages are left alone, whether referenced directly or
/// through an `npm:<name>@` alias.
fn collect_requests(registry: &WorkspaceRegistry, paths: &[String]) -> IndexMap<Request, Vec<Usage>> {
    let local: HashSet<&str> = registry.iter().map(|(_, m)| m.name()).collect();
    let mut requests: IndexMap<Request, Vec<Usage>> = IndexMap::new();

    for path in paths {
        let Some(manifest) = registry.get(path) else {
            continue;
        };
        for kind in DependencyKind::ALL {
            for (key, value) in manifest.dependencies(kind) {
                let (alias, range) = split_alias(value);
                let dependency = alias.unwrap_or(key);
                if local.contains(key) || local.contains(dependency) {
                    continue;
                }
                if !range.starts_with(['^', '~']) {
                    continue;
                }
                requests
                    .entry(Request {
                        dependency: dependency.to_string(),
                        range: range.to_string(),
                    })
                    .or_default()
                    .push(Usage {
                        path: path.clone(),
                        kind,
                        key: key.to_string(),
                    });
            }
        }
    }
    requests
}

/// Split `npm:<name>@<range>` into the aliased name and the range.
fn split_alias(value: &str) -> (Option<&str>, &str) {
    if let Some(rest) = value.strip_prefix("npm:")
        && let Some(at) = rest.get(1..).and_then(|tail| tail.rfind('@'))
    {
        let at = at + 1;
        return (Some(&rest[..at]), &rest[at + 1..]);
    }
    (None, value)
}

fn plan(range: &str, document: Option<&Packument>) -> Plan {
    let Some(document) = document else {
        return Plan::Skip;
    };
    let (Ok(old), Some(version)) = (Version::parse(&range[1..]), document.max_satisfying(range)) else {
        return Plan::Skip;
    };
    if version <= old {
        return Plan::Keep;
    }
    Plan::Upgrade {
        version,
        latest: document.latest().map(str::to_string),
    }
}
