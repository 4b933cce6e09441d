//! `publish`: publish packages whose local version is ahead of the
//! registry.

use crate::plugins::progress;
use crate::prompt::confirm;
use crate::registry::{NpmRegistry, Packument, resolve_registry};
use async_trait::async_trait;
use clap::Arg;
use futures::future::join_all;
use semver::Version;
use tracing::{info, warn};
use yakumo_core::{
    CommandHandler, Error, Extensions, PUBLISH_AFTER, PUBLISH_BEFORE, Plugin, Result, Session, flag,
    option, process,
};
use yakumo_workspaces::{LocateOptions, PackageManager};

/// Registers the `publish` command.
#[derive(Debug, Clone, Copy, Default)]
pub struct PublishPlugin;

impl Plugin for PublishPlugin {
    fn name(&self) -> &'static str {
        "publish"
    }

    fn apply(&self, extensions: &mut Extensions) {
        extensions.register(PublishCommand);
    }
}

#[derive(Debug)]
struct PublishCommand;

/// Options forwarded to the package manager.
#[derive(Debug, Clone, Default)]
struct PublishFlags {
    tag: Option<String>,
    access: Option<String>,
    registry: Option<String>,
    otp: Option<String>,
}

#[derive(Debug, Clone)]
struct Candidate {
    path: String,
    name: String,
    version: String,
}

#[async_trait]
impl CommandHandler for PublishCommand {
    fn name(&self) -> &str {
        "publish"
    }

    fn args(&self) -> Vec<Arg> {
        vec![
            flag("debug", None),
            flag("yes", Some('y')),
            option("tag", None),
            option("access", None),
            option("registry", None),
            option("otp", None),
        ]
    }

    async fn run(&self, session: &mut Session<'_>) -> Result<()> {
        let explicit = !session.argv.targets.is_empty();
        let debug = session.argv.flag("debug");
        let flags = PublishFlags {
            tag: session.argv.value("tag").map(str::to_string),
            access: session.argv.value("access").map(str::to_string),
            registry: session.argv.value("registry").map(str::to_string),
            otp: session.argv.value("otp").map(str::to_string),
        };

        // Workspace roots are never published; private packages only when
        // named explicitly.
        let paths = session.targets(&LocateOptions::with_filter(move |manifest, _| {
            if explicit {
                !manifest.is_workspace_root()
            } else {
                !manifest.is_private()
            }
        }))?;

        if explicit && !make_public(session, &paths).await? {
            println!("operation cancelled.");
            return Ok(());
        }

        let candidates: Vec<Candidate> = paths
            .iter()
            .filter_map(|path| {
                let manifest = session.workspaces.get(path)?;
                Some(Candidate {
                    path: path.clone(),
                    name: manifest.name().to_string(),
                    version: manifest.version().unwrap_or_default().to_string(),
                })
            })
            .collect();

        let registry = NpmRegistry::new(resolve_registry(
            flags.registry.as_deref(),
            session.config().registry.as_deref(),
        ));
        let names: Vec<String> = candidates.iter().map(|c| c.name.clone()).collect();
        let bar = progress("Loading workspaces", names.len());
        let remote = registry
            .fetch_many(&names, session.config().publish_concurrency(), &bar)
            .await;
        bar.finish_and_clear();

        let mut skipped = 0;
        let mut pending = Vec::new();
        for candidate in candidates {
            let document = match remote.get(&candidate.name) {
                Some(Ok(document)) => document.as_ref(),
                Some(Err(e)) => {
                    warn!(package = %candidate.name, error = %e, "Could not fetch remote version");
                    None
                }
                None => None,
            };
            let published = remote_version(document, is_next(&candidate.version));
            if should_publish(&candidate.version, published) {
                pending.push(candidate);
            } else {
                info!(package = %candidate.name, local = %candidate.version, remote = %published, "Skipping");
                skipped += 1;
            }
        }

        let total = pending.len();
        let session: &Session<'_> = session;
        let results = if debug {
            let mut results = Vec::with_capacity(total);
            for candidate in &pending {
                results.push(publish_one(session, candidate, &flags, true).await);
            }
            results
        } else {
            let bar = progress("Publishing packages", total);
            let results = join_all(pending.iter().map(|candidate| {
                let bar = bar.clone();
                let flags = &flags;
                async move {
                    let result = publish_one(session, candidate, flags, false).await;
                    bar.inc(1);
                    result
                }
            }))
            .await;
            bar.finish_and_clear();
            results
        };

        let mut failed = 0;
        for (candidate, result) in pending.iter().zip(results) {
            if let Err(e) = result {
                warn!(package = %candidate.name, error = %e, "Publish failed");
                failed += 1;
            }
        }

        let line = summary(total, failed, skipped);
        if failed > 0 {
            return Err(Error::CommandFailed { message: line });
        }
        println!("{line}");
        Ok(())
    }
}

/// Ask before publishing explicitly named private packages, then drop
/// their `private` flag. Returns `false` when the user declines.
async fn make_public(session: &mut Session<'_>, paths: &[String]) -> Result<bool> {
    let private: Vec<&String> = paths
        .iter()
        .filter(|path| session.workspaces.get(path).is_some_and(|m| m.is_private()))
        .collect();
    if private.is_empty() {
        return Ok(true);
    }

    let names: Vec<&str> = private
        .iter()
        .filter_map(|path| session.workspaces.get(path))
        .map(|m| m.name())
        .collect();
    let verb = if private.len() > 1 { "are" } else { "is" };
    let message = format!("workspace {} {verb} private, switch to public?", names.join(", "));
    if !confirm(&message, session.argv.flag("yes")).await? {
        return Ok(false);
    }

    for path in private {
        if let Some(manifest) = session.workspaces.get_mut(path) {
            manifest.set_private(false);
        }
        session.save(path).await?;
    }
    Ok(true)
}

async fn publish_one(
    session: &Session<'_>,
    candidate: &Candidate,
    flags: &PublishFlags,
    debug: bool,
) -> Result<()> {
    session.emit(PUBLISH_BEFORE, &candidate.path).await?;

    let dir = session.workspaces.dir(&candidate.path);
    let args = publish_args(&candidate.version, flags);
    let command = publish_command(session.manager(), &dir.to_string_lossy(), &candidate.name, args);

    let outcome = if debug {
        process::spawn(&command, session.cwd()).await?
    } else {
        let output = process::capture(&command, session.cwd()).await?;
        if !output.outcome.success() {
            warn!(package = %candidate.name, stderr = %output.stderr.trim(), "Publish command failed");
        }
        output.outcome
    };
    if !outcome.success() {
        return Err(Error::ProcessExit {
            command: command.join(" "),
            code: outcome.exit_code(),
        });
    }

    session.emit(PUBLISH_AFTER, &candidate.path).await
}

/// Alpha and beta prereleases go to the `next` tag; release candidates
/// and stable versions to `latest`.
fn is_next(version: &str) -> bool {
    Version::parse(version).is_ok_and(|v| {
        !v.pre.is_empty() && v.pre.as_str().split('.').next() != Some("rc")
    })
}

fn remote_version(document: Option<&Packument>, next: bool) -> &str {
    document
        .and_then(|doc| {
            if next {
                doc.tag("next").or_else(|| doc.latest())
            } else {
                doc.latest()
            }
        })
        .unwrap_or("0.0.0")
}

fn should_publish(local: &str, remote: &str) -> bool {
    let Ok(local) = Version::parse(local) else {
        warn!(version = %local, "Invalid local version");
        return false;
    };
    let remote = Version::parse(remote).unwrap_or_else(|_| Version::new(0, 0, 0));
    local > remote
}

fn publish_args(version: &str, flags: &PublishFlags) -> Vec<String> {
    let tag = flags
        .tag
        .clone()
        .unwrap_or_else(|| if is_next(version) { "next" } else { "latest" }.to_string());
    let mut args = vec![
        "--tag".to_string(),
        tag,
        "--access".to_string(),
        flags.access.clone().unwrap_or_else(|| "public".to_string()),
    ];
    if let Some(registry) = &flags.registry {
        args.extend(["--registry".to_string(), registry.clone()]);
    }
    if let Some(otp) = &flags.otp {
        args.extend(["--otp".to_string(), otp.clone()]);
    }
    args
}

fn publish_command(manager: &PackageManager, dir: &str, name: &str, args: Vec<String>) -> Vec<String> {
    let mut command = if manager.is_yarn_berry() {
        vec![
            "yarn".to_string(),
            "workspace".to_string(),
            name.to_string(),
            "npm".to_string(),
            "publish".to_string(),
        ]
    } else {
        vec![manager.name.clone(), "publish".to_string(), dir.to_string()]
    };
    command.extend(args);
    command
}

fn summary(total: usize, failed: usize, skipped: usize) -> String {
    let skipped = if skipped > 0 {
        format!(", {skipped} skipped")
    } else {
        String::new()
    };
    if failed > 0 {
        format!("Published {} packages, {failed} failed{skipped}.", total - failed)
    } else {
        format!("Published {total} packages{skipped}.")
    }
}
