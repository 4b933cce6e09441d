//! Package manager detection.
//!
//! The agent that launched yakumo advertises itself through
//! `npm_config_user_agent` (`pnpm/9.1.0 npm/? node/v20.11.0 linux x64`).
//! When that is absent the lockfiles at the workspace root decide.
//!
//! ```
//! use yakumo_workspaces::detection::parse_user_agent;
//!
//! let manager = parse_user_agent("yarn/4.1.0 npm/? node/v20.11.0").unwrap();
//! assert_eq!(manager.name, "yarn");
//! assert!(manager.is_yarn_berry());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Environment variable set by npm-compatible agents when running scripts.
pub const USER_AGENT_ENV: &str = "npm_config_user_agent";

/// The package manager driving the workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageManager {
    /// Executable name: `npm`, `yarn`, `pnpm` or `bun`.
    pub name: String,
    /// Reported version, empty when unknown.
    pub version: String,
}

impl Default for PackageManager {
    fn default() -> Self {
        Self::new("npm", "")
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.version.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}@{}", self.name, self.version)
        }
    }
}

impl PackageManager {
    /// Build a manager identity.
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// Whether this is Yarn 2 or later.
    #[must_use]
    pub fn is_yarn_berry(&self) -> bool {
        self.name == "yarn" && parse_major_version(&self.version).is_some_and(|major| major >= 2)
    }

    /// Command prefix for running a binary from the workspace's dependencies.
    #[must_use]
    pub fn exec_prefix(&self) -> Vec<String> {
        if self.name == "yarn" {
            vec!["yarn".to_string()]
        } else {
            vec![self.name.clone(), "exec".to_string(), "--".to_string()]
        }
    }
}

/// Detect the package manager for `root`.
///
/// The user agent wins, then the root manifest's `packageManager` field,
/// then lockfiles. Defaults to npm.
#[must_use]
pub fn detect(root: &Path, hint: Option<&str>) -> PackageManager {
    let from_env = std::env::var(USER_AGENT_ENV)
        .ok()
        .and_then(|agent| parse_user_agent(&agent));
    if let Some(manager) = from_env {
        tracing::debug!(%manager, "Package manager from user agent");
        return manager;
    }
    if let Some(manager) = hint.and_then(parse_package_manager_hint) {
        tracing::debug!(%manager, "Package manager from packageManager field");
        return manager;
    }
    let manager = detect_from_lockfiles(root).unwrap_or_default();
    tracing::debug!(%manager, "Package manager from lockfiles");
    manager
}

/// Parse the first `<name>/<version>` token of a user agent string.
#[must_use]
pub fn parse_user_agent(agent: &str) -> Option<PackageManager> {
    let token = agent.split_whitespace().next()?;
    let (name, version) = token.split_once('/').unwrap_or((token, ""));
    if name.is_empty() {
        return None;
    }
    Some(PackageManager::new(name, version))
}

/// Detect the package manager from lockfiles at `root`.
#[must_use]
pub fn detect_from_lockfiles(root: &Path) -> Option<PackageManager> {
    if root.join("pnpm-lock.yaml").exists() {
        return Some(PackageManager::new("pnpm", ""));
    }
    let yarn_lock = root.join("yarn.lock");
    if yarn_lock.exists() {
        return Some(detect_yarn_version(&yarn_lock));
    }
    if root.join("bun.lock").exists() || root.join("bun.lockb").exists() {
        return Some(PackageManager::new("bun", ""));
    }
    if root.join("package-lock.json").exists() {
        return Some(PackageManager::new("npm", ""));
    }
    None
}

/// Berry lockfiles carry a `__metadata:` block that classic ones lack.
fn detect_yarn_version(lockfile: &Path) -> PackageManager {
    let berry = std::fs::read_to_string(lockfile)
        .map(|content| content.lines().any(|line| line.trim_start().starts_with("__metadata:")))
        .unwrap_or(false);
    PackageManager::new("yarn", if berry { "2" } else { "1" })
}

/// Parse a `packageManager` field such as `pnpm@9.1.0`.
#[must_use]
pub fn parse_package_manager_hint(hint: &str) -> Option<PackageManager> {
    let trimmed = hint.trim();
    let (name, version) = match trimmed.split_once('@') {
        Some((name, version)) if !name.is_empty() => (name, version),
        _ => (trimmed, ""),
    };
    let name = name.trim().to_ascii_lowercase();
    match name.as_str() {
        "npm" | "yarn" | "pnpm" | "bun" => {
            let version = version.split('+').next().unwrap_or_default();
            Some(PackageManager::new(name, version))
        }
        _ => None,
    }
}

fn parse_major_version(input: &str) -> Option<u64> {
    let trimmed = input.trim().trim_start_matches(['v', 'V']);
    let digits: String = trimmed.chars().take_while(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse::<u64>().ok()
}
