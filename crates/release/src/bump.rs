//! Version bump calculation for a single package.

use crate::error::{Error, Result};
use semver::{BuildMetadata, Prerelease, Version};
use std::fmt;

/// Prerelease channels, in the order they advance.
pub const CHANNELS: [&str; 3] = ["alpha", "beta", "rc"];

/// The component a bump targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BumpKind {
    /// `--major`
    Major,
    /// `--minor`
    Minor,
    /// `--patch`
    Patch,
    /// `--version <semver>`
    Version(Version),
    /// `--reset`
    Reset,
    /// `--local`
    Local,
}

impl fmt::Display for BumpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Major => f.write_str("major"),
            Self::Minor => f.write_str("minor"),
            Self::Patch => f.write_str("patch"),
            Self::Version(v) => write!(f, "version {v}"),
            Self::Reset => f.write_str("reset"),
            Self::Local => f.write_str("local"),
        }
    }
}

/// Raw bump flags as passed on the command line.
#[derive(Debug, Clone, Default)]
pub struct BumpFlags {
    /// Bump the major component.
    pub major: bool,
    /// Bump the minor component.
    pub minor: bool,
    /// Bump the patch component.
    pub patch: bool,
    /// Step the last component back.
    pub reset: bool,
    /// Re-propagate the current version.
    pub local: bool,
    /// Set an explicit version.
    pub version: Option<String>,
    /// Enter or advance a prerelease channel.
    pub prerelease: bool,
    /// Leave the prerelease channel.
    pub stable: bool,
    /// Bump dependents too.
    pub recursive: bool,
}

/// Validated bump options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BumpOptions {
    /// The requested kind; `None` steps the last component forward.
    pub kind: Option<BumpKind>,
    /// Enter or advance a prerelease channel.
    pub prerelease: bool,
    /// Leave the prerelease channel.
    pub stable: bool,
    /// Bump dependents whose ranges were rewritten.
    pub recursive: bool,
}

impl BumpOptions {
    /// Validate raw flags. Nothing is mutated when this fails.
    ///
    /// # Errors
    ///
    /// Fails when more than one bump kind is given, when `--version` is not
    /// valid semver, or when `--prerelease` is combined with a kind it cannot
    /// apply to.
    pub fn from_flags(flags: &BumpFlags) -> Result<Self> {
        let mut kinds = Vec::new();
        if flags.major {
            kinds.push(("major", BumpKind::Major));
        }
        if flags.minor {
            kinds.push(("minor", BumpKind::Minor));
        }
        if flags.patch {
            kinds.push(("patch", BumpKind::Patch));
        }
        if let Some(raw) = &flags.version {
            let version = Version::parse(raw.trim()).map_err(|_| Error::invalid_version(raw.as_str()))?;
            kinds.push(("version", BumpKind::Version(version)));
        }
        if flags.reset {
            kinds.push(("reset", BumpKind::Reset));
        }
        if flags.local {
            kinds.push(("local", BumpKind::Local));
        }

        if kinds.len() > 1 {
            return Err(Error::ConflictingBumps {
                flags: kinds.into_iter().map(|(name, _)| name.to_string()).collect(),
            });
        }
        let kind = kinds.pop().map(|(_, kind)| kind);

        if flags.prerelease
            && !flags.stable
            && let Some(kind @ (BumpKind::Version(_) | BumpKind::Reset)) = &kind
        {
            return Err(Error::ConflictingBumps {
                flags: vec!["prerelease".to_string(), kind.to_string()],
            });
        }

        Ok(Self {
            kind,
            prerelease: flags.prerelease,
            stable: flags.stable,
            recursive: flags.recursive,
        })
    }
}

/// The result of computing a bump for one version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Accept only when strictly greater than the current version.
    Candidate(Version),
    /// Always accepted; the node becomes dirty.
    Forced(Version),
    /// Always accepted; the node becomes dirty only if it changed.
    Explicit(Version),
}

impl Step {
    /// The computed version.
    #[must_use]
    pub const fn version(&self) -> &Version {
        match self {
            Self::Candidate(v) | Self::Forced(v) | Self::Explicit(v) => v,
        }
    }
}

/// Compute the next version of `current`.
///
/// `Local` is not handled here since it never computes a new version.
///
/// # Errors
///
/// Fails when a prerelease channel cannot advance or a reset would go below
/// zero.
pub fn next_version(current: &Version, options: &BumpOptions) -> Result<Step> {
    let mut next = current.clone();
    next.build = BuildMetadata::EMPTY;

    if options.stable {
        next.pre = Prerelease::EMPTY;
        return Ok(Step::Candidate(next));
    }

    if options.prerelease {
        if current.pre.is_empty() {
            match options.kind {
                None | Some(BumpKind::Major) => {
                    next = Version::new(current.major + 1, 0, 0);
                }
                Some(BumpKind::Minor) => next = Version::new(current.major, current.minor + 1, 0),
                Some(BumpKind::Patch) => {
                    next = Version::new(current.major, current.minor, current.patch + 1);
                }
                _ => return Ok(Step::Candidate(next)),
            }
            next.pre = prerelease(CHANNELS[0], 0)?;
        } else {
            let (label, _) = split_prerelease(&current.pre);
            let channel = CHANNELS
                .iter()
                .position(|c| *c == label)
                .and_then(|i| CHANNELS.get(i + 1))
                .ok_or_else(|| Error::PrereleaseExhausted {
                    version: current.to_string(),
                })?;
            next.pre = prerelease(channel, 0)?;
        }
        return Ok(Step::Candidate(next));
    }

    match &options.kind {
        None => {
            if current.pre.is_empty() {
                next.patch += 1;
            } else {
                let (label, counter) = split_prerelease(&current.pre);
                next.pre = prerelease(label, counter + 1)?;
            }
            Ok(Step::Candidate(next))
        }
        Some(BumpKind::Reset) => {
            let below_zero = || Error::ResetBelowZero {
                version: current.to_string(),
            };
            if current.pre.is_empty() {
                next.patch = current.patch.checked_sub(1).ok_or_else(below_zero)?;
            } else {
                let (label, counter) = split_prerelease(&current.pre);
                let counter = counter.checked_sub(1).ok_or_else(below_zero)?;
                next.pre = prerelease(label, counter)?;
            }
            Ok(Step::Forced(next))
        }
        Some(BumpKind::Version(version)) => Ok(Step::Explicit(version.clone())),
        Some(kind @ (BumpKind::Major | BumpKind::Minor | BumpKind::Patch)) => {
            if current.pre.is_empty() {
                match kind {
                    BumpKind::Major => next = Version::new(current.major + 1, 0, 0),
                    BumpKind::Minor => next = Version::new(current.major, current.minor + 1, 0),
                    _ => next.patch += 1,
                }
            } else {
                next.pre = Prerelease::EMPTY;
            }
            Ok(Step::Candidate(next))
        }
        Some(BumpKind::Local) => Ok(Step::Candidate(next)),
    }
}

/// Split `beta.3` into `("beta", 3)`. A missing counter reads as zero.
fn split_prerelease(pre: &Prerelease) -> (&str, u64) {
    match pre.as_str().split_once('.') {
        Some((label, counter)) => (label, counter.parse().unwrap_or(0)),
        None => (pre.as_str(), 0),
    }
}

fn prerelease(label: &str, counter: u64) -> Result<Prerelease> {
    let text = format!("{label}.{counter}");
    Prerelease::new(&text).map_err(|_| Error::invalid_version(text))
}
