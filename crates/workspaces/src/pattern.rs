//! Anchored path patterns used by the `exclude` and `ignore` settings.
//!
//! A pattern is matched against a whole workspace path. `*` never crosses a
//! `/`, and a leading `/` on either side is optional.

use crate::error::{Error, Result};
use glob::{MatchOptions, Pattern};

const OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// A compiled workspace path pattern.
#[derive(Debug, Clone)]
pub struct PathPattern {
    source: String,
    pattern: Pattern,
}

impl PathPattern {
    /// Compile a pattern.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPattern`] when the glob syntax is invalid.
    pub fn new(source: &str) -> Result<Self> {
        let trimmed = source.trim_start_matches('/');
        let pattern = Pattern::new(trimmed).map_err(|e| Error::InvalidPattern {
            pattern: source.to_string(),
            message: e.msg.to_string(),
        })?;
        Ok(Self {
            source: source.to_string(),
            pattern,
        })
    }

    /// The pattern as written in the configuration.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether a workspace path (`/packages/a` or `packages/a`) matches.
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        self.pattern
            .matches_with(path.trim_start_matches('/'), OPTIONS)
    }
}

/// A list of patterns where any match counts.
#[derive(Debug, Clone, Default)]
pub struct PatternSet(Vec<PathPattern>);

impl PatternSet {
    /// Compile every pattern.
    ///
    /// # Errors
    ///
    /// Fails on the first invalid pattern.
    pub fn new<S: AsRef<str>>(sources: &[S]) -> Result<Self> {
        sources
            .iter()
            .map(|s| PathPattern::new(s.as_ref()))
            .collect::<Result<Vec<_>>>()
            .map(Self)
    }

    /// Whether any pattern matches `path`.
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        self.0.iter().any(|p| p.matches(path))
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_star_is_single_segment() {
        let p = PathPattern::new("/packages/*").unwrap();
        assert!(p.matches("/packages/a"));
        assert!(p.matches("packages/b"));
        assert!(!p.matches("/packages/a/b"));
        assert!(!p.matches("/plugins/a"));
    }

    #[test]
    fn test_literal_is_anchored() {
        let p = PathPattern::new("packages/a").unwrap();
        assert!(p.matches("/packages/a"));
        assert!(!p.matches("/x/packages/a"));
        assert!(!p.matches("/packages/ab"));
    }

    #[test]
    fn test_invalid_pattern() {
        let err = PathPattern::new("packages/[").unwrap_err();
        assert!(matches!(err, Error::InvalidPattern { .. }));
    }

    #[test]
    fn test_set_matches_any() {
        let set = PatternSet::new(&["/a/*", "/b"]).unwrap();
        assert!(set.matches("/a/x"));
        assert!(set.matches("/b"));
        assert!(!set.matches("/c"));
        assert!(PatternSet::default().is_empty());
    }
}
