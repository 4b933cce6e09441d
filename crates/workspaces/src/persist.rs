//! Manifest persistence: indentation detection and write-back.

use crate::error::{Error, Result};
use crate::manifest::PackageManifest;
use std::path::Path;

/// The indentation unit used when writing manifests back to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Indent(String);

impl Default for Indent {
    fn default() -> Self {
        Self::spaces(2)
    }
}

impl Indent {
    /// An indent of `width` spaces.
    #[must_use]
    pub fn spaces(width: usize) -> Self {
        Self(" ".repeat(width))
    }

    /// A single tab.
    #[must_use]
    pub fn tab() -> Self {
        Self("\t".to_string())
    }

    /// Detect the indent of JSON text from its first indented line.
    ///
    /// Falls back to two spaces when nothing is indented.
    #[must_use]
    pub fn detect(content: &str) -> Self {
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .find_map(|line| {
                let unit: String = line
                    .chars()
                    .take_while(|c| *c == ' ' || *c == '\t')
                    .collect();
                if unit.is_empty() {
                    return None;
                }
                // Mixed leading whitespace: keep the first kind only.
                let first = unit.chars().next()?;
                Some(Self(unit.chars().take_while(|c| *c == first).collect()))
            })
            .unwrap_or_default()
    }

    /// The raw indent text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The raw indent bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

/// Write `manifest` to `<dir>/package.json`.
///
/// # Errors
///
/// Returns an I/O error when the file cannot be written.
pub async fn write_manifest(dir: &Path, manifest: &PackageManifest, indent: &Indent) -> Result<()> {
    let path = dir.join("package.json");
    let content = manifest.to_pretty_string(indent)?;
    tokio::fs::write(&path, content)
        .await
        .map_err(|e| Error::io(e, &path, "writing manifest"))?;
    tracing::debug!(path = %path.display(), "Manifest written");
    Ok(())
}
