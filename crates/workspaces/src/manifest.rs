//! The `package.json` manifest model.
//!
//! A [`PackageManifest`] keeps the manifest as an insertion-ordered JSON
//! object so that writing it back never reorders keys or drops fields the
//! tool does not know about. Typed accessors cover the fields yakumo reads
//! and mutates.

use crate::error::{Error, Result};
use crate::persist::Indent;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;

/// The four dependency maps of a manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyKind {
    /// `dependencies`
    Dependencies,
    /// `devDependencies`
    DevDependencies,
    /// `peerDependencies`
    PeerDependencies,
    /// `optionalDependencies`
    OptionalDependencies,
}

impl DependencyKind {
    /// All kinds, in manifest order.
    pub const ALL: [Self; 4] = [
        Self::Dependencies,
        Self::DevDependencies,
        Self::PeerDependencies,
        Self::OptionalDependencies,
    ];

    /// The manifest key holding this map.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Dependencies => "dependencies",
            Self::DevDependencies => "devDependencies",
            Self::PeerDependencies => "peerDependencies",
            Self::OptionalDependencies => "optionalDependencies",
        }
    }

    /// Whether a change in this map makes the dependent itself part of a
    /// release. Development dependencies are rewritten but never cascade.
    #[must_use]
    pub const fn cascades(self) -> bool {
        !matches!(self, Self::DevDependencies)
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A parsed `package.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageManifest {
    fields: Map<String, Value>,
}

impl PackageManifest {
    /// Build a manifest from a JSON value.
    ///
    /// # Errors
    ///
    /// Fails when the value is not an object or has no string `name`.
    pub fn from_value(value: Value, path: &Path) -> Result<Self> {
        let Value::Object(fields) = value else {
            return Err(Error::InvalidManifest {
                path: path.to_path_buf(),
                message: "expected a JSON object".to_string(),
            });
        };
        if !fields.get("name").is_some_and(Value::is_string) {
            return Err(Error::InvalidManifest {
                path: path.to_path_buf(),
                message: "missing string field `name`".to_string(),
            });
        }
        Ok(Self { fields })
    }

    /// Parse manifest text read from `path`.
    ///
    /// # Errors
    ///
    /// Fails on invalid JSON or an invalid manifest shape.
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        let value: Value = serde_json::from_str(content).map_err(|source| Error::Json {
            source,
            path: Some(path.to_path_buf()),
        })?;
        Self::from_value(value, path)
    }

    /// The package name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.fields
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// The package version, if declared.
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.fields.get("version").and_then(Value::as_str)
    }

    /// Set the version, keeping the key in place when it already exists.
    pub fn set_version(&mut self, version: &str) {
        self.fields
            .insert("version".to_string(), Value::String(version.to_string()));
    }

    /// Whether the package is marked `private`.
    #[must_use]
    pub fn is_private(&self) -> bool {
        self.fields
            .get("private")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Mark the package private, or remove the flag entirely.
    pub fn set_private(&mut self, private: bool) {
        if private {
            self.fields.insert("private".to_string(), Value::Bool(true));
        } else {
            self.fields.shift_remove("private");
        }
    }

    /// The workspace globs declared by this manifest.
    #[must_use]
    pub fn workspaces(&self) -> Vec<&str> {
        self.fields
            .get("workspaces")
            .and_then(Value::as_array)
            .map(|list| list.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    /// Whether this manifest declares workspaces of its own.
    #[must_use]
    pub fn is_workspace_root(&self) -> bool {
        !self.workspaces().is_empty()
    }

    /// Replace the workspace globs.
    pub fn set_workspaces(&mut self, globs: Vec<String>) {
        let list = globs.into_iter().map(Value::String).collect();
        self.fields
            .insert("workspaces".to_string(), Value::Array(list));
    }

    /// Iterate the `(name, range)` pairs of one dependency map.
    pub fn dependencies(&self, kind: DependencyKind) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .get(kind.key())
            .and_then(Value::as_object)
            .into_iter()
            .flat_map(|deps| deps.iter())
            .filter_map(|(name, range)| range.as_str().map(|range| (name.as_str(), range)))
    }

    /// Look up a single dependency range.
    #[must_use]
    pub fn dependency(&self, kind: DependencyKind, name: &str) -> Option<&str> {
        self.fields
            .get(kind.key())
            .and_then(Value::as_object)
            .and_then(|deps| deps.get(name))
            .and_then(Value::as_str)
    }

    /// Overwrite an existing dependency range. Returns whether it changed.
    ///
    /// Keys that are not present are left alone; range rewriting never adds
    /// dependencies.
    pub fn set_dependency(&mut self, kind: DependencyKind, name: &str, range: &str) -> bool {
        let Some(slot) = self
            .fields
            .get_mut(kind.key())
            .and_then(Value::as_object_mut)
            .and_then(|deps| deps.get_mut(name))
        else {
            return false;
        };
        if slot.as_str() == Some(range) {
            return false;
        }
        *slot = Value::String(range.to_string());
        true
    }

    /// The command line of a package script.
    #[must_use]
    pub fn script(&self, name: &str) -> Option<&str> {
        self.fields
            .get("scripts")
            .and_then(Value::as_object)
            .and_then(|scripts| scripts.get(name))
            .and_then(Value::as_str)
    }

    /// Raw access to any field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// The underlying ordered object.
    #[must_use]
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Serialize with the given indentation and a trailing newline.
    ///
    /// # Errors
    ///
    /// Fails only if serialization itself fails.
    pub fn to_pretty_string(&self, indent: &Indent) -> Result<String> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.fields.serialize(&mut serializer)?;
        buf.push(b'\n');
        String::from_utf8(buf).map_err(|e| Error::InvalidManifest {
            path: Path::new(self.name()).to_path_buf(),
            message: format!("serialized manifest is not UTF-8: {e}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn manifest(value: Value) -> PackageManifest {
        PackageManifest::from_value(value, Path::new("package.json")).unwrap()
    }

    #[test]
    fn test_requires_object_with_name() {
        let path = Path::new("package.json");
        assert!(PackageManifest::from_value(json!([1, 2]), path).is_err());
        assert!(PackageManifest::from_value(json!({"version": "1.0.0"}), path).is_err());
        assert!(PackageManifest::from_value(json!({"name": 3}), path).is_err());
        assert!(PackageManifest::from_value(json!({"name": "a"}), path).is_ok());
    }

    #[test]
    fn test_typed_accessors() {
        let m = manifest(json!({
            "name": "@scope/a",
            "version": "1.2.3",
            "private": true,
            "workspaces": ["packages/*"],
            "scripts": {"build": "tsc -b"},
            "dependencies": {"b": "^1.0.0"},
        }));
        assert_eq!(m.name(), "@scope/a");
        assert_eq!(m.version(), Some("1.2.3"));
        assert!(m.is_private());
        assert!(m.is_workspace_root());
        assert_eq!(m.script("build"), Some("tsc -b"));
        assert_eq!(m.dependency(DependencyKind::Dependencies, "b"), Some("^1.0.0"));
        assert_eq!(m.dependency(DependencyKind::DevDependencies, "b"), None);
    }

    #[test]
    fn test_empty_workspaces_is_not_root() {
        let m = manifest(json!({"name": "a", "workspaces": []}));
        assert!(!m.is_workspace_root());
    }

    #[test]
    fn test_set_version_keeps_key_order() {
        let mut m = manifest(json!({"name": "a", "version": "1.0.0", "main": "index.js"}));
        m.set_version("2.0.0");
        let keys: Vec<_> = m.as_map().keys().cloned().collect();
        assert_eq!(keys, ["name", "version", "main"]);
        assert_eq!(m.version(), Some("2.0.0"));
    }

    #[test]
    fn test_set_private_false_removes_key_in_place() {
        let mut m = manifest(json!({"name": "a", "private": true, "version": "1.0.0", "main": "x"}));
        m.set_private(false);
        let keys: Vec<_> = m.as_map().keys().cloned().collect();
        assert_eq!(keys, ["name", "version", "main"]);
        assert!(!m.is_private());
    }

    #[test]
    fn test_set_dependency_only_rewrites_existing() {
        let mut m = manifest(json!({"name": "a", "devDependencies": {"b": "^1.0.0"}}));
        assert!(m.set_dependency(DependencyKind::DevDependencies, "b", "^2.0.0"));
        assert!(!m.set_dependency(DependencyKind::DevDependencies, "b", "^2.0.0"));
        assert!(!m.set_dependency(DependencyKind::Dependencies, "b", "^2.0.0"));
        assert_eq!(m.dependency(DependencyKind::DevDependencies, "b"), Some("^2.0.0"));
        assert!(m.get("dependencies").is_none());
    }

    #[test]
    fn test_pretty_string_uses_indent_and_trailing_newline() {
        let m = manifest(json!({"name": "a", "version": "1.0.0"}));
        let text = m.to_pretty_string(&Indent::spaces(4)).unwrap();
        assert_eq!(text, "{\n    \"name\": \"a\",\n    \"version\": \"1.0.0\"\n}\n");
    }

    #[test]
    fn test_dependency_kind_cascade_policy() {
        assert!(DependencyKind::Dependencies.cascades());
        assert!(DependencyKind::PeerDependencies.cascades());
        assert!(DependencyKind::OptionalDependencies.cascades());
        assert!(!DependencyKind::DevDependencies.cascades());
    }
}
