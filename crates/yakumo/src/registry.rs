//! Minimal npm registry client.
//!
//! Only package documents are fetched: `GET <registry>/<name>` and the
//! `dist-tags` and `versions` fields of the answer.

use indexmap::IndexMap;
use indicatif::ProgressBar;
use miette::Diagnostic;
use semver::{Version, VersionReq};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Registry used when nothing else is configured.
pub const DEFAULT_REGISTRY: &str = "https://registry.npmjs.org";

/// Environment variable npm uses for the registry URL.
pub const REGISTRY_ENV: &str = "npm_config_registry";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!("yakumo/", env!("CARGO_PKG_VERSION"));

/// Errors talking to the registry.
#[derive(Error, Debug, Diagnostic)]
pub enum RegistryError {
    /// The request could not be completed.
    #[error("Request to {url} failed: {source}")]
    #[diagnostic(code(yakumo::registry::request), help("Check the network and the registry URL"))]
    Request {
        /// Requested URL
        url: String,
        /// Transport error
        #[source]
        source: reqwest::Error,
    },

    /// The registry answered with an unexpected status.
    #[error("Registry returned status {status} for {name}")]
    #[diagnostic(code(yakumo::registry::status))]
    Status {
        /// Package name
        name: String,
        /// HTTP status code
        status: u16,
    },
}

/// The parts of a package document yakumo reads.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Packument {
    /// Tag name to version.
    #[serde(default, rename = "dist-tags")]
    pub dist_tags: IndexMap<String, String>,
    /// Every published version.
    #[serde(default)]
    pub versions: IndexMap<String, serde_json::Value>,
}

impl Packument {
    /// The version a dist-tag points at.
    #[must_use]
    pub fn tag(&self, tag: &str) -> Option<&str> {
        self.dist_tags.get(tag).map(String::as_str)
    }

    /// The `latest` dist-tag.
    #[must_use]
    pub fn latest(&self) -> Option<&str> {
        self.tag("latest")
    }

    /// The highest published version satisfying `range`.
    #[must_use]
    pub fn max_satisfying(&self, range: &str) -> Option<Version> {
        let req = VersionReq::parse(range).ok()?;
        self.versions
            .keys()
            .filter_map(|v| Version::parse(v).ok())
            .filter(|v| req.matches(v))
            .max()
    }
}

/// Pick the registry base URL: explicit flag, then `npm_config_registry`,
/// then project configuration, then the public registry.
#[must_use]
pub fn resolve_registry(flag: Option<&str>, configured: Option<&str>) -> String {
    let env = std::env::var(REGISTRY_ENV).ok();
    select_registry(flag, env.as_deref(), configured)
}

fn select_registry(flag: Option<&str>, env: Option<&str>, configured: Option<&str>) -> String {
    [flag, env, configured]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|url| !url.is_empty())
        .unwrap_or(DEFAULT_REGISTRY)
        .trim_end_matches('/')
        .to_string()
}

/// An npm registry endpoint.
#[derive(Debug, Clone)]
pub struct NpmRegistry {
    client: reqwest::Client,
    base: String,
}

impl NpmRegistry {
    /// Create a client for `base`.
    #[must_use]
    pub fn new(base: impl Into<String>) -> Self {
        let client = match reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
        {
            Ok(client) => client,
            Err(e) => {
                tracing::warn!(error = %e, "Falling back to a default HTTP client without timeout");
                reqwest::Client::new()
            }
        };
        Self {
            client,
            base: base.into().trim_end_matches('/').to_string(),
        }
    }

    /// The registry base URL.
    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Document URL of a package. The scope separator is escaped.
    #[must_use]
    pub fn url(&self, name: &str) -> String {
        format!("{}/{}", self.base, name.replace('/', "%2f"))
    }

    /// Fetch a package document. Unpublished packages yield `None`.
    ///
    /// # Errors
    ///
    /// Fails on transport errors and unexpected statuses.
    pub async fn fetch(&self, name: &str) -> Result<Option<Packument>, RegistryError> {
        let url = self.url(name);
        tracing::debug!(url = %url, "Fetching package document");
        let response = self
            .client
            .get(&url)
            .header("accept", "application/vnd.npm.install-v1+json; q=1.0, application/json; q=0.8")
            .send()
            .await
            .map_err(|source| RegistryError::Request {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(RegistryError::Status {
                name: name.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .json::<Packument>()
            .await
            .map(Some)
            .map_err(|source| RegistryError::Request { url, source })
    }

    /// Fetch several documents with at most `concurrency` requests in
    /// flight. Results keep the order of `names`; `progress` advances once
    /// per finished request.
    pub async fn fetch_many(
        &self,
        names: &[String],
        concurrency: usize,
        progress: &ProgressBar,
    ) -> IndexMap<String, Result<Option<Packument>, RegistryError>> {
        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
        let mut tasks = JoinSet::new();
        for (index, name) in names.iter().enumerate() {
            let registry = self.clone();
            let semaphore = Arc::clone(&semaphore);
            let name = name.clone();
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                let result = registry.fetch(&name).await;
                (index, result)
            });
        }

        let mut slots: Vec<Option<Result<Option<Packument>, RegistryError>>> =
            names.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            progress.inc(1);
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(e) => tracing::warn!(error = %e, "Registry request task failed"),
            }
        }

        names
            .iter()
            .cloned()
            .zip(slots)
            .filter_map(|(name, slot)| slot.map(|result| (name, result)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packument() -> Packument {
        serde_json::from_value(serde_json::json!({
            "name": "demo",
            "dist-tags": {"latest": "1.4.0", "next": "2.0.0-beta.1"},
            "versions": {
                "1.0.0": {}, "1.2.0": {}, "1.4.0": {},
                "2.0.0-beta.1": {}, "not-a-version": {}
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_tags() {
        let doc = packument();
        assert_eq!(doc.latest(), Some("1.4.0"));
        assert_eq!(doc.tag("next"), Some("2.0.0-beta.1"));
        assert_eq!(doc.tag("canary"), None);
    }

    #[test]
    fn test_max_satisfying() {
        let doc = packument();
        assert_eq!(doc.max_satisfying("^1.0.0"), Some(Version::new(1, 4, 0)));
        assert_eq!(doc.max_satisfying("~1.2.0"), Some(Version::new(1, 2, 0)));
        assert_eq!(doc.max_satisfying("^3.0.0"), None);
        assert_eq!(doc.max_satisfying("not a range"), None);
    }

    #[test]
    fn test_missing_fields_default() {
        let doc: Packument = serde_json::from_str("{}").unwrap();
        assert!(doc.latest().is_none());
        assert!(doc.versions.is_empty());
    }

    #[test]
    fn test_registry_selection_order() {
        assert_eq!(select_registry(None, None, None), DEFAULT_REGISTRY);
        assert_eq!(
            select_registry(Some("https://flag/"), Some("https://env"), None),
            "https://flag"
        );
        assert_eq!(
            select_registry(None, Some("https://env"), Some("https://config")),
            "https://env"
        );
        assert_eq!(select_registry(Some(" "), None, Some("https://config")), "https://config");
    }

    #[tokio::test]
    async fn test_fetch_many_without_names() {
        let registry = NpmRegistry::new(DEFAULT_REGISTRY);
        let results = registry.fetch_many(&[], 4, &ProgressBar::hidden()).await;
        assert!(results.is_empty());
    }

    #[test]
    fn test_scoped_url() {
        let registry = NpmRegistry::new("https://registry.example/");
        assert_eq!(registry.base(), "https://registry.example");
        assert_eq!(registry.url("@scope/pkg"), "https://registry.example/@scope%2fpkg");
        assert_eq!(registry.url("pkg"), "https://registry.example/pkg");
    }
}
