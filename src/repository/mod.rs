//! Repository access.
//!
//! A [`ContentSource`] lists the files of a repository tree and serves their
//! text. [`GitHubClient`] talks to the GitHub API, [`LocalRepository`] reads a
//! checkout on disk. Both build browsable links through [`RepositoryLinks`].

mod github;
mod local;

pub use github::GitHubClient;
pub use local::LocalRepository;

use crate::config::RepositoryConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::Url;
use std::collections::HashMap;
use std::sync::Mutex;

const WEB_BASE: &str = "https://github.com";

/// Where connector definitions are read from
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Identifier of the revision being indexed
    async fn latest_revision(&self) -> Result<String>;

    /// Every file path under `prefix`, recursively
    async fn list_tree(&self, prefix: &str) -> Result<Vec<String>>;

    /// Text content of one file
    async fn file_content(&self, path: &str) -> Result<String>;

    /// Link builder for this repository
    fn links(&self) -> &RepositoryLinks;
}

/// Builds `github.com` tree and blob URLs for repository paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryLinks {
    owner: String,
    name: String,
    branch: String,
}

impl RepositoryLinks {
    pub fn new(repo: &RepositoryConfig) -> Self {
        Self {
            owner: repo.owner.clone(),
            name: repo.name.clone(),
            branch: repo.branch.clone(),
        }
    }

    /// URL of a directory
    pub fn tree_url(&self, path: &str) -> String {
        self.link("tree", path)
    }

    /// URL of a file
    pub fn blob_url(&self, path: &str) -> String {
        self.link("blob", path)
    }

    fn link(&self, kind: &str, path: &str) -> String {
        let base = format!("{}/{}/{}", WEB_BASE, self.owner, self.name);
        let segments = std::iter::once(kind)
            .chain(self.branch.split('/'))
            .chain(path.split('/'));
        match join_segments(&base, segments) {
            Ok(url) => url.to_string(),
            Err(_) => format!("{}/{}/{}/{}", base, kind, self.branch, path),
        }
    }
}

/// Append path segments to a base URL, percent-encoding each one
pub(crate) fn join_segments<'a>(
    base: &str,
    segments: impl IntoIterator<Item = &'a str>,
) -> Result<Url> {
    let mut url = Url::parse(base).map_err(|e| Error::other(format!("invalid URL {}: {}", base, e)))?;
    {
        let mut path = url
            .path_segments_mut()
            .map_err(|_| Error::other(format!("URL cannot take a path: {}", base)))?;
        path.pop_if_empty();
        path.extend(segments.into_iter().filter(|s| !s.is_empty()));
    }
    Ok(url)
}

/// Path-keyed text cache for the lifetime of one client
#[derive(Debug, Default)]
pub struct ContentCache {
    cache: Mutex<HashMap<String, String>>,
}

impl ContentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.cache.lock().ok()?.get(key).cloned()
    }

    pub fn set(&self, key: String, value: String) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(key, value);
        }
    }

    pub fn clear(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_links_encode_spaces() {
        let links = RepositoryLinks::new(&RepositoryConfig::default());
        assert_eq!(
            links.tree_url("Solutions/Cisco ASA"),
            "https://github.com/Azure/Azure-Sentinel/tree/master/Solutions/Cisco%20ASA"
        );
        assert_eq!(
            links.blob_url("Solutions/Cisco ASA/Data Connectors/CiscoASA.JSON"),
            "https://github.com/Azure/Azure-Sentinel/blob/master/Solutions/Cisco%20ASA/Data%20Connectors/CiscoASA.JSON"
        );
    }

    #[test]
    fn test_links_keep_branch_slashes() {
        let repo = RepositoryConfig {
            branch: "feature/new-connectors".to_string(),
            ..Default::default()
        };
        let links = RepositoryLinks::new(&repo);
        assert_eq!(
            links.tree_url("Solutions"),
            "https://github.com/Azure/Azure-Sentinel/tree/feature/new-connectors/Solutions"
        );
    }

    #[test]
    fn test_join_segments_rejects_bad_base() {
        assert!(join_segments("not a url", ["a"]).is_err());
        let url = join_segments("https://raw.githubusercontent.com/", ["Azure", "a b.json"]).unwrap();
        assert_eq!(url.as_str(), "https://raw.githubusercontent.com/Azure/a%20b.json");
    }

    #[test]
    fn test_cache_operations() {
        let cache = ContentCache::new();
        assert!(cache.is_empty());

        cache.set("Solutions/a.json".to_string(), "{}".to_string());
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("Solutions/a.json"), Some("{}".to_string()));
        assert_eq!(cache.get("missing"), None);

        cache.clear();
        assert!(cache.is_empty());
    }
}
