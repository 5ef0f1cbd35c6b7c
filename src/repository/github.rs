// GitHub API client
//
// Commit and tree listings come from the REST API; file contents come from
// raw.githubusercontent.com. Nothing is cloned. The branch head is resolved
// once per client, and the tree and every file are read at that commit.

use super::{join_segments, ContentCache, ContentSource, RepositoryLinks};
use crate::config::{FetchConfig, RepositoryConfig};
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("sentinel-index/", env!("CARGO_PKG_VERSION"));

/// Response of `GET /repos/{owner}/{repo}/commits/{ref}`
#[derive(Debug, Deserialize)]
struct CommitResponse {
    sha: String,
    commit: CommitDetail,
}

#[derive(Debug, Deserialize)]
struct CommitDetail {
    tree: ShaRef,
}

#[derive(Debug, Deserialize)]
struct ShaRef {
    sha: String,
}

/// Response of `GET /repos/{owner}/{repo}/git/trees/{sha}?recursive=1`
#[derive(Debug, Deserialize)]
struct TreeResponse {
    tree: Vec<TreeItem>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Debug, Deserialize)]
struct TreeItem {
    path: String,
    #[serde(rename = "type")]
    kind: String,
}

/// Commit the client reads from once the branch head is resolved
#[derive(Debug, Clone, PartialEq, Eq)]
struct PinnedCommit {
    sha: String,
    tree_sha: String,
}

/// Reads a GitHub repository over HTTP
pub struct GitHubClient {
    repo: RepositoryConfig,
    fetch: FetchConfig,
    client: Client,
    cache: ContentCache,
    pinned: Mutex<Option<PinnedCommit>>,
    links: RepositoryLinks,
}

impl GitHubClient {
    /// Create a new client for the configured repository
    pub fn new(repo: RepositoryConfig, fetch: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(fetch.timeout_secs))
            .build()?;

        Ok(Self {
            links: RepositoryLinks::new(&repo),
            repo,
            fetch,
            client,
            cache: ContentCache::new(),
            pinned: Mutex::new(None),
        })
    }

    /// Drop every cached file and forget the resolved commit
    pub fn clear_cache(&self) {
        self.cache.clear();
        if let Ok(mut pinned) = self.pinned.lock() {
            *pinned = None;
        }
    }

    fn pinned(&self) -> Option<PinnedCommit> {
        self.pinned.lock().ok()?.clone()
    }

    fn pin(&self, commit: PinnedCommit) {
        if let Ok(mut pinned) = self.pinned.lock() {
            *pinned = Some(commit);
        }
    }

    fn api_url(&self, tail: &[&str]) -> Result<Url> {
        let segments = ["repos", self.repo.owner.as_str(), self.repo.name.as_str()]
            .into_iter()
            .chain(tail.iter().copied());
        join_segments(&self.fetch.api_base, segments)
    }

    /// Raw file URL at the pinned commit, or at the branch head before one is pinned
    fn raw_url(&self, path: &str) -> Result<Url> {
        let pinned = self.pinned();
        let reference = match &pinned {
            Some(commit) => commit.sha.as_str(),
            None => self.repo.branch.as_str(),
        };
        let segments = [self.repo.owner.as_str(), self.repo.name.as_str()]
            .into_iter()
            .chain(reference.split('/'))
            .chain(path.split('/'));
        join_segments(&self.fetch.raw_base, segments)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, what: &str) -> Result<T> {
        debug!(%url, "GET");
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/vnd.github+json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::fetch(what, format!("HTTP {}", response.status())));
        }

        Ok(response.json().await?)
    }

    /// Resolve the branch head on first use; later calls reuse it
    async fn latest_commit(&self) -> Result<PinnedCommit> {
        if let Some(commit) = self.pinned() {
            return Ok(commit);
        }

        let url = self.api_url(&["commits", self.repo.branch.as_str()])?;
        let response: CommitResponse = self
            .get_json(url, &format!("commit {}", self.repo.branch))
            .await?;
        let commit = PinnedCommit {
            sha: response.sha,
            tree_sha: response.commit.tree.sha,
        };
        debug!(sha = %commit.sha, "pinned {}", self.repo.branch);
        self.pin(commit.clone());
        Ok(commit)
    }
}

#[async_trait]
impl ContentSource for GitHubClient {
    async fn latest_revision(&self) -> Result<String> {
        Ok(self.latest_commit().await?.sha)
    }

    async fn list_tree(&self, prefix: &str) -> Result<Vec<String>> {
        let commit = self.latest_commit().await?;
        let mut url = self.api_url(&["git", "trees", commit.tree_sha.as_str()])?;
        url.query_pairs_mut().append_pair("recursive", "1");

        let tree: TreeResponse = self.get_json(url, "repository tree").await?;
        if tree.truncated {
            warn!("GitHub truncated the repository tree; some solutions may be missing");
        }

        let prefix = format!("{}/", prefix.trim_matches('/'));
        Ok(tree
            .tree
            .into_iter()
            .filter(|item| item.kind == "blob" && item.path.starts_with(&prefix))
            .map(|item| item.path)
            .collect())
    }

    async fn file_content(&self, path: &str) -> Result<String> {
        if let Some(cached) = self.cache.get(path) {
            return Ok(cached);
        }

        let url = self.raw_url(path)?;
        debug!(%url, "GET");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::fetch(path, e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::fetch(path, format!("HTTP {}", response.status())));
        }

        let text = response
            .text()
            .await
            .map_err(|e| Error::fetch(path, e.to_string()))?;
        self.cache.set(path.to_string(), text.clone());
        Ok(text)
    }

    fn links(&self) -> &RepositoryLinks {
        &self.links
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GitHubClient {
        GitHubClient::new(RepositoryConfig::default(), FetchConfig::default()).unwrap()
    }

    #[test]
    fn test_api_url() {
        let url = client().api_url(&["commits", "master"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.github.com/repos/Azure/Azure-Sentinel/commits/master"
        );
    }

    #[test]
    fn test_raw_url_encodes_path() {
        let url = client()
            .raw_url("Solutions/Cisco ASA/Data Connectors/CiscoASA.JSON")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://raw.githubusercontent.com/Azure/Azure-Sentinel/master/Solutions/Cisco%20ASA/Data%20Connectors/CiscoASA.JSON"
        );
    }

    #[test]
    fn test_custom_bases() {
        let fetch = FetchConfig {
            api_base: "http://127.0.0.1:9/api/".to_string(),
            raw_base: "http://127.0.0.1:9/raw".to_string(),
            ..Default::default()
        };
        let client = GitHubClient::new(RepositoryConfig::default(), fetch).unwrap();
        assert_eq!(
            client.api_url(&["git", "trees", "abc"]).unwrap().as_str(),
            "http://127.0.0.1:9/api/repos/Azure/Azure-Sentinel/git/trees/abc"
        );
        assert_eq!(
            client.raw_url("Solutions/a.json").unwrap().as_str(),
            "http://127.0.0.1:9/raw/Azure/Azure-Sentinel/master/Solutions/a.json"
        );
    }

    #[tokio::test]
    async fn test_resolved_commit_is_reused() {
        let fetch = FetchConfig {
            api_base: "http://127.0.0.1:9".to_string(),
            raw_base: "http://127.0.0.1:9/raw".to_string(),
            timeout_secs: 2,
            ..Default::default()
        };
        let client = GitHubClient::new(RepositoryConfig::default(), fetch).unwrap();
        client.pin(PinnedCommit {
            sha: "c0ffee".to_string(),
            tree_sha: "7ree".to_string(),
        });

        // The API host is unreachable, so this only succeeds without a new lookup
        assert_eq!(client.latest_revision().await.unwrap(), "c0ffee");
        assert_eq!(
            client.raw_url("Solutions/a.json").unwrap().as_str(),
            "http://127.0.0.1:9/raw/Azure/Azure-Sentinel/c0ffee/Solutions/a.json"
        );

        client.clear_cache();
        assert!(client.pinned().is_none());
        assert!(client.latest_revision().await.is_err());
    }

    #[tokio::test]
    async fn test_file_content_served_from_cache() {
        let client = client();
        client
            .cache
            .set("Solutions/a.json".to_string(), "{\"id\": \"A\"}".to_string());

        let text = client.file_content("Solutions/a.json").await.unwrap();
        assert_eq!(text, "{\"id\": \"A\"}");

        client.clear_cache();
        assert!(client.cache.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_fetch_error() {
        let fetch = FetchConfig {
            raw_base: "http://127.0.0.1:9".to_string(),
            timeout_secs: 2,
            ..Default::default()
        };
        let client = GitHubClient::new(RepositoryConfig::default(), fetch).unwrap();

        let err = client.file_content("Solutions/a.json").await.unwrap_err();
        assert!(matches!(err, Error::Fetch { ref path, .. } if path == "Solutions/a.json"));
    }

    #[test]
    fn test_tree_response_parsing() {
        let json = r#"{
            "sha": "abc",
            "tree": [
                {"path": "Solutions/A", "type": "tree", "sha": "1"},
                {"path": "Solutions/A/Data/Solution_A.json", "type": "blob", "sha": "2", "size": 10}
            ],
            "truncated": false
        }"#;
        let tree: TreeResponse = serde_json::from_str(json).unwrap();
        assert_eq!(tree.tree.len(), 2);
        assert_eq!(tree.tree[1].kind, "blob");
        assert!(!tree.truncated);
    }

    #[test]
    fn test_commit_response_parsing() {
        let json = r#"{"sha": "c0ffee", "commit": {"tree": {"sha": "7ree"}, "message": "m"}}"#;
        let commit: CommitResponse = serde_json::from_str(json).unwrap();
        assert_eq!(commit.sha, "c0ffee");
        assert_eq!(commit.commit.tree.sha, "7ree");
    }
}
