// Local checkout source

use super::{ContentSource, RepositoryLinks};
use crate::config::RepositoryConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Serves a repository checkout from disk.
///
/// Links still point at the configured GitHub repository, so reports built
/// from a checkout match reports built over the network.
pub struct LocalRepository {
    root: PathBuf,
    links: RepositoryLinks,
}

impl LocalRepository {
    pub fn new(root: impl Into<PathBuf>, repo: &RepositoryConfig) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(Error::PathNotFound(root));
        }
        Ok(Self {
            root,
            links: RepositoryLinks::new(repo),
        })
    }

    fn relative(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<_> = relative
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        Some(parts.join("/"))
    }
}

#[async_trait]
impl ContentSource for LocalRepository {
    async fn latest_revision(&self) -> Result<String> {
        Ok("local".to_string())
    }

    async fn list_tree(&self, prefix: &str) -> Result<Vec<String>> {
        let start = self.root.join(prefix.trim_matches('/'));
        if !start.is_dir() {
            return Err(Error::PathNotFound(start));
        }

        let mut paths = Vec::new();
        for entry in WalkDir::new(&start).follow_links(true) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(relative) = self.relative(entry.path()) {
                paths.push(relative);
            }
        }

        paths.sort();
        Ok(paths)
    }

    async fn file_content(&self, path: &str) -> Result<String> {
        tokio::fs::read_to_string(self.root.join(path))
            .await
            .map_err(|e| Error::fetch(path, e.to_string()))
    }

    fn links(&self) -> &RepositoryLinks {
        &self.links
    }
}
