// Pre-built index snapshot
//
// A snapshot is the full analysis result plus provenance, written as one JSON
// document so reports can be regenerated without touching the network.

use crate::analysis::AnalysisResult;
use crate::config::RepositoryConfig;
use crate::error::Result;
use crate::model::{AnalysisIssue, AnalysisMetadata, TableMapping};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub mappings: Vec<TableMapping>,
    pub issues: Vec<AnalysisIssue>,
    pub metadata: SnapshotMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMetadata {
    #[serde(flatten)]
    pub analysis: AnalysisMetadata,
    /// `owner/name`
    pub repository: String,
    pub branch: String,
    pub commit_sha: String,
    pub pre_built_at: DateTime<Utc>,
    /// Version of the tool that built the snapshot
    pub version: String,
    /// SHA-256 of the serialized mappings
    pub mappings_digest: String,
}

impl IndexSnapshot {
    /// Wrap an analysis result with provenance
    pub fn new(result: AnalysisResult, repo: &RepositoryConfig, commit_sha: String) -> Result<Self> {
        let mappings_digest = mappings_digest(&result.mappings)?;
        Ok(Self {
            mappings: result.mappings,
            issues: result.issues,
            metadata: SnapshotMetadata {
                analysis: result.metadata,
                repository: repo.slug(),
                branch: repo.branch.clone(),
                commit_sha,
                pre_built_at: Utc::now(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                mappings_digest,
            },
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn summary(&self) -> String {
        let m = &self.metadata.analysis;
        format!(
            "{} solutions, {} connectors, {} tables ({} unique), {} mappings, {} issues",
            m.total_solutions,
            m.total_connectors,
            m.total_tables,
            m.unique_tables,
            m.total_mappings,
            m.total_issues
        )
    }
}

/// Hex SHA-256 of the compact JSON encoding of `mappings`
pub fn mappings_digest(mappings: &[TableMapping]) -> Result<String> {
    let bytes = serde_json::to_vec(mappings)?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}
