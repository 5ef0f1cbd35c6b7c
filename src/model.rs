// Record types produced by an analysis run
//
// Mappings and issues are plain values assembled once per run and serialized
// verbatim into the CSV/JSON reports.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One `(solution, connector, table)` association
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TableMapping {
    pub solution: String,
    pub publisher: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub support_tier: Option<String>,
    pub connector_id: String,
    pub connector_title: String,
    pub connector_description: String,
    pub table_name: String,
    /// True when no other mapping in the run references this table
    pub is_unique: bool,
    pub detection_method: DetectionMethod,
    pub solution_url: String,
    pub connector_file_url: String,
}

impl TableMapping {
    /// Dedup key of the record
    pub fn key(&self) -> (&str, &str, &str) {
        (&self.solution, &self.connector_id, &self.table_name)
    }
}

/// How a table reference was found inside a connector definition
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum DetectionMethod {
    /// `dataTypes[].name`
    DataTypes,
    /// `graphQueries[].baseQuery`
    GraphQueries,
    /// `sampleQueries[].query`, used only as a fallback
    SampleQueries,
}

impl DetectionMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            DetectionMethod::DataTypes => "dataTypes",
            DetectionMethod::GraphQueries => "graphQueries",
            DetectionMethod::SampleQueries => "sampleQueries",
        }
    }
}

impl fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category of a detected problem
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub enum IssueKind {
    MissingTable,
    MalformedDefinition,
    InvalidConnectorId,
    InvalidTableName,
    DuplicateConnectorId,
    DuplicateMapping,
    MissingConnectorFile,
    FetchFailed,
}

impl IssueKind {
    pub fn as_str(self) -> &'static str {
        match self {
            IssueKind::MissingTable => "missing-table",
            IssueKind::MalformedDefinition => "malformed-definition",
            IssueKind::InvalidConnectorId => "invalid-connector-id",
            IssueKind::InvalidTableName => "invalid-table-name",
            IssueKind::DuplicateConnectorId => "duplicate-connector-id",
            IssueKind::DuplicateMapping => "duplicate-mapping",
            IssueKind::MissingConnectorFile => "missing-connector-file",
            IssueKind::FetchFailed => "fetch-failed",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structural or referential problem found during analysis
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisIssue {
    pub solution: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connector_id: Option<String>,
    pub issue_type: IssueKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
}

impl AnalysisIssue {
    pub fn new(solution: &str, issue_type: IssueKind, message: impl Into<String>) -> Self {
        Self {
            solution: solution.to_string(),
            connector_id: None,
            issue_type,
            message: message.into(),
            file_path: None,
        }
    }

    pub fn with_connector(mut self, connector_id: &str) -> Self {
        self.connector_id = Some(connector_id.to_string());
        self
    }

    pub fn with_file(mut self, file_path: &str) -> Self {
        self.file_path = Some(file_path.to_string());
        self
    }
}

/// Totals for one analysis run
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisMetadata {
    pub total_solutions: usize,
    pub total_connectors: usize,
    pub total_tables: usize,
    pub unique_tables: usize,
    pub total_mappings: usize,
    pub total_issues: usize,
}
