//! sentinel-index - index connector-to-table mappings of Sentinel solutions
//!
//! Reads solution folders from a GitHub repository (or a local checkout),
//! maps every data connector to the tables it ingests and reports the
//! inconsistencies it finds along the way.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod error;
pub mod indexer;
pub mod model;
pub mod parser;
pub mod report;
pub mod repository;

// Re-export main types
pub use analysis::{AnalysisResult, Analyzer, FetchedFile, FileContent, SolutionBundle};
pub use config::Config;
pub use error::{Error, Result};
pub use indexer::Indexer;
pub use model::{AnalysisIssue, AnalysisMetadata, DetectionMethod, IssueKind, TableMapping};
pub use report::{IndexSnapshot, ReportWriter};
pub use repository::{ContentSource, GitHubClient, LocalRepository, RepositoryLinks};
