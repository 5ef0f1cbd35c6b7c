// Report generation
//
// Writes the analysis records verbatim: CSV for spreadsheets, JSON for
// tooling, plus the snapshot that lets `report` rebuild both offline.

pub mod json;
pub mod snapshot;
pub mod tabular;

pub use json::{issues_from_json, issues_to_json, mappings_from_json, mappings_to_json};
pub use snapshot::{mappings_digest, IndexSnapshot, SnapshotMetadata};
pub use tabular::{write_issues_csv, write_mappings_csv};

use crate::config::OutputConfig;
use crate::error::Result;
use std::fs;
use std::path::PathBuf;
use tracing::info;

pub const MAPPINGS_CSV: &str = "mappings.csv";
pub const ISSUES_CSV: &str = "issues.csv";
pub const MAPPINGS_JSON: &str = "mappings.json";
pub const ISSUES_JSON: &str = "issues.json";
pub const INDEX_JSON: &str = "index.json";

/// Files written by one [`ReportWriter::write`] call
#[derive(Debug, Default)]
pub struct GenerationReport {
    pub files_written: Vec<PathBuf>,
}

impl GenerationReport {
    pub fn summary(&self) -> String {
        let names: Vec<_> = self
            .files_written
            .iter()
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .collect();
        format!("Wrote {} files: {}", names.len(), names.join(", "))
    }
}

/// Writes the report set selected by [`OutputConfig::format`]
pub struct ReportWriter {
    config: OutputConfig,
}

impl ReportWriter {
    pub fn new(config: OutputConfig) -> Self {
        Self { config }
    }

    pub fn write(&self, snapshot: &IndexSnapshot) -> Result<GenerationReport> {
        let mut report = GenerationReport::default();
        let dir = &self.config.directory;
        fs::create_dir_all(dir)?;

        if self.config.format.writes_csv() {
            let path = dir.join(MAPPINGS_CSV);
            write_mappings_csv(
                &snapshot.mappings,
                &path,
                self.config.show_detection_methods,
            )?;
            report.files_written.push(path);

            let path = dir.join(ISSUES_CSV);
            if write_issues_csv(&snapshot.issues, &path)? {
                report.files_written.push(path);
            } else if path.exists() {
                // left over from an earlier run that had issues
                fs::remove_file(&path)?;
            }
        }

        if self.config.format.writes_json() {
            let path = dir.join(MAPPINGS_JSON);
            fs::write(&path, mappings_to_json(&snapshot.mappings)?)?;
            report.files_written.push(path);

            let path = dir.join(ISSUES_JSON);
            fs::write(&path, issues_to_json(&snapshot.issues)?)?;
            report.files_written.push(path);

            let path = dir.join(INDEX_JSON);
            snapshot.save(&path)?;
            report.files_written.push(path);
        }

        info!(directory = %dir.display(), files = report.files_written.len(), "reports written");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::AnalysisResult;
    use crate::config::{OutputFormat, RepositoryConfig};
    use crate::model::{AnalysisIssue, IssueKind};
    use tempfile::TempDir;

    fn snapshot(with_issue: bool) -> IndexSnapshot {
        let mut result = AnalysisResult::default();
        if with_issue {
            result
                .issues
                .push(AnalysisIssue::new("Foo", IssueKind::MissingTable, "no tables"));
        }
        IndexSnapshot::new(result, &RepositoryConfig::default(), "abc".to_string()).unwrap()
    }

    fn writer(dir: &TempDir, format: OutputFormat) -> ReportWriter {
        ReportWriter::new(OutputConfig {
            directory: dir.path().join("out"),
            format,
            show_detection_methods: false,
        })
    }

    #[test]
    fn test_write_all_formats() {
        let dir = TempDir::new().unwrap();
        let report = writer(&dir, OutputFormat::All).write(&snapshot(true)).unwrap();

        assert_eq!(report.files_written.len(), 5);
        for name in [MAPPINGS_CSV, ISSUES_CSV, MAPPINGS_JSON, ISSUES_JSON, INDEX_JSON] {
            assert!(dir.path().join("out").join(name).exists(), "missing {}", name);
        }
        assert!(report.summary().starts_with("Wrote 5 files"));
    }

    #[test]
    fn test_csv_only_without_issues() {
        let dir = TempDir::new().unwrap();
        let report = writer(&dir, OutputFormat::Csv).write(&snapshot(false)).unwrap();

        assert_eq!(report.files_written, vec![dir.path().join("out").join(MAPPINGS_CSV)]);
        assert!(!dir.path().join("out").join(INDEX_JSON).exists());
    }

    #[test]
    fn test_clean_run_removes_old_issues_csv() {
        let dir = TempDir::new().unwrap();
        let issues = dir.path().join("out").join(ISSUES_CSV);

        writer(&dir, OutputFormat::Csv).write(&snapshot(true)).unwrap();
        assert!(issues.exists());

        writer(&dir, OutputFormat::Csv).write(&snapshot(false)).unwrap();
        assert!(!issues.exists());
    }

    #[test]
    fn test_json_only() {
        let dir = TempDir::new().unwrap();
        let report = writer(&dir, OutputFormat::Json).write(&snapshot(false)).unwrap();

        assert_eq!(report.files_written.len(), 3);
        let loaded = IndexSnapshot::load(&dir.path().join("out").join(INDEX_JSON)).unwrap();
        assert_eq!(loaded.metadata.commit_sha, "abc");
    }
}
