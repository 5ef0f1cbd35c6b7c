// CSV reports

use crate::error::Result;
use crate::model::{AnalysisIssue, TableMapping};
use std::io::Write;
use std::path::Path;

/// Header row of the mappings CSV
pub fn mapping_headers(show_detection_methods: bool) -> Vec<&'static str> {
    let mut headers = vec![
        "Solution",
        "Publisher",
        "Version",
        "Support Tier",
        "Connector ID",
        "Connector Title",
        "Description",
        "Table Name",
        "Is Unique",
    ];
    if show_detection_methods {
        headers.push("Detection Method");
    }
    headers.push("Solution GitHub URL");
    headers.push("Connector File URL");
    headers
}

pub const ISSUE_HEADERS: [&str; 5] = ["Solution", "Connector ID", "Issue Type", "Message", "File Path"];

/// Write mappings as CSV to any writer
pub fn write_mappings<W: Write>(
    mappings: &[TableMapping],
    out: W,
    show_detection_methods: bool,
) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(mapping_headers(show_detection_methods))?;

    for m in mappings {
        let description = m.connector_description.replace("\r\n", "<br>").replace('\n', "<br>");
        let mut row = vec![
            m.solution.as_str(),
            m.publisher.as_str(),
            m.version.as_str(),
            m.support_tier.as_deref().unwrap_or(""),
            m.connector_id.as_str(),
            m.connector_title.as_str(),
            description.as_str(),
            m.table_name.as_str(),
            if m.is_unique { "Yes" } else { "No" },
        ];
        if show_detection_methods {
            row.push(m.detection_method.as_str());
        }
        row.push(m.solution_url.as_str());
        row.push(m.connector_file_url.as_str());
        writer.write_record(&row)?;
    }

    writer.flush()?;
    Ok(())
}

/// Write issues as CSV to any writer
pub fn write_issues<W: Write>(issues: &[AnalysisIssue], out: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(ISSUE_HEADERS)?;

    for issue in issues {
        writer.write_record([
            issue.solution.as_str(),
            issue.connector_id.as_deref().unwrap_or(""),
            issue.issue_type.as_str(),
            issue.message.as_str(),
            issue.file_path.as_deref().unwrap_or(""),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Write `mappings.csv`-style output to a file
pub fn write_mappings_csv(
    mappings: &[TableMapping],
    path: &Path,
    show_detection_methods: bool,
) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_mappings(mappings, file, show_detection_methods)
}

/// Write an issues CSV file; returns `false` without touching the disk when
/// there is nothing to report
pub fn write_issues_csv(issues: &[AnalysisIssue], path: &Path) -> Result<bool> {
    if issues.is_empty() {
        return Ok(false);
    }
    let file = std::fs::File::create(path)?;
    write_issues(issues, file)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DetectionMethod, IssueKind};
    use tempfile::TempDir;

    fn mapping() -> TableMapping {
        TableMapping {
            solution: "Cisco ASA".to_string(),
            publisher: "azuresentinel".to_string(),
            version: "3.0.0".to_string(),
            support_tier: None,
            connector_id: "CiscoASA".to_string(),
            connector_title: "Cisco ASA, via Legacy Agent".to_string(),
            connector_description: "First line\nSecond line".to_string(),
            table_name: "CommonSecurityLog".to_string(),
            is_unique: true,
            detection_method: DetectionMethod::GraphQueries,
            solution_url: "https://github.com/s".to_string(),
            connector_file_url: "https://github.com/c".to_string(),
        }
    }

    fn render(mappings: &[TableMapping], show: bool) -> String {
        let mut buf = Vec::new();
        write_mappings(mappings, &mut buf, show).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_mappings_csv_columns() {
        let out = render(&[mapping()], false);
        let mut lines = out.lines();

        assert_eq!(
            lines.next().unwrap(),
            "Solution,Publisher,Version,Support Tier,Connector ID,Connector Title,Description,Table Name,Is Unique,Solution GitHub URL,Connector File URL"
        );
        assert_eq!(
            lines.next().unwrap(),
            "Cisco ASA,azuresentinel,3.0.0,,CiscoASA,\"Cisco ASA, via Legacy Agent\",First line<br>Second line,CommonSecurityLog,Yes,https://github.com/s,https://github.com/c"
        );
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_mappings_csv_detection_method_column() {
        let out = render(&[mapping()], true);
        let header = out.lines().next().unwrap();
        assert!(header.contains("Is Unique,Detection Method,Solution GitHub URL"));
        assert!(out.lines().nth(1).unwrap().contains(",Yes,graphQueries,"));
    }

    #[test]
    fn test_mappings_csv_can_be_read_back() {
        let mut not_unique = mapping();
        not_unique.is_unique = false;
        not_unique.support_tier = Some("Microsoft".to_string());
        let out = render(&[not_unique], false);

        let mut reader = csv::Reader::from_reader(out.as_bytes());
        let record = reader.records().next().unwrap().unwrap();
        assert_eq!(record.get(3), Some("Microsoft"));
        assert_eq!(record.get(8), Some("No"));
    }

    #[test]
    fn test_issues_csv() {
        let issues = vec![
            AnalysisIssue::new("Foo", IssueKind::MissingTable, "connector declares no table")
                .with_connector("FooConnector"),
            AnalysisIssue::new("Bar", IssueKind::FetchFailed, "HTTP 404").with_file("Solutions/Bar/x.json"),
        ];

        let mut buf = Vec::new();
        write_issues(&issues, &mut buf).unwrap();
        let out = String::from_utf8(buf).unwrap();
        let lines: Vec<_> = out.lines().collect();

        assert_eq!(lines[0], "Solution,Connector ID,Issue Type,Message,File Path");
        assert_eq!(lines[1], "Foo,FooConnector,missing-table,connector declares no table,");
        assert_eq!(lines[2], "Bar,,fetch-failed,HTTP 404,Solutions/Bar/x.json");
    }

    #[test]
    fn test_empty_issues_write_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("issues.csv");
        assert!(!write_issues_csv(&[], &path).unwrap());
        assert!(!path.exists());
    }

    #[test]
    fn test_write_mappings_csv_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mappings.csv");
        write_mappings_csv(&[mapping()], &path, false).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
    }
}
