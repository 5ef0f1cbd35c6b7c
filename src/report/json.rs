// JSON reports

use crate::error::Result;
use crate::model::{AnalysisIssue, TableMapping};

pub fn mappings_to_json(mappings: &[TableMapping]) -> Result<String> {
    Ok(serde_json::to_string_pretty(mappings)?)
}

pub fn issues_to_json(issues: &[AnalysisIssue]) -> Result<String> {
    Ok(serde_json::to_string_pretty(issues)?)
}

pub fn mappings_from_json(json: &str) -> Result<Vec<TableMapping>> {
    Ok(serde_json::from_str(json)?)
}

pub fn issues_from_json(json: &str) -> Result<Vec<AnalysisIssue>> {
    Ok(serde_json::from_str(json)?)
}
