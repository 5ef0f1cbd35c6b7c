// Parser module for connector definitions and solution metadata
//
// Every parse is fallible and reports *what kind* of problem it hit, so the
// analyzer can turn failures into issues instead of aborting the run.

mod connector;
mod query;
mod solution;

pub use connector::{
    is_valid_connector_id, is_valid_table_name, normalize_data_type_name, parse_connector_file,
    ConnectorDefinition, ConnectorFile, TableRef,
};
pub use query::query_head;
pub use solution::{
    is_solution_data_file, is_solution_metadata_file, parse_solution_data,
    parse_solution_metadata, resolve_reference, SolutionData, SolutionMetadata,
};

use crate::model::IssueKind;
use serde_json::Value;
use std::fmt;

/// A parse that could not produce a usable result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    pub kind: IssueKind,
    pub message: String,
}

impl ParseFailure {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self {
            kind: IssueKind::MalformedDefinition,
            message: message.into(),
        }
    }
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Parse JSON text, tolerating a UTF-8 byte order mark
pub(crate) fn parse_json(text: &str) -> Result<Value, ParseFailure> {
    let text = text.trim_start_matches('\u{feff}');
    serde_json::from_str(text).map_err(|e| ParseFailure::malformed(format!("invalid JSON: {}", e)))
}

/// Non-empty trimmed string field of an object
pub(crate) fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_strips_bom() {
        let value = parse_json("\u{feff}{\"id\": \"x\"}").unwrap();
        assert_eq!(str_field(&value, "id"), Some("x"));
    }

    #[test]
    fn test_parse_json_failure_is_malformed() {
        let err = parse_json("{ not json").unwrap_err();
        assert_eq!(err.kind, IssueKind::MalformedDefinition);
        assert!(err.message.starts_with("invalid JSON"));
        assert!(err.to_string().starts_with("malformed-definition:"));
    }

    #[test]
    fn test_str_field_ignores_blank_and_non_strings() {
        let value: Value = serde_json::json!({"a": "  ", "b": 3, "c": " ok "});
        assert_eq!(str_field(&value, "a"), None);
        assert_eq!(str_field(&value, "b"), None);
        assert_eq!(str_field(&value, "c"), Some("ok"));
        assert_eq!(str_field(&value, "missing"), None);
    }
}
