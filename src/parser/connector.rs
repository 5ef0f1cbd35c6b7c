// Connector definition parsing
//
// Connector files come in two shapes: a plain definition object carrying
// `dataTypes`/`graphQueries`/`connectivityCriterias` (or at least an id/title
// with connector-only keys), or an ARM template whose resources embed the same
// definition under `connectorUiConfig`.

use super::query::{is_kql_keyword, query_head};
use super::{parse_json, str_field, ParseFailure};
use crate::model::DetectionMethod;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static TABLE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid table regex"));

static CONNECTOR_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.\-]*$").expect("valid id regex"));

/// Keys whose presence marks an object as a connector definition
const DEFINITION_KEYS: &[&str] = &[
    "dataTypes",
    "graphQueries",
    "connectivityCriterias",
    "connectivityCriteria",
];

/// Connector-only keys that, next to an `id` or `title`, also mark a definition
const CONNECTOR_MARKERS: &[&str] = &["instructionSteps", "publisher", "descriptionMarkdown"];

/// Outcome of parsing one file found among a solution's connectors
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectorFile {
    /// One or more connector definitions
    Connectors(Vec<ConnectorDefinition>),
    /// Valid JSON without any connector definition (deployment templates etc.)
    NotAConnector,
}

/// A connector definition with its table references extracted
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConnectorDefinition {
    /// Declared id, if it was a non-empty string
    pub id: Option<String>,
    pub title: Option<String>,
    pub description: String,
    /// Valid table references in extraction order, one per table name
    pub tables: Vec<TableRef>,
    /// Table references that are not plain table identifiers
    pub rejected_tables: Vec<String>,
}

/// A table named by a connector and how it was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub name: String,
    pub method: DetectionMethod,
}

impl ConnectorDefinition {
    fn from_value(value: &Value) -> Self {
        let mut def = ConnectorDefinition {
            id: str_field(value, "id").map(str::to_string),
            title: str_field(value, "title").map(str::to_string),
            description: str_field(value, "descriptionMarkdown")
                .or_else(|| str_field(value, "description"))
                .unwrap_or_default()
                .to_string(),
            ..Default::default()
        };

        for data_type in array(value, "dataTypes") {
            if let Some(name) = str_field(data_type, "name") {
                def.add_candidate(normalize_data_type_name(name), DetectionMethod::DataTypes);
            }
        }

        for graph_query in array(value, "graphQueries") {
            if let Some(head) = str_field(graph_query, "baseQuery").and_then(query_head) {
                def.add_query_head(head, DetectionMethod::GraphQueries);
            }
        }

        if def.tables.is_empty() {
            for sample in array(value, "sampleQueries") {
                if let Some(head) = str_field(sample, "query").and_then(query_head) {
                    def.add_query_head(head, DetectionMethod::SampleQueries);
                }
            }
        }

        def
    }

    fn add_query_head(&mut self, head: &str, method: DetectionMethod) {
        if !is_kql_keyword(head) {
            self.add_candidate(head, method);
        }
    }

    fn add_candidate(&mut self, name: &str, method: DetectionMethod) {
        if !is_valid_table_name(name) {
            if !self.rejected_tables.iter().any(|r| r == name) {
                self.rejected_tables.push(name.to_string());
            }
            return;
        }

        if !self.tables.iter().any(|t| t.name == name) {
            self.tables.push(TableRef {
                name: name.to_string(),
                method,
            });
        }
    }
}

/// Parse a connector file.
///
/// Invalid JSON and non-object/non-array documents are malformed; valid JSON
/// that holds no definition is [`ConnectorFile::NotAConnector`].
pub fn parse_connector_file(text: &str) -> Result<ConnectorFile, ParseFailure> {
    let value = parse_json(text)?;

    if !value.is_object() && !value.is_array() {
        return Err(ParseFailure::malformed(
            "expected a JSON object or array at the top level",
        ));
    }

    if is_definition(&value) {
        return Ok(ConnectorFile::Connectors(vec![
            ConnectorDefinition::from_value(&value),
        ]));
    }

    let mut embedded = Vec::new();
    collect_ui_configs(&value, &mut embedded);

    if embedded.is_empty() {
        Ok(ConnectorFile::NotAConnector)
    } else {
        Ok(ConnectorFile::Connectors(
            embedded.into_iter().map(ConnectorDefinition::from_value).collect(),
        ))
    }
}

/// `CommonSecurityLog (Cisco ASA)` -> `CommonSecurityLog`
pub fn normalize_data_type_name(name: &str) -> &str {
    let name = name.trim();
    let end = name
        .find(|c: char| c.is_whitespace() || c == '(')
        .unwrap_or(name.len());
    &name[..end]
}

/// Plain KQL table identifier
pub fn is_valid_table_name(name: &str) -> bool {
    TABLE_NAME.is_match(name)
}

/// Connector ids are single tokens of letters, digits, `_`, `.` and `-`
pub fn is_valid_connector_id(id: &str) -> bool {
    CONNECTOR_ID.is_match(id)
}

fn is_definition(value: &Value) -> bool {
    if !value.is_object() {
        return false;
    }
    if DEFINITION_KEYS.iter().any(|k| value.get(*k).is_some()) {
        return true;
    }
    let has_identity = str_field(value, "id").is_some() || str_field(value, "title").is_some();
    has_identity && CONNECTOR_MARKERS.iter().any(|k| value.get(*k).is_some())
}

fn collect_ui_configs<'a>(value: &'a Value, out: &mut Vec<&'a Value>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                if key == "connectorUiConfig" && child.is_object() {
                    out.push(child);
                } else {
                    collect_ui_configs(child, out);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_ui_configs(item, out);
            }
        }
        _ => {}
    }
}

fn array<'a>(value: &'a Value, key: &str) -> impl Iterator<Item = &'a Value> {
    value
        .get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}
