// Solution-level metadata parsing
//
// A solution directory carries `SolutionMetadata.json` (publisher, support
// tier) and `Data/Solution_*.json` (name, author, version and the list of
// data connector files it packages).

use super::{parse_json, str_field, ParseFailure};
use serde_json::Value;

/// Contents of `Data/Solution_*.json`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SolutionData {
    pub name: Option<String>,
    pub author: Option<String>,
    pub version: Option<String>,
    /// Raw `Data Connectors` entries as written in the file
    pub data_connectors: Vec<String>,
}

impl SolutionData {
    /// Publisher part of `Author` (`"Microsoft - support@microsoft.com"` -> `Microsoft`)
    pub fn author_name(&self) -> Option<&str> {
        self.author
            .as_deref()
            .and_then(|a| a.split(" - ").next())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Contents of `SolutionMetadata.json`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SolutionMetadata {
    pub publisher_id: Option<String>,
    pub version: Option<String>,
    pub support_tier: Option<String>,
}

pub fn parse_solution_data(text: &str) -> Result<SolutionData, ParseFailure> {
    let value = parse_json(text)?;
    if !value.is_object() {
        return Err(ParseFailure::malformed("solution data must be a JSON object"));
    }

    let data_connectors = value
        .get("Data Connectors")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Ok(SolutionData {
        name: str_field(&value, "Name").map(str::to_string),
        author: str_field(&value, "Author").map(str::to_string),
        version: str_field(&value, "Version").map(str::to_string),
        data_connectors,
    })
}

pub fn parse_solution_metadata(text: &str) -> Result<SolutionMetadata, ParseFailure> {
    let value = parse_json(text)?;
    if !value.is_object() {
        return Err(ParseFailure::malformed(
            "solution metadata must be a JSON object",
        ));
    }

    Ok(SolutionMetadata {
        publisher_id: str_field(&value, "publisherId").map(str::to_string),
        version: str_field(&value, "version").map(str::to_string),
        support_tier: value
            .get("support")
            .and_then(|s| str_field(s, "tier"))
            .map(str::to_string),
    })
}

/// `Solutions/Foo/Data/Solution_Foo.json` (file-name match is case-insensitive)
pub fn is_solution_data_file(solution_dir: &str, path: &str) -> bool {
    let Some(rest) = strip_dir(solution_dir, path) else {
        return false;
    };
    let lower = rest.to_ascii_lowercase();
    lower
        .strip_prefix("data/")
        .map(|file| !file.contains('/') && file.starts_with("solution_") && file.ends_with(".json"))
        .unwrap_or(false)
}

/// `Solutions/Foo/SolutionMetadata.json`
pub fn is_solution_metadata_file(solution_dir: &str, path: &str) -> bool {
    strip_dir(solution_dir, path)
        .map(|rest| rest.eq_ignore_ascii_case("SolutionMetadata.json"))
        .unwrap_or(false)
}

/// Resolve a `Data Connectors` entry to a repository path.
///
/// Entries may be relative to the solution (`Data Connectors/x.json`),
/// repository-relative (`Solutions/Foo/Data Connectors/x.json`) or absolute
/// paths from someone's checkout, possibly with backslashes. Template
/// placeholders resolve to `None`.
pub fn resolve_reference(solution_dir: &str, reference: &str) -> Option<String> {
    let normalized = reference.trim().replace('\\', "/");
    if normalized.is_empty() || normalized.contains("{{") || normalized.starts_with('[') {
        return None;
    }

    let dir = solution_dir.trim_matches('/');
    let lower = normalized.to_ascii_lowercase();
    let dir_lower = format!("{}/", dir.to_ascii_lowercase());

    let relative = match lower.find(&dir_lower) {
        Some(pos) if pos == 0 || lower.as_bytes()[pos - 1] == b'/' => {
            &normalized[pos + dir_lower.len()..]
        }
        _ => normalized.as_str(),
    };

    let relative = relative.trim_start_matches("./").trim_start_matches('/');
    if relative.is_empty() {
        return None;
    }

    Some(format!("{}/{}", dir, relative))
}

fn strip_dir<'a>(solution_dir: &str, path: &'a str) -> Option<&'a str> {
    path.strip_prefix(solution_dir.trim_matches('/'))
        .and_then(|rest| rest.strip_prefix('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_solution_data() {
        let data = parse_solution_data(
            r#"{
                "Name": "Cisco ASA",
                "Author": "Microsoft - support@microsoft.com",
                "Version": "3.0.0",
                "Data Connectors": [
                    "Data Connectors/CiscoASA.JSON",
                    "",
                    42
                ],
                "Workbooks": ["Workbooks/CiscoASA.json"]
            }"#,
        )
        .unwrap();

        assert_eq!(data.name.as_deref(), Some("Cisco ASA"));
        assert_eq!(data.author_name(), Some("Microsoft"));
        assert_eq!(data.version.as_deref(), Some("3.0.0"));
        assert_eq!(data.data_connectors, vec!["Data Connectors/CiscoASA.JSON"]);
    }

    #[test]
    fn test_parse_solution_data_rejects_arrays() {
        let err = parse_solution_data("[]").unwrap_err();
        assert!(err.message.contains("JSON object"));
    }

    #[test]
    fn test_parse_solution_metadata() {
        let meta = parse_solution_metadata(
            r#"{
                "publisherId": "azuresentinel",
                "offerId": "azure-sentinel-solution-ciscoasa",
                "version": "3.0.1",
                "support": {"name": "Microsoft Corporation", "tier": "Microsoft"}
            }"#,
        )
        .unwrap();

        assert_eq!(meta.publisher_id.as_deref(), Some("azuresentinel"));
        assert_eq!(meta.version.as_deref(), Some("3.0.1"));
        assert_eq!(meta.support_tier.as_deref(), Some("Microsoft"));
    }

    #[test]
    fn test_metadata_without_support() {
        let meta = parse_solution_metadata(r#"{"publisherId": "contoso"}"#).unwrap();
        assert_eq!(meta.support_tier, None);
    }

    #[test]
    fn test_solution_file_detection() {
        let dir = "Solutions/Cisco ASA";
        assert!(is_solution_data_file(dir, "Solutions/Cisco ASA/Data/Solution_CiscoASA.json"));
        assert!(is_solution_data_file(dir, "Solutions/Cisco ASA/Data/solution_ciscoasa.JSON"));
        assert!(!is_solution_data_file(dir, "Solutions/Cisco ASA/Data/system_generated.json"));
        assert!(!is_solution_data_file(dir, "Solutions/Cisco ASA/Data/old/Solution_X.json"));
        assert!(!is_solution_data_file(dir, "Solutions/Cisco ASAv2/Data/Solution_X.json"));

        assert!(is_solution_metadata_file(dir, "Solutions/Cisco ASA/SolutionMetadata.json"));
        assert!(!is_solution_metadata_file(dir, "Solutions/Cisco ASA/Package/SolutionMetadata.json"));
    }

    #[test]
    fn test_resolve_relative_reference() {
        assert_eq!(
            resolve_reference("Solutions/Foo", "Data Connectors/foo.json").as_deref(),
            Some("Solutions/Foo/Data Connectors/foo.json")
        );
        assert_eq!(
            resolve_reference("Solutions/Foo", "./Data Connectors\\foo.json").as_deref(),
            Some("Solutions/Foo/Data Connectors/foo.json")
        );
    }

    #[test]
    fn test_resolve_repository_and_absolute_reference() {
        assert_eq!(
            resolve_reference("Solutions/Foo", "Solutions/Foo/Data Connectors/foo.json").as_deref(),
            Some("Solutions/Foo/Data Connectors/foo.json")
        );
        assert_eq!(
            resolve_reference(
                "Solutions/Foo",
                "C:\\GitHub\\Azure-Sentinel\\Solutions\\Foo\\Data Connectors\\foo.json"
            )
            .as_deref(),
            Some("Solutions/Foo/Data Connectors/foo.json")
        );
    }

    #[test]
    fn test_resolve_placeholder_reference() {
        assert_eq!(resolve_reference("Solutions/Foo", "{{connectorPath}}"), None);
        assert_eq!(resolve_reference("Solutions/Foo", "  "), None);
    }
}
