// Analysis module: connector definitions in, table mappings and issues out

mod mapping;

pub use mapping::{table_counts, InsertOutcome, MappingSet};

use crate::model::{AnalysisIssue, AnalysisMetadata, IssueKind, TableMapping};
use crate::parser::{
    is_valid_connector_id, parse_connector_file, parse_solution_data, parse_solution_metadata,
    resolve_reference, ConnectorDefinition, ConnectorFile, SolutionData, SolutionMetadata,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::debug;

/// Text of a repository file, or why it could not be fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContent {
    Text(String),
    Failed(String),
}

/// A repository file handed to the analyzer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedFile {
    /// Repository path
    pub path: String,
    /// Browsable URL of the file
    pub url: String,
    pub content: FileContent,
}

impl FetchedFile {
    pub fn text(path: impl Into<String>, url: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            url: url.into(),
            content: FileContent::Text(text.into()),
        }
    }

    pub fn failed(path: impl Into<String>, url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            url: url.into(),
            content: FileContent::Failed(reason.into()),
        }
    }
}

/// Everything fetched for one solution
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SolutionBundle {
    /// Solution directory name
    pub name: String,
    /// Repository path of the solution directory
    pub path: String,
    /// Browsable URL of the solution directory
    pub url: String,
    /// `Data/Solution_*.json`
    pub solution_data: Option<FetchedFile>,
    /// `SolutionMetadata.json`
    pub solution_metadata: Option<FetchedFile>,
    /// Every blob path under the solution directory
    pub tree_paths: Vec<String>,
    /// Candidate connector files, in analysis order
    pub connector_files: Vec<FetchedFile>,
}

/// Output of one analysis run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub mappings: Vec<TableMapping>,
    pub issues: Vec<AnalysisIssue>,
    pub metadata: AnalysisMetadata,
}

/// Publisher/version/tier attached to every mapping of a solution
#[derive(Debug, Clone, PartialEq, Eq)]
struct SolutionInfo {
    publisher: String,
    version: String,
    support_tier: Option<String>,
}

/// Cross-references connector definitions against the tables they ingest
#[derive(Debug, Clone, Default)]
pub struct Analyzer;

/// Per-run mutable state
#[derive(Default)]
struct Run {
    mappings: MappingSet,
    issues: Vec<AnalysisIssue>,
    connectors: usize,
}

impl Analyzer {
    pub fn new() -> Self {
        Self
    }

    /// Analyze solutions in the given order
    pub fn analyze(&self, bundles: &[SolutionBundle]) -> AnalysisResult {
        let mut run = Run::default();

        for bundle in bundles {
            self.analyze_solution(bundle, &mut run);
        }

        let mappings = run.mappings.finish();
        let counts = table_counts(&mappings);
        let metadata = AnalysisMetadata {
            total_solutions: bundles.len(),
            total_connectors: run.connectors,
            total_tables: counts.len(),
            unique_tables: counts.values().filter(|&&c| c == 1).count(),
            total_mappings: mappings.len(),
            total_issues: run.issues.len(),
        };

        AnalysisResult {
            mappings,
            issues: run.issues,
            metadata,
        }
    }

    fn analyze_solution(&self, bundle: &SolutionBundle, run: &mut Run) {
        let data = self.solution_data(bundle, run);
        let info = self.solution_info(bundle, data.as_ref(), run);

        let referenced = self.check_references(bundle, data.as_ref(), run);

        // connector id -> file that first defined it
        let mut seen_ids: HashMap<String, String> = HashMap::new();

        for file in &bundle.connector_files {
            let text = match &file.content {
                FileContent::Text(text) => text,
                FileContent::Failed(reason) => {
                    run.issues.push(
                        AnalysisIssue::new(&bundle.name, IssueKind::FetchFailed, reason.clone())
                            .with_file(&file.path),
                    );
                    continue;
                }
            };

            let definitions = match parse_connector_file(text) {
                Ok(ConnectorFile::Connectors(defs)) => defs,
                Ok(ConnectorFile::NotAConnector) => {
                    if referenced.contains(&file.path.to_ascii_lowercase()) {
                        run.issues.push(
                            AnalysisIssue::new(
                                &bundle.name,
                                IssueKind::MalformedDefinition,
                                "referenced data connector file holds no connector definition",
                            )
                            .with_file(&file.path),
                        );
                    } else {
                        debug!(path = %file.path, "skipping non-connector file");
                    }
                    continue;
                }
                Err(failure) => {
                    run.issues.push(
                        AnalysisIssue::new(&bundle.name, failure.kind, failure.message)
                            .with_file(&file.path),
                    );
                    continue;
                }
            };

            let multiple = definitions.len() > 1;
            for (index, def) in definitions.iter().enumerate() {
                let fallback = fallback_id(&file.path, multiple.then_some(index));
                self.add_connector(bundle, &info, file, def, fallback, &mut seen_ids, run);
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn add_connector(
        &self,
        bundle: &SolutionBundle,
        info: &SolutionInfo,
        file: &FetchedFile,
        def: &ConnectorDefinition,
        fallback: String,
        seen_ids: &mut HashMap<String, String>,
        run: &mut Run,
    ) {
        run.connectors += 1;

        let connector_id = match &def.id {
            Some(id) if is_valid_connector_id(id) => id.clone(),
            Some(id) => {
                run.issues.push(
                    AnalysisIssue::new(
                        &bundle.name,
                        IssueKind::InvalidConnectorId,
                        format!("connector id '{}' is not a plain identifier", id),
                    )
                    .with_connector(id)
                    .with_file(&file.path),
                );
                id.clone()
            }
            None => {
                run.issues.push(
                    AnalysisIssue::new(
                        &bundle.name,
                        IssueKind::InvalidConnectorId,
                        format!("connector has no id; using '{}'", fallback),
                    )
                    .with_connector(&fallback)
                    .with_file(&file.path),
                );
                fallback
            }
        };

        match seen_ids.get(&connector_id) {
            Some(first) if first != &file.path => {
                run.issues.push(
                    AnalysisIssue::new(
                        &bundle.name,
                        IssueKind::DuplicateConnectorId,
                        format!("connector id '{}' is already defined in {}", connector_id, first),
                    )
                    .with_connector(&connector_id)
                    .with_file(&file.path),
                );
            }
            Some(_) => {}
            None => {
                seen_ids.insert(connector_id.clone(), file.path.clone());
            }
        }

        for rejected in &def.rejected_tables {
            run.issues.push(
                AnalysisIssue::new(
                    &bundle.name,
                    IssueKind::InvalidTableName,
                    format!("'{}' is not a valid table name", rejected),
                )
                .with_connector(&connector_id)
                .with_file(&file.path),
            );
        }

        if def.tables.is_empty() {
            run.issues.push(
                AnalysisIssue::new(
                    &bundle.name,
                    IssueKind::MissingTable,
                    "connector declares no table",
                )
                .with_connector(&connector_id)
                .with_file(&file.path),
            );
            return;
        }

        let title = def.title.clone().unwrap_or_else(|| connector_id.clone());

        for table in &def.tables {
            let record = TableMapping {
                solution: bundle.name.clone(),
                publisher: info.publisher.clone(),
                version: info.version.clone(),
                support_tier: info.support_tier.clone(),
                connector_id: connector_id.clone(),
                connector_title: title.clone(),
                connector_description: def.description.clone(),
                table_name: table.name.clone(),
                is_unique: false,
                detection_method: table.method,
                solution_url: bundle.url.clone(),
                connector_file_url: file.url.clone(),
            };

            if let InsertOutcome::Duplicate { first_origin } = run.mappings.insert(record, &file.path) {
                run.issues.push(
                    AnalysisIssue::new(
                        &bundle.name,
                        IssueKind::DuplicateMapping,
                        format!(
                            "table '{}' is already mapped to '{}' by {}",
                            table.name, connector_id, first_origin
                        ),
                    )
                    .with_connector(&connector_id)
                    .with_file(&file.path),
                );
            }
        }
    }

    fn solution_data(&self, bundle: &SolutionBundle, run: &mut Run) -> Option<SolutionData> {
        let file = bundle.solution_data.as_ref()?;
        parse_metadata_file(bundle, file, parse_solution_data, run)
    }

    fn solution_info(
        &self,
        bundle: &SolutionBundle,
        data: Option<&SolutionData>,
        run: &mut Run,
    ) -> SolutionInfo {
        let metadata: Option<SolutionMetadata> = bundle
            .solution_metadata
            .as_ref()
            .and_then(|file| parse_metadata_file(bundle, file, parse_solution_metadata, run));

        let publisher = metadata
            .as_ref()
            .and_then(|m| m.publisher_id.clone())
            .or_else(|| data.and_then(|d| d.author_name()).map(str::to_string))
            .unwrap_or_else(|| "Unknown".to_string());

        let version = data
            .and_then(|d| d.version.clone())
            .or_else(|| metadata.as_ref().and_then(|m| m.version.clone()))
            .unwrap_or_default();

        SolutionInfo {
            publisher,
            version,
            support_tier: metadata.and_then(|m| m.support_tier),
        }
    }

    /// Flag `Data Connectors` entries missing from the tree; returns the
    /// lowercased paths of the references that do exist
    fn check_references(
        &self,
        bundle: &SolutionBundle,
        data: Option<&SolutionData>,
        run: &mut Run,
    ) -> HashSet<String> {
        let Some(data) = data else {
            return HashSet::new();
        };

        let tree: HashSet<String> = bundle
            .tree_paths
            .iter()
            .map(|p| p.to_ascii_lowercase())
            .collect();
        let data_path = bundle
            .solution_data
            .as_ref()
            .map(|f| f.path.as_str())
            .unwrap_or_default();

        let mut found = HashSet::new();
        for reference in &data.data_connectors {
            let Some(resolved) = resolve_reference(&bundle.path, reference) else {
                continue;
            };
            let key = resolved.to_ascii_lowercase();
            if tree.contains(&key) {
                found.insert(key);
            } else {
                run.issues.push(
                    AnalysisIssue::new(
                        &bundle.name,
                        IssueKind::MissingConnectorFile,
                        format!("referenced data connector '{}' does not exist", reference),
                    )
                    .with_file(data_path),
                );
            }
        }
        found
    }
}

fn parse_metadata_file<T, F>(
    bundle: &SolutionBundle,
    file: &FetchedFile,
    parse: F,
    run: &mut Run,
) -> Option<T>
where
    F: Fn(&str) -> Result<T, crate::parser::ParseFailure>,
{
    let text = match &file.content {
        FileContent::Text(text) => text,
        FileContent::Failed(reason) => {
            run.issues.push(
                AnalysisIssue::new(&bundle.name, IssueKind::FetchFailed, reason.clone())
                    .with_file(&file.path),
            );
            return None;
        }
    };

    match parse(text) {
        Ok(value) => Some(value),
        Err(failure) => {
            run.issues.push(
                AnalysisIssue::new(&bundle.name, failure.kind, failure.message).with_file(&file.path),
            );
            None
        }
    }
}

/// File stem, suffixed with the definition index when a file holds several
fn fallback_id(path: &str, index: Option<usize>) -> String {
    let stem = Path::new(path)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string());
    match index {
        Some(i) => format!("{}#{}", stem, i + 1),
        None => stem,
    }
}
