//! Index pipeline.
//!
//! Lists the repository tree, fetches every solution's metadata and connector
//! files concurrently, then hands the complete set to the [`Analyzer`].
//! Fetches never overlap with analysis: each phase finishes before the next
//! one starts.

use crate::analysis::{Analyzer, FetchedFile, FileContent, SolutionBundle};
use crate::config::{AnalysisConfig, Config};
use crate::error::Result;
use crate::parser::{
    is_solution_data_file, is_solution_metadata_file, parse_solution_data, resolve_reference,
};
use crate::report::IndexSnapshot;
use crate::repository::ContentSource;
use futures::stream::{self, StreamExt};
use glob::Pattern;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, info, warn};

const CONNECTOR_DIR: &str = "data connectors/";

/// Include/exclude globs over solution names
#[derive(Debug, Clone, Default)]
pub struct SolutionFilter {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl SolutionFilter {
    pub fn new(config: &AnalysisConfig) -> Result<Self> {
        let compile = |patterns: &[String]| -> Result<Vec<Pattern>> {
            patterns.iter().map(|p| Ok(Pattern::new(p)?)).collect()
        };
        Ok(Self {
            include: compile(&config.include)?,
            exclude: compile(&config.exclude)?,
        })
    }

    pub fn matches(&self, solution: &str) -> bool {
        let included = self.include.is_empty() || self.include.iter().any(|p| p.matches(solution));
        included && !self.exclude.iter().any(|p| p.matches(solution))
    }
}

/// Files of one solution, as found in the tree
#[derive(Debug, Clone, PartialEq, Eq)]
struct SolutionPaths {
    name: String,
    dir: String,
    files: Vec<String>,
}

/// Runs one indexing pass against a content source
pub struct Indexer {
    source: Box<dyn ContentSource>,
    config: Config,
    verbose: bool,
}

impl Indexer {
    pub fn new(source: Box<dyn ContentSource>, config: Config) -> Self {
        Self {
            source,
            config,
            verbose: false,
        }
    }

    /// Show a progress bar while fetching
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub async fn run(&self) -> Result<IndexSnapshot> {
        let revision = match self.source.latest_revision().await {
            Ok(sha) => sha,
            Err(e) => {
                warn!(error = %e, "could not resolve latest revision");
                "unknown".to_string()
            }
        };
        info!(revision = %revision, "indexing {}", self.config.repository.slug());

        let root = self.config.repository.solutions_path.trim_matches('/').to_string();
        let tree = self.source.list_tree(&root).await?;
        let filter = SolutionFilter::new(&self.config.analysis)?;
        let solutions = group_by_solution(&root, &tree, &filter);
        info!(files = tree.len(), solutions = solutions.len(), "listed repository tree");

        let metadata_paths: Vec<String> = solutions
            .iter()
            .flat_map(|s| {
                s.files.iter().filter(move |p| {
                    is_solution_metadata_file(&s.dir, p) || is_solution_data_file(&s.dir, p)
                })
            })
            .cloned()
            .collect();
        let mut fetched = self.fetch_all(metadata_paths, "solution metadata").await;

        let connector_paths: Vec<String> = solutions
            .iter()
            .flat_map(|s| connector_candidates(s, &fetched))
            .collect();
        let connector_contents = self.fetch_all(connector_paths, "connector files").await;
        fetched.extend(connector_contents);

        let bundles: Vec<SolutionBundle> = solutions
            .iter()
            .map(|s| self.bundle(s, &fetched))
            .collect();

        let result = Analyzer::new().analyze(&bundles);
        info!(
            mappings = result.mappings.len(),
            issues = result.issues.len(),
            "analysis complete"
        );

        IndexSnapshot::new(result, &self.config.repository, revision)
    }

    /// Fetch paths concurrently; failures are kept as [`FileContent::Failed`]
    async fn fetch_all(&self, paths: Vec<String>, label: &str) -> HashMap<String, FileContent> {
        info!(count = paths.len(), "fetching {}", label);
        let progress = self.progress_bar(paths.len() as u64, label);

        let results: Vec<(String, FileContent)> = stream::iter(paths)
            .map(|path| async move {
                debug!(path = %path, "fetch");
                let content = match self.source.file_content(&path).await {
                    Ok(text) => FileContent::Text(text),
                    Err(e) => {
                        warn!(path = %path, error = %e, "fetch failed");
                        FileContent::Failed(e.to_string())
                    }
                };
                (path, content)
            })
            .buffer_unordered(self.config.fetch.concurrency.max(1))
            .inspect(|_| {
                if let Some(pb) = &progress {
                    pb.inc(1);
                }
            })
            .collect()
            .await;

        if let Some(pb) = progress {
            pb.finish_and_clear();
        }

        results.into_iter().collect()
    }

    fn progress_bar(&self, len: u64, label: &str) -> Option<ProgressBar> {
        if !self.verbose || len == 0 {
            return None;
        }
        let pb = ProgressBar::new(len);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb.set_message(label.to_string());
        Some(pb)
    }

    fn bundle(&self, solution: &SolutionPaths, fetched: &HashMap<String, FileContent>) -> SolutionBundle {
        let links = self.source.links();
        let to_file = |path: &String| {
            fetched.get(path).map(|content| FetchedFile {
                path: path.clone(),
                url: links.blob_url(path),
                content: content.clone(),
            })
        };

        let solution_data = solution
            .files
            .iter()
            .find(|p| is_solution_data_file(&solution.dir, p))
            .and_then(|p| to_file(p));
        let solution_metadata = solution
            .files
            .iter()
            .find(|p| is_solution_metadata_file(&solution.dir, p))
            .and_then(|p| to_file(p));

        let connector_files = connector_candidates(solution, fetched)
            .iter()
            .filter_map(|p| to_file(p))
            .collect();

        SolutionBundle {
            name: solution.name.clone(),
            path: solution.dir.clone(),
            url: links.tree_url(&solution.dir),
            solution_data,
            solution_metadata,
            tree_paths: solution.files.clone(),
            connector_files,
        }
    }
}

/// Split tree paths into solutions (sorted by name, files sorted by path)
fn group_by_solution(root: &str, paths: &[String], filter: &SolutionFilter) -> Vec<SolutionPaths> {
    let prefix = format!("{}/", root);
    let mut groups: BTreeMap<&str, Vec<String>> = BTreeMap::new();

    for path in paths {
        let Some(rest) = path.strip_prefix(&prefix) else {
            continue;
        };
        let Some((name, file)) = rest.split_once('/') else {
            continue;
        };
        if file.is_empty() || !filter.matches(name) {
            continue;
        }
        groups.entry(name).or_default().push(path.clone());
    }

    groups
        .into_iter()
        .map(|(name, mut files)| {
            files.sort();
            SolutionPaths {
                name: name.to_string(),
                dir: format!("{}{}", prefix, name),
                files,
            }
        })
        .collect()
}

/// JSON files under the solution's `Data Connectors` folder plus the files
/// its solution data references, in path order
fn connector_candidates(
    solution: &SolutionPaths,
    fetched: &HashMap<String, FileContent>,
) -> Vec<String> {
    let dir_prefix = format!("{}/", solution.dir.to_ascii_lowercase());
    let mut candidates: BTreeSet<String> = solution
        .files
        .iter()
        .filter(|p| {
            let lower = p.to_ascii_lowercase();
            lower.ends_with(".json")
                && lower
                    .strip_prefix(dir_prefix.as_str())
                    .is_some_and(|rest| rest.starts_with(CONNECTOR_DIR))
        })
        .cloned()
        .collect();

    let data_text = solution
        .files
        .iter()
        .find(|p| is_solution_data_file(&solution.dir, p))
        .and_then(|p| fetched.get(p));

    if let Some(FileContent::Text(text)) = data_text {
        if let Ok(data) = parse_solution_data(text) {
            let by_lower: HashMap<String, &String> = solution
                .files
                .iter()
                .map(|p| (p.to_ascii_lowercase(), p))
                .collect();
            for reference in &data.data_connectors {
                let resolved = resolve_reference(&solution.dir, reference)
                    .and_then(|r| by_lower.get(&r.to_ascii_lowercase()).copied());
                if let Some(path) = resolved {
                    candidates.insert(path.clone());
                }
            }
        }
    }

    candidates.into_iter().collect()
}
