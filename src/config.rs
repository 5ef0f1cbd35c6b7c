use crate::error::{Error, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variables that override the repository settings
pub const ENV_REPO_OWNER: &str = "SENTINEL_REPO_OWNER";
pub const ENV_REPO_NAME: &str = "SENTINEL_REPO_NAME";
pub const ENV_REPO_BRANCH: &str = "SENTINEL_REPO_BRANCH";
pub const ENV_SOLUTIONS_PATH: &str = "SENTINEL_SOLUTIONS_PATH";

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "sentinel-index.toml";

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub repository: RepositoryConfig,
    pub fetch: FetchConfig,
    pub analysis: AnalysisConfig,
    pub output: OutputConfig,
}

/// Which repository holds the solutions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    pub owner: String,
    pub name: String,
    pub branch: String,
    pub solutions_path: String,
}

/// Network settings for the GitHub client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub api_base: String,
    pub raw_base: String,
    pub concurrency: usize,
    pub timeout_secs: u64,
}

/// Solution selection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Solution-name globs to keep; empty keeps every solution
    pub include: Vec<String>,
    /// Solution-name globs to drop
    pub exclude: Vec<String>,
}

/// Output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: PathBuf,
    pub format: OutputFormat,
    pub show_detection_methods: bool,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Csv,
    Json,
    #[default]
    All,
}

impl OutputFormat {
    pub fn writes_csv(self) -> bool {
        matches!(self, OutputFormat::Csv | OutputFormat::All)
    }

    pub fn writes_json(self) -> bool {
        matches!(self, OutputFormat::Json | OutputFormat::All)
    }
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            owner: "Azure".to_string(),
            name: "Azure-Sentinel".to_string(),
            branch: "master".to_string(),
            solutions_path: "Solutions".to_string(),
        }
    }
}

impl RepositoryConfig {
    /// `owner/name` slug
    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.github.com".to_string(),
            raw_base: "https://raw.githubusercontent.com".to_string(),
            concurrency: 16,
            timeout_secs: 30,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./sentinel-index-out"),
            format: OutputFormat::default(),
            show_detection_methods: false,
        }
    }
}

/// Values supplied on the command line; `None`/empty leaves the config untouched
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub output: Option<PathBuf>,
    pub format: Option<OutputFormat>,
    pub show_detection_methods: bool,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub concurrency: Option<usize>,
    pub branch: Option<String>,
}

impl Config {
    /// Load config from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from file, or defaults when the file does not exist.
    /// A file that exists but fails to parse or validate is an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Apply `SENTINEL_*` overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any key lookup (empty values are ignored)
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(owner) = get(ENV_REPO_OWNER) {
            self.repository.owner = owner;
        }
        if let Some(name) = get(ENV_REPO_NAME) {
            self.repository.name = name;
        }
        if let Some(branch) = get(ENV_REPO_BRANCH) {
            self.repository.branch = branch;
        }
        if let Some(path) = get(ENV_SOLUTIONS_PATH) {
            self.repository.solutions_path = path;
        }
    }

    /// Merge CLI arguments into config (CLI takes precedence)
    pub fn merge_cli(&mut self, cli: CliOverrides) {
        if let Some(out) = cli.output {
            self.output.directory = out;
        }

        if let Some(fmt) = cli.format {
            self.output.format = fmt;
        }

        if cli.show_detection_methods {
            self.output.show_detection_methods = true;
        }

        if !cli.include.is_empty() {
            self.analysis.include = cli.include;
        }

        if !cli.exclude.is_empty() {
            self.analysis.exclude.extend(cli.exclude);
        }

        if let Some(c) = cli.concurrency {
            self.fetch.concurrency = c;
        }

        if let Some(branch) = cli.branch {
            self.repository.branch = branch;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let repo = &self.repository;
        if repo.owner.trim().is_empty() || repo.name.trim().is_empty() {
            return Err(Error::config_validation(
                "repository owner and name must not be empty",
            ));
        }

        if repo.branch.trim().is_empty() {
            return Err(Error::config_validation("repository branch must not be empty"));
        }

        if repo.solutions_path.trim_matches('/').is_empty() {
            return Err(Error::config_validation("solutions_path must not be empty"));
        }

        if self.fetch.concurrency == 0 {
            return Err(Error::config_validation("concurrency must be at least 1"));
        }

        if self.fetch.concurrency > 64 {
            return Err(Error::config_validation("concurrency cannot exceed 64"));
        }

        for pattern in self.analysis.include.iter().chain(&self.analysis.exclude) {
            glob::Pattern::new(pattern)?;
        }

        Ok(())
    }
}
