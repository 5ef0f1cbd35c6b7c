//! CLI argument parsing

use crate::config::OutputFormat;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Index connector-to-table mappings of Microsoft Sentinel solutions
#[derive(Parser, Debug)]
#[command(name = "sentinel-index")]
#[command(about = "Index connector-to-table mappings of Microsoft Sentinel solutions")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

impl Args {
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Index solutions and write mapping/issue reports
    Analyze {
        /// Read a local checkout instead of the GitHub API
        #[arg(long)]
        local: Option<PathBuf>,

        /// Config file path
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,

        /// Add the Detection Method column to mappings.csv
        #[arg(long)]
        show_detection_methods: bool,

        /// Only index solutions matching this glob (can be repeated)
        #[arg(long = "solution")]
        solutions: Vec<String>,

        /// Skip solutions matching this glob (can be repeated)
        #[arg(long)]
        exclude: Vec<String>,

        /// Maximum concurrent fetches
        #[arg(long)]
        concurrency: Option<usize>,

        /// Branch to index
        #[arg(long)]
        branch: Option<String>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Regenerate reports from a saved index.json
    Report {
        /// Path to a snapshot written by `analyze`
        #[arg(long)]
        index: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = "./sentinel-index-out")]
        output: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
        format: OutputFormat,

        /// Add the Detection Method column to mappings.csv
        #[arg(long)]
        show_detection_methods: bool,
    },

    /// Show version information
    Version,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_analyze_defaults() {
        let args = Args::try_parse_from(["sentinel-index", "analyze"]).unwrap();
        match args.command {
            Command::Analyze {
                local,
                output,
                format,
                solutions,
                verbose,
                ..
            } => {
                assert!(local.is_none());
                assert!(output.is_none());
                assert!(format.is_none());
                assert!(solutions.is_empty());
                assert!(!verbose);
            }
            _ => panic!("expected analyze"),
        }
    }

    #[test]
    fn test_parse_analyze_full() {
        let args = Args::try_parse_from([
            "sentinel-index",
            "analyze",
            "--local",
            "/repos/Azure-Sentinel",
            "-o",
            "/tmp/out",
            "--format",
            "json",
            "--solution",
            "Cisco*",
            "--solution",
            "Okta*",
            "--exclude",
            "Cisco Legacy",
            "--concurrency",
            "4",
            "--show-detection-methods",
            "-v",
        ])
        .unwrap();

        match args.command {
            Command::Analyze {
                local,
                output,
                format,
                solutions,
                exclude,
                concurrency,
                show_detection_methods,
                verbose,
                ..
            } => {
                assert_eq!(local, Some(PathBuf::from("/repos/Azure-Sentinel")));
                assert_eq!(output, Some(PathBuf::from("/tmp/out")));
                assert_eq!(format, Some(OutputFormat::Json));
                assert_eq!(solutions, vec!["Cisco*", "Okta*"]);
                assert_eq!(exclude, vec!["Cisco Legacy"]);
                assert_eq!(concurrency, Some(4));
                assert!(show_detection_methods);
                assert!(verbose);
            }
            _ => panic!("expected analyze"),
        }
    }

    #[test]
    fn test_parse_report() {
        let args =
            Args::try_parse_from(["sentinel-index", "report", "--index", "out/index.json"]).unwrap();
        match args.command {
            Command::Report { index, output, format, .. } => {
                assert_eq!(index, PathBuf::from("out/index.json"));
                assert_eq!(output, PathBuf::from("./sentinel-index-out"));
                assert_eq!(format, OutputFormat::Csv);
            }
            _ => panic!("expected report"),
        }
    }

    #[test]
    fn test_unknown_format_is_rejected() {
        assert!(Args::try_parse_from(["sentinel-index", "analyze", "--format", "xml"]).is_err());
        assert!(Args::try_parse_from([
            "sentinel-index",
            "report",
            "--index",
            "index.json",
            "--format",
            "html"
        ])
        .is_err());
    }

    #[test]
    fn test_report_requires_index() {
        assert!(Args::try_parse_from(["sentinel-index", "report"]).is_err());
    }

    #[test]
    fn test_parse_version() {
        let args = Args::try_parse_from(["sentinel-index", "version"]).unwrap();
        assert!(matches!(args.command, Command::Version));
    }
}
