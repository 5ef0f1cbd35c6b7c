//! CLI module for sentinel-index

mod args;

pub use args::{Args, Command};

use crate::config::{CliOverrides, Config, OutputConfig, DEFAULT_CONFIG_FILE};
use crate::error::{Error, Result};
use crate::indexer::Indexer;
use crate::report::{IndexSnapshot, ReportWriter};
use crate::repository::{ContentSource, GitHubClient, LocalRepository};
use std::io::IsTerminal;
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Run the CLI application
pub fn run() -> ExitCode {
    let args = Args::parse_args();

    match execute(args) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Install the stderr subscriber; `RUST_LOG` wins over `verbose`
pub fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(std::io::stderr().is_terminal())
                .with_writer(std::io::stderr),
        )
        .try_init();
}

fn execute(args: Args) -> Result<()> {
    match args.command {
        Command::Analyze {
            local,
            config,
            output,
            format,
            show_detection_methods,
            solutions,
            exclude,
            concurrency,
            branch,
            verbose,
        } => {
            init_logging(verbose);

            // An explicit config must exist; the default one may be absent
            let mut cfg = match &config {
                Some(path) => Config::load(path)?,
                None => Config::load_or_default(Path::new(DEFAULT_CONFIG_FILE))?,
            };
            cfg.apply_env();
            cfg.merge_cli(CliOverrides {
                output,
                format,
                show_detection_methods,
                include: solutions,
                exclude,
                concurrency,
                branch,
            });
            cfg.validate()?;

            if verbose {
                println!("Repository: {} ({})", cfg.repository.slug(), cfg.repository.branch);
                println!("Solutions path: {}", cfg.repository.solutions_path);
                println!("Output: {}", cfg.output.directory.display());
                println!("Format: {:?}", cfg.output.format);
                if !cfg.analysis.include.is_empty() {
                    println!("Include: {:?}", cfg.analysis.include);
                }
                if !cfg.analysis.exclude.is_empty() {
                    println!("Exclude: {:?}", cfg.analysis.exclude);
                }
            }

            let source: Box<dyn ContentSource> = match local {
                Some(dir) => Box::new(LocalRepository::new(dir, &cfg.repository)?),
                None => Box::new(GitHubClient::new(cfg.repository.clone(), cfg.fetch.clone())?),
            };

            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            let indexer = Indexer::new(source, cfg.clone()).with_verbose(verbose);
            let snapshot = runtime.block_on(indexer.run())?;

            println!("Indexed {}", snapshot.summary());

            let report = ReportWriter::new(cfg.output.clone()).write(&snapshot)?;
            println!("{}", report.summary());
            println!("Reports written to: {}", cfg.output.directory.display());

            Ok(())
        }

        Command::Report {
            index,
            output,
            format,
            show_detection_methods,
        } => {
            init_logging(false);

            if !index.exists() {
                return Err(Error::PathNotFound(index));
            }

            let snapshot = IndexSnapshot::load(&index)?;
            println!(
                "Loaded index of {} at {} ({})",
                snapshot.metadata.repository,
                snapshot.metadata.commit_sha,
                snapshot.summary()
            );

            let writer = ReportWriter::new(OutputConfig {
                directory: output.clone(),
                format,
                show_detection_methods,
            });
            let report = writer.write(&snapshot)?;
            println!("{}", report.summary());
            println!("Reports written to: {}", output.display());

            Ok(())
        }

        Command::Version => {
            println!("sentinel-index {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
