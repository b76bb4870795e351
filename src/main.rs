//! @ai:module:intent CLI entry point for finding and linting code annotations
//! @ai:module:layer presentation
//! @ai:module:public_api main
//! @ai:module:depends_on config, search, docstring, validator, report, output

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use code_annotations::{
    check_coverage, group_by_key, output, require_coverage_target, AnnotationConfig,
    ConfigOverrides, DocstringSearch, ManifestSource, OutputFormat, SearchResults, StaticSearch,
    Validator, ValidatorTrait, YamlReporter, YamlReporterTrait, DEFAULT_CONFIG_FILE,
};
use std::fmt::Display;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "code-annotations")]
#[command(author, version, about = "Find and lint annotations embedded in code comments")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct CommonArgs {
    /// Path to the configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config_file: PathBuf,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Search source files for annotations in comments
    StaticFindAnnotations {
        #[command(flatten)]
        common: CommonArgs,

        /// Directory or file to search, overrides the configuration file
        #[arg(long)]
        source_path: Option<PathBuf>,

        /// Directory to write the report into, overrides the configuration file
        #[arg(long)]
        report_path: Option<PathBuf>,

        /// Skip linting the found annotations
        #[arg(long)]
        no_lint: bool,

        /// Skip writing the YAML report
        #[arg(long)]
        no_report: bool,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: Format,
    },

    /// Search docstrings listed in an introspection manifest
    DocstringFindAnnotations {
        #[command(flatten)]
        common: CommonArgs,

        /// YAML or JSON manifest of object docstrings
        #[arg(long)]
        manifest: PathBuf,

        /// Directory to write the report into, overrides the configuration file
        #[arg(long)]
        report_path: Option<PathBuf>,

        /// Lint the found annotations
        #[arg(long)]
        lint: bool,

        /// Write the YAML report
        #[arg(long)]
        report: bool,

        /// Check annotation coverage against the configured target
        #[arg(long)]
        coverage: bool,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: Format,
    },

    /// Print annotation units indexed by the payload of one token
    GroupBy {
        #[command(flatten)]
        common: CommonArgs,

        /// Token whose payload keys the index
        #[arg(long)]
        key: String,

        /// Directory or file to search, overrides the configuration file
        #[arg(long)]
        source_path: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
    JsonPretty,
}

impl From<Format> for OutputFormat {
    fn from(f: Format) -> Self {
        match f {
            Format::Text => OutputFormat::Text,
            Format::Json => OutputFormat::Json,
            Format::JsonPretty => OutputFormat::JsonPretty,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli.command) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

/// @ai:intent Install the log subscriber for the configured verbosity, letting RUST_LOG win
fn init_tracing(config: &AnnotationConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_filter()));

    // A subscriber may already be installed when run() is called more than once.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Progress lines go to stderr when stdout carries a JSON payload.
fn status(format: OutputFormat, message: impl Display) {
    if format.is_json() {
        eprintln!("{}", message);
    } else {
        println!("{}", message);
    }
}

fn run(command: Commands) -> Result<ExitCode> {
    match command {
        Commands::StaticFindAnnotations {
            common,
            source_path,
            report_path,
            no_lint,
            no_report,
            format,
        } => {
            let start = Instant::now();
            let format = format.into();
            let config = load_config(&common, source_path, report_path)?;
            let mut results = StaticSearch::new(&config)?
                .search()
                .context("Static search failed")?;

            if no_lint {
                println!("{}", output::format_search_results(&results, format));
            } else if !lint(&config, &results, format) {
                return Ok(ExitCode::from(1));
            }

            if !no_report {
                write_report(&config, &mut results, format)?;
            }

            print_summary(&results, format, start);
            Ok(ExitCode::SUCCESS)
        }

        Commands::DocstringFindAnnotations {
            common,
            manifest,
            report_path,
            lint: run_lint,
            report,
            coverage,
            format,
        } => {
            if !(run_lint || report || coverage) {
                bail!("At least one of --lint, --report, or --coverage must be selected.");
            }

            let start = Instant::now();
            let format = format.into();
            let config = load_config(&common, None, report_path)?;
            let coverage_target = if coverage {
                Some(require_coverage_target(config.coverage_target)?)
            } else {
                None
            };

            let source = ManifestSource::new(&manifest);
            let mut outcome = DocstringSearch::new(&config.schema)
                .search(&source)
                .with_context(|| format!("Docstring search of {} failed", manifest.display()))?;

            if run_lint && !lint(&config, &outcome.results, format) {
                return Ok(ExitCode::from(1));
            }

            if let Some(target) = coverage_target {
                let coverage_report = check_coverage(&outcome, target);
                println!("{}", output::format_coverage(&coverage_report, format));
                if !coverage_report.passed() {
                    return Ok(ExitCode::from(1));
                }
            }

            if report {
                write_report(&config, &mut outcome.results, format)?;
            }

            print_summary(&outcome.results, format, start);
            Ok(ExitCode::SUCCESS)
        }

        Commands::GroupBy {
            common,
            key,
            source_path,
        } => {
            let config = load_config(&common, source_path, None)?;
            let results = StaticSearch::new(&config)?
                .search()
                .context("Static search failed")?;

            println!("{}", output::to_json(&group_by_key(&results, &key), true));
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// @ai:intent Load configuration, then start logging at its verbosity
/// @ai:effects fs:read, log
fn load_config(
    common: &CommonArgs,
    source_path: Option<PathBuf>,
    report_path: Option<PathBuf>,
) -> Result<AnnotationConfig> {
    let overrides = ConfigOverrides {
        source_path,
        report_path,
        verbosity: common.verbose,
    };
    let config = AnnotationConfig::load(&common.config_file, overrides).with_context(|| {
        format!(
            "Could not load configuration from {}",
            common.config_file.display()
        )
    })?;

    init_tracing(&config);
    config.log_summary();
    Ok(config)
}

/// @ai:intent Validate results and print the outcome, returning whether linting passed
fn lint(config: &AnnotationConfig, results: &SearchResults, format: OutputFormat) -> bool {
    status(format, "Performing linting checks...");
    let lint = Validator::new(&config.schema).check_results(results);
    println!("{}", output::format_lint_result(&lint, format));
    lint.passed()
}

/// @ai:effects fs:write
fn write_report(
    config: &AnnotationConfig,
    results: &mut SearchResults,
    format: OutputFormat,
) -> Result<()> {
    results.assign_report_group_ids(&config.schema);
    let path = YamlReporter::new()
        .generate(results, &config.report_path)
        .context("Failed to write report")?;
    status(format, format!("Report written to {}", path.display()));
    Ok(())
}

fn print_summary(results: &SearchResults, format: OutputFormat, start: Instant) {
    status(
        format,
        format!(
            "Search found {} annotations in {:.2?}.",
            results.annotation_count(),
            start.elapsed()
        ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use code_annotations::Error;
    use std::fs;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, extra: &str) -> PathBuf {
        let path = dir.path().join(".annotations");
        fs::write(
            &path,
            format!(
                "source_path: .\nreport_path: reports\n{}annotations:\n    \".. no_pii::\":\nextensions:\n    python:\n",
                extra
            ),
        )
        .unwrap();
        path
    }

    fn parse(args: &[&str]) -> Commands {
        Cli::try_parse_from(std::iter::once("code-annotations").chain(args.iter().copied()))
            .unwrap()
            .command
    }

    #[test]
    fn test_missing_coverage_target_fails_before_reading_manifest() {
        let temp = TempDir::new().unwrap();
        let config = write_config(&temp, "");
        let manifest = temp.path().join("missing.yaml");

        let err = run(parse(&[
            "docstring-find-annotations",
            "--config-file",
            config.to_str().unwrap(),
            "--manifest",
            manifest.to_str().unwrap(),
            "--lint",
            "--coverage",
        ]))
        .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::CoverageTargetMissing)
        ));
    }

    #[test]
    fn test_docstring_command_requires_an_action() {
        let temp = TempDir::new().unwrap();
        let config = write_config(&temp, "coverage_target: 50\n");

        let err = run(parse(&[
            "docstring-find-annotations",
            "--config-file",
            config.to_str().unwrap(),
            "--manifest",
            "manifest.yaml",
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("At least one of"));
    }

    #[test]
    fn test_json_report_run_writes_report() {
        let temp = TempDir::new().unwrap();
        let config = write_config(&temp, "coverage_target: 50\n");
        let manifest = temp.path().join("manifest.yaml");
        fs::write(
            &manifest,
            "- object_id: app.User\n  docstring: \".. no_pii:: nothing\"\n  source_path: app/models.py\n  line_number: 3\n",
        )
        .unwrap();
        let reports = temp.path().join("reports");

        run(parse(&[
            "docstring-find-annotations",
            "--config-file",
            config.to_str().unwrap(),
            "--manifest",
            manifest.to_str().unwrap(),
            "--report-path",
            reports.to_str().unwrap(),
            "--lint",
            "--coverage",
            "--report",
            "--format",
            "json",
        ]))
        .unwrap();

        assert_eq!(fs::read_dir(&reports).unwrap().count(), 1);
    }
}
