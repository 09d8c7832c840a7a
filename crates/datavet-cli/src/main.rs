//! # datavet-cli
//!
//! Command-line interface for the datavet validation engine.
//!
//! Exit codes: `0` success (warnings allowed), `1` the data failed
//! validation, `2` critical failure.

use anyhow::Context;
use clap::{ArgAction, Args, Parser, Subcommand};
use datavet_pipeline::{
    run_batch, worst_exit_code, Coordinator, EngineConfig, RunOutcome, RunRequest,
};
use datavet_schema::SchemaRegistry;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const EXIT_CRITICAL: u8 = 2;

#[derive(Parser)]
#[command(name = "datavet")]
#[command(about = "Validate data files against declarative schemas")]
#[command(version)]
struct Cli {
    /// Path to engine configuration file (YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log more detail (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a data file against a schema
    Validate {
        /// Data file (zip, spreadsheet or delimited text)
        data: PathBuf,

        /// Schema file path
        #[arg(short, long)]
        schema: PathBuf,

        /// Run identifier (generated when omitted)
        #[arg(long)]
        run_id: Option<String>,

        #[command(flatten)]
        origin: Origin,

        /// Directory that holds the run directories
        #[arg(long)]
        work_root: Option<PathBuf>,
    },

    /// Load and check a schema without validating data
    CheckSchema {
        /// Schema file path
        schema: PathBuf,
    },

    /// Validate several data files concurrently
    Batch {
        /// Data files
        #[arg(required = true)]
        data: Vec<PathBuf>,

        /// Schema file path
        #[arg(short, long)]
        schema: PathBuf,

        #[command(flatten)]
        origin: Origin,

        /// Directory that holds the run directories
        #[arg(long)]
        work_root: Option<PathBuf>,

        /// Maximum number of concurrent runs
        #[arg(short, long, default_value_t = 4)]
        jobs: usize,
    },
}

/// Where a delivery came from; recorded in the report only
#[derive(Args)]
struct Origin {
    #[arg(long)]
    box_id: Option<String>,

    #[arg(long)]
    sender_id: Option<String>,

    /// Delivery channel
    #[arg(long)]
    channel: Option<String>,
}

impl Origin {
    fn apply(&self, mut request: RunRequest) -> RunRequest {
        request.box_id.clone_from(&self.box_id);
        request.sender_id.clone_from(&self.sender_id);
        request.channel.clone_from(&self.channel);
        request
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match execute(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(EXIT_CRITICAL)
        }
    }
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn execute(cli: Cli) -> anyhow::Result<u8> {
    match cli.command {
        Commands::Validate {
            data,
            schema,
            run_id,
            origin,
            work_root,
        } => {
            let config = load_config(cli.config.as_deref(), work_root)?;
            let mut request = origin.apply(RunRequest::new(schema, data));
            request.run_id = run_id;

            let outcome = Coordinator::new(config)
                .run(&request)
                .context("validation run could not produce a report")?;
            print_outcome(&outcome);
            Ok(exit_code(outcome.exit_code()))
        }
        Commands::CheckSchema { schema } => Ok(check_schema(&schema)),
        Commands::Batch {
            data,
            schema,
            origin,
            work_root,
            jobs,
        } => {
            let config = load_config(cli.config.as_deref(), work_root)?;
            let coordinator =
                Coordinator::new(config).with_registry(Arc::new(SchemaRegistry::new()));
            let requests = data
                .into_iter()
                .map(|path| origin.apply(RunRequest::new(&schema, path)))
                .collect();

            let items = run_batch(coordinator, requests, jobs).await;
            for item in &items {
                match &item.result {
                    Ok(outcome) => print_outcome(outcome),
                    Err(e) => eprintln!("{}: {e}", item.request.data_path.display()),
                }
            }
            Ok(exit_code(worst_exit_code(&items)))
        }
    }
}

fn load_config(path: Option<&Path>, work_root: Option<PathBuf>) -> anyhow::Result<EngineConfig> {
    let config = match path {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("cannot load configuration {}", path.display()))?,
        None => EngineConfig::default(),
    };
    Ok(match work_root {
        Some(work_root) => config.with_work_root(work_root),
        None => config,
    })
}

fn check_schema(path: &Path) -> u8 {
    match datavet_schema::load_from_file(path) {
        Ok(schema) => {
            println!(
                "{}: schema '{}' version '{}' is valid ({} dataset(s), {} package(s))",
                path.display(),
                schema.metadata.name,
                schema.metadata.version,
                schema.datasets.len(),
                schema.packages.len()
            );
            0
        }
        Err(e) => {
            eprintln!("{}: invalid schema", path.display());
            for problem in e.problems() {
                eprintln!("  - {problem}");
            }
            EXIT_CRITICAL
        }
    }
}

fn print_outcome(outcome: &RunOutcome) {
    println!(
        "run_id={} errors={} warnings={} status={} dir={}",
        outcome.run_id,
        outcome.errors,
        outcome.warnings,
        outcome.status.as_str(),
        outcome.dir.display()
    );
}

fn exit_code(code: i32) -> u8 {
    u8::try_from(code).unwrap_or(EXIT_CRITICAL)
}
