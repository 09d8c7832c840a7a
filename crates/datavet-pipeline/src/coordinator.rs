//! Execution coordinator
//!
//! Drives one run end to end. Only failures that leave nothing to validate
//! (unreadable schema, unsupported input, unreadable archive) abort a run;
//! they are recorded as a critical entry and written to `error.log` next to
//! the usual result files.

use crate::config::EngineConfig;
use crate::context::{resolve_run_id, ExecutionContext, RunRequest};
use crate::extract::{archive_entries, extract, read_source, ReadFailure};
use crate::format::{classify, InputKind};
use crate::{Error, Result};
use datavet_report::{finalize, write_error_log, Category, EventLog, LogEntry, RunInfo, RunStatus};
use datavet_schema::{ContainerFormat, DatasetSpec, PackageSpec, SchemaDocument, SchemaRegistry};
use datavet_validation::ValidationEngine;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, info_span, warn};

/// What a finished run returns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub run_id: String,
    pub errors: usize,
    pub warnings: usize,
    pub status: RunStatus,
    /// Working directory holding the result files
    pub dir: PathBuf,
}

impl RunOutcome {
    /// Process exit code for this outcome
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        self.status.exit_code()
    }
}

/// Runs validations with a shared configuration and optional schema cache
#[derive(Debug, Clone, Default)]
pub struct Coordinator {
    config: EngineConfig,
    registry: Option<Arc<SchemaRegistry>>,
}

impl Coordinator {
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            registry: None,
        }
    }

    /// Load schemas through a shared cache
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<SchemaRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run one validation
    ///
    /// # Errors
    ///
    /// Only when no result files can be produced: an invalid run id, an
    /// invalid configuration or a working directory that cannot be
    /// prepared or written. Everything else ends up in the report.
    pub fn run(&self, request: &RunRequest) -> Result<RunOutcome> {
        let run_id = resolve_run_id(request.run_id.as_deref())?;
        let span = info_span!(
            "run",
            run_id = %run_id,
            box_id = request.box_id.as_deref().unwrap_or(""),
            sender_id = request.sender_id.as_deref().unwrap_or(""),
            channel = request.channel.as_deref().unwrap_or(""),
        );
        let _entered = span.enter();

        let engine = ValidationEngine::with_config(self.config.validation_config()?);
        let context = ExecutionContext::prepare(&self.config.work_root, &run_id)?;
        info!(
            "Validating {} against {}",
            request.data_path.display(),
            request.schema_path.display()
        );

        let mut run = RunInfo::new(
            &run_id,
            request.schema_path.display().to_string(),
            request.data_path.display().to_string(),
        );
        run.box_id.clone_from(&request.box_id);
        run.sender_id.clone_from(&request.sender_id);
        run.channel.clone_from(&request.channel);

        let mut log = EventLog::new();
        log.record(
            LogEntry::info(format!("Run {run_id} started")).with_file(request.data_file_name()),
        );

        if let Err(e) = execute(request, &context, &engine, self.registry.as_deref(), &mut run, &mut log) {
            error!("Run {} aborted: {}", run_id, e);
            let message = e.to_string();
            log.record(LogEntry::error(Category::Critical, &message));
            write_error_log(&context.dir, &run_id, &message)?;
        }

        let report = finalize(run, &log, &context.dir)?;
        debug!("Run {} took {:?}", run_id, context.started.elapsed());
        Ok(RunOutcome {
            run_id,
            errors: report.totals.errors,
            warnings: report.totals.warnings,
            status: report.status,
            dir: context.dir,
        })
    }
}

/// Run one validation with the default configuration
///
/// # Errors
///
/// See [`Coordinator::run`].
pub fn run(request: &RunRequest) -> Result<RunOutcome> {
    Coordinator::default().run(request)
}

fn execute(
    request: &RunRequest,
    context: &ExecutionContext,
    engine: &ValidationEngine,
    registry: Option<&SchemaRegistry>,
    run: &mut RunInfo,
    log: &mut EventLog,
) -> Result<()> {
    let data_copy = context.copy_inputs(request)?;

    let schema = match registry {
        Some(registry) => registry.get_or_load(&request.schema_path)?,
        None => Arc::new(datavet_schema::load_from_file(&request.schema_path)?),
    };
    run.schema_name = Some(schema.metadata.name.clone()).filter(|n| !n.is_empty());
    run.schema_version = Some(schema.metadata.version.clone()).filter(|v| !v.is_empty());

    let original_name = request.data_file_name();
    let kind = classify(&data_copy)?;
    let names = match kind {
        InputKind::Archive => archive_entries(&data_copy)?,
        InputKind::Spreadsheet | InputKind::Delimited => vec![original_name.clone()],
    };
    let selection = select(&schema, kind, &names).ok_or_else(|| Error::NoMatchingSpec {
        kind,
        path: original_name.clone(),
    })?;
    let target = match selection.package {
        Some(package) => format!(
            "package '{}' ({} dataset(s))",
            package.name,
            selection.members.len()
        ),
        None => format!("dataset '{}'", selection.members[0].name),
    };
    info!("{} classified as {}; validating {}", original_name, kind, target);
    log.record(LogEntry::info(format!("Validating {target}")).with_file(&original_name));

    let extraction = extract(&data_copy, &original_name, kind, &selection.members)?;
    for duplicate in &extraction.duplicates {
        warn!("Ignoring duplicate archive entry {}", duplicate.name);
        log.record(
            LogEntry::warning(
                Category::Format,
                format!(
                    "Archive entry '{}' also matches dataset '{}'; only the first match is validated",
                    duplicate.name, duplicate.dataset
                ),
            )
            .with_file(&duplicate.name),
        );
    }

    let mut outcomes = Vec::with_capacity(selection.members.len());
    for spec in &selection.members {
        let Some(file) = extraction.file(&spec.name) else {
            if let Some(missing) = extraction.missing.iter().find(|m| m.dataset == spec.name) {
                log.record(
                    LogEntry::error(Category::MissingFile, &missing.reason)
                        .with_rule(&spec.file_pattern),
                );
            }
            continue;
        };

        match read_source(spec, file) {
            Ok(raw) => outcomes.push(engine.validate_dataset(spec, &raw, log)),
            Err(ReadFailure::MissingSheet(reason)) => {
                log.record(
                    LogEntry::error(
                        Category::MissingFile,
                        format!("Dataset '{}' not found in {}", spec.name, file.name),
                    )
                    .with_file(&file.name)
                    .with_detail(reason),
                );
            }
            Err(ReadFailure::Unreadable(reason)) => {
                log.record(
                    LogEntry::error(
                        Category::Format,
                        format!("Cannot read dataset '{}' from {}", spec.name, file.name),
                    )
                    .with_file(&file.name)
                    .with_detail(reason),
                );
            }
        }
    }

    if let Some(package) = selection.package {
        engine.validate_package(package, &outcomes, log);
    }
    Ok(())
}

/// Package or standalone dataset chosen for an input
#[derive(Debug)]
struct Selection<'a> {
    package: Option<&'a PackageSpec>,
    members: Vec<&'a DatasetSpec>,
}

impl<'a> Selection<'a> {
    fn package(schema: &'a SchemaDocument, package: &'a PackageSpec) -> Self {
        Self {
            package: Some(package),
            members: schema.members(package).collect(),
        }
    }

    fn dataset(spec: &'a DatasetSpec) -> Self {
        Self {
            package: None,
            members: vec![spec],
        }
    }

    /// Number of members whose pattern matches one of `names`
    fn matched(&self, names: &[String]) -> usize {
        self.members
            .iter()
            .filter(|m| names.iter().any(|n| m.matches(n)))
            .count()
    }
}

/// Choose what to validate an input against
///
/// `names` are the archive's entry names, or the file name of a flat input.
/// Archives go to a zip package. A flat file goes to a package of its own
/// container format (a delimited file needs a single-member package), else
/// to a standalone dataset of its format. Among candidates the one with the
/// most members matching `names` wins, then declaration order.
fn select<'a>(schema: &'a SchemaDocument, kind: InputKind, names: &[String]) -> Option<Selection<'a>> {
    let container = kind.container();
    let packages: Vec<Selection<'a>> = schema
        .packages
        .iter()
        .filter(|p| p.format == container)
        .map(|p| Selection::package(schema, p))
        .collect();

    if container == ContainerFormat::Zip {
        return preferred(packages, names);
    }

    let of_format = |spec: &DatasetSpec| spec.format.container() == container;
    let packages = packages
        .into_iter()
        .filter(|s| {
            !s.members.is_empty()
                && s.members.iter().all(|m| of_format(m))
                && (kind == InputKind::Spreadsheet || s.members.len() == 1)
        })
        .collect();
    let datasets = schema
        .datasets
        .iter()
        .filter(|d| of_format(d))
        .map(Selection::dataset)
        .collect();

    preferred(packages, names).or_else(|| preferred(datasets, names))
}

fn preferred<'a>(candidates: Vec<Selection<'a>>, names: &[String]) -> Option<Selection<'a>> {
    let mut best: Option<(usize, Selection<'a>)> = None;
    for candidate in candidates {
        let score = candidate.matched(names);
        if best.as_ref().is_none_or(|(top, _)| score > *top) {
            best = Some((score, candidate));
        }
    }
    best.map(|(_, selection)| selection)
}
