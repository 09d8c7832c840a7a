//! Run identity and working directory
//!
//! Each run owns `<work_root>/<run_id>/`. Preparing a directory that already
//! exists removes the artifacts of the earlier attempt so that re-running an
//! id overwrites its output. The earlier input copies stay until the new
//! inputs have been read, so a run can be replayed from its own directory.

use crate::{Error, Result};
use datavet_report::{ERROR_LOG, OUTPUT_LOG, REPORT_JSON, RESULTS_TXT};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::debug;
use uuid::Uuid;

/// Inputs of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub schema_path: PathBuf,
    pub data_path: PathBuf,
    pub run_id: Option<String>,
    pub box_id: Option<String>,
    pub sender_id: Option<String>,
    pub channel: Option<String>,
}

impl RunRequest {
    pub fn new(schema_path: impl Into<PathBuf>, data_path: impl Into<PathBuf>) -> Self {
        Self {
            schema_path: schema_path.into(),
            data_path: data_path.into(),
            run_id: None,
            box_id: None,
            sender_id: None,
            channel: None,
        }
    }

    #[must_use]
    pub fn run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    #[must_use]
    pub fn box_id(mut self, box_id: impl Into<String>) -> Self {
        self.box_id = Some(box_id.into());
        self
    }

    #[must_use]
    pub fn sender_id(mut self, sender_id: impl Into<String>) -> Self {
        self.sender_id = Some(sender_id.into());
        self
    }

    #[must_use]
    pub fn channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    /// Original data file name, used for pattern matching
    #[must_use]
    pub fn data_file_name(&self) -> String {
        file_name(&self.data_path)
    }
}

/// A prepared run
#[derive(Debug)]
pub struct ExecutionContext {
    pub run_id: String,
    pub dir: PathBuf,
    pub started: Instant,
}

impl ExecutionContext {
    /// Create (or clean) the run directory under `work_root`
    ///
    /// # Errors
    ///
    /// Invalid run ids and directories that cannot be created or cleaned.
    pub fn prepare(work_root: &Path, run_id: &str) -> Result<Self> {
        validate_run_id(run_id)?;
        let dir = work_root.join(run_id);
        fs::create_dir_all(&dir).map_err(|e| Error::io("create run directory", &dir, &e))?;
        remove_stale(&dir, is_report_artifact)?;
        debug!("Prepared run directory {}", dir.display());
        Ok(Self {
            run_id: run_id.to_string(),
            dir,
            started: Instant::now(),
        })
    }

    /// Copy the schema to `input.<ext>` and the data to `data.<ext>`
    ///
    /// Both sources are read before any earlier copy is removed; either may
    /// be a copy from a previous attempt of the same run.
    /// Returns the path of the data copy.
    ///
    /// # Errors
    ///
    /// Returns an error when either file cannot be copied.
    pub fn copy_inputs(&self, request: &RunRequest) -> Result<PathBuf> {
        let schema = fs::read(&request.schema_path)
            .map_err(|e| Error::io("copy schema", &request.schema_path, &e))?;
        let data = fs::read(&request.data_path)
            .map_err(|e| Error::io("copy data", &request.data_path, &e))?;
        remove_stale(&self.dir, is_input_copy)?;

        let schema_copy = self.dir.join(with_extension("input", &request.schema_path, "yaml"));
        fs::write(&schema_copy, schema).map_err(|e| Error::io("copy schema", &schema_copy, &e))?;

        let data_copy = self.dir.join(with_extension("data", &request.data_path, ""));
        fs::write(&data_copy, data).map_err(|e| Error::io("copy data", &data_copy, &e))?;
        Ok(data_copy)
    }
}

/// Resolve the caller's run id or generate one
///
/// # Errors
///
/// Returns [`Error::InvalidRunId`] for ids that are not filesystem-safe.
pub fn resolve_run_id(requested: Option<&str>) -> Result<String> {
    match requested {
        Some(id) => {
            validate_run_id(id)?;
            Ok(id.to_string())
        }
        None => Ok(Uuid::new_v4().to_string()),
    }
}

/// Run ids name directories: ASCII letters, digits, `-` and `_` only
///
/// # Errors
///
/// Returns [`Error::InvalidRunId`] otherwise.
pub fn validate_run_id(run_id: &str) -> Result<()> {
    let valid = !run_id.is_empty()
        && run_id.len() <= 128
        && run_id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidRunId(run_id.to_string()))
    }
}

fn is_report_artifact(name: &str) -> bool {
    [OUTPUT_LOG, RESULTS_TXT, REPORT_JSON, ERROR_LOG].contains(&name)
}

fn is_input_copy(name: &str) -> bool {
    name == "input" || name == "data" || name.starts_with("input.") || name.starts_with("data.")
}

fn remove_stale(dir: &Path, stale: fn(&str) -> bool) -> Result<()> {
    let entries = fs::read_dir(dir).map_err(|e| Error::io("read run directory", dir, &e))?;
    for entry in entries {
        let entry = entry.map_err(|e| Error::io("read run directory", dir, &e))?;
        let path = entry.path();
        if path.is_file() && stale(&entry.file_name().to_string_lossy()) {
            debug!("Removing stale artifact {}", path.display());
            fs::remove_file(&path).map_err(|e| Error::io("remove stale artifact", &path, &e))?;
        }
    }
    Ok(())
}

fn with_extension(stem: &str, original: &Path, fallback: &str) -> String {
    match original.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{stem}.{ext}"),
        None if fallback.is_empty() => stem.to_string(),
        None => format!("{stem}.{fallback}"),
    }
}

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}
