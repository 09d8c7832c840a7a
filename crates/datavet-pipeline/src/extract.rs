//! Extraction of dataset buffers from the input artifact
//!
//! Archives are searched entry by entry: each entry's base name is matched
//! against the member patterns. Flat files feed every selected dataset
//! directly (a workbook feeds one dataset per sheet).

use crate::format::InputKind;
use crate::{Error, Result};
use datavet_adapter_csv::{CsvConfig, CsvReader, Encoding};
use datavet_adapter_xlsx::{XlsxError, XlsxReader};
use datavet_ir::RawTable;
use datavet_schema::{DatasetSpec, FileFormat, TextEncoding};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, trace};
use zip::ZipArchive;

/// Bytes of one dataset's file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub dataset: String,
    /// File name or archive entry path
    pub name: String,
    pub bytes: Vec<u8>,
}

/// A member dataset with no file in the input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingFile {
    pub dataset: String,
    pub reason: String,
}

/// Outcome of extracting the input for a set of datasets
#[derive(Debug, Default)]
pub struct Extraction {
    /// Found files in the order the datasets were given
    pub files: Vec<SourceFile>,
    pub missing: Vec<MissingFile>,
    /// Archive entries ignored because their dataset already had a file
    pub duplicates: Vec<SourceFile>,
}

impl Extraction {
    /// File found for a dataset
    #[must_use]
    pub fn file(&self, dataset: &str) -> Option<&SourceFile> {
        self.files.iter().find(|f| f.dataset == dataset)
    }
}

/// Why a dataset's file could not be turned into a buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadFailure {
    /// The declared sheet does not exist
    MissingSheet(String),
    /// The file is not readable in its declared format
    Unreadable(String),
}

/// Extract the files of `members` from the input at `path`
///
/// `original_name` is the name the input was delivered under.
///
/// # Errors
///
/// Unreadable inputs and archive entries that match several datasets.
pub fn extract(
    path: &Path,
    original_name: &str,
    kind: InputKind,
    members: &[&DatasetSpec],
) -> Result<Extraction> {
    match kind {
        InputKind::Archive => extract_archive(path, members),
        InputKind::Spreadsheet | InputKind::Delimited => {
            let bytes = std::fs::read(path).map_err(|e| Error::io("read data", path, &e))?;
            Ok(Extraction {
                files: members
                    .iter()
                    .map(|spec| SourceFile {
                        dataset: spec.name.clone(),
                        name: original_name.to_string(),
                        bytes: bytes.clone(),
                    })
                    .collect(),
                ..Extraction::default()
            })
        }
    }
}

fn extract_archive(path: &Path, members: &[&DatasetSpec]) -> Result<Extraction> {
    let file = File::open(path).map_err(|e| Error::io("open archive", path, &e))?;
    let mut archive = ZipArchive::new(file)
        .map_err(|e| Error::pipeline("open archive", path.display().to_string(), e.to_string()))?;

    let mut found: Vec<Option<SourceFile>> = vec![None; members.len()];
    let mut duplicates = Vec::new();

    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| Error::pipeline("read archive", path.display().to_string(), e.to_string()))?;
        let entry_name = entry.name().to_string();
        if entry.is_dir() || is_ignored(&entry_name) {
            trace!("Ignoring archive entry {}", entry_name);
            continue;
        }

        let base = base_name(&entry_name);
        let matching: Vec<usize> = members
            .iter()
            .enumerate()
            .filter(|(_, spec)| spec.matches(base))
            .map(|(i, _)| i)
            .collect();
        let slot = match matching.as_slice() {
            [] => {
                debug!("Archive entry {} matches no dataset", entry_name);
                continue;
            }
            [slot] => *slot,
            several => {
                return Err(Error::AmbiguousEntry {
                    entry: entry_name,
                    datasets: several.iter().map(|&i| members[i].name.clone()).collect(),
                });
            }
        };

        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes).map_err(|e| {
            Error::pipeline("read archive entry", entry_name.clone(), e.to_string())
        })?;
        let source = SourceFile {
            dataset: members[slot].name.clone(),
            name: entry_name,
            bytes,
        };
        if found[slot].is_some() {
            duplicates.push(source);
        } else {
            debug!("Archive entry {} -> dataset {}", source.name, source.dataset);
            found[slot] = Some(source);
        }
    }

    let mut extraction = Extraction {
        duplicates,
        ..Extraction::default()
    };
    for (spec, file) in members.iter().zip(found) {
        match file {
            Some(file) => extraction.files.push(file),
            None => extraction.missing.push(MissingFile {
                dataset: spec.name.clone(),
                reason: format!(
                    "No archive entry matches dataset '{}' (pattern '{}')",
                    spec.name, spec.file_pattern
                ),
            }),
        }
    }
    Ok(extraction)
}

/// Base names of the file entries of an archive
///
/// # Errors
///
/// Returns an error when the archive cannot be opened.
pub fn archive_entries(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path).map_err(|e| Error::io("open archive", path, &e))?;
    let archive = ZipArchive::new(file)
        .map_err(|e| Error::pipeline("open archive", path.display().to_string(), e.to_string()))?;
    Ok(archive
        .file_names()
        .filter(|name| !name.ends_with('/') && !is_ignored(name))
        .map(|name| base_name(name).to_string())
        .collect())
}

fn is_ignored(entry_name: &str) -> bool {
    entry_name.starts_with("__MACOSX/")
        || entry_name.contains("/__MACOSX/")
        || base_name(entry_name).starts_with("._")
}

fn base_name(entry_name: &str) -> &str {
    entry_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(entry_name)
}

/// Read a dataset's file with the adapter its format declares
///
/// # Errors
///
/// Returns a [`ReadFailure`] when the file cannot be read as declared.
pub fn read_source(spec: &DatasetSpec, file: &SourceFile) -> std::result::Result<RawTable, ReadFailure> {
    match &spec.format {
        FileFormat::Csv(csv) => {
            let config = CsvConfig::new()
                .delimiter(char::from(csv.delimiter))
                .quote_char(char::from(csv.quote))
                .has_header(csv.header)
                .encoding(match csv.encoding {
                    TextEncoding::Utf8 => Encoding::Utf8,
                    TextEncoding::Latin1 => Encoding::Latin1,
                })
                .trim(csv.trim);
            CsvReader::new()
                .with_config(config)
                .read_bytes(&file.name, &file.bytes)
                .map_err(|e| ReadFailure::Unreadable(e.to_string()))
        }
        FileFormat::Excel(excel) => XlsxReader::new()
            .sheet(excel.sheet.clone())
            .has_header(excel.header)
            .read_bytes(&file.name, file.bytes.clone())
            .map_err(|e| match e {
                XlsxError::SheetNotFound { .. } | XlsxError::NoSheets => {
                    ReadFailure::MissingSheet(e.to_string())
                }
                other => ReadFailure::Unreadable(other.to_string()),
            }),
    }
}
