//! Input classification

use crate::{Error, Result};
use datavet_schema::ContainerFormat;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

const ZIP_MAGIC: &[&[u8]] = &[b"PK\x03\x04", b"PK\x05\x06"];
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Kind of data artifact a run receives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputKind {
    /// ZIP archive of several files
    Archive,
    /// Workbook
    Spreadsheet,
    /// Flat delimited text
    Delimited,
}

impl InputKind {
    /// Classify by extension alone
    #[must_use]
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "zip" => Some(Self::Archive),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Some(Self::Spreadsheet),
            "csv" | "tsv" | "txt" | "psv" | "dat" => Some(Self::Delimited),
            _ => None,
        }
    }

    /// Classify by leading bytes
    #[must_use]
    pub fn sniff(head: &[u8]) -> Self {
        if ZIP_MAGIC.iter().any(|magic| head.starts_with(magic)) {
            Self::Archive
        } else if head.starts_with(OLE_MAGIC) {
            Self::Spreadsheet
        } else {
            Self::Delimited
        }
    }

    /// Container format of packages that accept this input
    #[must_use]
    pub fn container(self) -> ContainerFormat {
        match self {
            Self::Archive => ContainerFormat::Zip,
            Self::Spreadsheet => ContainerFormat::Excel,
            Self::Delimited => ContainerFormat::Csv,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Archive => "archive",
            Self::Spreadsheet => "spreadsheet",
            Self::Delimited => "delimited",
        }
    }
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a data file: by extension first, then by content
///
/// # Errors
///
/// Returns an error when a file with an unknown extension cannot be read.
pub fn classify(path: &Path) -> Result<InputKind> {
    if let Some(kind) = path
        .extension()
        .and_then(|e| e.to_str())
        .and_then(InputKind::from_extension)
    {
        debug!("{} classified as {} by extension", path.display(), kind);
        return Ok(kind);
    }

    let mut head = Vec::with_capacity(OLE_MAGIC.len());
    File::open(path)
        .and_then(|file| file.take(OLE_MAGIC.len() as u64).read_to_end(&mut head))
        .map_err(|e| Error::io("classify", path, &e))?;
    let kind = InputKind::sniff(&head);
    debug!("{} classified as {} by content", path.display(), kind);
    Ok(kind)
}
