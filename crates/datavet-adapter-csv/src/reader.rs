//! CSV reader
//!
//! Decodes bytes (BOM-aware, with a Latin-1 fallback for invalid UTF-8) and
//! splits them into a [`RawTable`]. Rows of any width are kept with their
//! source line; checks against the declared layout happen downstream.

use crate::config::{CsvConfig, Encoding};
use crate::errors::{CsvError, CsvResult};
use csv::{ReaderBuilder, Trim};
use datavet_ir::RawTable;
use std::path::Path;
use tracing::{debug, warn};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const UTF16_LE_BOM: &[u8] = &[0xFF, 0xFE];
const UTF16_BE_BOM: &[u8] = &[0xFE, 0xFF];

/// Reader for delimited text files
#[derive(Debug, Clone, Default)]
pub struct CsvReader {
    config: CsvConfig,
}

impl CsvReader {
    /// Create a new CSV reader
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the given configuration
    #[must_use]
    pub fn with_config(mut self, config: CsvConfig) -> Self {
        self.config = config;
        self
    }

    /// The active configuration
    #[must_use]
    pub fn config(&self) -> &CsvConfig {
        &self.config
    }

    /// Read a file from disk
    ///
    /// # Errors
    ///
    /// I/O failures and malformed records.
    pub fn read_path(&self, path: &Path) -> CsvResult<RawTable> {
        let bytes = std::fs::read(path)?;
        let source = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        self.read_bytes(&source, &bytes)
    }

    /// Read an in-memory file
    ///
    /// # Errors
    ///
    /// Invalid configuration and malformed records.
    pub fn read_bytes(&self, source: &str, bytes: &[u8]) -> CsvResult<RawTable> {
        let delimiter = self.config.delimiter_u8().ok_or_else(|| {
            CsvError::config(format!(
                "delimiter '{}' is not a single-byte character",
                self.config.delimiter
            ))
        })?;
        let quote = self.config.quote_char_u8().ok_or_else(|| {
            CsvError::config(format!(
                "quote '{}' is not a single-byte character",
                self.config.quote_char
            ))
        })?;

        let mut table = RawTable::new(source);
        let text = decode(bytes, self.config.encoding, &mut table);

        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(delimiter)
            .quote(quote)
            .trim(if self.config.trim { Trim::All } else { Trim::None })
            .from_reader(text.as_bytes());

        let mut fallback_line = 0;
        for result in reader.records() {
            let record = result?;
            fallback_line += 1;
            let line = record
                .position()
                .and_then(|p| usize::try_from(p.line()).ok())
                .unwrap_or(fallback_line);

            if record.len() == 1 && record.get(0).is_some_and(str::is_empty) {
                continue;
            }
            let cells: Vec<String> = record.iter().map(str::to_string).collect();

            if self.config.has_header && table.header.is_none() {
                table = table.with_header(cells, line);
            } else {
                table.push_row(line, cells);
            }
        }

        debug!(
            "Read {} record(s) from {} (header: {})",
            table.record_count(),
            source,
            table.header.is_some()
        );
        Ok(table)
    }
}

/// Decode file bytes into text, recording encoding problems as notices
fn decode(bytes: &[u8], encoding: Encoding, table: &mut RawTable) -> String {
    if let Some(rest) = bytes.strip_prefix(UTF16_LE_BOM) {
        return decode_utf16(rest, u16::from_le_bytes, table);
    }
    if let Some(rest) = bytes.strip_prefix(UTF16_BE_BOM) {
        return decode_utf16(rest, u16::from_be_bytes, table);
    }
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

    match encoding {
        Encoding::Latin1 => latin1(bytes),
        Encoding::Utf8 => match std::str::from_utf8(bytes) {
            Ok(text) => text.to_string(),
            Err(e) => {
                warn!("{}: invalid UTF-8, decoding as Latin-1", table.source);
                table.add_notice(format!(
                    "File is not valid UTF-8 (invalid byte at offset {}); content decoded as Latin-1",
                    e.valid_up_to()
                ));
                latin1(bytes)
            }
        },
    }
}

fn decode_utf16(bytes: &[u8], to_unit: fn([u8; 2]) -> u16, table: &mut RawTable) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| to_unit([pair[0], pair[1]]))
        .collect();
    if bytes.len() % 2 != 0 {
        table.add_notice("UTF-16 content has an odd number of bytes; trailing byte ignored");
    }
    String::from_utf16(&units).unwrap_or_else(|_| {
        table.add_notice("File contains invalid UTF-16 sequences; they were replaced");
        String::from_utf16_lossy(&units)
    })
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(config: CsvConfig, data: &[u8]) -> RawTable {
        CsvReader::new()
            .with_config(config)
            .read_bytes("test.csv", data)
            .unwrap()
    }

    #[test]
    fn test_header_and_line_numbers() {
        let table = read(CsvConfig::new(), b"id,name\n1,Ann\n\n2,\"Bob, Jr\"\n");
        assert_eq!(
            table.header,
            Some(vec!["id".to_string(), "name".to_string()])
        );
        assert_eq!(table.header_line, 1);
        assert_eq!(table.record_count(), 2);
        assert_eq!(table.rows[0].line, 2);
        assert_eq!(table.rows[1].line, 4);
        assert_eq!(table.rows[1].cells, vec!["2", "Bob, Jr"]);
    }

    #[test]
    fn test_headerless_keeps_ragged_rows() {
        let table = read(
            CsvConfig::new().without_header().delimiter(';'),
            b"a;b;c\nd;e\n",
        );
        assert!(table.header.is_none());
        assert_eq!(table.rows[0].cells.len(), 3);
        assert_eq!(table.rows[1].cells.len(), 2);
        assert_eq!(table.rows[1].line, 2);
    }

    #[test]
    fn test_multiline_quoted_field_keeps_start_line() {
        let table = read(CsvConfig::new(), b"id,note\n1,\"two\nlines\"\n2,x\n");
        assert_eq!(table.rows[0].cells[1], "two\nlines");
        assert_eq!(table.rows[1].line, 4);
    }

    #[test]
    fn test_utf8_bom_removed() {
        let table = read(CsvConfig::new(), b"\xEF\xBB\xBFid\n1\n");
        assert_eq!(table.header, Some(vec!["id".to_string()]));
        assert!(table.notices.is_empty());
    }

    #[test]
    fn test_utf16_le_bom_decoded() {
        let mut data = vec![0xFF, 0xFE];
        for unit in "id\n7\n".encode_utf16() {
            data.extend_from_slice(&unit.to_le_bytes());
        }
        let table = read(CsvConfig::new(), &data);
        assert_eq!(table.rows[0].cells, vec!["7"]);
    }

    #[test]
    fn test_invalid_utf8_falls_back_to_latin1() {
        let table = read(CsvConfig::new(), b"city\nM\xE1laga\n");
        assert_eq!(table.rows[0].cells, vec!["Málaga"]);
        assert_eq!(table.notices.len(), 1);
        assert!(table.notices[0].contains("not valid UTF-8"));
    }

    #[test]
    fn test_declared_latin1_has_no_notice() {
        let table = read(CsvConfig::new().encoding(Encoding::Latin1), b"city\nM\xE1laga\n");
        assert_eq!(table.rows[0].cells, vec!["Málaga"]);
        assert!(table.notices.is_empty());
    }

    #[test]
    fn test_trim() {
        let table = read(CsvConfig::new().trim(true), b"a , b\n 1 ,  2 \n");
        assert_eq!(table.header, Some(vec!["a".to_string(), "b".to_string()]));
        assert_eq!(table.rows[0].cells, vec!["1", "2"]);
    }

    #[test]
    fn test_empty_input() {
        let table = read(CsvConfig::new(), b"");
        assert!(table.header.is_none());
        assert_eq!(table.record_count(), 0);
    }

    #[test]
    fn test_non_ascii_delimiter_is_config_error() {
        let err = CsvReader::new()
            .with_config(CsvConfig::new().delimiter('§'))
            .read_bytes("x.csv", b"a")
            .unwrap_err();
        assert!(matches!(err, CsvError::Config(_)));
    }
}
