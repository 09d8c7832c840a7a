//! Workbook reader

use crate::{Result, XlsxError};
use calamine::{open_workbook_auto_from_rs, Data, Range, Reader, Sheets};
use datavet_ir::RawTable;
use std::io::{Cursor, Read, Seek};
use std::path::Path;
use tracing::debug;

/// Reader for one sheet of a workbook
#[derive(Debug, Clone)]
pub struct XlsxReader {
    sheet: Option<String>,
    has_header: bool,
}

impl Default for XlsxReader {
    fn default() -> Self {
        Self {
            sheet: None,
            has_header: true,
        }
    }
}

impl XlsxReader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sheet to read; the first sheet when unset
    #[must_use]
    pub fn sheet(mut self, sheet: Option<String>) -> Self {
        self.sheet = sheet;
        self
    }

    #[must_use]
    pub fn has_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    /// Read a workbook from disk
    ///
    /// # Errors
    ///
    /// I/O failures, unreadable workbooks and missing sheets.
    pub fn read_path(&self, path: &Path) -> Result<RawTable> {
        let bytes = std::fs::read(path)?;
        let source = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        self.read_bytes(&source, bytes)
    }

    /// Read an in-memory workbook
    ///
    /// # Errors
    ///
    /// Unreadable workbooks and missing sheets.
    pub fn read_bytes(&self, source: &str, bytes: Vec<u8>) -> Result<RawTable> {
        let mut workbook =
            open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(|e| XlsxError::Open {
                source_name: source.to_string(),
                message: e.to_string(),
            })?;
        self.read_workbook(source, &mut workbook)
    }

    fn read_workbook<RS: Read + Seek>(&self, source: &str, workbook: &mut Sheets<RS>) -> Result<RawTable> {
        let available = workbook.sheet_names();
        let sheet = match &self.sheet {
            Some(name) => available
                .iter()
                .find(|s| *s == name)
                .cloned()
                .ok_or_else(|| XlsxError::SheetNotFound {
                    sheet: name.clone(),
                    available: available.clone(),
                })?,
            None => available.first().cloned().ok_or(XlsxError::NoSheets)?,
        };

        let range = workbook
            .worksheet_range(&sheet)
            .map_err(|e| XlsxError::Read {
                sheet: sheet.clone(),
                message: e.to_string(),
            })?;

        let table = self.range_to_table(source, &range);
        debug!(
            "Read {} record(s) from {} sheet '{}'",
            table.record_count(),
            source,
            sheet
        );
        Ok(table)
    }

    fn range_to_table(&self, source: &str, range: &Range<Data>) -> RawTable {
        let mut table = RawTable::new(source);
        let first_row = range.start().map_or(0, |(row, _)| row as usize);
        // Cells left of the used range are empty; keep positions stable.
        let first_col = range.start().map_or(0, |(_, col)| col as usize);

        for (offset, row) in range.rows().enumerate() {
            let line = first_row + offset + 1;
            if row.iter().all(|c| matches!(c, Data::Empty)) {
                continue;
            }
            let mut cells: Vec<String> = std::iter::repeat_n(String::new(), first_col).collect();
            cells.extend(row.iter().map(render_cell));

            if self.has_header && table.header.is_none() {
                table = table.with_header(cells, line);
            } else {
                table.push_row(line, cells);
            }
        }
        table
    }
}

/// Render a cell the way it would appear in a delimited export
#[must_use]
pub fn render_cell(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::Float(f) => render_float(*f),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(datetime) if datetime.time() == chrono::NaiveTime::default() => {
                datetime.date().format("%Y-%m-%d").to_string()
            }
            Some(datetime) => datetime.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => dt.as_f64().to_string(),
        },
        Data::Error(e) => format!("#{e:?}"),
    }
}

fn render_float(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{f:.0}")
    } else {
        f.to_string()
    }
}
