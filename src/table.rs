use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::io::{Cursor, Read, Seek};
use std::path::Path;

use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, Range, Reader};
use chrono::{DateTime, Utc};
use polars::prelude::*;
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{Result, RouteError};

/// Identity of one loaded table. A new upload always gets a new id, even for
/// identical content, so every cache keyed by it is dropped on reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TableId(Uuid);

impl TableId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TableId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// CSV reader settings.
#[derive(Debug, Clone, Copy)]
pub struct CsvOptions {
    pub separator: u8,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self { separator: b',' }
    }
}

/// Summary of a loaded table, for status displays.
#[derive(Debug, Clone, Serialize)]
pub struct TableInfo {
    pub id: TableId,
    pub name: String,
    pub rows: usize,
    pub columns: Vec<String>,
    pub loaded_at: DateTime<Utc>,
}

/// A read-only spreadsheet: every column holds text, column names are trimmed.
#[derive(Debug, Clone)]
pub struct RouteTable {
    id: TableId,
    name: String,
    frame: DataFrame,
    loaded_at: DateTime<Utc>,
}

impl RouteTable {
    /// Wrap an existing frame, casting every column to String.
    pub fn from_frame(name: impl Into<String>, frame: DataFrame) -> Result<Self> {
        let columns = frame
            .get_columns()
            .iter()
            .map(|c| c.cast(&DataType::String))
            .collect::<PolarsResult<Vec<Column>>>()?;
        let mut frame = DataFrame::new(columns)?;
        trim_column_names(&mut frame)?;

        Ok(Self {
            id: TableId::new(),
            name: name.into(),
            frame,
            loaded_at: Utc::now(),
        })
    }

    /// Read a spreadsheet file, choosing the reader by extension: Excel and
    /// OpenDocument workbooks through calamine, anything else as CSV.
    pub fn load_path(path: &Path, options: CsvOptions) -> Result<Self> {
        if is_workbook(&file_name(path)) {
            Self::load_excel(path)
        } else {
            Self::load_csv(path, options)
        }
    }

    /// Read uploaded content, choosing the reader from the upload's file name.
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>, options: CsvOptions) -> Result<Self> {
        let name = name.into();
        if is_workbook(&name) {
            Self::from_excel_bytes(name, bytes)
        } else {
            Self::from_csv_bytes(name, bytes, options)
        }
    }

    /// Read a CSV file with all columns as String dtype.
    pub fn load_csv(path: &Path, options: CsvOptions) -> Result<Self> {
        require_file(path)?;
        Self::from_csv_bytes(file_name(path), fs::read(path)?, options)
    }

    /// Read CSV content already in memory (an uploaded file). Content that is
    /// not UTF-8 is taken as Latin-1, the usual encoding of French exports.
    pub fn from_csv_bytes(name: impl Into<String>, bytes: Vec<u8>, options: CsvOptions) -> Result<Self> {
        if bytes.iter().all(|b| b.is_ascii_whitespace()) {
            return Err(RouteError::InvalidData("file is empty".into()));
        }
        let bytes = match String::from_utf8(bytes) {
            Ok(text) => text.into_bytes(),
            Err(err) => {
                debug!("content is not UTF-8, decoding as Latin-1");
                latin1_to_utf8(err.as_bytes())
            }
        };
        let frame = csv_options(options)
            .into_reader_with_file_handle(Cursor::new(bytes))
            .finish()?;

        let table = Self::from_frame(name, frame)?;
        table.log_loaded();
        Ok(table)
    }

    /// Read the first worksheet of an Excel (`.xlsx`, `.xls`, `.xlsm`) or
    /// OpenDocument (`.ods`) workbook. The first row holds the column names.
    pub fn load_excel(path: &Path) -> Result<Self> {
        require_file(path)?;
        let mut workbook = open_workbook_auto(path)?;
        let range = first_sheet(&mut workbook)?;
        let table = Self::from_frame(file_name(path), range_to_frame(&range)?)?;
        table.log_loaded();
        Ok(table)
    }

    /// Read an uploaded workbook held in memory.
    pub fn from_excel_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self> {
        if bytes.is_empty() {
            return Err(RouteError::InvalidData("file is empty".into()));
        }
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
        let range = first_sheet(&mut workbook)?;
        let table = Self::from_frame(name, range_to_frame(&range)?)?;
        table.log_loaded();
        Ok(table)
    }

    pub fn id(&self) -> TableId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.frame
            .get_column_names_str()
            .iter()
            .map(|c| c.to_string())
            .collect()
    }

    pub fn info(&self) -> TableInfo {
        TableInfo {
            id: self.id,
            name: self.name.clone(),
            rows: self.height(),
            columns: self.column_names(),
            loaded_at: self.loaded_at,
        }
    }

    /// Borrow every column as a string array, in column order.
    pub fn text_columns(&self) -> Result<Vec<&StringChunked>> {
        self.frame
            .get_columns()
            .iter()
            .map(|c| c.str().map_err(RouteError::from))
            .collect()
    }

    pub fn row(&self, index: usize) -> Result<Row> {
        if index >= self.height() {
            return Err(RouteError::InvalidData(format!(
                "row {index} out of range ({} rows)",
                self.height()
            )));
        }
        let cells = self
            .text_columns()?
            .iter()
            .map(|ca| ca.get(index).map(str::to_string))
            .collect();
        Ok(Row::new(index, cells))
    }

    fn log_loaded(&self) {
        info!(
            table = %self.name,
            id = %self.id,
            rows = self.height(),
            columns = self.frame.width(),
            "table loaded"
        );
    }
}

fn csv_options(options: CsvOptions) -> CsvReadOptions {
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0)) // all columns as String
        .map_parse_options(|parse| parse.with_separator(options.separator))
}

fn trim_column_names(frame: &mut DataFrame) -> Result<()> {
    let trimmed = frame
        .get_column_names_str()
        .iter()
        .map(|c| c.trim().to_string())
        .collect();
    frame.set_column_names(unique_column_names(trimmed).as_slice())?;
    Ok(())
}

/// Suffix repeated names with `_duplicated_<n>`, the way the CSV reader
/// names repeated headers. Blank names become `column_<i>` (1-based).
fn unique_column_names(names: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::with_capacity(names.len());
    let mut unique = Vec::with_capacity(names.len());
    for (i, name) in names.into_iter().enumerate() {
        let base = if name.is_empty() {
            format!("column_{}", i + 1)
        } else {
            name
        };
        let mut candidate = base.clone();
        let mut n = 0;
        while seen.contains(&candidate) {
            candidate = format!("{base}_duplicated_{n}");
            n += 1;
        }
        seen.insert(candidate.clone());
        unique.push(candidate);
    }
    unique
}

fn require_file(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    Err(RouteError::Io(std::io::Error::new(
        std::io::ErrorKind::NotFound,
        format!("no such file: {}", path.display()),
    )))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn is_workbook(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| WORKBOOK_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

fn latin1_to_utf8(bytes: &[u8]) -> Vec<u8> {
    bytes.iter().map(|&b| b as char).collect::<String>().into_bytes()
}

fn first_sheet<RS: Read + Seek>(workbook: &mut calamine::Sheets<RS>) -> Result<Range<Data>> {
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| RouteError::InvalidData("workbook has no worksheet".into()))?;
    Ok(workbook.worksheet_range(&sheet_name)?)
}

/// Header row as column names, every following row as text cells. Empty
/// cells become nulls, as in the CSV reader.
fn range_to_frame(range: &Range<Data>) -> Result<DataFrame> {
    let mut rows = range.rows();
    let header = rows
        .next()
        .ok_or_else(|| RouteError::InvalidData("worksheet is empty".into()))?;
    let names = unique_column_names(
        header
            .iter()
            .map(|c| cell_text(c).unwrap_or_default().trim().to_string())
            .collect(),
    );

    let mut values: Vec<Vec<Option<String>>> = vec![Vec::new(); names.len()];
    for row in rows {
        for (i, column) in values.iter_mut().enumerate() {
            column.push(row.get(i).and_then(cell_text));
        }
    }

    let columns = names
        .into_iter()
        .zip(values)
        .map(|(name, cells)| Column::new(name.into(), cells))
        .collect();
    Ok(DataFrame::new(columns)?)
}

fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        _ => Some(cell.to_string()),
    }
}

/// Trimmed text of a cell, or `None` when the cell is missing or blank.
pub fn present(cell: Option<&str>) -> Option<&str> {
    cell.map(str::trim).filter(|s| !s.is_empty())
}

/// One row of a table, addressed by column index.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    index: usize,
    cells: Vec<Option<String>>,
}

impl Row {
    pub fn new(index: usize, cells: Vec<Option<String>>) -> Self {
        Self { index, cells }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Trimmed, non-empty text of a cell.
    pub fn text(&self, column: usize) -> Option<&str> {
        present(self.cells.get(column)?.as_deref())
    }

    /// Every non-empty cell with its column index, in column order.
    pub fn present_cells(&self) -> impl Iterator<Item = (usize, &str)> + '_ {
        (0..self.cells.len()).filter_map(|i| self.text(i).map(|t| (i, t)))
    }
}
