use polars::prelude::*;
use std::collections::HashMap;
use std::fs;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use time::format_description::{self, OwnedFormatItem};
use time::Date;
use tracing::{debug, info};

use crate::config::SourceConfig;
use crate::error::{CellParseError, LoadError};
use crate::series::{Record, TimeSeries, UNIX_EPOCH_JULIAN_DAY};
use crate::spreadsheet;

/// Loads the configured sheet into a [`TimeSeries`].
///
/// An empty file, or a sheet whose rows all lack a valid date, yields an empty
/// series rather than an error.
pub fn load(config: &SourceConfig) -> Result<TimeSeries, LoadError> {
    Loader::new(config.clone()).load()
}

/// Where the rows of the configured sheet come from.
#[derive(Debug, Clone, PartialEq)]
enum SheetSource {
    /// A CSV file holding exactly the configured sheet.
    Csv(PathBuf),
    /// An Excel or OpenDocument workbook; the sheet is looked up inside it.
    Spreadsheet(PathBuf),
}

/// Reads and validates one asset sheet described by a [`SourceConfig`].
#[derive(Debug, Clone)]
pub struct Loader {
    config: SourceConfig,
}

impl Loader {
    pub fn new(config: SourceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    pub fn load(&self) -> Result<TimeSeries, LoadError> {
        let source = resolve_sheet(&self.config)?;
        let formats = compile_date_formats(&self.config.date_formats)?;
        match source {
            SheetSource::Csv(path) => self.load_csv(&path, &formats),
            SheetSource::Spreadsheet(path) => self.load_spreadsheet(&path, &formats),
        }
    }

    fn load_csv(&self, path: &Path, formats: &[OwnedFormatItem]) -> Result<TimeSeries, LoadError> {
        let bytes = fs::read(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => LoadError::SourceNotFound {
                path: path.to_path_buf(),
            },
            _ => LoadError::unknown(path, e),
        })?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            info!(source = %path.display(), "asset sheet is empty");
            return Ok(self.empty_series());
        }

        let df = read_csv(bytes).map_err(|e| LoadError::unknown(path, e))?;
        parse_asset_df_with(&df, &self.config, formats, path)
    }

    fn load_spreadsheet(
        &self,
        path: &Path,
        formats: &[OwnedFormatItem],
    ) -> Result<TimeSeries, LoadError> {
        let range = spreadsheet::read_sheet(path, &self.config.sheet)?;
        let mut rows = range.rows();
        let Some(header) = rows.next() else {
            info!(source = %path.display(), sheet = %self.config.sheet, "asset sheet is empty");
            return Ok(self.empty_series());
        };

        let headers: Vec<String> = header.iter().map(|cell| cell.to_string()).collect();
        let rows = rows.map(|row| Ok(row.iter().map(spreadsheet::cell_value).collect()));
        build_series(&headers, rows, &self.config, formats, path)
    }

    fn empty_series(&self) -> TimeSeries {
        TimeSeries::empty(self.config.date_column.trim(), Vec::new())
    }
}

/// Parses an asset DataFrame into a [`TimeSeries`].
///
/// The DF must include the configured date column (UTF8 or polars `Date`) and
/// the configured value column. Every other column is read as numbers, either
/// native numeric cells or UTF8 text such as `"105,000"`. Rows without a
/// parseable date are dropped.
///
/// # Errors
/// Returns [`LoadError::Schema`] if a required column is missing and
/// [`LoadError::Unknown`] if a numeric cell cannot be read. `origin` only
/// names the data in error messages.
pub fn parse_asset_df(
    df: &DataFrame,
    config: &SourceConfig,
    origin: &Path,
) -> Result<TimeSeries, LoadError> {
    let formats = compile_date_formats(&config.date_formats)?;
    parse_asset_df_with(df, config, &formats, origin)
}

fn parse_asset_df_with(
    df: &DataFrame,
    config: &SourceConfig,
    formats: &[OwnedFormatItem],
    origin: &Path,
) -> Result<TimeSeries, LoadError> {
    let headers: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    let columns = df.get_columns();
    let rows = (0..df.height()).map(|i| {
        columns
            .iter()
            .map(|col| col.get(i))
            .collect::<PolarsResult<Vec<_>>>()
            .map_err(|e| LoadError::unknown(origin, e))
    });
    build_series(&headers, rows, config, formats, origin)
}

/// Turns a header plus rows of cells into a [`TimeSeries`], whatever the backend.
///
/// Header names are compared after trimming. Columns with a blank header are
/// ignored.
fn build_series<'a, I>(
    headers: &[String],
    rows: I,
    config: &SourceConfig,
    formats: &[OwnedFormatItem],
    origin: &Path,
) -> Result<TimeSeries, LoadError>
where
    I: IntoIterator<Item = Result<Vec<AnyValue<'a>>, LoadError>>,
{
    let headers: Vec<&str> = headers.iter().map(|h| h.trim()).collect();
    let date_name = config.date_column.trim();
    let value_name = config.value_column.trim();
    for required in [date_name, value_name] {
        if !headers.contains(&required) {
            return Err(LoadError::Schema(format!(
                "expected column `{}` in {}, found [{}]",
                required,
                origin.display(),
                headers.join(", ")
            )));
        }
    }

    let date_idx = headers
        .iter()
        .position(|h| *h == date_name)
        .unwrap_or_default();
    let value_columns: Vec<(usize, Arc<str>)> = headers
        .iter()
        .enumerate()
        .filter(|(idx, name)| *idx != date_idx && !name.is_empty())
        .map(|(idx, name)| (idx, Arc::from(*name)))
        .collect();

    let mut records = Vec::new();
    let mut dropped = 0usize;
    for (i, row) in rows.into_iter().enumerate() {
        let row = row?;
        let cell = |idx: usize| row.get(idx).cloned().unwrap_or(AnyValue::Null);

        let date_val = cell(date_idx);
        let Some(date) = parse_date_cell(&date_val, formats) else {
            debug!(row = i + 1, value = %date_val, "skipping row without a valid date");
            dropped += 1;
            continue;
        };

        let mut values = HashMap::with_capacity(value_columns.len());
        for (idx, name) in &value_columns {
            let value = parse_numeric_cell(&cell(*idx), i + 1, name)
                .map_err(|e| LoadError::unknown(origin, e))?;
            values.insert(name.clone(), value);
        }
        records.push(Record { date, values });
    }

    info!(
        source = %origin.display(),
        records = records.len(),
        dropped,
        "loaded asset sheet"
    );

    let columns = value_columns.into_iter().map(|(_, name)| name).collect();
    Ok(TimeSeries::new(date_name, columns, records))
}

/// Decides which backend holds the configured sheet.
fn resolve_sheet(config: &SourceConfig) -> Result<SheetSource, LoadError> {
    let workbook = &config.workbook;
    if !workbook.exists() {
        return Err(LoadError::SourceNotFound {
            path: workbook.clone(),
        });
    }

    if workbook.is_dir() {
        let path = workbook.join(format!("{}.csv", config.sheet));
        if path.is_file() {
            return Ok(SheetSource::Csv(path));
        }
        let available = list_sheets(workbook).map_err(|e| LoadError::unknown(workbook, e))?;
        return Err(LoadError::Schema(format!(
            "sheet `{}` not found in workbook {}, available sheets: [{}]",
            config.sheet,
            workbook.display(),
            available.join(", ")
        )));
    }

    if spreadsheet::is_spreadsheet(workbook) {
        return Ok(SheetSource::Spreadsheet(workbook.clone()));
    }

    let stem = workbook.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    if stem == config.sheet {
        Ok(SheetSource::Csv(workbook.clone()))
    } else {
        Err(LoadError::Schema(format!(
            "sheet `{}` not found, {} holds sheet `{}`",
            config.sheet,
            workbook.display(),
            stem
        )))
    }
}

fn list_sheets(workbook: &Path) -> io::Result<Vec<String>> {
    let mut sheets = Vec::new();
    for entry in fs::read_dir(workbook)? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("csv")) {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                sheets.push(stem.to_string());
            }
        }
    }
    sheets.sort();
    Ok(sheets)
}

/// Reads every column as UTF8 so cell parsing stays under our control.
fn read_csv(bytes: Vec<u8>) -> PolarsResult<DataFrame> {
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .map_parse_options(|options| options.with_truncate_ragged_lines(true))
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()
}

fn compile_date_formats(formats: &[String]) -> Result<Vec<OwnedFormatItem>, LoadError> {
    formats
        .iter()
        .map(|format| {
            format_description::parse_owned::<2>(format).map_err(|e| {
                LoadError::Schema(format!("invalid date format `{}`: {}", format, e))
            })
        })
        .collect()
}

fn parse_date_cell(value: &AnyValue<'_>, formats: &[OwnedFormatItem]) -> Option<Date> {
    match value {
        AnyValue::String(s) => parse_date_str(s, formats),
        AnyValue::StringOwned(s) => parse_date_str(s.as_str(), formats),
        AnyValue::Date(days) => Date::from_julian_day(days + UNIX_EPOCH_JULIAN_DAY).ok(),
        _ => None,
    }
}

/// Tries each format in order on the trimmed text.
fn parse_date_str(text: &str, formats: &[OwnedFormatItem]) -> Option<Date> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    formats
        .iter()
        .find_map(|format| Date::parse(text, format).ok())
}

fn parse_numeric_cell(
    value: &AnyValue<'_>,
    row: usize,
    column: &str,
) -> Result<Option<f64>, CellParseError> {
    match value {
        AnyValue::Null => Ok(None),
        AnyValue::Float64(v) => Ok(Some(*v)),
        AnyValue::Float32(v) => Ok(Some(f64::from(*v))),
        AnyValue::Int64(v) => Ok(Some(*v as f64)),
        AnyValue::Int32(v) => Ok(Some(f64::from(*v))),
        AnyValue::UInt64(v) => Ok(Some(*v as f64)),
        AnyValue::UInt32(v) => Ok(Some(f64::from(*v))),
        AnyValue::String(s) => parse_number_str(s, row, column),
        AnyValue::StringOwned(s) => parse_number_str(s.as_str(), row, column),
        AnyValue::Boolean(_) | AnyValue::Date(_) => Err(CellParseError {
            row,
            column: column.to_string(),
            value: value.to_string(),
            source: None,
        }),
        other => other.extract::<f64>().map(Some).ok_or_else(|| CellParseError {
            row,
            column: column.to_string(),
            value: other.to_string(),
            source: None,
        }),
    }
}

/// Blank text is a missing value; `,` thousands separators are ignored.
fn parse_number_str(text: &str, row: usize, column: &str) -> Result<Option<f64>, CellParseError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .replace(',', "")
        .parse::<f64>()
        .map(Some)
        .map_err(|e| CellParseError {
            row,
            column: column.to_string(),
            value: text.to_string(),
            source: Some(e),
        })
}
