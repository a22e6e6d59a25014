use calamine::{open_workbook_auto, Data, Range, Reader};
use polars::prelude::AnyValue;
use std::path::Path;
use tracing::debug;

use crate::error::LoadError;

/// Excel serial number of 1970-01-01 in the 1900 date system.
const EXCEL_UNIX_EPOCH: f64 = 25_569.0;

const SPREADSHEET_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Whether `path` names a workbook format calamine can open.
pub(crate) fn is_spreadsheet(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SPREADSHEET_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// Reads one worksheet of an Excel or OpenDocument workbook.
///
/// # Errors
/// [`LoadError::Schema`] if the workbook has no sheet called `sheet`, with the
/// sheets it does have. [`LoadError::Unknown`] if the file cannot be decoded.
pub(crate) fn read_sheet(path: &Path, sheet: &str) -> Result<Range<Data>, LoadError> {
    let mut workbook = open_workbook_auto(path).map_err(|e| LoadError::unknown(path, e))?;
    let available = workbook.sheet_names();
    if !available.iter().any(|name| name == sheet) {
        return Err(LoadError::Schema(format!(
            "sheet `{}` not found in workbook {}, available sheets: [{}]",
            sheet,
            path.display(),
            available.join(", ")
        )));
    }

    let range = workbook
        .worksheet_range(sheet)
        .map_err(|e| LoadError::unknown(path, e))?;
    debug!(source = %path.display(), sheet, rows = range.height(), "read worksheet");
    Ok(range)
}

/// Maps a worksheet cell onto the polars value the row parser understands.
pub(crate) fn cell_value(cell: &Data) -> AnyValue<'_> {
    match cell {
        Data::Empty => AnyValue::Null,
        Data::Int(v) => AnyValue::Int64(*v),
        Data::Float(v) => AnyValue::Float64(*v),
        Data::Bool(v) => AnyValue::Boolean(*v),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => AnyValue::String(s),
        Data::DateTime(dt) => AnyValue::Date(excel_serial_to_days(dt.as_f64())),
        Data::Error(e) => AnyValue::StringOwned(e.to_string().into()),
    }
}

/// Days since the Unix epoch for an Excel serial date; the time of day is dropped.
fn excel_serial_to_days(serial: f64) -> i32 {
    (serial.floor() - EXCEL_UNIX_EPOCH) as i32
}
