use pyo3::create_exception;
use pyo3::exceptions::PyException;
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyType};
use pyo3_polars::PyDataFrame;

use crate::config::SourceConfig;
use crate::error::{ErrorKind, LoadError, MetricsError};
use crate::input_handler::Loader;
use crate::metrics::{contributions, summarize, SummaryMetrics};
use crate::series::TimeSeries;

create_exception!(asset_tracker, AssetTrackerError, PyException);
create_exception!(asset_tracker, SourceNotFoundError, AssetTrackerError);
create_exception!(asset_tracker, SchemaError, AssetTrackerError);
create_exception!(asset_tracker, UnknownLoadError, AssetTrackerError);
create_exception!(asset_tracker, InsufficientDataError, AssetTrackerError);
create_exception!(asset_tracker, DivisionByZeroError, AssetTrackerError);
create_exception!(asset_tracker, MissingValueError, AssetTrackerError);

/// Python exception class name raised for each error kind.
fn exception_name(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::SourceNotFound => "SourceNotFoundError",
        ErrorKind::SchemaError => "SchemaError",
        ErrorKind::UnknownLoadError => "UnknownLoadError",
        ErrorKind::InsufficientDataError => "InsufficientDataError",
        ErrorKind::DivisionByZeroError => "DivisionByZeroError",
        ErrorKind::MissingValue => "MissingValueError",
    }
}

const ERROR_KINDS: [ErrorKind; 6] = [
    ErrorKind::SourceNotFound,
    ErrorKind::SchemaError,
    ErrorKind::UnknownLoadError,
    ErrorKind::InsufficientDataError,
    ErrorKind::DivisionByZeroError,
    ErrorKind::MissingValue,
];

fn exception_type(py: Python<'_>, kind: ErrorKind) -> Bound<'_, PyType> {
    match kind {
        ErrorKind::SourceNotFound => py.get_type::<SourceNotFoundError>(),
        ErrorKind::SchemaError => py.get_type::<SchemaError>(),
        ErrorKind::UnknownLoadError => py.get_type::<UnknownLoadError>(),
        ErrorKind::InsufficientDataError => py.get_type::<InsufficientDataError>(),
        ErrorKind::DivisionByZeroError => py.get_type::<DivisionByZeroError>(),
        ErrorKind::MissingValue => py.get_type::<MissingValueError>(),
    }
}

fn new_exception(kind: ErrorKind, message: String) -> PyErr {
    match kind {
        ErrorKind::SourceNotFound => SourceNotFoundError::new_err(message),
        ErrorKind::SchemaError => SchemaError::new_err(message),
        ErrorKind::UnknownLoadError => UnknownLoadError::new_err(message),
        ErrorKind::InsufficientDataError => InsufficientDataError::new_err(message),
        ErrorKind::DivisionByZeroError => DivisionByZeroError::new_err(message),
        ErrorKind::MissingValue => MissingValueError::new_err(message),
    }
}

impl From<LoadError> for PyErr {
    fn from(error: LoadError) -> Self {
        new_exception(error.kind(), error.to_string())
    }
}

impl From<MetricsError> for PyErr {
    fn from(error: MetricsError) -> Self {
        new_exception(error.kind(), error.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
enum MetricField {
    Float(f64),
    Count(usize),
    Date(String),
}

/// Entries of the dict returned by `TimeSeries.summarize`, in insertion order.
fn summary_fields(metrics: &SummaryMetrics) -> Vec<(&'static str, MetricField)> {
    vec![
        ("start_value", MetricField::Float(metrics.start_value)),
        ("latest_value", MetricField::Float(metrics.latest_value)),
        ("total_gain", MetricField::Float(metrics.total_gain)),
        ("percentage_gain", MetricField::Float(metrics.percentage_gain)),
        ("record_count", MetricField::Count(metrics.record_count)),
        ("start_date", MetricField::Date(metrics.start_date.to_string())),
        ("latest_date", MetricField::Date(metrics.latest_date.to_string())),
    ]
}

fn build_config(
    workbook: &str,
    sheet: &str,
    date_column: Option<&str>,
    value_column: Option<&str>,
    date_formats: Option<Vec<String>>,
    delta_columns: Option<Vec<String>>,
) -> SourceConfig {
    let mut config = SourceConfig::default().with_workbook(workbook).with_sheet(sheet);
    if let Some(column) = date_column {
        config = config.with_date_column(column);
    }
    if let Some(column) = value_column {
        config = config.with_value_column(column);
    }
    if let Some(formats) = date_formats {
        config = config.with_date_formats(formats);
    }
    if let Some(columns) = delta_columns {
        config = config.with_delta_columns(columns);
    }
    config
}

/// Python wrapper for a loaded asset series
#[pyclass(name = "TimeSeries")]
struct PyTimeSeries {
    series: TimeSeries,
    value_column: String,
    delta_columns: Vec<String>,
}

impl PyTimeSeries {
    fn summary(&self, column: Option<&str>) -> Result<SummaryMetrics, MetricsError> {
        summarize(&self.series, column.unwrap_or(&self.value_column))
    }
}

#[pymethods]
impl PyTimeSeries {
    fn __len__(&self) -> usize {
        self.series.len()
    }

    fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Field names in sheet order, without the date column
    fn columns(&self) -> Vec<String> {
        self.series.columns().iter().map(|c| c.to_string()).collect()
    }

    /// The series as a Polars DataFrame with a Date column first
    fn to_polars(&self) -> PyResult<PyDataFrame> {
        let df = self.series.to_dataframe().map_err(|e| {
            PyErr::new::<pyo3::exceptions::PyRuntimeError, _>(format!(
                "Error building DataFrame: {}",
                e
            ))
        })?;
        Ok(PyDataFrame(df))
    }

    /// Summary metrics for `column` (defaults to the configured value column)
    ///
    /// Returns:
    ///     Dictionary with start_value, latest_value, total_gain,
    ///     percentage_gain, record_count, start_date and latest_date
    #[pyo3(signature = (column=None))]
    fn summarize<'py>(&self, py: Python<'py>, column: Option<&str>) -> PyResult<Bound<'py, PyDict>> {
        let metrics = self.summary(column)?;

        let metrics_dict = PyDict::new(py);
        for (key, field) in summary_fields(&metrics) {
            match field {
                MetricField::Float(v) => metrics_dict.set_item(key, v)?,
                MetricField::Count(v) => metrics_dict.set_item(key, v)?,
                MetricField::Date(v) => metrics_dict.set_item(key, v)?,
            }
        }
        Ok(metrics_dict)
    }

    /// Sum of each delta column, keyed by column name
    fn contributions<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyDict>> {
        let totals = PyDict::new(py);
        for contribution in contributions(&self.series, &self.delta_columns) {
            totals.set_item(contribution.column, contribution.total)?;
        }
        Ok(totals)
    }
}

/// Load an asset sheet
///
/// Args:
///     workbook: xlsx/ods workbook, directory of per-sheet CSV files, or a single CSV file
///     sheet: sheet name
///     date_column: date column name (default "日期")
///     value_column: total asset column name (default "總資產 (元)")
///     date_formats: `time` format descriptions tried in order
///     delta_columns: per-asset daily change columns
#[pyfunction]
#[pyo3(signature = (workbook, sheet, date_column=None, value_column=None, date_formats=None, delta_columns=None))]
fn load(
    workbook: &str,
    sheet: &str,
    date_column: Option<&str>,
    value_column: Option<&str>,
    date_formats: Option<Vec<String>>,
    delta_columns: Option<Vec<String>>,
) -> PyResult<PyTimeSeries> {
    let config = build_config(
        workbook,
        sheet,
        date_column,
        value_column,
        date_formats,
        delta_columns,
    );

    let series = Loader::new(config.clone()).load()?;
    Ok(PyTimeSeries {
        series,
        value_column: config.value_column,
        delta_columns: config.delta_columns,
    })
}

/// A Python module implemented in Rust using PyO3.
#[pymodule]
fn asset_tracker(m: &Bound<'_, PyModule>) -> PyResult<()> {
    let py = m.py();
    m.add_class::<PyTimeSeries>()?;
    m.add_function(wrap_pyfunction!(load, m)?)?;
    m.add("AssetTrackerError", py.get_type::<AssetTrackerError>())?;
    for kind in ERROR_KINDS {
        m.add(exception_name(kind), exception_type(py, kind))?;
    }
    Ok(())
}
