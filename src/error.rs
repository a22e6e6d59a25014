use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use time::Date;

/// Flat tag shared by every error the core can surface, so callers can branch
/// on the failure without matching messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    SourceNotFound,
    SchemaError,
    UnknownLoadError,
    InsufficientDataError,
    DivisionByZeroError,
    MissingValue,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::SourceNotFound => "SourceNotFound",
            ErrorKind::SchemaError => "SchemaError",
            ErrorKind::UnknownLoadError => "UnknownLoadError",
            ErrorKind::InsufficientDataError => "InsufficientDataError",
            ErrorKind::DivisionByZeroError => "DivisionByZeroError",
            ErrorKind::MissingValue => "MissingValue",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A numeric cell that could not be read as a number.
#[derive(Debug, Error)]
#[error("row {row}, column `{column}`: cannot read `{value}` as a number")]
pub struct CellParseError {
    /// 1-indexed data row, header excluded.
    pub row: usize,
    pub column: String,
    pub value: String,
    #[source]
    pub source: Option<std::num::ParseFloatError>,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("source not found: {}", path.display())]
    SourceNotFound { path: PathBuf },

    #[error("schema error: {0}")]
    Schema(String),

    #[error("failed to load {}: {source}", path.display())]
    Unknown {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl LoadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LoadError::SourceNotFound { .. } => ErrorKind::SourceNotFound,
            LoadError::Schema(_) => ErrorKind::SchemaError,
            LoadError::Unknown { .. } => ErrorKind::UnknownLoadError,
        }
    }

    pub(crate) fn unknown(
        path: impl Into<PathBuf>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        LoadError::Unknown {
            path: path.into(),
            source: source.into(),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum MetricsError {
    #[error("insufficient data: need at least 2 records, found {count}")]
    InsufficientData { count: usize },

    #[error("column `{0}` is not present in the series")]
    MissingColumn(String),

    #[error("column `{column}` has no value on {date}")]
    MissingValue { column: String, date: Date },

    #[error("baseline value is zero, percentage gain is undefined (total gain {total_gain})")]
    DivisionByZero { total_gain: f64 },
}

impl MetricsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MetricsError::InsufficientData { .. } => ErrorKind::InsufficientDataError,
            MetricsError::MissingColumn(_) => ErrorKind::SchemaError,
            MetricsError::MissingValue { .. } => ErrorKind::MissingValue,
            MetricsError::DivisionByZero { .. } => ErrorKind::DivisionByZeroError,
        }
    }
}

/// Everything a single load-then-summarize cycle can fail with.
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Metrics(#[from] MetricsError),
}

impl DashboardError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DashboardError::Load(error) => error.kind(),
            DashboardError::Metrics(error) => error.kind(),
        }
    }
}
