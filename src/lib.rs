//! Core of a personal asset dashboard.
//!
//! Loads a spreadsheet sheet of dated asset values into a date-ordered
//! [`TimeSeries`] and derives [`SummaryMetrics`] from it. Charts and page layout
//! live elsewhere and consume these values as plain data.

pub mod config;
pub mod error;
pub mod input_handler;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod series;
mod spreadsheet;

#[cfg(feature = "python")]
mod python;

pub use config::SourceConfig;
pub use error::{CellParseError, ConfigError, DashboardError, ErrorKind, LoadError, MetricsError};
pub use input_handler::{load, parse_asset_df, Loader};
pub use metrics::{contributions, summarize, Contribution, SummaryMetrics};
pub use pipeline::{run, Dashboard};
pub use series::{Record, TimeSeries};
