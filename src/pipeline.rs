use tracing::warn;

use crate::config::SourceConfig;
use crate::error::DashboardError;
use crate::input_handler::Loader;
use crate::metrics::{contributions, summarize, Contribution, SummaryMetrics};
use crate::series::TimeSeries;

/// Everything the presentation layer needs for one render cycle.
#[derive(Debug, Clone)]
pub struct Dashboard {
    pub series: TimeSeries,
    pub metrics: SummaryMetrics,
    pub contributions: Vec<Contribution>,
}

/// Loads the configured sheet and summarizes its value column.
///
/// Nothing is cached: every call re-reads the source.
pub fn run(config: &SourceConfig) -> Result<Dashboard, DashboardError> {
    let series = Loader::new(config.clone()).load()?;
    let metrics = summarize(&series, &config.value_column).inspect_err(|error| {
        warn!(%error, records = series.len(), "cannot summarize asset sheet");
    })?;
    let contributions = contributions(&series, &config.delta_columns);

    Ok(Dashboard {
        series,
        metrics,
        contributions,
    })
}
