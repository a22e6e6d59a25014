use serde::Serialize;
use time::Date;

use crate::error::MetricsError;
use crate::series::{Record, TimeSeries};

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// Summary figures for one value column of a [`TimeSeries`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryMetrics {
    pub start_value: f64,
    pub latest_value: f64,
    /// `latest_value - start_value`.
    pub total_gain: f64,
    /// `total_gain / start_value`, as a decimal (-0.02 means -2%).
    pub percentage_gain: f64,
    pub record_count: usize,
    #[serde(with = "iso_date")]
    pub start_date: Date,
    #[serde(with = "iso_date")]
    pub latest_date: Date,
}

/// Sum of one delta column across the whole series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contribution {
    pub column: String,
    pub total: f64,
    /// Number of non-blank cells that went into `total`.
    pub observations: usize,
}

/// Computes the summary metrics of `column`.
///
/// The first record is the baseline and the last record is the latest value.
///
/// # Errors
/// * [`MetricsError::InsufficientData`] when the series has fewer than two records.
/// * [`MetricsError::MissingColumn`] when `column` is not part of the series.
/// * [`MetricsError::MissingValue`] when the baseline or latest cell is blank.
/// * [`MetricsError::DivisionByZero`] when the baseline value is zero.
pub fn summarize(series: &TimeSeries, column: &str) -> Result<SummaryMetrics, MetricsError> {
    let record_count = series.len();
    // A single point cannot express change.
    let [first, .., last] = series.records() else {
        return Err(MetricsError::InsufficientData { count: record_count });
    };
    if !series.has_column(column) {
        return Err(MetricsError::MissingColumn(column.to_string()));
    }

    let value_on = |record: &Record| {
        record.value(column).ok_or_else(|| MetricsError::MissingValue {
            column: column.to_string(),
            date: record.date,
        })
    };
    let start_value = value_on(first)?;
    let latest_value = value_on(last)?;

    let total_gain = latest_value - start_value;
    if start_value == 0.0 {
        return Err(MetricsError::DivisionByZero { total_gain });
    }

    Ok(SummaryMetrics {
        start_value,
        latest_value,
        total_gain,
        percentage_gain: total_gain / start_value,
        record_count,
        start_date: first.date,
        latest_date: last.date,
    })
}

/// Sums each of `columns` over the series, skipping blank cells.
///
/// Columns that are not part of the series are left out of the result.
pub fn contributions<S: AsRef<str>>(series: &TimeSeries, columns: &[S]) -> Vec<Contribution> {
    columns
        .iter()
        .filter_map(|name| {
            let name = name.as_ref();
            let values = series.column(name)?;
            let present: Vec<f64> = values.into_iter().flatten().collect();
            Some(Contribution {
                column: name.to_string(),
                total: present.iter().sum(),
                observations: present.len(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::tests::{make_record, make_series};
    use std::sync::Arc;
    use time::macros::date;

    #[test]
    fn test_summarize_losing_period() {
        let series = make_series(
            "Total",
            vec![
                (date!(2024 - 01 - 01), 100_000.0),
                (date!(2024 - 01 - 02), 105_000.0),
                (date!(2024 - 01 - 03), 98_000.0),
            ],
        );

        let metrics = summarize(&series, "Total").unwrap();
        assert!((metrics.start_value - 100_000.0).abs() < 1e-10);
        assert!((metrics.latest_value - 98_000.0).abs() < 1e-10);
        assert!((metrics.total_gain - -2_000.0).abs() < 1e-10);
        assert!((metrics.percentage_gain - -0.02).abs() < 1e-10);
        assert_eq!(metrics.record_count, 3);
        assert_eq!(metrics.start_date, date!(2024 - 01 - 01));
        assert_eq!(metrics.latest_date, date!(2024 - 01 - 03));
    }

    #[test]
    fn test_summarize_uses_date_order_not_source_order() {
        let series = make_series(
            "Total",
            vec![(date!(2024 - 03 - 01), 150.0), (date!(2024 - 01 - 01), 100.0)],
        );
        let metrics = summarize(&series, "Total").unwrap();
        assert!((metrics.start_value - 100.0).abs() < 1e-10);
        assert!((metrics.percentage_gain - 0.5).abs() < 1e-10);
    }

    #[test]
    fn test_summarize_short_series() {
        let empty = make_series("Total", vec![]);
        assert_eq!(
            summarize(&empty, "Total"),
            Err(MetricsError::InsufficientData { count: 0 })
        );

        let single = make_series("Total", vec![(date!(2024 - 01 - 01), 100.0)]);
        assert_eq!(
            summarize(&single, "Total"),
            Err(MetricsError::InsufficientData { count: 1 })
        );
    }

    #[test]
    fn test_summarize_checks_length_before_column() {
        let single = make_series("Total", vec![(date!(2024 - 01 - 01), 100.0)]);
        assert_eq!(
            summarize(&single, "Missing"),
            Err(MetricsError::InsufficientData { count: 1 })
        );

        let same_day = make_series(
            "Total",
            vec![(date!(2024 - 01 - 01), 100.0), (date!(2024 - 01 - 01), 110.0)],
        );
        let metrics = summarize(&same_day, "Total").unwrap();
        assert_eq!(metrics.record_count, 2);
        assert!((metrics.total_gain - 10.0).abs() < 1e-10);
    }

    #[test]
    fn test_summarize_zero_baseline() {
        let series = make_series(
            "Total",
            vec![(date!(2024 - 01 - 01), 0.0), (date!(2024 - 01 - 02), 500.0)],
        );
        assert_eq!(
            summarize(&series, "Total"),
            Err(MetricsError::DivisionByZero { total_gain: 500.0 })
        );
    }

    #[test]
    fn test_summarize_unknown_column() {
        let series = make_series(
            "Total",
            vec![(date!(2024 - 01 - 01), 1.0), (date!(2024 - 01 - 02), 2.0)],
        );
        assert_eq!(
            summarize(&series, "Other"),
            Err(MetricsError::MissingColumn("Other".to_string()))
        );
    }

    #[test]
    fn test_summarize_blank_latest_value() {
        let records = vec![
            make_record(date!(2024 - 01 - 01), vec![("Total", Some(1.0))]),
            make_record(date!(2024 - 01 - 02), vec![("Total", None)]),
        ];
        let series = TimeSeries::new("Date", vec![Arc::from("Total")], records);
        assert_eq!(
            summarize(&series, "Total"),
            Err(MetricsError::MissingValue {
                column: "Total".to_string(),
                date: date!(2024 - 01 - 02),
            })
        );
    }

    #[test]
    fn test_contributions_skip_blanks_and_unknown_columns() {
        let records = vec![
            make_record(date!(2024 - 01 - 01), vec![("A", Some(100.0)), ("B", None)]),
            make_record(date!(2024 - 01 - 02), vec![("A", Some(-40.0)), ("B", Some(25.0))]),
        ];
        let series = TimeSeries::new("Date", vec![Arc::from("A"), Arc::from("B")], records);

        let result = contributions(&series, &["A", "B", "C"]);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].column, "A");
        assert!((result[0].total - 60.0).abs() < 1e-10);
        assert_eq!(result[0].observations, 2);
        assert!((result[1].total - 25.0).abs() < 1e-10);
        assert_eq!(result[1].observations, 1);
    }

    #[test]
    fn test_metrics_serialize_iso_dates() {
        let series = make_series(
            "Total",
            vec![(date!(2024 - 01 - 01), 100.0), (date!(2024 - 01 - 05), 110.0)],
        );
        let metrics = summarize(&series, "Total").unwrap();
        let json = serde_json::to_value(&metrics).unwrap();
        assert_eq!(json["start_date"], "2024-01-01");
        assert_eq!(json["latest_date"], "2024-01-05");
        assert_eq!(json["record_count"], 2);
    }
}
