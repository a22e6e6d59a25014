use polars::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use time::Date;

/// Julian day number of 1970-01-01, the epoch of polars' `Date` type.
pub(crate) const UNIX_EPOCH_JULIAN_DAY: i32 = 2_440_588;

/// One dated row of the asset sheet. A `None` value is a blank cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub date: Date,
    pub values: HashMap<Arc<str>, Option<f64>>,
}

impl Record {
    pub fn value(&self, column: &str) -> Option<f64> {
        self.values.get(column).copied().flatten()
    }
}

/// Date-ordered asset records.
///
/// Records are sorted ascending by date. Records sharing a date are all kept,
/// in the order they appeared in the source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeSeries {
    date_column: Arc<str>,
    columns: Vec<Arc<str>>,
    records: Vec<Record>,
}

impl TimeSeries {
    /// Builds a series, sorting `records` by date.
    pub fn new(
        date_column: impl Into<Arc<str>>,
        columns: Vec<Arc<str>>,
        mut records: Vec<Record>,
    ) -> Self {
        // Stable, so equal dates keep source order.
        records.sort_by_key(|record| record.date);
        Self {
            date_column: date_column.into(),
            columns,
            records,
        }
    }

    /// A series with a header but no rows.
    pub fn empty(date_column: impl Into<Arc<str>>, columns: Vec<Arc<str>>) -> Self {
        Self::new(date_column, columns, Vec::new())
    }

    pub fn date_column(&self) -> &str {
        &self.date_column
    }

    /// Field names in source header order, excluding the date column.
    pub fn columns(&self) -> &[Arc<str>] {
        &self.columns
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| &**c == column)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    pub fn first(&self) -> Option<&Record> {
        self.records.first()
    }

    pub fn last(&self) -> Option<&Record> {
        self.records.last()
    }

    pub fn dates(&self) -> impl Iterator<Item = Date> + '_ {
        self.records.iter().map(|record| record.date)
    }

    /// Earliest and latest date, if the series is not empty.
    pub fn date_range(&self) -> Option<(Date, Date)> {
        Some((self.first()?.date, self.last()?.date))
    }

    /// All values of one column in date order, or `None` if the column is unknown.
    pub fn column(&self, column: &str) -> Option<Vec<Option<f64>>> {
        if !self.has_column(column) {
            return None;
        }
        Some(self.records.iter().map(|r| r.value(column)).collect())
    }

    /// Converts the series into a polars `DataFrame` for the presentation layer.
    ///
    /// The first column holds the dates (polars `Date`), followed by one
    /// `Float64` column per field in header order.
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let days: Vec<i32> = self
            .records
            .iter()
            .map(|record| record.date.to_julian_day() - UNIX_EPOCH_JULIAN_DAY)
            .collect();
        let dates = Series::new(PlSmallStr::from(&*self.date_column), days).cast(&DataType::Date)?;

        let mut columns = Vec::with_capacity(self.columns.len() + 1);
        columns.push(Column::from(dates));
        for name in &self.columns {
            let values: Vec<Option<f64>> = self.records.iter().map(|r| r.value(name)).collect();
            columns.push(Column::from(Series::new(PlSmallStr::from(&**name), values)));
        }
        DataFrame::new(columns)
    }
}

impl<'a> IntoIterator for &'a TimeSeries {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use time::macros::date;

    /// Helper method to create a Record instance.
    pub(crate) fn make_record(date: Date, values: Vec<(&str, Option<f64>)>) -> Record {
        let values = values
            .into_iter()
            .map(|(name, value)| (Arc::from(name), value))
            .collect();
        Record { date, values }
    }

    /// Helper method to create a single-column series.
    pub(crate) fn make_series(column: &str, rows: Vec<(Date, f64)>) -> TimeSeries {
        let records = rows
            .into_iter()
            .map(|(date, value)| make_record(date, vec![(column, Some(value))]))
            .collect();
        TimeSeries::new("Date", vec![Arc::from(column)], records)
    }

    #[test]
    fn test_new_sorts_by_date() {
        let series = make_series(
            "Total",
            vec![
                (date!(2024 - 01 - 03), 3.0),
                (date!(2024 - 01 - 01), 1.0),
                (date!(2024 - 01 - 02), 2.0),
            ],
        );
        let dates: Vec<Date> = series.dates().collect();
        assert_eq!(
            dates,
            vec![date!(2024 - 01 - 01), date!(2024 - 01 - 02), date!(2024 - 01 - 03)]
        );
        assert_eq!(
            series.date_range(),
            Some((date!(2024 - 01 - 01), date!(2024 - 01 - 03)))
        );
    }

    #[test]
    fn test_duplicate_dates_keep_source_order() {
        let series = make_series(
            "Total",
            vec![
                (date!(2024 - 01 - 02), 20.0),
                (date!(2024 - 01 - 01), 10.0),
                (date!(2024 - 01 - 02), 21.0),
            ],
        );
        assert_eq!(series.len(), 3);
        assert_eq!(
            series.column("Total").unwrap(),
            vec![Some(10.0), Some(20.0), Some(21.0)]
        );
    }

    #[test]
    fn test_empty_series() {
        let series = TimeSeries::empty("Date", vec![Arc::from("Total")]);
        assert!(series.is_empty());
        assert_eq!(series.len(), 0);
        assert_eq!(series.date_range(), None);
        assert!(series.has_column("Total"));
        assert_eq!(series.column("Total"), Some(Vec::new()));
        assert_eq!(series.column("Other"), None);
    }

    #[test]
    fn test_to_dataframe() {
        let records = vec![
            make_record(date!(1970 - 01 - 02), vec![("Total", Some(1.5)), ("Delta", None)]),
            make_record(date!(1970 - 01 - 01), vec![("Total", Some(1.0)), ("Delta", Some(0.5))]),
        ];
        let series = TimeSeries::new(
            "Date",
            vec![Arc::from("Total"), Arc::from("Delta")],
            records,
        );

        let df = series.to_dataframe().unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.width(), 3);
        assert_eq!(df.column("Date").unwrap().dtype(), &DataType::Date);

        let days = df.column("Date").unwrap().cast(&DataType::Int32).unwrap();
        let days = days.i32().unwrap();
        assert_eq!(days.get(0), Some(0));
        assert_eq!(days.get(1), Some(1));

        let delta = df.column("Delta").unwrap().f64().unwrap();
        assert_eq!(delta.get(0), Some(0.5));
        assert_eq!(delta.get(1), None);
    }
}
