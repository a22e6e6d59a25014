use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Describes where the asset sheet lives and how its columns are named.
///
/// A workbook is an Excel or OpenDocument file (`.xlsx`, `.xlsm`, `.xlsb`,
/// `.xls`, `.ods`), a directory holding one `<sheet>.csv` file per sheet, or a
/// single CSV file whose stem is the sheet name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub workbook: PathBuf,
    pub sheet: String,
    pub date_column: String,
    /// The "total asset" column used for summary metrics.
    pub value_column: String,
    /// Optional per-category daily change columns.
    pub delta_columns: Vec<String>,
    /// `time` format descriptions, tried in order.
    pub date_formats: Vec<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            workbook: PathBuf::from("Finance_Record.xlsx"),
            sheet: "工作表1".to_string(),
            date_column: "日期".to_string(),
            value_column: "總資產 (元)".to_string(),
            delta_columns: vec![
                "資產一 每日變化 (元)".to_string(),
                "資產二 每日變化 (元)".to_string(),
            ],
            date_formats: vec![
                "[year]-[month padding:none]-[day padding:none]".to_string(),
                "[year]-[month padding:none]-[day padding:none] [hour]:[minute]:[second]"
                    .to_string(),
                "[year]-[month padding:none]-[day padding:none]T[hour]:[minute]:[second]"
                    .to_string(),
                "[year]/[month padding:none]/[day padding:none]".to_string(),
                "[month padding:none]/[day padding:none]/[year]".to_string(),
            ],
        }
    }
}

impl SourceConfig {
    /// Reads a JSON config file. Fields not present keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(config)
    }

    pub fn with_workbook(mut self, workbook: impl Into<PathBuf>) -> Self {
        self.workbook = workbook.into();
        self
    }

    pub fn with_sheet(mut self, sheet: impl Into<String>) -> Self {
        self.sheet = sheet.into();
        self
    }

    pub fn with_date_column(mut self, column: impl Into<String>) -> Self {
        self.date_column = column.into();
        self
    }

    pub fn with_value_column(mut self, column: impl Into<String>) -> Self {
        self.value_column = column.into();
        self
    }

    pub fn with_delta_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.delta_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_date_formats<I, S>(mut self, formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.date_formats = formats.into_iter().map(Into::into).collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_finance_record() {
        let config = SourceConfig::default();
        assert_eq!(config.workbook, PathBuf::from("Finance_Record.xlsx"));
        assert_eq!(config.sheet, "工作表1");
        assert_eq!(config.date_column, "日期");
        assert_eq!(config.value_column, "總資產 (元)");
        assert_eq!(config.delta_columns.len(), 2);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"sheet": "Sheet1", "date_column": "Date"}}"#).unwrap();

        let config = SourceConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.sheet, "Sheet1");
        assert_eq!(config.date_column, "Date");
        // Untouched fields fall back to the defaults.
        assert_eq!(config.value_column, "總資產 (元)");
        assert_eq!(config.date_formats, SourceConfig::default().date_formats);
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();

        let result = SourceConfig::from_json_file(file.path());
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_missing_config_is_io_error() {
        let result = SourceConfig::from_json_file("does/not/exist.json");
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_builders_override_fields() {
        let config = SourceConfig::default()
            .with_workbook("data")
            .with_sheet("Assets")
            .with_value_column("Total")
            .with_delta_columns(["A", "B", "C"]);
        assert_eq!(config.workbook, PathBuf::from("data"));
        assert_eq!(config.sheet, "Assets");
        assert_eq!(config.value_column, "Total");
        assert_eq!(config.delta_columns, vec!["A", "B", "C"]);
    }
}
