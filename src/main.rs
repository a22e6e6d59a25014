use asset_tracker::error::ErrorKind;
use asset_tracker::logging::init_logging;
use asset_tracker::{ConfigError, Dashboard, DashboardError, SourceConfig};
use clap::{Parser, ValueEnum};
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;
use thiserror::Error;

/// Personal asset tracker
///
/// Loads a sheet of dated asset values and prints the latest total, the
/// accumulated gain and the per-asset contributions.
#[derive(Debug, Parser)]
#[command(name = "asset_tracker", version, about = "Personal asset tracker")]
struct Cli {
    /// JSON config file; flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// xlsx/xls/ods workbook, a directory of per-sheet CSV files, or one CSV file.
    #[arg(long)]
    workbook: Option<PathBuf>,

    #[arg(long)]
    sheet: Option<String>,

    #[arg(long)]
    date_column: Option<String>,

    #[arg(long)]
    value_column: Option<String>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Also print every record.
    #[arg(long)]
    show_records: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Dashboard(#[from] DashboardError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl CliError {
    fn exit_code(&self) -> u8 {
        match self {
            CliError::Config(_) => 2,
            CliError::Serialization(_) => 4,
            CliError::Dashboard(error) => match error.kind() {
                ErrorKind::SourceNotFound => 10,
                ErrorKind::SchemaError => 11,
                ErrorKind::UnknownLoadError => 12,
                ErrorKind::InsufficientDataError => 13,
                ErrorKind::DivisionByZeroError => 14,
                ErrorKind::MissingValue => 15,
            },
        }
    }
}

fn main() -> ExitCode {
    init_logging();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error}");
            if let CliError::Dashboard(dashboard) = &error {
                eprintln!("kind: {}", dashboard.kind());
                let config = build_config(&cli).unwrap_or_default();
                eprintln!("{}", remediation_hint(&config));
            }
            ExitCode::from(error.exit_code())
        }
    }
}

fn run(cli: &Cli) -> Result<(), CliError> {
    let config = build_config(cli)?;
    let dashboard = asset_tracker::run(&config)?;
    match cli.format {
        OutputFormat::Table => print_table(&dashboard, cli.show_records),
        OutputFormat::Json => print_json(&dashboard, cli.show_records)?,
    }
    Ok(())
}

fn build_config(cli: &Cli) -> Result<SourceConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => SourceConfig::from_json_file(path)?,
        None => SourceConfig::default(),
    };
    if let Some(workbook) = &cli.workbook {
        config = config.with_workbook(workbook);
    }
    if let Some(sheet) = &cli.sheet {
        config = config.with_sheet(sheet);
    }
    if let Some(column) = &cli.date_column {
        config = config.with_date_column(column);
    }
    if let Some(column) = &cli.value_column {
        config = config.with_value_column(column);
    }
    Ok(config)
}

fn remediation_hint(config: &SourceConfig) -> String {
    format!(
        "Please check:\n\
         1. the workbook {} exists and is readable\n\
         2. the sheet is named `{}`\n\
         3. the sheet has at least two rows with a valid `{}` date and `{}` value",
        config.workbook.display(),
        config.sheet,
        config.date_column,
        config.value_column
    )
}

fn print_table(dashboard: &Dashboard, show_records: bool) {
    let metrics = &dashboard.metrics;
    println!("Latest total assets : {}", group_thousands(metrics.latest_value));
    println!(
        "Total gain          : {} ({:+.2}%)",
        group_thousands(metrics.total_gain),
        metrics.percentage_gain * 100.0
    );
    println!("Recorded days       : {}", metrics.record_count);
    println!("Period              : {} .. {}", metrics.start_date, metrics.latest_date);

    if !dashboard.contributions.is_empty() {
        println!();
        for contribution in &dashboard.contributions {
            println!(
                "{:<20}: {}",
                contribution.column,
                group_thousands(contribution.total)
            );
        }
    }

    if show_records {
        let series = &dashboard.series;
        println!();
        let header: Vec<&str> = series.columns().iter().map(|c| &**c).collect();
        println!("{}\t{}", series.date_column(), header.join("\t"));
        for record in series {
            let cells: Vec<String> = series
                .columns()
                .iter()
                .map(|c| record.value(c).map(group_thousands).unwrap_or_default())
                .collect();
            println!("{}\t{}", record.date, cells.join("\t"));
        }
    }
}

fn print_json(dashboard: &Dashboard, show_records: bool) -> Result<(), serde_json::Error> {
    let mut output = json!({
        "metrics": dashboard.metrics,
        "contributions": dashboard.contributions,
    });
    if show_records {
        let series = &dashboard.series;
        let records: Vec<_> = series
            .iter()
            .map(|record| {
                let mut row = serde_json::Map::new();
                row.insert(series.date_column().to_string(), json!(record.date.to_string()));
                for column in series.columns() {
                    row.insert(column.to_string(), json!(record.value(column)));
                }
                serde_json::Value::Object(row)
            })
            .collect();
        output["records"] = serde_json::Value::Array(records);
    }
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Formats a value rounded to whole units with `,` separators, e.g. `-1,234,568`.
fn group_thousands(value: f64) -> String {
    let rounded = format!("{:.0}", value.abs());
    let mut grouped = String::with_capacity(rounded.len() + rounded.len() / 3 + 1);
    for (i, digit) in rounded.chars().enumerate() {
        if i > 0 && (rounded.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    if value.is_sign_negative() && rounded != "0" {
        grouped.insert(0, '-');
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0.0), "0");
        assert_eq!(group_thousands(999.4), "999");
        assert_eq!(group_thousands(1_000.0), "1,000");
        assert_eq!(group_thousands(98_000.0), "98,000");
        assert_eq!(group_thousands(-2_000.0), "-2,000");
        assert_eq!(group_thousands(1_234_567.8), "1,234,568");
        assert_eq!(group_thousands(-0.2), "0");
    }

    #[test]
    fn test_flags_override_defaults() {
        let cli = Cli::parse_from([
            "asset_tracker",
            "--workbook",
            "data",
            "--sheet",
            "Sheet1",
            "--value-column",
            "Total",
        ]);
        let config = build_config(&cli).unwrap();
        assert_eq!(config.workbook, PathBuf::from("data"));
        assert_eq!(config.sheet, "Sheet1");
        assert_eq!(config.value_column, "Total");
        assert_eq!(config.date_column, SourceConfig::default().date_column);
    }

    #[test]
    fn test_exit_codes_follow_kind() {
        let error = CliError::from(DashboardError::from(
            asset_tracker::MetricsError::InsufficientData { count: 1 },
        ));
        assert_eq!(error.exit_code(), 13);
    }
}
