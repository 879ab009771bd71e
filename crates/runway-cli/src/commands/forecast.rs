//! Forecast command - build the report and print it.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Args;
use runway_core::AwsCredentials;
use runway_report::ReportPipeline;
use tokio_util::sync::CancellationToken;

use crate::commands::{athena_runner, resolve_report_date};
use crate::{Config, OutputFormat, output};

/// Arguments for the forecast command.
#[derive(Debug, Args)]
pub struct ForecastArgs {
    /// Report date (YYYY-MM-DD). Defaults to yesterday in UTC.
    #[arg(long)]
    pub report_date: Option<NaiveDate>,

    /// Also print the statistics of every window.
    #[arg(long)]
    pub windows: bool,
}

/// Execute the forecast command.
///
/// # Errors
///
/// Returns an error if credentials are missing or the report cannot be built.
pub async fn execute(
    args: ForecastArgs,
    config: &Config,
    cancel: &CancellationToken,
) -> Result<()> {
    let report_date = resolve_report_date(args.report_date);
    let credentials = AwsCredentials::from_env()?;
    let runner = athena_runner(&config.report, credentials)?;
    let pipeline = ReportPipeline::new(runner, config.report.clone())?;

    let report = pipeline
        .build_report(report_date, cancel)
        .await
        .with_context(|| format!("forecast for {report_date} failed"))?;

    match config.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("Failed to serialize report")?
            );
        }
        OutputFormat::Text => {
            output::print_text(&report);
            if args.windows {
                println!();
                output::print_window_table(&report);
            }
        }
        OutputFormat::Table => {
            output::print_table(&report);
            if args.windows {
                output::print_window_table(&report);
            }
        }
    }
    Ok(())
}
