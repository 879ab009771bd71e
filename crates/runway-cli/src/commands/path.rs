//! Path command - print where a report is stored.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Args;
use runway_core::parse_bucket;

use crate::commands::resolve_report_date;
use crate::{Config, OutputFormat};

/// Arguments for the path command.
#[derive(Debug, Args)]
pub struct PathArgs {
    /// Report date (YYYY-MM-DD). Defaults to yesterday in UTC.
    #[arg(long)]
    pub report_date: Option<NaiveDate>,

    /// Bucket to prefix the key with.
    #[arg(long, env = "S3_PRYMAL_ANALYTICS")]
    pub bucket: Option<String>,
}

/// Execute the path command.
///
/// # Errors
///
/// Returns an error if the configured layout or the bucket name is invalid.
pub fn execute(args: &PathArgs, config: &Config) -> Result<()> {
    let report_date = resolve_report_date(args.report_date);
    let paths = config.report.report_paths()?;
    let key = paths.report_object(report_date);
    let uri = args
        .bucket
        .as_deref()
        .map(parse_bucket)
        .transpose()?
        .map(|bucket| format!("s3://{bucket}/{key}"));

    match config.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "reportDate": report_date.to_string(),
                    "key": key,
                    "uri": uri,
                }))
                .context("Failed to serialize path")?
            );
        }
        OutputFormat::Text | OutputFormat::Table => println!("{}", uri.unwrap_or(key)),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_path_args_parsing() {
        #[derive(Parser)]
        struct TestCli {
            #[command(flatten)]
            args: PathArgs,
        }

        let cli = TestCli::parse_from(["test", "--report-date", "2024-03-01", "--bucket", "analytics"]);
        assert_eq!(cli.args.report_date, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(cli.args.bucket.as_deref(), Some("analytics"));
    }
}
