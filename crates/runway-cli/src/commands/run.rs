//! Run command - build the report and publish it.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use clap::Args;
use runway_core::{AwsCredentials, MemoryBackend, ObjectStoreBackend, StorageBackend};
use runway_report::{ReportPipeline, ReportPublisher, RunSummary, RuntimeEnv};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::commands::{athena_runner, resolve_report_date};
use crate::{Config, OutputFormat, output};

/// Arguments for the run command.
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Report date (YYYY-MM-DD). Defaults to yesterday in UTC.
    #[arg(long)]
    pub report_date: Option<NaiveDate>,

    /// Build the report without touching the bucket.
    #[arg(long)]
    pub dry_run: bool,

    /// Exit with an error if the upload fails.
    #[arg(long)]
    pub strict_upload: bool,
}

/// Execute the run command.
///
/// # Errors
///
/// Returns an error if the environment is incomplete, a query fails, stale
/// objects cannot be cleared, or `--strict-upload` is set and the upload
/// failed.
pub async fn execute(args: RunArgs, config: &Config, cancel: &CancellationToken) -> Result<()> {
    let report_date = resolve_report_date(args.report_date);
    let paths = config.report.report_paths()?;

    let Destination {
        credentials,
        bucket,
        storage,
    } = destination(config, args.dry_run)?;

    let publisher = ReportPublisher::new(storage, paths)
        .with_max_delete_rounds(config.report.max_delete_rounds);
    let runner = athena_runner(&config.report, credentials)?;
    let pipeline = ReportPipeline::new(runner, config.report.clone())?;

    let summary = pipeline
        .run(&publisher, report_date, args.dry_run, cancel)
        .await
        .with_context(|| format!("report run for {report_date} failed"))?;

    print_summary(config, bucket.as_deref(), &summary)?;

    if let Some(outcome) = &summary.publish {
        if !outcome.is_uploaded() {
            if args.strict_upload {
                bail!("upload of {} failed", outcome.key);
            }
            warn!(key = %outcome.key, "report was not uploaded");
        }
    }
    Ok(())
}

/// Where a run writes, plus the credentials it runs with.
struct Destination {
    credentials: AwsCredentials,
    bucket: Option<String>,
    storage: Arc<dyn StorageBackend>,
}

/// Dry runs publish into memory and need no bucket.
fn destination(config: &Config, dry_run: bool) -> Result<Destination> {
    if dry_run {
        return Ok(Destination {
            credentials: AwsCredentials::from_env()?,
            bucket: None,
            storage: Arc::new(MemoryBackend::new()),
        });
    }
    let env = RuntimeEnv::from_env()?;
    let storage = ObjectStoreBackend::s3(&env.bucket, &config.report.region, &env.credentials)
        .context("failed to configure report bucket")?;
    Ok(Destination {
        credentials: env.credentials,
        bucket: Some(env.bucket),
        storage: Arc::new(storage),
    })
}

fn print_summary(config: &Config, bucket: Option<&str>, summary: &RunSummary) -> Result<()> {
    match config.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(summary).context("Failed to serialize summary")?
            );
        }
        OutputFormat::Text => output::print_text(&summary.report),
        OutputFormat::Table => output::print_table(&summary.report),
    }

    if matches!(config.format, OutputFormat::Json) {
        return Ok(());
    }
    match (&summary.publish, bucket) {
        (Some(outcome), Some(bucket)) => output::print_publish(bucket, outcome),
        _ => {
            println!();
            println!("Dry run: nothing was published");
        }
    }
    Ok(())
}
