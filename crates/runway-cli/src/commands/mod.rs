//! CLI command implementations.

pub mod forecast;
pub mod path;
pub mod run;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use runway_core::AwsCredentials;
use runway_report::{ReportConfig, default_report_date};
use runway_warehouse::{AthenaClient, QueryRunner};

/// Resolves the report date flag, defaulting to yesterday (UTC).
#[must_use]
pub fn resolve_report_date(flag: Option<NaiveDate>) -> NaiveDate {
    flag.unwrap_or_else(|| default_report_date(Utc::now()))
}

/// Builds the Athena-backed query runner for `config`.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be created.
pub fn athena_runner(
    config: &ReportConfig,
    credentials: AwsCredentials,
) -> Result<QueryRunner<AthenaClient>> {
    let client = AthenaClient::new(&config.region, credentials)
        .context("failed to create Athena client")?;
    Ok(QueryRunner::new(client, config.poll_policy()))
}
