//! # runway-cli
//!
//! Command-line interface for the inventory runway report.
//!
//! ## Commands
//!
//! - `runway run` - Build the report and publish it to the bucket
//! - `runway forecast` - Build the report and print it without publishing
//! - `runway path` - Print the object key for a report date
//!
//! ## Configuration
//!
//! Report settings come from an optional JSON file (`--config` or
//! `RUNWAY_CONFIG`); anything unset keeps its production default. Secrets and
//! the bucket come from the environment:
//!
//! - `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY` - required
//! - `AWS_SESSION_TOKEN` - optional
//! - `S3_PRYMAL_ANALYTICS` - destination bucket (required to publish)

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]
// CLI uses print! macros intentionally
#![allow(clippy::print_stdout)]
#![allow(clippy::print_stderr)]

pub mod commands;
pub mod interrupt;
pub mod output;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use runway_core::LogFormat;
use runway_report::ReportConfig;

/// Inventory runway report.
#[derive(Debug, Parser)]
#[command(name = "runway")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// JSON report configuration file.
    #[arg(long, global = true, env = "RUNWAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log output format.
    #[arg(long, global = true, env = "RUNWAY_LOG_FORMAT", default_value = "pretty")]
    pub log_format: LogFormatArg,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Get the effective configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or is invalid.
    pub fn config(&self) -> Result<Config> {
        let report = match &self.config {
            Some(path) => ReportConfig::from_path(path)
                .with_context(|| format!("loading report config {}", path.display()))?,
            None => ReportConfig::default(),
        };
        Ok(Config {
            report,
            format: self.format.clone(),
        })
    }
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Build the report and publish it.
    Run(commands::run::RunArgs),
    /// Build the report and print it without publishing.
    Forecast(commands::forecast::ForecastArgs),
    /// Print the object key of a report.
    Path(commands::path::PathArgs),
}

/// Output format.
#[derive(Debug, Clone, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output.
    Json,
    /// Table output.
    Table,
}

/// Log format flag.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum LogFormatArg {
    /// Human-readable logs.
    #[default]
    Pretty,
    /// JSON structured logs.
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Pretty => Self::Pretty,
            LogFormatArg::Json => Self::Json,
        }
    }
}

/// CLI configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Report settings.
    pub report: ReportConfig,
    /// Output format.
    pub format: OutputFormat,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_config_defaults() {
        let cli = Cli::parse_from(["runway", "--format", "json", "path", "--report-date", "2024-03-01"]);

        let config = cli.config().expect("default config");
        assert_eq!(config.report, ReportConfig::default());
        assert!(matches!(config.format, OutputFormat::Json));
        assert!(matches!(cli.log_format, LogFormatArg::Pretty));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["runway", "forecast", "--format", "table", "--log-format", "json"]);
        assert!(matches!(cli.format, OutputFormat::Table));
        assert!(matches!(LogFormat::from(cli.log_format), LogFormat::Json));
        assert!(matches!(cli.command, Commands::Forecast(_)));
    }

    #[test]
    fn test_missing_config_file_is_reported() {
        let cli = Cli::parse_from(["runway", "--config", "/nonexistent/runway.json", "forecast"]);
        let err = cli.config().unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/runway.json"));
    }
}
