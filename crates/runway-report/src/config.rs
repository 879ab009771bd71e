//! Report configuration.
//!
//! [`ReportConfig`] holds everything that shapes a run: regions, databases,
//! the tracked product list, forecast windows and query text. It defaults to
//! the production Shopify report and may be overridden by a JSON file whose
//! fields are all optional.
//!
//! [`RuntimeEnv`] holds what only the environment knows: credentials and the
//! destination bucket.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use runway_core::credentials::required_env;
use runway_core::{AwsCredentials, ReportPaths, parse_bucket};
use runway_warehouse::PollPolicy;
use serde::{Deserialize, Serialize};

use crate::error::{ReportError, Result};
use crate::queries::{INVENTORY_QUERY_TEMPLATE, SALES_QUERY_TEMPLATE};

/// Environment variable naming the destination bucket.
pub const BUCKET_ENV: &str = "S3_PRYMAL_ANALYTICS";

/// Products tracked by the default report, in output order.
pub const DEFAULT_PRODUCTS: [&str; 6] = [
    "Salted Caramel - Large Bag (320 g)",
    "Cacao Mocha - Large Bag (320 g)",
    "Original - Large Bag (320 g)",
    "Vanilla Bean - Large Bag (320 g)",
    "Butter Pecan - Large Bag (320 g)",
    "Cinnamon Dolce - Large Bag (320 g)",
];

/// Trailing window sizes, in records, blended into the run rate.
pub const DEFAULT_WINDOWS: [usize; 4] = [7, 14, 30, 60];

/// Settings for one report run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    /// AWS region for the warehouse and the bucket.
    pub region: String,
    /// Database holding the daily sales table.
    pub sales_database: String,
    /// Database holding the inventory snapshots.
    pub inventory_database: String,
    /// Where the warehouse writes query result files.
    pub query_output_location: String,
    /// Optional warehouse workgroup.
    pub work_group: Option<String>,
    /// Days of sales history to fetch.
    pub lookback_days: u32,
    /// Trailing window sizes in records.
    pub windows: Vec<usize>,
    /// Product display names, in report order.
    pub products: Vec<String>,
    /// Key prefix under which report partitions live.
    pub report_root: String,
    /// File name stem of the report object.
    pub report_file_stem: String,
    /// Sales query template.
    pub sales_query: String,
    /// Inventory query template.
    pub inventory_query: String,
    /// Status polling settings.
    pub poll: PollSettings,
    /// Upper bound on list-then-delete rounds when clearing a partition.
    pub max_delete_rounds: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            sales_database: "prymal-analytics".to_string(),
            inventory_database: "prymal".to_string(),
            query_output_location: "s3://prymal-ops/athena_query_results/".to_string(),
            work_group: None,
            lookback_days: 120,
            windows: DEFAULT_WINDOWS.to_vec(),
            products: DEFAULT_PRODUCTS.iter().map(|p| (*p).to_string()).collect(),
            report_root: "shopify/inventory_report".to_string(),
            report_file_stem: "shopify_inventory_report".to_string(),
            sales_query: SALES_QUERY_TEMPLATE.to_string(),
            inventory_query: INVENTORY_QUERY_TEMPLATE.to_string(),
            poll: PollSettings::default(),
            max_delete_rounds: 10,
        }
    }
}

impl ReportConfig {
    /// Loads a config file, filling unspecified fields with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Config`] if the file cannot be read, is not
    /// valid JSON, or fails [`validate`](Self::validate).
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ReportError::config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_json(&raw)
            .map_err(|e| ReportError::config(format!("{}: {e}", path.display())))
    }

    /// Parses a JSON config document.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Config`] on malformed JSON or invalid settings.
    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)
            .map_err(|e| ReportError::config(format!("invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Config`] describing the first violation.
    pub fn validate(&self) -> Result<()> {
        if self.windows.is_empty() {
            return Err(ReportError::config("at least one forecast window is required"));
        }
        if self.windows.contains(&0) {
            return Err(ReportError::config("forecast windows must be positive"));
        }
        if self.products.is_empty() {
            return Err(ReportError::config("the product list is empty"));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = self.products.iter().find(|p| !seen.insert(p.as_str())) {
            return Err(ReportError::config(format!("duplicate product {dup:?}")));
        }
        if self.lookback_days == 0 {
            return Err(ReportError::config("lookback_days must be positive"));
        }
        if !self.query_output_location.starts_with("s3://") {
            return Err(ReportError::config(format!(
                "query_output_location must be an s3:// URI, got {:?}",
                self.query_output_location
            )));
        }
        if self.max_delete_rounds == 0 {
            return Err(ReportError::config("max_delete_rounds must be positive"));
        }
        self.poll.validate()?;
        self.report_paths().map(|_| ())
    }

    /// Report object paths derived from the root and stem.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Core`] if the root or stem is malformed.
    pub fn report_paths(&self) -> Result<ReportPaths> {
        Ok(ReportPaths::new(&self.report_root, &self.report_file_stem)?)
    }

    /// Poll policy for warehouse queries.
    #[must_use]
    pub fn poll_policy(&self) -> PollPolicy {
        self.poll.to_policy()
    }
}

/// Serializable form of [`PollPolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PollSettings {
    /// Wait after the first status check, in milliseconds.
    pub initial_delay_ms: u64,
    /// Upper bound on a single wait, in milliseconds.
    pub max_delay_ms: u64,
    /// Growth factor per attempt.
    pub multiplier: u32,
    /// Status checks before giving up.
    pub max_attempts: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        let policy = PollPolicy::default();
        Self {
            initial_delay_ms: u64::try_from(policy.initial_delay.as_millis()).unwrap_or(u64::MAX),
            max_delay_ms: u64::try_from(policy.max_delay.as_millis()).unwrap_or(u64::MAX),
            multiplier: policy.multiplier,
            max_attempts: policy.max_attempts,
        }
    }
}

impl PollSettings {
    fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(ReportError::config("poll.max_attempts must be positive"));
        }
        if self.initial_delay_ms > self.max_delay_ms {
            return Err(ReportError::config(
                "poll.initial_delay_ms must not exceed poll.max_delay_ms",
            ));
        }
        Ok(())
    }

    /// Converts to the executor's policy type.
    #[must_use]
    pub const fn to_policy(self) -> PollPolicy {
        PollPolicy {
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            multiplier: self.multiplier,
            max_attempts: self.max_attempts,
        }
    }
}

/// Settings only the process environment provides.
#[derive(Debug, Clone)]
pub struct RuntimeEnv {
    /// Static AWS credentials.
    pub credentials: AwsCredentials,
    /// Destination bucket name.
    pub bucket: String,
}

impl RuntimeEnv {
    /// Reads credentials and the bucket from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Core`] with a configuration error naming the
    /// first missing variable.
    pub fn from_env() -> Result<Self> {
        let credentials = AwsCredentials::from_env()?;
        let bucket = parse_bucket(&required_env(BUCKET_ENV)?)?;
        Ok(Self {
            credentials,
            bucket,
        })
    }
}
