//! Typed path helpers for date-partitioned report objects.
//!
//! Reports live at `{root}/partition_date=<date>/{stem}_<date>.csv` inside a
//! bucket. The bucket itself is not part of the key.

use chrono::NaiveDate;

use crate::error::{Error, Result};

const DEFAULT_ROOT: &str = "shopify/inventory_report";
const DEFAULT_STEM: &str = "shopify_inventory_report";

/// Typed report paths under a scope-relative root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    root: String,
    file_stem: String,
}

impl ReportPaths {
    /// Creates typed paths rooted at `root`, naming files `{file_stem}_<date>.csv`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `root` is not a clean relative path or
    /// `file_stem` is empty or contains a separator.
    pub fn new(root: impl AsRef<str>, file_stem: impl AsRef<str>) -> Result<Self> {
        let root = normalize_relative_path(root.as_ref())?;
        let file_stem = file_stem.as_ref().trim();
        if file_stem.is_empty() || file_stem.contains('/') {
            return Err(Error::InvalidInput(format!(
                "report file stem must be a non-empty file name: {file_stem:?}"
            )));
        }
        Ok(Self {
            root,
            file_stem: file_stem.to_string(),
        })
    }

    /// Paths used by the Shopify inventory report.
    #[must_use]
    pub fn shopify_default() -> Self {
        Self {
            root: DEFAULT_ROOT.to_string(),
            file_stem: DEFAULT_STEM.to_string(),
        }
    }

    /// Returns the root under which all partitions live.
    #[must_use]
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Returns the partition directory for `date`, with a trailing slash.
    #[must_use]
    pub fn partition_prefix(&self, date: NaiveDate) -> String {
        format!("{}/partition_date={}/", self.root, format_date(date))
    }

    /// Returns the object key of the report for `date`.
    #[must_use]
    pub fn report_object(&self, date: NaiveDate) -> String {
        let date = format_date(date);
        format!(
            "{}/partition_date={date}/{}_{date}.csv",
            self.root, self.file_stem
        )
    }
}

impl Default for ReportPaths {
    fn default() -> Self {
        Self::shopify_default()
    }
}

/// Formats a partition date as `YYYY-MM-DD`.
#[must_use]
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Resolves a bucket name from `name`, `s3://name` or `s3://name/`.
///
/// # Errors
///
/// Returns [`Error::Configuration`] when the bucket is empty or carries a key path.
pub fn parse_bucket(value: &str) -> Result<String> {
    let value = value.trim();
    let bare = value
        .strip_prefix("s3://")
        .unwrap_or(value)
        .trim_end_matches('/');

    if bare.is_empty() {
        return Err(Error::configuration("bucket name must not be empty"));
    }
    if bare.contains('/') {
        return Err(Error::configuration(format!(
            "bucket name must not contain a key path: {value}"
        )));
    }
    Ok(bare.to_string())
}

fn normalize_relative_path(path: &str) -> Result<String> {
    let normalized = path.trim().trim_matches('/').to_string();
    if normalized.is_empty() {
        return Err(Error::InvalidInput("path must not be empty".to_string()));
    }

    if normalized.contains('\\') {
        return Err(Error::InvalidInput(
            "backslashes are not allowed in paths".to_string(),
        ));
    }

    if normalized.contains('\n') || normalized.contains('\r') || normalized.contains('\0') {
        return Err(Error::InvalidInput(
            "control characters are not allowed in paths".to_string(),
        ));
    }

    for segment in normalized.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(Error::InvalidInput(format!(
                "invalid path segment in {normalized:?}"
            )));
        }
    }

    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap_or_default()
    }

    #[test]
    fn default_paths_match_published_layout() {
        let paths = ReportPaths::shopify_default();
        assert_eq!(
            paths.report_object(date()),
            "shopify/inventory_report/partition_date=2024-03-01/shopify_inventory_report_2024-03-01.csv"
        );
        assert_eq!(
            paths.partition_prefix(date()),
            "shopify/inventory_report/partition_date=2024-03-01/"
        );
    }

    #[test]
    fn report_object_lives_under_partition_prefix() {
        let paths = ReportPaths::new("/reports/runway/", "runway").unwrap_or_default();
        assert!(paths
            .report_object(date())
            .starts_with(&paths.partition_prefix(date())));
        assert_eq!(paths.root(), "reports/runway");
    }

    #[test]
    fn rejects_traversal_and_empty_roots() {
        assert!(ReportPaths::new("a/../b", "x").is_err());
        assert!(ReportPaths::new("  ", "x").is_err());
        assert!(ReportPaths::new("a//b", "x").is_err());
        assert!(ReportPaths::new("a/b", "").is_err());
        assert!(ReportPaths::new("a/b", "x/y").is_err());
    }

    #[test]
    fn parses_bucket_forms() {
        assert_eq!(parse_bucket("analytics").ok().as_deref(), Some("analytics"));
        assert_eq!(parse_bucket("s3://analytics/").ok().as_deref(), Some("analytics"));
        assert!(parse_bucket("s3://").is_err());
        assert!(parse_bucket("s3://analytics/reports").is_err());
    }
}
